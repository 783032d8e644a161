//! Pointer events and the subscriptions that route them, plus notifications
//! for completed rebuilds.

use derive_more::Display;
use fnv::FnvBuildHasher;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};

use crate::board::{graph::BlockGraph, BlockId};

/// Something the pointer did to a block. Pointer input itself comes from
/// whatever is hosting the board, this is just the common language for it.
#[derive(Copy, Clone, Debug, Display, PartialEq, Serialize, Deserialize)]
#[display(fmt = "{} on {}", kind, block)]
pub struct PointerEvent {
    pub block: BlockId,
    pub kind: PointerEventKind,
}

impl PointerEvent {
    pub fn new(block: BlockId, kind: PointerEventKind) -> Self {
        Self { block, kind }
    }
}

#[derive(Copy, Clone, Debug, Display, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum PointerEventKind {
    /// Button pressed while over the block
    #[display(fmt = "down")]
    Down,
    /// Pointer moved while the button is held. Only the sign of the
    /// horizontal delta matters.
    #[display(fmt = "drag {}", delta_x)]
    Drag { delta_x: f64 },
    /// Button released after a press on the block
    #[display(fmt = "up")]
    Up,
    /// Pointer started hovering the block
    #[display(fmt = "enter")]
    Enter,
    /// Pointer stopped hovering the block
    #[display(fmt = "exit")]
    Exit,
}

/// Handlers subscribed to pointer events, keyed by the block they listen on.
/// A handler is usually a small `Copy` key that the owner uses to look up
/// whatever should react, e.g. an index into a list of controllers.
#[derive(Clone, Debug)]
pub struct Subscriptions<H> {
    handlers: HashMap<BlockId, Vec<H>, FnvBuildHasher>,
}

impl<H: Copy> Subscriptions<H> {
    /// Start listening for events on the given block
    pub fn subscribe(&mut self, block: BlockId, handler: H) {
        self.handlers.entry(block).or_default().push(handler);
    }

    /// Get every handler listening on a block, in subscription order
    pub fn handlers(&self, block: BlockId) -> &[H] {
        self.handlers
            .get(&block)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

// Derived Default would require H: Default
impl<H> Default for Subscriptions<H> {
    fn default() -> Self {
        Self {
            handlers: HashMap::default(),
        }
    }
}

type RebuildListener = Box<dyn FnMut(&BlockGraph)>;

/// Callbacks that get told about every successful rebuild
#[derive(Default)]
pub struct RebuildListeners {
    listeners: Vec<RebuildListener>,
}

impl RebuildListeners {
    pub fn add(&mut self, listener: impl FnMut(&BlockGraph) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Call every listener, in the order they were added
    pub fn notify(&mut self, graph: &BlockGraph) {
        for listener in &mut self.listeners {
            listener(graph);
        }
    }
}

impl fmt::Debug for RebuildListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RebuildListeners({})", self.listeners.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_test::{assert_tokens, Token};
    use std::{cell::Cell, rc::Rc};

    #[test]
    fn test_subscriptions() {
        let mut subscriptions = Subscriptions::default();
        subscriptions.subscribe(BlockId::new(2), 'a');
        subscriptions.subscribe(BlockId::new(2), 'b');
        subscriptions.subscribe(BlockId::new(5), 'c');
        assert_eq!(subscriptions.handlers(BlockId::new(2)), &['a', 'b']);
        assert_eq!(subscriptions.handlers(BlockId::new(5)), &['c']);
        assert!(subscriptions.handlers(BlockId::new(0)).is_empty());
    }

    #[test]
    fn test_rebuild_listeners() {
        let calls = Rc::new(Cell::new(0));
        let mut listeners = RebuildListeners::default();
        let counter = Rc::clone(&calls);
        listeners.add(move |_| counter.set(counter.get() + 1));
        assert_eq!(listeners.listeners.len(), 1);

        let graph = BlockGraph::empty();
        listeners.notify(&graph);
        listeners.notify(&graph);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_display() {
        let event =
            PointerEvent::new(BlockId::new(3), PointerEventKind::Drag {
                delta_x: -2.5,
            });
        assert_eq!(event.to_string(), "drag -2.5 on #3");
        let event = PointerEvent::new(BlockId::new(0), PointerEventKind::Down);
        assert_eq!(event.to_string(), "down on #0");
    }

    #[test]
    fn test_serde() {
        assert_tokens(
            &PointerEventKind::Drag { delta_x: 1.5 },
            &[
                Token::Struct {
                    name: "PointerEventKind",
                    len: 2,
                },
                Token::Str("type"),
                Token::Str("drag"),
                Token::Str("delta_x"),
                Token::F64(1.5),
                Token::StructEnd,
            ],
        );
        assert_tokens(
            &PointerEventKind::Exit,
            &[
                Token::Struct {
                    name: "PointerEventKind",
                    len: 1,
                },
                Token::Str("type"),
                Token::Str("exit"),
                Token::StructEnd,
            ],
        );
    }
}
