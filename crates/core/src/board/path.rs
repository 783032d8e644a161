use fnv::FnvBuildHasher;
use std::collections::{HashMap, HashSet, VecDeque};

use crate::board::BlockId;

/// A shortest route between two blocks, stored as a map from each block to the
/// next block on the way to the goal. Walk it forward with [Path::next_step]
/// or [Path::steps].
#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    start: BlockId,
    goal: BlockId,
    next: HashMap<BlockId, BlockId, FnvBuildHasher>,
}

impl Path {
    pub fn start(&self) -> BlockId {
        self.start
    }

    pub fn goal(&self) -> BlockId {
        self.goal
    }

    /// Get the block to move to after the given one. `None` if the block is
    /// the goal, or isn't on the way to the goal at all.
    pub fn next_step(&self, from: BlockId) -> Option<BlockId> {
        if from == self.goal {
            None
        } else {
            self.next.get(&from).copied()
        }
    }

    /// Every block on the path, starting with the start block and ending with
    /// the goal block
    pub fn blocks(&self) -> impl Iterator<Item = BlockId> + '_ {
        std::iter::successors(Some(self.start), move |&block| {
            self.next_step(block)
        })
    }

    /// Every block to move to, in order. Excludes the start block.
    pub fn steps(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks().skip(1)
    }

    /// Number of edges between start and goal
    pub fn len(&self) -> usize {
        self.steps().count()
    }

    /// Is the start block already the goal?
    pub fn is_empty(&self) -> bool {
        self.start == self.goal
    }
}

/// Find a shortest path (by number of edges) from `start` to `goal`. The search
/// runs backwards, from the goal outwards, so that each discovered block can
/// remember which block to step to next. A block's next step is always the
/// first block that discovered it, which keeps every step on a shortest path.
///
/// Returns `None` if there is no route. That's a normal outcome, not an error.
pub fn plan_path<'a>(
    start: BlockId,
    goal: BlockId,
    neighbors: impl Fn(BlockId) -> &'a [BlockId],
) -> Option<Path> {
    let mut next: HashMap<BlockId, BlockId, FnvBuildHasher> =
        HashMap::default();
    let mut discovered: HashSet<BlockId, FnvBuildHasher> = HashSet::default();
    let mut queue: VecDeque<BlockId> = VecDeque::new();

    discovered.insert(goal);
    queue.push_back(goal);

    while let Some(block) = queue.pop_front() {
        if block == start {
            return Some(Path { start, goal, next });
        }

        for &adjacent in neighbors(block) {
            if discovered.insert(adjacent) {
                next.insert(adjacent, block);
                queue.push_back(adjacent);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A 5x5 grid with a wall across the middle row. Only the rightmost cell
    /// of the wall row is open. Blocks are numbered row by row.
    ///
    /// ```text
    /// z=4  20 21 22 23 24
    /// z=3  15 16 17 18 19
    /// z=2  ## ## ## ## 14
    /// z=1   5  6  7  8  9
    /// z=0   0  1  2  3  4
    /// ```
    fn walled_grid() -> Vec<Vec<BlockId>> {
        let is_open = |x: i32, z: i32| {
            (0..5).contains(&x) && (0..5).contains(&z) && (z != 2 || x == 4)
        };
        let mut neighbors = vec![Vec::new(); 25];
        for z in 0..5 {
            for x in 0..5 {
                if !is_open(x, z) {
                    continue;
                }
                for (dx, dz) in [(1, 0), (-1, 0), (0, 1), (0, -1)].iter() {
                    let (ax, az) = (x + dx, z + dz);
                    if is_open(ax, az) {
                        neighbors[(z * 5 + x) as usize]
                            .push(BlockId::new((az * 5 + ax) as usize));
                    }
                }
            }
        }
        neighbors
    }

    fn plan(
        graph: &[Vec<BlockId>],
        start: usize,
        goal: usize,
    ) -> Option<Path> {
        plan_path(BlockId::new(start), BlockId::new(goal), |id| {
            graph[id.index()].as_slice()
        })
    }

    #[test]
    fn test_walk_around_wall() {
        let graph = walled_grid();
        let path = plan(&graph, 0, 20).unwrap();
        // 4 right, 4 up, 4 left
        assert_eq!(path.len(), 12);
        assert_eq!(path.start(), BlockId::new(0));
        assert_eq!(path.goal(), BlockId::new(20));

        // Every step is along an edge, and the gap gets used
        let blocks: Vec<BlockId> = path.blocks().collect();
        assert_eq!(blocks.len(), 13);
        assert_eq!(blocks.last(), Some(&BlockId::new(20)));
        assert!(blocks.contains(&BlockId::new(14)));
        for pair in blocks.windows(2) {
            assert!(graph[pair[0].index()].contains(&pair[1]));
        }
    }

    #[test]
    fn test_shortest() {
        let graph = walled_grid();
        // Straight line across the bottom row
        assert_eq!(plan(&graph, 0, 4).unwrap().len(), 4);
        // Same side of the wall
        assert_eq!(plan(&graph, 16, 24).unwrap().len(), 4);
        assert_eq!(plan(&graph, 9, 19).unwrap().len(), 2);
    }

    #[test]
    fn test_already_there() {
        let graph = walled_grid();
        let path = plan(&graph, 7, 7).unwrap();
        assert!(path.is_empty());
        assert_eq!(path.len(), 0);
        assert_eq!(path.next_step(BlockId::new(7)), None);
    }

    #[test]
    fn test_no_path() {
        let graph = walled_grid();
        // The wall blocks themselves have no edges
        assert_eq!(plan(&graph, 10, 0), None);
        assert_eq!(plan(&graph, 0, 10), None);
    }

    #[test]
    fn test_first_discovery_wins() {
        // 0 is the goal, 3 the start. 1 and 2 both reach 3, but 1 is
        // discovered first so 3 steps to 1.
        let graph = vec![
            vec![BlockId::new(1), BlockId::new(2)],
            vec![BlockId::new(0), BlockId::new(3)],
            vec![BlockId::new(0), BlockId::new(3)],
            vec![BlockId::new(1), BlockId::new(2)],
        ];
        let path = plan(&graph, 3, 0).unwrap();
        assert_eq!(path.next_step(BlockId::new(3)), Some(BlockId::new(1)));
        assert_eq!(
            path.steps().collect::<Vec<_>>(),
            vec![BlockId::new(1), BlockId::new(0)]
        );
    }
}
