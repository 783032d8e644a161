//! Everything that moves things around on a [Board]: the draggable mirror,
//! movable and rotatable block groups, and the player. A [Puzzle] owns the
//! board plus all of these controllers, and routes pointer input to them.

pub mod movable;
pub mod player;
pub mod rotatable;

use anyhow::{anyhow, bail, Context};
use fnv::FnvBuildHasher;
use log::{debug, info, warn};
use nalgebra::{Point3, Vector3};
use std::collections::HashSet;
use validator::Validate;

use crate::{
    board::{
        event::{PointerEvent, PointerEventKind, Subscriptions},
        Board, BlockId,
    },
    config::PuzzleConfig,
    puzzle::{
        movable::{MovableBlock, MovableMember},
        player::{Player, PlayerStep},
        rotatable::{RotatableBlock, RotateOutcome},
    },
    util::{self, WorldCellSet},
};

/// A set of blocks
pub type BlockSet = HashSet<BlockId, FnvBuildHasher>;

/// Who reacts to pointer events on a block. Each variant holds an index into
/// the puzzle's list of groups of that kind.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Handler {
    Movable(usize),
    Rotatable(usize),
}

/// A drag that's currently in progress. Only one can run at a time, since
/// starting one takes the interaction lock.
#[derive(Clone, Debug)]
enum ActiveDrag {
    Mirror,
    Movable {
        group: usize,
        /// Cells the group can't move into, fixed for the whole drag
        obstacles: WorldCellSet,
    },
}

/// A playable puzzle: a board plus everything that can change it
#[derive(Debug)]
pub struct Puzzle {
    board: Board,
    movables: Vec<MovableBlock>,
    rotatables: Vec<RotatableBlock>,
    player: Option<Player>,
    subscriptions: Subscriptions<Handler>,
    drag: Option<ActiveDrag>,
    highlighted: BlockSet,
}

impl Puzzle {
    /// Build a puzzle from config. The config is validated first, then block
    /// names are resolved and the board gets its first rebuild. Returns an
    /// error if the config is invalid, refers to a block that doesn't exist,
    /// pairs up groups that don't point back at each other, or if the first
    /// rebuild fails.
    pub fn new(config: PuzzleConfig) -> anyhow::Result<Self> {
        config.validate().context("invalid config")?;

        let mut board =
            Board::new(config.camera.to_camera(), config.mirror.to_plane());
        for block in &config.blocks {
            board.add_block(
                block.name.as_str(),
                block.category,
                Point3::from(block.position),
            );
        }
        let resolve = |name: &str| {
            board
                .find_block(name)
                .ok_or_else(|| anyhow!("unknown block {:?}", name))
        };

        let movables = config
            .movables
            .iter()
            .map(|movable| {
                let members = movable
                    .blocks
                    .iter()
                    .map(|member| {
                        Ok(MovableMember {
                            block: resolve(member.block.as_str())?,
                            x_range: (member.move_x_min, member.move_x_max),
                            z_range: (member.move_z_min, member.move_z_max),
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(MovableBlock::new(
                    members,
                    movable.mirrored,
                    movable.passive,
                    movable.move_speed,
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .context("error resolving movable groups")?;
        check_pairs(movables.iter().map(MovableBlock::mirrored))
            .context("error pairing movable groups")?;

        let rotatables = config
            .rotatables
            .iter()
            .map(|rotatable| {
                let members = rotatable
                    .blocks
                    .iter()
                    .map(|name| resolve(name.as_str()))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(RotatableBlock::new(
                    members,
                    resolve(rotatable.pivot.as_str())?,
                    Vector3::from(rotatable.axis),
                    rotatable.mirrored,
                    rotatable.passive,
                ))
            })
            .collect::<anyhow::Result<Vec<_>>>()
            .context("error resolving rotatable groups")?;
        check_pairs(rotatables.iter().map(RotatableBlock::mirrored))
            .context("error pairing rotatable groups")?;

        let player = match &config.player {
            Some(player) => Some(
                Player::new(
                    resolve(player.start.as_str())?,
                    player
                        .goals
                        .iter()
                        .map(|name| resolve(name.as_str()))
                        .collect::<anyhow::Result<_>>()?,
                ),
            ),
            None => None,
        };

        // Passive groups never hear from the pointer
        let mut subscriptions = Subscriptions::default();
        for (i, movable) in movables.iter().enumerate() {
            if !movable.is_passive() {
                for member in movable.members() {
                    subscriptions.subscribe(member.block, Handler::Movable(i));
                }
            }
        }
        for (i, rotatable) in rotatables.iter().enumerate() {
            if !rotatable.is_passive() {
                for &block in rotatable.members() {
                    subscriptions.subscribe(block, Handler::Rotatable(i));
                }
            }
        }

        board.rebuild().context("error in initial rebuild")?;
        info!(
            "Loaded puzzle: {} blocks, {} movable groups, {} rotatable groups",
            board.blocks().len(),
            movables.len(),
            rotatables.len()
        );

        Ok(Self {
            board,
            movables,
            rotatables,
            player,
            subscriptions,
            drag: None,
            highlighted: BlockSet::default(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn movables(&self) -> &[MovableBlock] {
        &self.movables
    }

    pub fn rotatables(&self) -> &[RotatableBlock] {
        &self.rotatables
    }

    pub fn player(&self) -> Option<&Player> {
        self.player.as_ref()
    }

    /// Blocks that are lit up because the pointer is over their group (or
    /// over the group's mirrored counterpart)
    pub fn highlighted(&self) -> &BlockSet {
        &self.highlighted
    }

    /// Send a pointer event to everything subscribed to its block. Events on
    /// blocks that nobody listens to are dropped.
    pub fn dispatch(&mut self, event: PointerEvent) -> anyhow::Result<()> {
        // Copy out the handlers so they're free to mutate the puzzle
        let handlers = self.subscriptions.handlers(event.block).to_vec();
        if handlers.is_empty() {
            debug!("No handlers for {}", event);
        }

        for handler in handlers {
            match (handler, event.kind) {
                (Handler::Movable(group), PointerEventKind::Down) => {
                    self.begin_movable_drag(group)?;
                }
                (
                    Handler::Movable(group),
                    PointerEventKind::Drag { delta_x },
                ) => {
                    if self.is_dragging_movable(group) {
                        self.drag_movable(delta_x)?;
                    }
                }
                (Handler::Movable(group), PointerEventKind::Up) => {
                    if self.is_dragging_movable(group) {
                        self.end_movable_drag()?;
                    }
                }
                (Handler::Rotatable(group), PointerEventKind::Down) => {
                    self.try_rotate(group)?;
                }
                (handler, PointerEventKind::Enter) => self.highlight(handler),
                (_, PointerEventKind::Exit) => self.highlighted.clear(),
                // Rotatables only care about clicks
                (Handler::Rotatable(_), _) => {}
            }
        }
        Ok(())
    }

    /// Light up a group and its mirrored counterpart
    fn highlight(&mut self, handler: Handler) {
        self.highlighted.clear();
        match handler {
            Handler::Movable(i) => {
                let group = &self.movables[i];
                let mirrored = &self.movables[group.mirrored()];
                self.highlighted.extend(
                    group
                        .members()
                        .iter()
                        .chain(mirrored.members())
                        .map(|member| member.block),
                );
            }
            Handler::Rotatable(i) => {
                let group = &self.rotatables[i];
                let mirrored = &self.rotatables[group.mirrored()];
                self.highlighted.extend(
                    group.members().iter().chain(mirrored.members()).copied(),
                );
            }
        }
    }

    /// Start dragging the mirror. Returns false (and does nothing) if there's
    /// no mirror, or if something else is going on.
    pub fn begin_mirror_drag(&mut self) -> bool {
        if self.board.mirror().is_none() {
            debug!("Ignoring mirror drag, there's no mirror");
            return false;
        }
        if !self.board.can_interact() {
            debug!("Ignoring mirror drag, board is locked");
            return false;
        }
        self.board.begin_interaction_lock();
        self.drag = Some(ActiveDrag::Mirror);
        true
    }

    /// Slide the mirror one step in the direction of `delta_x`. Ignored
    /// unless a mirror drag is in progress.
    pub fn drag_mirror(&mut self, delta_x: f64) {
        if let Some(ActiveDrag::Mirror) = self.drag {
            if let Some(mirror) = self.board.mirror_mut() {
                mirror.drag(delta_x);
            }
        }
    }

    /// Snap the mirror into place, release the lock and rebuild. Ignored
    /// unless a mirror drag is in progress.
    pub fn end_mirror_drag(&mut self) -> anyhow::Result<()> {
        if let Some(ActiveDrag::Mirror) = self.drag {
            self.drag = None;
            if let Some(mirror) = self.board.mirror_mut() {
                mirror.snap();
                debug!("Mirror snapped to x={}", mirror.position.x);
            }
            self.board.end_interaction_lock();
            self.board.rebuild()?;
        }
        Ok(())
    }

    fn is_dragging_movable(&self, index: usize) -> bool {
        matches!(
            self.drag,
            Some(ActiveDrag::Movable { group, .. }) if group == index
        )
    }

    /// Start dragging a movable group. Returns false (and does nothing) if
    /// the group is passive, or if something else is going on.
    pub fn begin_movable_drag(&mut self, index: usize) -> anyhow::Result<bool> {
        let group = movable(&self.movables, index)?;
        if group.is_passive() {
            debug!("Ignoring drag on passive movable group {}", index);
            return Ok(false);
        }
        if !self.board.can_interact() {
            debug!("Ignoring drag on movable group {}, board is locked", index);
            return Ok(false);
        }

        let obstacles = group.obstacles(&self.board)?;
        self.board.begin_interaction_lock();
        self.drag = Some(ActiveDrag::Movable {
            group: index,
            obstacles,
        });
        Ok(true)
    }

    /// Move the dragged group one step in the direction of `delta_x`, and its
    /// mirrored group along with it. Returns whether anything moved. Nothing
    /// moves if the group would run into another block, or if no movable drag
    /// is in progress.
    pub fn drag_movable(&mut self, delta_x: f64) -> anyhow::Result<bool> {
        let (index, obstacles) = match &self.drag {
            Some(ActiveDrag::Movable { group, obstacles }) => {
                (*group, obstacles)
            }
            _ => return Ok(false),
        };
        let group = movable(&self.movables, index)?;
        let mirrored = movable(&self.movables, group.mirrored())?;
        let step = group.move_speed() * util::sign(delta_x);
        if step == 0.0 || !group.can_move(&self.board, obstacles, step)? {
            return Ok(false);
        }

        group.shift(&mut self.board, step, step)?;
        mirrored.shift(&mut self.board, step, -step)?;
        Ok(true)
    }

    /// Snap the dragged group and its mirrored group onto the grid, release
    /// the lock and rebuild. Ignored unless a movable drag is in progress.
    pub fn end_movable_drag(&mut self) -> anyhow::Result<()> {
        let index = match self.drag {
            Some(ActiveDrag::Movable { group, .. }) => group,
            _ => return Ok(()),
        };
        self.drag = None;
        let group = movable(&self.movables, index)?;
        let mirrored = movable(&self.movables, group.mirrored())?;
        group.snap(&mut self.board)?;
        mirrored.snap(&mut self.board)?;
        self.board.end_interaction_lock();
        self.board.rebuild()
    }

    /// Rotate a group by its current angle, and its mirrored group the other
    /// way. If that's blocked, the group turns around and tries the other
    /// direction. See [RotateOutcome] for the possible results.
    pub fn try_rotate(&mut self, index: usize) -> anyhow::Result<RotateOutcome> {
        if rotatable(&self.rotatables, index)?.is_passive() {
            debug!("Ignoring rotation of passive group {}", index);
            return Ok(RotateOutcome::Ignored);
        }
        if !self.board.can_interact() {
            debug!("Ignoring rotation of group {}, board is locked", index);
            return Ok(RotateOutcome::Ignored);
        }

        let group = rotatable(&self.rotatables, index)?;
        if !group.can_rotate(&self.board, group.angle())? {
            self.rotatables[index].flip_angle();
            let group = &self.rotatables[index];
            if !group.can_rotate(&self.board, group.angle())? {
                warn!("Rotatable group {} is stuck", index);
                return Ok(RotateOutcome::Stuck);
            }
        }

        let group = &self.rotatables[index];
        let mirrored = rotatable(&self.rotatables, group.mirrored())?;
        let angle = group.angle();
        self.board.begin_interaction_lock();
        let rotated = group
            .rotate(&mut self.board, angle)
            .and_then(|()| mirrored.rotate(&mut self.board, -angle));
        self.board.end_interaction_lock();
        rotated.with_context(|| format!("error rotating group {}", index))?;

        self.board.rebuild()?;
        Ok(RotateOutcome::Rotated(angle))
    }

    /// Start walking towards the next goal. Returns false if there's no
    /// player, it's already walking, it has no goals left, the board is
    /// locked, or there's no way to get to the goal from here.
    pub fn try_move(&mut self) -> bool {
        let player = match &mut self.player {
            Some(player) => player,
            None => return false,
        };
        if player.is_moving() || !self.board.can_interact() {
            debug!("Player can't move right now");
            return false;
        }
        let goal = match player.next_goal() {
            Some(goal) => goal,
            None => return false,
        };

        match self.board.plan_path(player.block(), goal) {
            Some(path) => {
                info!(
                    "Player heading from {} to {} ({} steps)",
                    player.block(),
                    goal,
                    path.len()
                );
                player.start_movement(path);
                self.board.begin_interaction_lock();
                true
            }
            None => {
                debug!("No path from {} to {}", player.block(), goal);
                false
            }
        }
    }

    /// Advance the player by one edge. When that finishes a movement, the
    /// lock is released, the board rebuilt, and the next movement attempted.
    pub fn step(&mut self) -> anyhow::Result<PlayerStep> {
        let step = match self.player.as_mut().and_then(Player::advance) {
            Some(step) => step,
            None => return Ok(PlayerStep::Idle),
        };

        if let PlayerStep::Arrived { goal, .. } = step {
            info!("Player reached {}", goal);
            self.board.end_interaction_lock();
            self.board.rebuild()?;
            self.try_move();
        }
        Ok(step)
    }

    /// Walk the player through every goal it can reach, one step at a time,
    /// and collect the steps taken. Stops when the player runs out of goals
    /// or gets stuck.
    pub fn walk(&mut self) -> anyhow::Result<Vec<PlayerStep>> {
        let mut steps = Vec::new();
        self.try_move();
        loop {
            match self.step()? {
                PlayerStep::Idle => break,
                step => steps.push(step),
            }
        }
        Ok(steps)
    }
}

// These take the group lists rather than the puzzle, so the board can be
// borrowed mutably at the same time

fn movable(
    movables: &[MovableBlock],
    index: usize,
) -> anyhow::Result<&MovableBlock> {
    movables
        .get(index)
        .ok_or_else(|| anyhow!("unknown movable group {}", index))
}

fn rotatable(
    rotatables: &[RotatableBlock],
    index: usize,
) -> anyhow::Result<&RotatableBlock> {
    rotatables
        .get(index)
        .ok_or_else(|| anyhow!("unknown rotatable group {}", index))
}

/// Make sure every group's counterpart exists, is a different group, and
/// points back at it
fn check_pairs(mirrored: impl Iterator<Item = usize>) -> anyhow::Result<()> {
    let targets: Vec<usize> = mirrored.collect();
    for (i, &target) in targets.iter().enumerate() {
        match targets.get(target) {
            None => bail!("group {} is paired with unknown group {}", i, target),
            Some(_) if target == i => bail!("group {} is paired with itself", i),
            Some(&back) if back != i => bail!(
                "group {} is paired with {}, but {} is paired with {}",
                i,
                target,
                target,
                back
            ),
            Some(_) => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_pairs() {
        assert!(check_pairs(vec![1, 0, 3, 2].into_iter()).is_ok());
        assert!(check_pairs(Vec::new().into_iter()).is_ok());
        assert!(check_pairs(vec![1].into_iter()).is_err());
        assert!(check_pairs(vec![0].into_iter()).is_err());
        assert!(check_pairs(vec![1, 2, 0].into_iter()).is_err());
    }
}
