use log::warn;

/// Keeps interactions from overlapping. Anything that changes the board over
/// a period of time (dragging, walking, etc.) takes a lock when it starts and
/// releases it when it's done. New interactions are only allowed while no
/// locks are held.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct InteractionGuard {
    locks: u32,
}

impl InteractionGuard {
    pub fn lock(&mut self) {
        self.locks += 1;
    }

    /// Release one lock. Releasing with no locks held is a bug in the caller,
    /// but it's logged and ignored rather than wrapping around.
    pub fn unlock(&mut self) {
        match self.locks.checked_sub(1) {
            Some(locks) => self.locks = locks,
            None => warn!("Interaction lock released while not held"),
        }
    }

    pub fn can_interact(&self) -> bool {
        self.locks == 0
    }
}
