//! Heartbeat cadence: how often a timestamp line lands in the status
//! display while nothing else is written there.

/// Minutes between heartbeats, indexed by how many have fired since the
/// last status activity.
pub const HEARTBEAT_MINUTES: [u32; 13] = [5, 6, 6, 7, 8, 10, 13, 18, 28, 39, 60, 120, 240];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCadence {
    index: usize,
    countdown_min: u32,
}

impl Default for StatusCadence {
    fn default() -> StatusCadence {
        StatusCadence {
            index: 0,
            countdown_min: 1,
        }
    }
}

impl StatusCadence {
    pub fn new() -> StatusCadence {
        StatusCadence::default()
    }

    /// Status activity: the next heartbeat comes one minute from now.
    pub fn reset(&mut self) {
        *self = StatusCadence::default();
    }

    /// Called on every wall-clock minute change. Returns true when a
    /// heartbeat is due, in which case the cadence has already backed off.
    pub fn on_minute(&mut self) -> bool {
        self.countdown_min = self.countdown_min.saturating_sub(1);
        if self.countdown_min > 0 {
            return false;
        }
        self.index = (self.index + 1).min(HEARTBEAT_MINUTES.len() - 1);
        self.countdown_min = HEARTBEAT_MINUTES[self.index];
        true
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn countdown(&self) -> u32 {
        self.countdown_min
    }
}
