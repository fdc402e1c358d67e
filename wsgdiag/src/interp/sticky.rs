//! Sticky error: the latest device error, kept visible for a fixed period.

pub const DEFAULT_PERIOD_S: u32 = 600;

/// What a one-second tick did to the sticky error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StickyTick {
    Idle,
    /// Still counting down. `redisplay` is set on whole elapsed minutes.
    Active { redisplay: bool },
    /// The countdown ran out on this tick and the error was cleared.
    Expired,
}

#[derive(Debug, Clone)]
pub struct StickyError {
    text: Option<String>,
    countdown_s: u32,
    period_s: u32,
}

impl Default for StickyError {
    fn default() -> StickyError {
        StickyError::new(DEFAULT_PERIOD_S)
    }
}

impl StickyError {
    pub fn new(period_s: u32) -> StickyError {
        let period_s = period_s.max(1);
        StickyError {
            text: None,
            countdown_s: period_s,
            period_s,
        }
    }

    /// Makes `text` the sticky error. Returns true if it differs from the
    /// current one, in which case the countdown restarts.
    pub fn raise(&mut self, text: &str) -> bool {
        if self.text.as_deref() == Some(text) {
            return false;
        }
        self.text = Some(text.to_string());
        self.countdown_s = self.period_s;
        true
    }

    pub fn clear(&mut self) {
        self.text = None;
        self.countdown_s = self.period_s;
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn countdown(&self) -> u32 {
        self.countdown_s
    }

    /// Advances by one second. `elapsed_s` is the console's running second
    /// count, used to pace the once-a-minute redisplay.
    pub fn tick(&mut self, elapsed_s: u64) -> StickyTick {
        if self.text.is_none() {
            return StickyTick::Idle;
        }
        self.countdown_s = self.countdown_s.saturating_sub(1);
        if self.countdown_s == 0 {
            self.clear();
            return StickyTick::Expired;
        }
        StickyTick::Active {
            redisplay: elapsed_s % 60 == 0,
        }
    }
}
