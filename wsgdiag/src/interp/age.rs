//! Data age: how stale the last received line is.
//!
//! Bands are closed-open on seconds since the last line:
//!
//! | band    | from (s)  | to (s)    |
//! |---------|-----------|-----------|
//! | fresh   | 0         | 120       |
//! | minutes | 120       | 7200      |
//! | hours   | 7200      | 172800    |
//! | days    | 172800    | 5529600   |
//! | months  | 5529600   | 62208000  |
//! | years   | 62208000  | -         |

use std::fmt;

const MINUTE: u32 = 60;
const HOUR: u32 = 60 * MINUTE;
const DAY: u32 = 24 * HOUR;

pub const MINUTES_FROM: u32 = 2 * MINUTE;
pub const HOURS_FROM: u32 = 120 * MINUTE;
pub const DAYS_FROM: u32 = 48 * HOUR;
pub const MONTHS_FROM: u32 = 64 * DAY;
pub const YEARS_FROM: u32 = 24 * 30 * DAY;

/// Staleness, in the coarsest unit whose band contains it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DataAge {
    Minutes(u32),
    Hours(u32),
    Days(u32),
    Months(f32),
    Years(f32),
}

impl DataAge {
    /// Returns `None` while the data is fresh.
    pub fn classify(elapsed_s: u32) -> Option<DataAge> {
        match elapsed_s {
            e if e < MINUTES_FROM => None,
            e if e < HOURS_FROM => Some(DataAge::Minutes(e / MINUTE)),
            e if e < DAYS_FROM => Some(DataAge::Hours(e / HOUR)),
            e if e < MONTHS_FROM => Some(DataAge::Days(e / DAY)),
            e if e < YEARS_FROM => Some(DataAge::Months(e as f32 / (30 * DAY) as f32)),
            e => Some(DataAge::Years(e as f32 / (365 * DAY) as f32)),
        }
    }
}

impl fmt::Display for DataAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataAge::Minutes(n) => write!(f, "Data {} minutes old", n),
            DataAge::Hours(n) => write!(f, "Data {} hours old", n),
            DataAge::Days(n) => write!(f, "Data {} days old", n),
            DataAge::Months(n) => write!(f, "Data {:.1} months old", n),
            DataAge::Years(n) => write!(f, "Data {:.1} years old", n),
        }
    }
}

/// Seconds since the last line was dequeued.
#[derive(Debug, Default, Clone, Copy)]
pub struct AgeCounter {
    elapsed_s: u32,
}

impl AgeCounter {
    pub fn reset(&mut self) {
        self.elapsed_s = 0;
    }

    pub fn tick(&mut self) {
        self.elapsed_s = self.elapsed_s.saturating_add(1);
    }

    pub fn seconds(&self) -> u32 {
        self.elapsed_s
    }

    pub fn report(&self) -> Option<DataAge> {
        DataAge::classify(self.elapsed_s)
    }
}
