//! Message interpreter
//!
//! Turns device lines into field updates and status messages. The
//! interpreter owns the state derived from the line history (device clock
//! and sticky error) and publishes everything else straight to the
//! presenter, never reading it back.

pub mod age;
pub mod clock;
pub mod fields;
mod markers;
pub mod sticky;

pub use age::{AgeCounter, DataAge};
pub use clock::DeviceClock;
pub use fields::FieldId;
pub use markers::{DIAGNOSTIC_MODE, ERROR, STARTUP, TRANSITION, WARNING};
pub use sticky::{StickyError, StickyTick};

use crate::sink::Presenter;
use markers::{Hit, RULES};

/// Written to the device when it announces diagnostic mode.
pub const DIAGNOSTIC_GREETING: &str = "+++ 1  2  3  Sensaphone WSG30 Temperature Display Diagnostic tool reporting...\r\n";

/// State handed to marker handlers while one line is scanned.
pub(crate) struct Scan<'a> {
    line: &'a str,
    clock: &'a mut DeviceClock,
    sticky: &'a mut StickyError,
    out: &'a mut dyn Presenter,
    reply: Option<String>,
}

impl Scan<'_> {
    fn status(&mut self, text: &str) {
        self.out.display_status(text);
    }
}

fn reset_state(clock: &mut DeviceClock, sticky: &mut StickyError, out: &mut dyn Presenter) {
    clock.reset();
    sticky.clear();
    for field in FieldId::ALL {
        out.set_field(field, field.placeholder());
    }
    out.clear_raw();
    out.clear_status();
}

#[derive(Debug, Default)]
pub struct Interpreter {
    clock: DeviceClock,
    sticky: StickyError,
}

impl Interpreter {
    pub fn new(sticky_period_s: u32) -> Interpreter {
        Interpreter {
            clock: DeviceClock::new(),
            sticky: StickyError::new(sticky_period_s),
        }
    }

    /// Applies every marker rule to `line`. Returns text to write back to
    /// the device, if the line asks for a reply.
    pub fn interpret(&mut self, line: &str, out: &mut dyn Presenter) -> Option<String> {
        let mut scan = Scan {
            line,
            clock: &mut self.clock,
            sticky: &mut self.sticky,
            out,
            reply: None,
        };
        for rule in RULES {
            if let Some(at) = line.find(rule.marker) {
                let hit = Hit {
                    from: &line[at..],
                    after: &line[at + rule.marker.len()..],
                };
                (rule.apply)(&mut scan, hit);
            }
        }
        scan.reply
    }

    /// One-second housekeeping: sticky error countdown and its once a minute
    /// redisplay.
    pub fn per_second(&mut self, elapsed_s: u64, out: &mut dyn Presenter) {
        match self.sticky.tick(elapsed_s) {
            StickyTick::Idle | StickyTick::Active { redisplay: false } => {}
            StickyTick::Active { redisplay: true } => {
                if let Some(text) = self.sticky.text() {
                    out.display_status(text);
                }
            }
            StickyTick::Expired => {
                log::debug!("sticky error expired");
                out.set_field(FieldId::StatusTitle, FieldId::StatusTitle.placeholder());
            }
        }
    }

    /// Clears all derived state and both displays.
    pub fn reset_display_state(&mut self, out: &mut dyn Presenter) {
        reset_state(&mut self.clock, &mut self.sticky, out);
    }

    pub fn clock(&self) -> &DeviceClock {
        &self.clock
    }

    pub fn sticky(&self) -> &StickyError {
        &self.sticky
    }
}
