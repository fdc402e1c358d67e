//! Device clock: runtime derived from device-reported timestamps.

#[derive(Debug, Default, Clone)]
pub struct DeviceClock {
    start: Option<u32>,
    current: Option<u32>,
}

impl DeviceClock {
    pub fn new() -> DeviceClock {
        DeviceClock::default()
    }

    /// Records a device timestamp and returns the runtime in seconds.
    /// A timestamp earlier than the recorded start (device reboot or clock
    /// set back) becomes the new start.
    pub fn observe(&mut self, timestamp: u32) -> u32 {
        let start = match self.start {
            Some(start) if start <= timestamp => start,
            _ => timestamp,
        };
        self.start = Some(start);
        self.current = Some(timestamp);
        timestamp - start
    }

    pub fn start(&self) -> Option<u32> {
        self.start
    }

    pub fn runtime(&self) -> u32 {
        match (self.start, self.current) {
            (Some(start), Some(current)) => current - start,
            _ => 0,
        }
    }

    pub fn reset(&mut self) {
        self.start = None;
        self.current = None;
    }
}

/// Formats seconds as `<d>d <h>h <m>m <s>s`.
pub fn format_runtime(seconds: u32) -> String {
    format!(
        "{}d {}h {}m {}s",
        seconds / 86400,
        (seconds % 86400) / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smaller_timestamp_restarts_runtime() {
        let mut clock = DeviceClock::new();
        assert_eq!(clock.observe(100), 0);
        assert_eq!(clock.observe(160), 60);
        assert_eq!(clock.observe(90), 0);
        assert_eq!(clock.start(), Some(90));
        assert_eq!(clock.observe(200), 110);
        assert_eq!(clock.runtime(), 110);
    }

    #[test]
    fn zero_is_a_valid_start() {
        let mut clock = DeviceClock::new();
        clock.observe(0);
        assert_eq!(clock.observe(5), 5);
    }

    #[test]
    fn runtime_format() {
        assert_eq!(format_runtime(0), "0d 0h 0m 0s");
        assert_eq!(format_runtime(90061), "1d 1h 1m 1s");
        assert_eq!(format_runtime(3599), "0d 0h 59m 59s");
    }
}
