//! Status events
//!
//! Events raised off the scheduler thread (by the port thread, or by the
//! queue on behalf of the producer) and rendered by the scheduler on its
//! next tick. They travel over a bounded `crossbeam::channel`.

use crossbeam::channel;

/// Something the console should tell the operator about.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The serial device was opened.
    LinkOpened(String),
    /// Opening the serial device failed. Only the first failure of an
    /// episode is reported.
    OpenFailed(String),
    /// The link went down: read error, EOF, or hangup.
    LinkLost(String),
    /// Receive queue occupancy reached half its capacity.
    QueueHalfFull,
    /// Receive queue occupancy is within the last slots of its capacity.
    QueueAlmostFull,
}

impl Event {
    /// Text appended to the status display for this event.
    pub fn status_text(&self) -> String {
        match self {
            Event::LinkOpened(dev) => format!("{} opened successfully!", dev),
            Event::OpenFailed(dev) => format!(
                "***ERROR*** problem opening {} - connect serial-to-USB cable to USB port",
                dev
            ),
            Event::LinkLost(why) => format!("Serial link lost: {}", why),
            Event::QueueHalfFull => "WARNING - receive FIFO is half-full".to_string(),
            Event::QueueAlmostFull => "WARNING - receive FIFO is almost full".to_string(),
        }
    }
}

/// Sending half of the status event channel. Events are dropped if the
/// channel is full, so the sender never blocks the producer.
#[derive(Clone)]
pub struct EventQueue {
    dest: channel::Sender<Event>,
}

/// Default depth of the event channel.
pub const DEFAULT_EVENT_CHANNEL_SIZE: usize = 64;

impl EventQueue {
    pub fn new(dest: channel::Sender<Event>) -> EventQueue {
        EventQueue { dest }
    }

    /// Creates a connected sender/receiver pair.
    pub fn channel() -> (EventQueue, channel::Receiver<Event>) {
        let (tx, rx) = channel::bounded::<Event>(DEFAULT_EVENT_CHANNEL_SIZE);
        (EventQueue::new(tx), rx)
    }

    pub fn send(&self, event: Event) {
        if let Err(err) = self.dest.try_send(event) {
            log::debug!("status event dropped: {:?}", err.into_inner());
        }
    }
}
