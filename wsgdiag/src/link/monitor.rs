//! Connection monitor
//!
//! Owns the open link, if any, and the reconnect policy. There is no backoff
//! of its own: the scheduler calls `service()` every tick, and every tick
//! spent disconnected is one open attempt.

use super::{Link, OpenError, Port, SendError};
use crate::event::{Event, EventQueue};
use crate::queue::{MessageQueue, Watermark};
use std::sync::Arc;

/// Seconds without a received line after which a connected link is
/// reported as degraded.
pub const DEGRADED_AFTER_S: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Open, but the device has gone quiet.
    Degraded,
}

/// Opens links to the device. Everything a link receives must be pushed to
/// `queue`, and problems reported on `events`.
pub trait Connector: Send {
    fn open(
        &mut self,
        device: &str,
        baud: u32,
        queue: Arc<MessageQueue>,
        events: EventQueue,
    ) -> Result<Box<dyn Link>, OpenError>;
}

/// Opens real serial ports.
pub struct SerialConnector {
    pub max_line_len: usize,
}

impl Default for SerialConnector {
    fn default() -> SerialConnector {
        SerialConnector {
            max_line_len: super::framer::DEFAULT_MAX_LINE_LEN,
        }
    }
}

impl Connector for SerialConnector {
    fn open(
        &mut self,
        device: &str,
        baud: u32,
        queue: Arc<MessageQueue>,
        events: EventQueue,
    ) -> Result<Box<dyn Link>, OpenError> {
        let port = Port::open(device, baud, self.max_line_len, move |res| match res {
            Ok(line) => {
                enqueue_line(&queue, &events, line);
                Ok(())
            }
            Err(e) => {
                events.send(Event::LinkLost(e.to_string()));
                Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
            }
        })?;
        Ok(Box::new(port))
    }
}

/// Pushes a received line and raises the matching watermark event.
pub fn enqueue_line(queue: &MessageQueue, events: &EventQueue, line: String) {
    match queue.enqueue(line) {
        Watermark::Normal => {}
        Watermark::HalfFull => events.send(Event::QueueHalfFull),
        Watermark::AlmostFull => events.send(Event::QueueAlmostFull),
    }
}

pub struct ConnectionMonitor {
    device: String,
    baud: u32,
    connector: Box<dyn Connector>,
    queue: Arc<MessageQueue>,
    events: EventQueue,
    link: Option<Box<dyn Link>>,
    state: ConnectionState,
    /// Set until an open attempt fails, and again after the next success.
    first_failure: bool,
}

impl ConnectionMonitor {
    pub fn new(
        device: &str,
        baud: u32,
        connector: Box<dyn Connector>,
        queue: Arc<MessageQueue>,
        events: EventQueue,
    ) -> ConnectionMonitor {
        ConnectionMonitor {
            device: device.to_string(),
            baud,
            connector,
            queue,
            events,
            link: None,
            state: ConnectionState::Disconnected,
            first_failure: true,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn is_connected(&self) -> bool {
        matches!(
            self.state,
            ConnectionState::Connected | ConnectionState::Degraded
        )
    }

    /// Notices a link that died since the last call, then retries if
    /// disconnected.
    pub fn service(&mut self) {
        if let Some(link) = &self.link {
            if !link.is_open() {
                self.link_failed();
            }
        }
        if self.state == ConnectionState::Disconnected {
            self.try_reconnect();
        }
    }

    /// Makes one attempt to open the device.
    pub fn try_reconnect(&mut self) {
        self.state = ConnectionState::Connecting;
        log::debug!("opening {} at {} baud", self.device, self.baud);
        match self.connector.open(
            &self.device,
            self.baud,
            Arc::clone(&self.queue),
            self.events.clone(),
        ) {
            Ok(link) => {
                log::info!("{} opened", self.device);
                self.link = Some(link);
                self.state = ConnectionState::Connected;
                self.first_failure = true;
                self.events.send(Event::LinkOpened(self.device.clone()));
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                if self.first_failure {
                    self.first_failure = false;
                    log::warn!("{}", e);
                    self.events.send(Event::OpenFailed(self.device.clone()));
                }
            }
        }
    }

    /// Drops the link after a read error, EOF, or hangup.
    pub fn link_failed(&mut self) {
        if self.link.take().is_some() {
            log::info!("{} closed", self.device);
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Explicitly closes the link. The next `service()` reopens it.
    pub fn close(&mut self) {
        self.link_failed();
    }

    /// Re-grades an open link by how long the device has been silent.
    pub fn classify(&mut self, data_age_s: u32) {
        self.state = match self.state {
            ConnectionState::Connected if data_age_s >= DEGRADED_AFTER_S => {
                ConnectionState::Degraded
            }
            ConnectionState::Degraded if data_age_s < DEGRADED_AFTER_S => {
                ConnectionState::Connected
            }
            other => other,
        };
    }

    /// Writes to the device if connected. Writing while disconnected is a
    /// no-op reported as `SendError::Disconnected`.
    pub fn write_line(&self, text: &str) -> Result<(), SendError> {
        match &self.link {
            Some(link) if self.is_connected() => link.write_line(text),
            _ => Err(SendError::Disconnected),
        }
    }
}
