pub mod framer;
pub mod monitor;
pub mod port;

pub use framer::LineFramer;
pub use monitor::{ConnectionMonitor, ConnectionState, Connector, SerialConnector};
pub use port::Port;

use std::io;
use thiserror::Error;

/// Default serial data rate. The device runs 8N1 at this rate.
pub const DEFAULT_BAUD: u32 = 115200;

/// Default device node of the serial-to-USB adapter.
pub const DEFAULT_DEVICE: &str = "/dev/ttyUSB0";

/// Possible errors when receiving from a port
#[derive(Debug, Error)]
pub enum RecvError {
    /// No complete line available at this time.
    #[error("no data available")]
    NotReady,
    /// End of stream or hangup.
    #[error("device disconnected")]
    Disconnected,
    #[error("read failed: {0}")]
    IO(#[from] io::Error),
}

/// Possible errors when sending to a port
#[derive(Debug, Error)]
pub enum SendError {
    /// The outgoing queue is backed up.
    #[error("send queue full")]
    Full,
    /// The link is not open.
    #[error("not connected")]
    Disconnected,
    #[error("write failed: {0}")]
    IO(#[from] io::Error),
}

/// Possible errors when opening a port
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("cannot open {device}: {source}")]
    Serial {
        device: String,
        #[source]
        source: mio_serial::Error,
    },
    #[error("cannot start poller: {0}")]
    Io(#[from] io::Error),
}

/// An open connection to the device, as seen by the connection monitor.
pub trait Link: Send {
    /// Best-effort write of `text` to the device.
    fn write_line(&self, text: &str) -> Result<(), SendError>;

    /// False once the underlying connection has gone away.
    fn is_open(&self) -> bool;
}
