//! Serial Port
//!
//! Implements a `RawPort` for a serial port, and an MIO event source.
//! Incoming bytes are framed into lines; outgoing text is written as-is.

use super::super::framer::LineFramer;
use super::super::{OpenError, RecvError, SendError};
use super::{iobuf::IOBuf, read_line, RawPort};
use mio_serial::{DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, StopBits};
use std::io;

/// RawPort to communicate via a serial port
pub struct Port {
    /// Underlying serial port stream
    port: mio_serial::SerialStream,
    /// Bytes read but not yet framed.
    rxbuf: IOBuf,
    /// Partial line being reassembled.
    framer: LineFramer,
    /// Outgoing buffer, for writes the OS could not take at once.
    txbuf: IOBuf,
}

impl Port {
    /// Opens `device` at `baud`, 8 data bits, no parity, one stop bit, no
    /// flow control, raw mode. Input already queued by the driver is
    /// discarded.
    pub fn new(device: &str, baud: u32, max_line_len: usize) -> Result<Port, OpenError> {
        let serial_err = |source| OpenError::Serial {
            device: device.to_string(),
            source,
        };
        let mio_port = mio_serial::new(device, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open_native_async()
            .map_err(serial_err)?;
        #[cfg(windows)]
        {
            // Windows requires some custom settings to replicate the unix behavior.
            use std::os::windows::io::AsRawHandle;
            use winapi::um::commapi::SetCommTimeouts;
            use winapi::um::winbase::COMMTIMEOUTS;
            let handle = mio_port.as_raw_handle();
            let mut timeouts = COMMTIMEOUTS {
                ReadIntervalTimeout: 0xFFFFFFFF,
                ReadTotalTimeoutMultiplier: 0xFFFFFFFF,
                ReadTotalTimeoutConstant: 0xFFFFFFFE,
                WriteTotalTimeoutMultiplier: 0,
                WriteTotalTimeoutConstant: 0,
            };
            if unsafe { SetCommTimeouts(handle, &mut timeouts) } == 0 {
                return Err(OpenError::Io(io::Error::last_os_error()));
            }
        }
        mio_port
            .clear(mio_serial::ClearBuffer::Input)
            .map_err(serial_err)?;
        Ok(Port {
            port: mio_port,
            rxbuf: IOBuf::new(),
            framer: LineFramer::new(max_line_len),
            txbuf: IOBuf::new(),
        })
    }
}

impl RawPort for Port {
    fn recv(&mut self) -> Result<String, RecvError> {
        let res = read_line(&mut self.port, &mut self.rxbuf, &mut self.framer);
        #[cfg(target_os = "macos")]
        // On macos, disconnecting a serial port while connected will
        // generate this error, so translate it.
        if let Err(RecvError::IO(ioerr)) = &res {
            if Some(6) == ioerr.raw_os_error() {
                return Err(RecvError::Disconnected);
            }
        }
        res
    }

    fn send(&mut self, data: &[u8]) -> Result<bool, SendError> {
        if self.has_data_to_drain() {
            return Err(SendError::Full);
        }
        self.txbuf.add_data(data)?;
        self.drain()
    }

    fn drain(&mut self) -> Result<bool, SendError> {
        self.txbuf.drain(&mut self.port)
    }

    fn has_data_to_drain(&self) -> bool {
        !self.txbuf.empty()
    }
}

impl mio::event::Source for Port {
    fn register(
        &mut self,
        registry: &mio::Registry,
        token: mio::Token,
        interests: mio::Interest,
    ) -> io::Result<()> {
        self.port.register(registry, token, interests)
    }

    fn reregister(
        &mut self,
        registry: &mio::Registry,
        token: mio::Token,
        interests: mio::Interest,
    ) -> io::Result<()> {
        self.port.reregister(registry, token, interests)
    }

    fn deregister(&mut self, registry: &mio::Registry) -> io::Result<()> {
        self.port.deregister(registry)
    }
}
