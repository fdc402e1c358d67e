//! Threaded port
//!
//! A `Port` owns a dedicated thread running a `mio` event loop over a
//! `RawPort`. Received lines (and the error that ends the link) are handed
//! to an owned rx callback from that thread; outbound text is passed to the
//! thread over a `crossbeam::channel` and a `mio::Waker`.
//!
//! Dropping the `Port` stops the thread and closes the device.

pub(crate) mod iobuf;
mod serial;

use super::{LineFramer, Link, OpenError, RecvError, SendError};
use crossbeam::channel::{self, TryRecvError};
use iobuf::IOBuf;
use std::io;
use std::thread;

/// Generic interface for the low level part of a port.
pub(crate) trait RawPort {
    /// Returns a line without blocking, or `RecvError::NotReady` if none is
    /// complete yet. Any other error means the port must be torn down.
    fn recv(&mut self) -> Result<String, RecvError>;

    /// Starts writing `data`. Returns `Ok(false)` if part of it is still
    /// buffered and `drain()` must be called once the port is writable.
    fn send(&mut self, data: &[u8]) -> Result<bool, SendError>;

    /// Continues a partial write. `Ok(true)` once the buffer is empty.
    fn drain(&mut self) -> Result<bool, SendError> {
        Ok(true)
    }

    fn has_data_to_drain(&self) -> bool {
        false
    }
}

/// Frames buffered bytes into the next line, reading more from `reader`
/// until a line completes. Returns `RecvError::NotReady` only once the
/// reader would block, so edge-triggered readiness is never left pending.
pub(crate) fn read_line<R: io::Read>(
    reader: &mut R,
    rxbuf: &mut IOBuf,
    framer: &mut LineFramer,
) -> Result<String, RecvError> {
    loop {
        let mut line = None;
        let mut used = 0;
        for &b in rxbuf.data() {
            used += 1;
            if let Some(l) = framer.push(b) {
                line = Some(l);
                break;
            }
        }
        rxbuf.consume(used);
        if let Some(line) = line {
            return Ok(line);
        }
        rxbuf.refill(reader)?;
    }
}

/// Depth of the outbound text channel.
static TX_CHANNEL_SIZE: usize = 16;

const WAKER: mio::Token = mio::Token(0);
const DEVICE: mio::Token = mio::Token(1);

pub struct Port {
    tx: Option<channel::Sender<String>>,
    waker: mio::Waker,
    /// Never receives anything: disconnects when the poller thread exits.
    alive: channel::Receiver<()>,
}

impl Port {
    /// Event loop of the port thread. Returns when the device fails, the rx
    /// callback asks to stop, or the owning `Port` is dropped.
    fn poller_thread<
        RawPortT: RawPort + mio::event::Source,
        RxCallbackT: FnMut(Result<String, RecvError>) -> io::Result<()>,
    >(
        mut raw_port: RawPortT,
        mut poll: mio::Poll,
        mut rx: RxCallbackT,
        tx: channel::Receiver<String>,
    ) {
        let mut events = mio::Events::with_capacity(4);
        let mut needs_draining = false;
        // Text queued while a previous write is still draining.
        let mut needs_tx_queue_check = false;

        if let Err(e) = poll
            .registry()
            .register(&mut raw_port, DEVICE, mio::Interest::READABLE)
        {
            let _ = rx(Err(RecvError::IO(e)));
            return;
        }

        'ioloop: loop {
            if let Err(e) = poll.poll(&mut events, None) {
                if e.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                let _ = rx(Err(RecvError::IO(e)));
                break 'ioloop;
            }

            let mut check_tx_channel = false;

            for event in events.iter() {
                match event.token() {
                    WAKER => {
                        if needs_draining {
                            needs_tx_queue_check = true;
                        } else {
                            check_tx_channel = true;
                        }
                    }
                    DEVICE => {
                        if event.is_writable() && needs_draining {
                            match raw_port.drain() {
                                Ok(true) => {
                                    needs_draining = false;
                                    if poll
                                        .registry()
                                        .reregister(&mut raw_port, DEVICE, mio::Interest::READABLE)
                                        .is_err()
                                    {
                                        break 'ioloop;
                                    }
                                }
                                Ok(false) => {}
                                Err(e) => {
                                    log::debug!("serial drain failed: {}", e);
                                    let _ = rx(Err(RecvError::Disconnected));
                                    break 'ioloop;
                                }
                            }
                        }
                        if event.is_read_closed() || event.is_error() {
                            // Pull whatever is left, the read will report the hangup.
                            log::debug!("serial port reported hangup or error");
                        }
                        loop {
                            match raw_port.recv() {
                                Ok(line) => {
                                    if rx(Ok(line)).is_err() {
                                        break 'ioloop;
                                    }
                                }
                                Err(RecvError::NotReady) => {
                                    break;
                                }
                                Err(e) => {
                                    let _ = rx(Err(e));
                                    break 'ioloop;
                                }
                            }
                        }
                    }
                    mio::Token(_) => {}
                }
            }

            if !needs_draining && needs_tx_queue_check {
                check_tx_channel = true;
                needs_tx_queue_check = false;
            }

            if check_tx_channel {
                loop {
                    match tx.try_recv() {
                        Ok(text) => match raw_port.send(text.as_bytes()) {
                            Ok(true) => {}
                            Ok(false) => {
                                needs_draining = true;
                                if poll
                                    .registry()
                                    .reregister(
                                        &mut raw_port,
                                        DEVICE,
                                        mio::Interest::READABLE.add(mio::Interest::WRITABLE),
                                    )
                                    .is_err()
                                {
                                    break 'ioloop;
                                }
                                break;
                            }
                            Err(SendError::Full) => {
                                log::warn!("dropping outbound text, port busy: {:?}", text);
                            }
                            Err(e) => {
                                log::debug!("serial write failed: {}", e);
                                let _ = rx(Err(RecvError::Disconnected));
                                break 'ioloop;
                            }
                        },
                        Err(TryRecvError::Empty) => {
                            break;
                        }
                        Err(TryRecvError::Disconnected) => {
                            // Owner dropped the port.
                            break 'ioloop;
                        }
                    }
                }
            }
        }
    }

    /// Create a `Port` from a `RawPort` and a rx callback.
    fn from_raw<
        RawPortT: RawPort + mio::event::Source + Send + 'static,
        RxCallbackT: FnMut(Result<String, RecvError>) -> io::Result<()> + Send + 'static,
    >(
        raw_port: RawPortT,
        rx: RxCallbackT,
    ) -> io::Result<Port> {
        let (tx, ttx) = channel::bounded::<String>(TX_CHANNEL_SIZE);
        let (alive_send, alive) = channel::bounded::<()>(0);
        let poll = mio::Poll::new()?;
        let waker = mio::Waker::new(poll.registry(), WAKER)?;
        thread::Builder::new()
            .name("serial-port".to_string())
            .spawn(move || {
                let _alive = alive_send;
                Port::poller_thread(raw_port, poll, rx, ttx);
            })?;
        Ok(Port {
            tx: Some(tx),
            waker,
            alive,
        })
    }

    /// Opens the serial device and starts framing lines into `rx`.
    ///
    /// `rx` runs on the port thread. It receives every complete line, and
    /// finally the error that ended the link. If it returns an `Err()`, the
    /// port is closed.
    pub fn open<RXT: FnMut(Result<String, RecvError>) -> io::Result<()> + Send + 'static>(
        device: &str,
        baud: u32,
        max_line_len: usize,
        rx: RXT,
    ) -> Result<Port, OpenError> {
        let raw = serial::Port::new(device, baud, max_line_len)?;
        Ok(Port::from_raw(raw, rx)?)
    }

    /// Queues `text` for the device without blocking.
    pub fn try_send(&self, text: &str) -> Result<(), SendError> {
        let tx = self.tx.as_ref().ok_or(SendError::Disconnected)?;
        match tx.try_send(text.to_string()) {
            Ok(()) => {
                self.waker.wake()?;
                Ok(())
            }
            Err(channel::TrySendError::Full(_)) => Err(SendError::Full),
            Err(channel::TrySendError::Disconnected(_)) => Err(SendError::Disconnected),
        }
    }

    /// True while the port thread is running.
    pub fn is_open(&self) -> bool {
        matches!(self.alive.try_recv(), Err(TryRecvError::Empty))
    }
}

impl Link for Port {
    fn write_line(&self, text: &str) -> Result<(), SendError> {
        self.try_send(text)
    }

    fn is_open(&self) -> bool {
        Port::is_open(self)
    }
}

impl Drop for Port {
    fn drop(&mut self) {
        // Closing the channel and waking the thread makes it exit, which
        // drops and closes the device.
        self.tx.take();
        let _ = self.waker.wake();
    }
}
