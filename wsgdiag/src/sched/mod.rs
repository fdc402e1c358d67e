//! Periodic scheduler
//!
//! Everything on the consumer side happens in `Scheduler::tick()`, called
//! on a fixed interval from a single thread. A tick:
//!
//! 1. on a new wall-clock second, advances the per-second counters (elapsed
//!    seconds, data age, sticky error), does display housekeeping, and on a
//!    new wall-clock minute runs the heartbeat cadence;
//! 2. lets the connection monitor notice a dead link or retry the open;
//! 3. renders pending link and queue events to the status display;
//! 4. drains the message queue, handing each line to the log sink, the raw
//!    display, and the interpreter, in that order.

pub mod cadence;

pub use cadence::StatusCadence;

use crate::command::Command;
use crate::config::ConsoleConfig;
use crate::event::{Event, EventQueue};
use crate::interp::{AgeCounter, FieldId, Interpreter};
use crate::link::{ConnectionMonitor, ConnectionState, Connector, SendError};
use crate::queue::MessageQueue;
use crate::sink::{LogSink, Presenter};
use chrono::{DateTime, Local, Timelike};
use crossbeam::channel::{self, Receiver};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Requests from the operator, served between ticks by `run()`.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Submit(Command),
    ResetDisplay,
    Logging(bool),
    Quit,
}

/// Forwards to a presenter, remembering whether the status display was
/// written to.
struct StatusTap<'a> {
    out: &'a mut dyn Presenter,
    touched: bool,
}

impl<'a> StatusTap<'a> {
    fn new(out: &'a mut dyn Presenter) -> StatusTap<'a> {
        StatusTap {
            out,
            touched: false,
        }
    }

    fn take_touched(&mut self) -> bool {
        std::mem::replace(&mut self.touched, false)
    }

    /// Writes that do not count as status activity.
    fn untapped(&mut self) -> &mut dyn Presenter {
        &mut *self.out
    }
}

impl Presenter for StatusTap<'_> {
    fn display_raw(&mut self, text: &str) {
        self.out.display_raw(text);
    }

    fn display_status(&mut self, text: &str) {
        self.touched = true;
        self.out.display_status(text);
    }

    fn set_field(&mut self, field: FieldId, text: &str) {
        self.out.set_field(field, text);
    }

    fn clear_raw(&mut self) {
        self.out.clear_raw();
    }

    fn clear_status(&mut self) {
        self.out.clear_status();
    }
}

pub struct Scheduler {
    monitor: ConnectionMonitor,
    queue: Arc<MessageQueue>,
    events: Receiver<Event>,
    interp: Interpreter,
    age: AgeCounter,
    cadence: StatusCadence,
    log: Box<dyn LogSink>,
    raw_clear_every_s: u64,
    status_clear_every_s: u64,
    last_second: Option<i64>,
    last_minute: Option<u32>,
    elapsed_s: u64,
    /// Queue overwrites already reported.
    reported_lost: u64,
}

impl Scheduler {
    pub fn new(
        config: &ConsoleConfig,
        connector: Box<dyn Connector>,
        log: Box<dyn LogSink>,
    ) -> Scheduler {
        let queue = Arc::new(MessageQueue::new(config.queue_capacity));
        let (event_queue, events) = EventQueue::channel();
        let monitor = ConnectionMonitor::new(
            &config.device,
            config.baud,
            connector,
            Arc::clone(&queue),
            event_queue,
        );
        Scheduler {
            monitor,
            queue,
            events,
            interp: Interpreter::new(config.sticky_period_s),
            age: AgeCounter::default(),
            cadence: StatusCadence::new(),
            log,
            raw_clear_every_s: config.raw_clear_every_s.max(1),
            status_clear_every_s: config.status_clear_every_s.max(1),
            last_second: None,
            last_minute: None,
            elapsed_s: 0,
            reported_lost: 0,
        }
    }

    /// Puts every field at its placeholder and announces the console.
    pub fn start(&mut self, out: &mut dyn Presenter) {
        let mut tap = StatusTap::new(out);
        self.reset_display(&mut tap);
        tap.display_status(&format!(
            "WSG30 diagnostic console {} watching {}",
            env!("CARGO_PKG_VERSION"),
            self.monitor.device()
        ));
        if tap.take_touched() {
            self.cadence.reset();
        }
    }

    pub fn tick(&mut self, now: DateTime<Local>, out: &mut dyn Presenter) {
        let mut tap = StatusTap::new(out);

        if self.last_second != Some(now.timestamp()) {
            self.last_second = Some(now.timestamp());
            self.per_second(&now, &mut tap);
        }

        self.monitor.service();

        for event in self.events.try_iter() {
            tap.display_status(&event.status_text());
        }

        self.drain(&mut tap);

        if tap.take_touched() {
            self.cadence.reset();
        }
    }

    fn per_second(&mut self, now: &DateTime<Local>, tap: &mut StatusTap<'_>) {
        self.elapsed_s += 1;
        self.age.tick();
        self.monitor.classify(self.age.seconds());
        self.interp.per_second(self.elapsed_s, tap);

        if self.elapsed_s % self.raw_clear_every_s == 0 {
            tap.clear_raw();
        }
        if self.elapsed_s % self.status_clear_every_s == 0 {
            tap.clear_status();
        }

        if tap.take_touched() {
            self.cadence.reset();
        }

        if self.last_minute != Some(now.minute()) {
            self.last_minute = Some(now.minute());
            if self.cadence.on_minute() {
                let out = tap.untapped();
                out.display_status(&format!(
                    "UNIX timestamp {}\tLocal time {}",
                    now.timestamp(),
                    now.format("%Y-%m-%d %H:%M:%S")
                ));
                if let Some(age) = self.age.report() {
                    out.display_status(&age.to_string());
                }
            }
        }
    }

    fn drain(&mut self, tap: &mut StatusTap<'_>) {
        let lines = self.queue.dequeue_all();
        if lines.is_empty() {
            return;
        }
        let lost = self.queue.overwritten();
        if lost > self.reported_lost {
            let text = format!(
                "WARNING - receive FIFO overflowed, {} messages lost",
                lost - self.reported_lost
            );
            log::warn!("{}", text);
            tap.display_status(&text);
            self.reported_lost = lost;
        }
        for line in lines {
            self.age.reset();
            if let Err(e) = self.log.offer(&line) {
                log::warn!("log write failed: {}", e);
            }
            tap.display_raw(&line);
            if let Some(reply) = self.interp.interpret(&line, tap) {
                if let Err(e) = self.monitor.write_line(&reply) {
                    log::warn!("cannot answer device: {}", e);
                }
            }
        }
        self.monitor.classify(self.age.seconds());
    }

    /// Sends an operator command to the device. Reset and reboot also clear
    /// the display.
    pub fn submit_command(
        &mut self,
        command: &Command,
        out: &mut dyn Presenter,
    ) -> Result<(), SendError> {
        let mut tap = StatusTap::new(out);
        tap.display_status(&command.to_string());
        let res = self.monitor.write_line(&command.wire());
        match &res {
            Ok(()) => log::debug!("sent {:?}", command.wire()),
            Err(e) => log::info!("{} not sent: {}", command, e),
        }
        if command.resets_display() {
            self.reset_display(&mut tap);
        }
        if tap.take_touched() {
            self.cadence.reset();
        }
        res
    }

    /// Clears the displays and derived state. The heartbeat cadence starts
    /// over, as after any status activity.
    pub fn reset_display_state(&mut self, out: &mut dyn Presenter) {
        let mut tap = StatusTap::new(out);
        self.reset_display(&mut tap);
    }

    fn reset_display(&mut self, tap: &mut StatusTap<'_>) {
        self.interp.reset_display_state(tap);
        self.cadence.reset();
    }

    /// Opens or closes the log file, announcing it on the status display.
    pub fn set_logging(
        &mut self,
        enable: bool,
        now: &DateTime<Local>,
        out: &mut dyn Presenter,
    ) -> io::Result<()> {
        let mut tap = StatusTap::new(out);
        if enable {
            let name = self.log.open(now)?;
            tap.display_status(&format!("Logfile {} opened", name));
        } else if let Some(name) = self.log.close() {
            tap.display_status(&format!("Logfile {} is now closed", name));
        }
        if tap.take_touched() {
            self.cadence.reset();
        }
        Ok(())
    }

    /// Ticks every `interval` and serves `requests` in between, until a
    /// `Quit` arrives or the request channel closes.
    pub fn run(
        &mut self,
        interval: Duration,
        requests: &Receiver<Request>,
        out: &mut dyn Presenter,
    ) {
        let ticker = channel::tick(interval);
        loop {
            crossbeam::select! {
                recv(ticker) -> _ => {
                    self.tick(Local::now(), out);
                }
                recv(requests) -> req => {
                    match req {
                        Ok(Request::Submit(command)) => {
                            // Failures are already reported by submit_command.
                            let _ = self.submit_command(&command, out);
                        }
                        Ok(Request::ResetDisplay) => self.reset_display_state(out),
                        Ok(Request::Logging(enable)) => {
                            if let Err(e) = self.set_logging(enable, &Local::now(), out) {
                                out.display_status(&format!("WARNING - cannot open logfile: {}", e));
                            }
                        }
                        Ok(Request::Quit) | Err(_) => break,
                    }
                }
            }
        }
        self.log.close();
        self.monitor.close();
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.monitor.state()
    }

    pub fn data_age_s(&self) -> u32 {
        self.age.seconds()
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn queue(&self) -> &MessageQueue {
        &self.queue
    }
}
