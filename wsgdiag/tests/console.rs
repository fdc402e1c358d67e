use chrono::{DateTime, Local, TimeZone};
use std::io;
use std::sync::{Arc, Mutex};
use wsgdiag::command::Command;
use wsgdiag::event::EventQueue;
use wsgdiag::interp::{FieldId, DIAGNOSTIC_GREETING};
use wsgdiag::link::monitor::enqueue_line;
use wsgdiag::link::{ConnectionState, Connector, Link, LineFramer, OpenError, SendError};
use wsgdiag::sink::{LogSink, Presenter};
use wsgdiag::{ConsoleConfig, MessageQueue, Scheduler};

/// In-memory serial wire: bytes fed by the test go through a real framer
/// into whatever queue the last successful open attached.
#[derive(Clone, Default)]
struct Wire {
    state: Arc<Mutex<WireState>>,
}

#[derive(Default)]
struct WireState {
    attached: Option<(Arc<MessageQueue>, EventQueue)>,
    framer: LineFramer,
    written: Vec<String>,
    open: bool,
    refuse: bool,
    opens: usize,
}

impl Wire {
    fn feed(&self, bytes: &[u8]) {
        let mut guard = self.state.lock().unwrap();
        let st = &mut *guard;
        let (queue, events) = st.attached.as_ref().expect("wire not attached");
        st.framer
            .push_all(bytes, |line| enqueue_line(queue, events, line));
    }

    fn hang_up(&self) {
        self.state.lock().unwrap().open = false;
    }

    fn refuse(&self, refuse: bool) {
        self.state.lock().unwrap().refuse = refuse;
    }

    fn written(&self) -> Vec<String> {
        self.state.lock().unwrap().written.clone()
    }

    fn opens(&self) -> usize {
        self.state.lock().unwrap().opens
    }
}

struct WireLink(Wire);

impl Link for WireLink {
    fn write_line(&self, text: &str) -> Result<(), SendError> {
        self.0.state.lock().unwrap().written.push(text.to_string());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.0.state.lock().unwrap().open
    }
}

struct WireConnector(Wire);

impl Connector for WireConnector {
    fn open(
        &mut self,
        _device: &str,
        _baud: u32,
        queue: Arc<MessageQueue>,
        events: EventQueue,
    ) -> Result<Box<dyn Link>, OpenError> {
        let mut st = self.0.state.lock().unwrap();
        if st.refuse {
            return Err(OpenError::Io(io::Error::from(io::ErrorKind::NotFound)));
        }
        st.attached = Some((queue, events));
        st.framer.reset();
        st.open = true;
        st.opens += 1;
        Ok(Box::new(WireLink(self.0.clone())))
    }
}

#[derive(Clone, Default)]
struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
    open: bool,
}

impl LogSink for MemoryLog {
    fn offer(&mut self, line: &str) -> io::Result<()> {
        if self.open {
            self.lines.lock().unwrap().push(line.to_string());
        }
        Ok(())
    }

    fn open(&mut self, _now: &DateTime<Local>) -> io::Result<String> {
        self.open = true;
        Ok("memory".to_string())
    }

    fn close(&mut self) -> Option<String> {
        std::mem::replace(&mut self.open, false).then(|| "memory".to_string())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Out {
    Raw(String),
    Status(String),
    Field(FieldId, String),
    ClearRaw,
    ClearStatus,
}

#[derive(Default)]
struct Screen(Vec<Out>);

impl Presenter for Screen {
    fn display_raw(&mut self, text: &str) {
        self.0.push(Out::Raw(text.into()));
    }
    fn display_status(&mut self, text: &str) {
        self.0.push(Out::Status(text.into()));
    }
    fn set_field(&mut self, field: FieldId, text: &str) {
        self.0.push(Out::Field(field, text.into()));
    }
    fn clear_raw(&mut self) {
        self.0.push(Out::ClearRaw);
    }
    fn clear_status(&mut self) {
        self.0.push(Out::ClearStatus);
    }
}

impl Screen {
    fn statuses(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|o| match o {
                Out::Status(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }

    fn field(&self, id: FieldId) -> Option<&str> {
        self.0.iter().rev().find_map(|o| match o {
            Out::Field(f, v) if *f == id => Some(v.as_str()),
            _ => None,
        })
    }

    fn raw(&self) -> Vec<&str> {
        self.0
            .iter()
            .filter_map(|o| match o {
                Out::Raw(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// A whole minute, so minute changes line up with multiples of 60 seconds.
const T0: i64 = 1_700_000_040;

fn at(seconds: i64) -> DateTime<Local> {
    Local.timestamp_opt(T0 + seconds, 0).unwrap()
}

struct Console {
    sched: Scheduler,
    wire: Wire,
    log: Arc<Mutex<Vec<String>>>,
    screen: Screen,
}

fn console() -> Console {
    console_with(&ConsoleConfig::default())
}

fn console_with(config: &ConsoleConfig) -> Console {
    let wire = Wire::default();
    let log = MemoryLog::default();
    let lines = Arc::clone(&log.lines);
    let mut sched = Scheduler::new(
        config,
        Box::new(WireConnector(wire.clone())),
        Box::new(log),
    );
    let mut screen = Screen::default();
    sched.start(&mut screen);
    Console {
        sched,
        wire,
        log: lines,
        screen,
    }
}

impl Console {
    fn tick(&mut self, seconds: i64) {
        self.sched.tick(at(seconds), &mut self.screen);
    }

    fn count(&self, out: &Out) -> usize {
        self.screen.0.iter().filter(|o| *o == out).count()
    }

    fn heartbeats(&self) -> usize {
        self.screen
            .statuses()
            .iter()
            .filter(|s| s.starts_with("UNIX timestamp"))
            .count()
    }
}

#[test]
fn status_line_reaches_fields_raw_display_and_log() {
    let mut c = console();
    c.sched
        .set_logging(true, &at(0), &mut c.screen)
        .unwrap();
    c.tick(0);
    assert_eq!(c.sched.connection_state(), ConnectionState::Connected);

    let line = "STATUS >> Scale:F MIN:32 TEMP:68 MAX:99 AlHI:90 AlLO:20 Alarm:NONE \
                SampleRateSeconds:60 ACK:YES HostCal:OK Buzzer:OFF Mains:ON";
    c.wire.feed(format!("{}\r\n", line).as_bytes());
    c.tick(0);

    assert_eq!(c.screen.raw(), vec![line]);
    assert_eq!(*c.log.lock().unwrap(), vec![line.to_string()]);
    assert_eq!(c.screen.field(FieldId::TemperatureUnit), Some("Fahrenheit"));
    assert_eq!(c.screen.field(FieldId::Temperature), Some("68"));
    assert_eq!(c.screen.field(FieldId::SampleRate), Some("60"));
    assert_eq!(c.screen.field(FieldId::Mains), Some("ON"));
    // Untouched fields keep their placeholders from start().
    assert_eq!(c.screen.field(FieldId::FirmwareVersion), Some("------"));
}

#[test]
fn bytes_split_across_reads_form_one_line() {
    let mut c = console();
    c.tick(0);
    c.wire.feed(b"Timestamp 17000");
    c.tick(0);
    assert!(c.screen.raw().is_empty());
    c.wire.feed(b"00040 UTC\r\nTimes");
    c.tick(0);
    assert_eq!(c.screen.raw(), vec!["Timestamp 1700000040 UTC"]);
    assert_eq!(c.screen.field(FieldId::Timestamp), Some("1700000040"));
}

#[test]
fn diagnostic_mode_is_answered() {
    let mut c = console();
    c.tick(0);
    c.wire.feed(b"+++ Start DIAGNOSTIC MODE +++\r\n");
    c.tick(0);
    assert_eq!(c.wire.written(), vec![DIAGNOSTIC_GREETING.to_string()]);
}

#[test]
fn open_failures_reported_once_until_success() {
    let mut c = console();
    c.wire.refuse(true);
    for s in 0..5 {
        c.tick(s);
    }
    let failures = c
        .screen
        .statuses()
        .iter()
        .filter(|s| s.starts_with("***ERROR*** problem opening"))
        .count();
    assert_eq!(failures, 1);
    assert_eq!(c.sched.connection_state(), ConnectionState::Disconnected);

    c.wire.refuse(false);
    c.tick(5);
    assert_eq!(c.sched.connection_state(), ConnectionState::Connected);
    assert!(c
        .screen
        .statuses()
        .contains(&"/dev/ttyUSB0 opened successfully!"));
}

#[test]
fn hangup_is_followed_by_reopen() {
    let mut c = console();
    c.tick(0);
    assert_eq!(c.wire.opens(), 1);
    c.wire.hang_up();
    c.tick(1);
    assert_eq!(c.wire.opens(), 2);
    assert_eq!(c.sched.connection_state(), ConnectionState::Connected);
}

#[test]
fn sticky_error_lasts_ten_minutes() {
    let mut c = console();
    c.tick(0);
    c.wire.feed(b"*** ERROR *** RTD sensor open circuit\r\n");
    c.tick(0);
    assert_eq!(
        c.screen.field(FieldId::StatusTitle),
        Some("Status: *** ERROR *** RTD sensor open circuit")
    );
    for s in 1..600 {
        c.tick(s);
    }
    assert!(c.sched.interpreter().sticky().text().is_some());
    c.tick(600);
    assert_eq!(c.sched.interpreter().sticky().text(), None);
    assert_eq!(c.screen.field(FieldId::StatusTitle), Some("Status"));
}

#[test]
fn connected_transition_clears_sticky_error() {
    let mut c = console();
    c.tick(0);
    c.wire.feed(b"*** ERROR *** radio join failed, retrying\r\n");
    c.tick(0);
    c.tick(1);
    c.wire.feed(
        b"Network_Connection_StateMachine: Transitioning from JOINING to CONNECTED\r\n",
    );
    c.tick(1);
    assert_eq!(c.sched.interpreter().sticky().text(), None);
    assert_eq!(c.screen.field(FieldId::Connection), Some("CONNECTED"));
}

#[test]
fn quiet_device_degrades_and_ages() {
    let mut c = console();
    c.tick(0);
    c.wire.feed(b"Timestamp 100 UTC\r\n");
    c.tick(0);
    for s in 1..120 {
        c.tick(s);
    }
    assert_eq!(c.sched.connection_state(), ConnectionState::Connected);
    c.tick(120);
    assert_eq!(c.sched.data_age_s(), 120);
    assert_eq!(c.sched.connection_state(), ConnectionState::Degraded);

    c.wire.feed(b"Timestamp 220 UTC\r\n");
    c.tick(120);
    assert_eq!(c.sched.data_age_s(), 0);
    assert_eq!(c.sched.connection_state(), ConnectionState::Connected);
}

#[test]
fn heartbeat_reports_time_and_data_age() {
    let mut c = console();
    c.tick(0);
    assert!(c
        .screen
        .statuses()
        .iter()
        .any(|s| s.starts_with(&format!("UNIX timestamp {}\tLocal time ", T0))));

    // Heartbeats follow one minute after the open message, then six minutes
    // later, when the silent device's data is stale.
    for s in 1..=419 {
        c.tick(s);
    }
    let heartbeats = |screen: &Screen| {
        screen
            .statuses()
            .iter()
            .filter(|s| s.starts_with("UNIX timestamp"))
            .count()
    };
    assert_eq!(heartbeats(&c.screen), 2);
    assert!(!c.screen.statuses().iter().any(|s| s.starts_with("Data ")));
    c.tick(420);
    assert_eq!(heartbeats(&c.screen), 3);
    assert!(c.screen.statuses().contains(&"Data 7 minutes old"));
}

#[test]
fn commands_are_written_and_reset_display() {
    let mut c = console();
    c.tick(0);
    c.sched
        .submit_command(&Command::from_menu('0', None).unwrap(), &mut c.screen)
        .unwrap();
    c.sched
        .submit_command(&Command::from_menu('P', Some("b")).unwrap(), &mut c.screen)
        .unwrap();
    c.screen.0.clear();
    c.sched
        .submit_command(&Command::from_menu('Z', None).unwrap(), &mut c.screen)
        .unwrap();
    assert_eq!(c.wire.written(), vec!["+++MENU:0", "+++MENU:P b", "+++MENU:Z"]);
    assert!(c.screen.0.contains(&Out::ClearStatus));
    assert!(c.screen.0.contains(&Out::ClearRaw));
}

#[test]
fn commands_while_disconnected_are_not_sent() {
    let mut c = console();
    c.wire.refuse(true);
    c.tick(0);
    let res = c
        .sched
        .submit_command(&Command::raw("PING").unwrap(), &mut c.screen);
    assert!(matches!(res, Err(SendError::Disconnected)));
    assert!(c.wire.written().is_empty());
}

#[test]
fn queue_watermarks_surface_as_status() {
    let mut c = console();
    c.tick(0);
    for i in 0..180 {
        c.wire.feed(format!("SensorTask: sample {}\r\n", i).as_bytes());
    }
    c.tick(0);
    let statuses = c.screen.statuses();
    assert!(statuses.contains(&"WARNING - receive FIFO is half-full"));
    assert!(statuses.contains(&"WARNING - receive FIFO is almost full"));
    assert_eq!(c.screen.raw().len(), 180);
    assert!(c.sched.queue().is_empty());
}

#[test]
fn displays_are_cleared_on_their_own_cadence() {
    let config = ConsoleConfig {
        status_clear_every_s: 90,
        ..ConsoleConfig::default()
    };
    let mut c = console_with(&config);
    c.screen.0.clear();

    // The first tick is elapsed second 1, so second s is elapsed s + 1.
    for s in 0..298 {
        c.tick(s);
    }
    assert_eq!(c.count(&Out::ClearRaw), 0);
    assert_eq!(c.count(&Out::ClearStatus), 3);

    c.tick(298);
    assert_eq!(c.count(&Out::ClearRaw), 0);
    c.tick(299);
    assert_eq!(c.count(&Out::ClearRaw), 1);
    assert_eq!(c.count(&Out::ClearStatus), 3);

    for s in 300..360 {
        c.tick(s);
    }
    assert_eq!(c.count(&Out::ClearStatus), 4);
}

#[test]
fn status_display_cleared_daily_by_default() {
    let mut c = console();
    c.screen.0.clear();
    for s in 0..86399 {
        c.tick(s);
    }
    assert_eq!(c.count(&Out::ClearStatus), 0);
    assert_eq!(c.count(&Out::ClearRaw), 287);
    c.tick(86399);
    assert_eq!(c.count(&Out::ClearStatus), 1);
    assert_eq!(c.count(&Out::ClearRaw), 288);
}

#[test]
fn overflow_reports_lost_lines() {
    let mut c = console();
    c.tick(0);
    for i in 0..205 {
        c.wire.feed(format!("SensorTask: sample {}\r\n", i).as_bytes());
    }
    c.tick(0);
    assert!(c
        .screen
        .statuses()
        .contains(&"WARNING - receive FIFO overflowed, 5 messages lost"));
    let raw = c.screen.raw();
    assert_eq!(raw.len(), 200);
    assert_eq!(raw[0], "SensorTask: sample 5");

    // Reported once, not again on the next drain.
    c.wire.feed(b"SensorTask: sample 205\r\n");
    c.tick(1);
    let reports = c
        .screen
        .statuses()
        .iter()
        .filter(|s| s.contains("overflowed"))
        .count();
    assert_eq!(reports, 1);
}

#[test]
fn operator_reset_restarts_heartbeat_cadence() {
    let mut c = console();
    for s in 0..=60 {
        c.tick(s);
    }
    assert_eq!(c.heartbeats(), 2);

    c.sched.reset_display_state(&mut c.screen);
    assert!(c.screen.0.contains(&Out::ClearStatus));
    for s in 61..120 {
        c.tick(s);
    }
    assert_eq!(c.heartbeats(), 2);
    // One minute after the reset rather than six.
    c.tick(120);
    assert_eq!(c.heartbeats(), 3);
}
