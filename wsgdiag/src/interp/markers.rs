//! Marker table
//!
//! Each rule pairs a marker substring with the handler that runs when the
//! marker is found in a line. Rules are evaluated in table order, every one
//! of them against every line, so one line can update several fields.
//! Only the first occurrence of a marker in a line is considered.
//!
//! Block markers (`STATUS >> `, `XBEE >> `, the battery reading) carry
//! `Name:value` sub-fields, searched from the start of the block.

use super::clock::format_runtime;
use super::fields::FieldId;
use super::Scan;

pub const WARNING: &str = "*** WARNING ***";
pub const ERROR: &str = "*** ERROR ***";
pub const STARTUP: &str = "Sensaphone WSG30 Temperature Sensor Display starting...";
pub const DIAGNOSTIC_MODE: &str = "+++ Start DIAGNOSTIC MODE +++";
pub const TRANSITION: &str = "Network_Connection_StateMachine: Transitioning from ";

/// Banners must carry more than this many bytes, counted from the start of
/// the marker, to be forwarded.
const MIN_BANNER_LEN: usize = 20;

/// A marker occurrence within a line.
#[derive(Clone, Copy)]
pub(super) struct Hit<'a> {
    /// From the first byte of the marker to the end of the line.
    pub from: &'a str,
    /// Everything after the marker.
    pub after: &'a str,
}

pub(super) struct Rule {
    pub marker: &'static str,
    pub apply: for<'a, 'b> fn(&mut Scan<'b>, Hit<'a>),
}

/// How a value is cut out of the text following its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Take {
    /// Up to the next space. Without a following space the value is
    /// considered absent.
    Word,
    /// The rest of the line, trimmed.
    Rest,
    /// A word naming the temperature scale.
    Scale,
    /// A word, shown in volts.
    Volts,
}

impl Take {
    pub fn extract(self, after: &str) -> Option<String> {
        match self {
            Take::Word => word(after).map(str::to_string),
            Take::Rest => Some(after.trim().to_string()),
            Take::Scale => word(after).map(|scale| {
                if scale.contains('F') {
                    "Fahrenheit".to_string()
                } else {
                    "Celsius".to_string()
                }
            }),
            Take::Volts => word(after).map(|v| format!("{} V", v)),
        }
    }
}

pub(super) fn word(after: &str) -> Option<&str> {
    after.find(' ').map(|end| &after[..end])
}

pub(super) struct SubField {
    pub marker: &'static str,
    pub take: Take,
    pub field: FieldId,
}

const fn sub(marker: &'static str, take: Take, field: FieldId) -> SubField {
    SubField {
        marker,
        take,
        field,
    }
}

static STATUS_BLOCK: &[SubField] = &[
    sub("Scale:", Take::Scale, FieldId::TemperatureUnit),
    sub("MIN:", Take::Word, FieldId::Minimum),
    sub("TEMP:", Take::Word, FieldId::Temperature),
    sub("MAX:", Take::Word, FieldId::Maximum),
    sub("AlHI:", Take::Word, FieldId::AlarmHigh),
    sub("AlLO:", Take::Word, FieldId::AlarmLow),
    sub("Alarm:", Take::Word, FieldId::Alarm),
    sub("SampleRateSeconds:", Take::Word, FieldId::SampleRate),
    sub("ACK:", Take::Word, FieldId::Ack),
    sub("HostCal:", Take::Word, FieldId::HostCal),
    sub("Buzzer:", Take::Word, FieldId::Buzzer),
    sub("Mains:", Take::Rest, FieldId::Mains),
];

static XBEE_BLOCK: &[SubField] = &[
    sub("SerialNumber:", Take::Word, FieldId::RadioSerial),
    sub("Device:", Take::Word, FieldId::RadioDevice),
    sub("PAN_ID:", Take::Word, FieldId::PanId),
    sub("Channel:", Take::Word, FieldId::Channel),
    sub("Connection:", Take::Rest, FieldId::Connection),
];

static BATTERY_BLOCK: &[SubField] = &[
    sub("Percentage ", Take::Rest, FieldId::BatteryPercentage),
    sub("Battery voltage ", Take::Volts, FieldId::BatteryVoltage),
];

pub(super) static RULES: &[Rule] = &[
    Rule {
        marker: WARNING,
        apply: warning,
    },
    Rule {
        marker: ERROR,
        apply: error,
    },
    Rule {
        marker: STARTUP,
        apply: startup,
    },
    Rule {
        marker: "Board revision = ",
        apply: board_revision,
    },
    Rule {
        marker: "WSG30 Temperature Display firmware version is ",
        apply: firmware_version,
    },
    Rule {
        marker: TRANSITION,
        apply: transition,
    },
    Rule {
        marker: DIAGNOSTIC_MODE,
        apply: diagnostic_mode,
    },
    Rule {
        marker: "InputTask: Battery reading: ",
        apply: battery,
    },
    Rule {
        marker: "Timestamp ",
        apply: timestamp,
    },
    Rule {
        marker: "STATUS >> ",
        apply: status_block,
    },
    Rule {
        marker: "XBEE >> ",
        apply: xbee_block,
    },
    Rule {
        marker: "Network_XBee_Modem_Status: ",
        apply: modem_status,
    },
    Rule {
        marker: "PCB revision = ",
        apply: pcb_revision,
    },
    Rule {
        marker: "Serial number = ",
        apply: serial_number,
    },
    Rule {
        marker: "Calibration date = ",
        apply: calibration_date,
    },
    Rule {
        marker: "Voltage reference (mV) = ",
        apply: voltage_reference,
    },
    Rule {
        marker: "PAN_ID:",
        apply: pan_id,
    },
    Rule {
        marker: "Channel:",
        apply: channel,
    },
];

fn block(scan: &mut Scan<'_>, hit: Hit<'_>, fields: &[SubField]) {
    for sf in fields {
        let Some(pos) = hit.from.find(sf.marker) else {
            continue;
        };
        if let Some(value) = sf.take.extract(&hit.from[pos + sf.marker.len()..]) {
            scan.out.set_field(sf.field, &value);
        }
    }
}

fn battery(scan: &mut Scan<'_>, hit: Hit<'_>) {
    block(scan, hit, BATTERY_BLOCK);
}

fn status_block(scan: &mut Scan<'_>, hit: Hit<'_>) {
    block(scan, hit, STATUS_BLOCK);
}

fn xbee_block(scan: &mut Scan<'_>, hit: Hit<'_>) {
    block(scan, hit, XBEE_BLOCK);
}

fn pan_id(scan: &mut Scan<'_>, hit: Hit<'_>) {
    set_word(scan, hit, FieldId::PanId);
}

fn channel(scan: &mut Scan<'_>, hit: Hit<'_>) {
    set_word(scan, hit, FieldId::Channel);
}

fn set_word(scan: &mut Scan<'_>, hit: Hit<'_>, field: FieldId) {
    if let Some(value) = word(hit.after) {
        scan.out.set_field(field, value);
    }
}

/// Rest-of-line value echoed to the status display as `<prefix><value>`.
fn announce(scan: &mut Scan<'_>, hit: Hit<'_>, prefix: &str, field: FieldId) {
    let value = hit.after.trim();
    scan.status(&format!("{}{}", prefix, value));
    scan.out.set_field(field, value);
}

fn warning(scan: &mut Scan<'_>, hit: Hit<'_>) {
    if hit.from.len() > MIN_BANNER_LEN {
        scan.status(hit.from);
    }
}

fn error(scan: &mut Scan<'_>, hit: Hit<'_>) {
    if hit.from.len() > MIN_BANNER_LEN {
        scan.status(hit.from);
        if scan.sticky.raise(hit.from) {
            scan.out
                .set_field(FieldId::StatusTitle, &format!("Status: {}", hit.from));
        }
    }
}

fn startup(scan: &mut Scan<'_>, _hit: Hit<'_>) {
    log::info!("device restarted, resetting display");
    super::reset_state(scan.clock, scan.sticky, scan.out);
}

fn board_revision(scan: &mut Scan<'_>, hit: Hit<'_>) {
    announce(scan, hit, "Detected Board revision: ", FieldId::BoardRevision);
}

fn firmware_version(scan: &mut Scan<'_>, hit: Hit<'_>) {
    announce(
        scan,
        hit,
        "Detected WSG30 Temperature Display firmware version: ",
        FieldId::FirmwareVersion,
    );
}

/// Any state name containing CONNECTED counts, DISCONNECTED included.
pub(super) fn is_connected_state(state: &str) -> bool {
    state.contains("CONNECTED")
}

fn transition(scan: &mut Scan<'_>, hit: Hit<'_>) {
    let line = scan.line;
    scan.status(line);
    let Some(pos) = hit.after.find(" to ") else {
        return;
    };
    let state = hit.after[pos + 4..].trim();
    scan.out.set_field(FieldId::Connection, state);
    if is_connected_state(state) {
        scan.sticky.clear();
        scan.out.set_field(FieldId::StatusTitle, "Status");
    }
}

fn diagnostic_mode(scan: &mut Scan<'_>, _hit: Hit<'_>) {
    scan.reply = Some(super::DIAGNOSTIC_GREETING.to_string());
}

fn timestamp(scan: &mut Scan<'_>, hit: Hit<'_>) {
    let Some(value) = word(hit.after) else {
        return;
    };
    scan.out.set_field(FieldId::Timestamp, value);
    match value.trim().parse::<u32>() {
        Ok(ts) => {
            let runtime = scan.clock.observe(ts);
            scan.out
                .set_field(FieldId::ElapsedTime, &format_runtime(runtime));
        }
        Err(_) => log::debug!("unparsable device timestamp {:?}", value),
    }
}

fn modem_status(scan: &mut Scan<'_>, hit: Hit<'_>) {
    announce(scan, hit, "Modem Status: ", FieldId::Connection);
}

fn pcb_revision(scan: &mut Scan<'_>, hit: Hit<'_>) {
    announce(scan, hit, "Detected PCB revision: ", FieldId::PcbRevision);
}

fn serial_number(scan: &mut Scan<'_>, hit: Hit<'_>) {
    announce(scan, hit, "Detected serial number: ", FieldId::SerialNumber);
}

fn calibration_date(scan: &mut Scan<'_>, hit: Hit<'_>) {
    announce(
        scan,
        hit,
        "Detected calibration date (YYYYMMDD): ",
        FieldId::CalibrationDate,
    );
}

fn voltage_reference(scan: &mut Scan<'_>, hit: Hit<'_>) {
    announce(
        scan,
        hit,
        "Detected voltage reference (mV): ",
        FieldId::VoltageReference,
    );
}
