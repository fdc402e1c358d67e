//! Display fields published by the interpreter.

use std::fmt;

/// Identifies one value on the console's field panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldId {
    FirmwareVersion,
    BoardRevision,
    PcbRevision,
    SerialNumber,
    CalibrationDate,
    VoltageReference,
    Timestamp,
    ElapsedTime,
    BatteryVoltage,
    BatteryPercentage,
    Mains,
    TemperatureUnit,
    Minimum,
    Temperature,
    Maximum,
    AlarmHigh,
    AlarmLow,
    Alarm,
    SampleRate,
    Ack,
    HostCal,
    Buzzer,
    RadioSerial,
    RadioDevice,
    PanId,
    Channel,
    Connection,
    /// Heading of the status display; carries the sticky error when one is
    /// active.
    StatusTitle,
}

impl FieldId {
    pub const ALL: [FieldId; 28] = [
        FieldId::FirmwareVersion,
        FieldId::BoardRevision,
        FieldId::PcbRevision,
        FieldId::SerialNumber,
        FieldId::CalibrationDate,
        FieldId::VoltageReference,
        FieldId::Timestamp,
        FieldId::ElapsedTime,
        FieldId::BatteryVoltage,
        FieldId::BatteryPercentage,
        FieldId::Mains,
        FieldId::TemperatureUnit,
        FieldId::Minimum,
        FieldId::Temperature,
        FieldId::Maximum,
        FieldId::AlarmHigh,
        FieldId::AlarmLow,
        FieldId::Alarm,
        FieldId::SampleRate,
        FieldId::Ack,
        FieldId::HostCal,
        FieldId::Buzzer,
        FieldId::RadioSerial,
        FieldId::RadioDevice,
        FieldId::PanId,
        FieldId::Channel,
        FieldId::Connection,
        FieldId::StatusTitle,
    ];

    /// Value shown before the device has reported anything.
    pub fn placeholder(self) -> &'static str {
        match self {
            FieldId::Timestamp => "0000000000",
            FieldId::SampleRate => "-",
            FieldId::TemperatureUnit => "Temperature",
            FieldId::StatusTitle => "Status",
            FieldId::BoardRevision
            | FieldId::PcbRevision
            | FieldId::SerialNumber
            | FieldId::CalibrationDate
            | FieldId::VoltageReference => "",
            _ => "------",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldId::FirmwareVersion => "FW version",
            FieldId::BoardRevision => "Board rev",
            FieldId::PcbRevision => "PCB rev",
            FieldId::SerialNumber => "Serial number",
            FieldId::CalibrationDate => "Cal date",
            FieldId::VoltageReference => "Vref (mV)",
            FieldId::Timestamp => "Timestamp",
            FieldId::ElapsedTime => "Elapsed time",
            FieldId::BatteryVoltage => "Battery voltage",
            FieldId::BatteryPercentage => "Battery %",
            FieldId::Mains => "Mains",
            FieldId::TemperatureUnit => "Scale",
            FieldId::Minimum => "Minimum",
            FieldId::Temperature => "Temperature",
            FieldId::Maximum => "Maximum",
            FieldId::AlarmHigh => "Alarm HI",
            FieldId::AlarmLow => "Alarm LO",
            FieldId::Alarm => "Alarm",
            FieldId::SampleRate => "Sample rate (s)",
            FieldId::Ack => "ACK",
            FieldId::HostCal => "Host cal",
            FieldId::Buzzer => "Buzzer",
            FieldId::RadioSerial => "XBee SN",
            FieldId::RadioDevice => "Device",
            FieldId::PanId => "PAN ID",
            FieldId::Channel => "Channel",
            FieldId::Connection => "Connection",
            FieldId::StatusTitle => "Status",
        }
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
