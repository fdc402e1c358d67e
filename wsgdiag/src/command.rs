//! Outbound commands
//!
//! The device accepts menu selections as `+++MENU:<code>`, setters as
//! `+++MENU:<code> <value>`, and raw pass-through text as
//! `+++COMMAND:<text>`. Commands are written without a line terminator.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("WARNING - {0} appears blank")]
    Blank(&'static str),
    #[error("WARNING - '{0}' is an invalid Board rev")]
    InvalidBoardRevision(String),
    #[error("WARNING - {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuItem {
    pub code: char,
    pub label: &'static str,
}

const fn item(code: char, label: &'static str) -> MenuItem {
    MenuItem { code, label }
}

/// Menu entries the device offers, in display order.
pub static MENU: &[MenuItem] = &[
    item('0', "Display menu"),
    item('1', "Toggle 5sec status"),
    item('B', "Buzzer"),
    item('d', "Read cal date"),
    item('L', "Toggle LCD blink"),
    item('M', "Music notes"),
    item('n', "Read SN"),
    item('p', "Read PCB rev"),
    item('v', "Read Vref"),
    item('X', "RESET to defaults"),
    item('Z', "REBOOT"),
];

pub fn menu_item(code: char) -> Option<&'static MenuItem> {
    MENU.iter().find(|m| m.code == code)
}

/// Menu codes that store a value on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Setter {
    BoardRevision,
    CalibrationDate,
    SerialNumber,
    VoltageReference,
}

impl Setter {
    pub fn from_code(code: char) -> Option<Setter> {
        match code {
            'P' => Some(Setter::BoardRevision),
            'D' => Some(Setter::CalibrationDate),
            'N' => Some(Setter::SerialNumber),
            'V' => Some(Setter::VoltageReference),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Setter::BoardRevision => 'P',
            Setter::CalibrationDate => 'D',
            Setter::SerialNumber => 'N',
            Setter::VoltageReference => 'V',
        }
    }

    pub fn what(self) -> &'static str {
        match self {
            Setter::BoardRevision => "Board rev",
            Setter::CalibrationDate => "Calibration date",
            Setter::SerialNumber => "Serial Number",
            Setter::VoltageReference => "Vref",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Menu(char),
    Set(Setter, String),
    Raw(String),
}

impl Command {
    /// Builds a command from a menu code and an optional argument, as typed
    /// by an operator.
    pub fn from_menu(code: char, arg: Option<&str>) -> Result<Command, CommandError> {
        if let Some(setter) = Setter::from_code(code) {
            return Command::set(setter, arg.unwrap_or(""));
        }
        if menu_item(code).is_none() {
            return Err(CommandError::InvalidArgument(format!(
                "'{}' is not a menu code",
                code
            )));
        }
        match arg.map(str::trim) {
            None | Some("") => Ok(Command::Menu(code)),
            Some(_) => Err(CommandError::InvalidArgument(format!(
                "menu code '{}' takes no argument",
                code
            ))),
        }
    }

    pub fn set(setter: Setter, value: &str) -> Result<Command, CommandError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CommandError::Blank(setter.what()));
        }
        if setter == Setter::BoardRevision {
            // Only the first character is sent.
            let rev: String = value.chars().take(1).collect();
            if !rev.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(CommandError::InvalidBoardRevision(rev));
            }
            return Ok(Command::Set(setter, rev));
        }
        Ok(Command::Set(setter, value.to_string()))
    }

    pub fn raw(text: &str) -> Result<Command, CommandError> {
        if text.trim().is_empty() {
            return Err(CommandError::Blank("Command"));
        }
        Ok(Command::Raw(text.to_string()))
    }

    /// Text written to the device.
    pub fn wire(&self) -> String {
        match self {
            Command::Menu(code) => format!("+++MENU:{}", code),
            Command::Set(setter, value) => format!("+++MENU:{} {}", setter.code(), value),
            Command::Raw(text) => format!("+++COMMAND:{}", text),
        }
    }

    /// Reset to defaults and reboot invalidate everything on display.
    pub fn resets_display(&self) -> bool {
        matches!(self, Command::Menu('X') | Command::Menu('Z'))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Menu(code) => match menu_item(*code) {
                Some(item) => write!(f, "Menu {} - {}", item.code, item.label),
                None => write!(f, "Menu {}", code),
            },
            Command::Set(setter, value) => write!(f, "New {} = >>{}<<", setter.what(), value),
            Command::Raw(text) => write!(f, "Command >>{}<<", text),
        }
    }
}
