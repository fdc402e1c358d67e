use getopts::Options;
use std::path::PathBuf;
use thiserror::Error;
use wsgdiag::command::{Command, CommandError};
use wsgdiag::{ConsoleConfig, Request};

#[derive(Error, Debug)]
pub enum OptsError {
    #[error("{0}")]
    Parse(#[from] getopts::Fail),
    #[error("Invalid baud rate '{0}'")]
    InvalidBaud(String),
    #[error("Unexpected argument '{0}'")]
    Unexpected(String),
}

/// Everything `wsg-console` takes from its command line.
#[derive(Debug, Clone)]
pub struct ConsoleOpts {
    pub config: ConsoleConfig,
    pub log_at_start: bool,
    pub verbose: bool,
    pub debugging: bool,
    pub time_format: String,
    pub enumerate: bool,
    pub help: bool,
}

pub fn console_opts() -> Options {
    let mut opts = Options::new();
    opts.optopt(
        "p",
        "",
        &format!(
            "serial device to open (default {})",
            wsgdiag::link::DEFAULT_DEVICE
        ),
        "device",
    );
    opts.optopt(
        "b",
        "",
        &format!("baud rate (default {})", wsgdiag::link::DEFAULT_BAUD),
        "baud",
    );
    opts.optflag("l", "", "Start with the log file enabled");
    opts.optopt("L", "", "Directory for log files (default .)", "dir");
    opts.optflag("v", "", "Verbose output, including field updates");
    opts.optflag("d", "", "Debugging output");
    opts.optopt("t", "", "Timestamp format (default '%T%.3f ')", "fmt");
    opts.optflag("", "enum", "Enumerate all serial devices, then quit");
    opts.optflag("h", "help", "Print this help");
    opts
}

/// Parses `args` (without the program name) over `base`, which normally
/// comes from the environment.
pub fn parse_console_opts(
    opts: &Options,
    args: &[String],
    base: ConsoleConfig,
) -> Result<ConsoleOpts, OptsError> {
    let matches = opts.parse(args)?;
    if let Some(extra) = matches.free.first() {
        return Err(OptsError::Unexpected(extra.clone()));
    }

    let mut config = base;
    if let Some(device) = matches.opt_str("p") {
        config.device = device;
    }
    if let Some(baud) = matches.opt_str("b") {
        config.baud = match baud.parse::<u32>() {
            Ok(b) if b > 0 => b,
            _ => return Err(OptsError::InvalidBaud(baud)),
        };
    }
    if let Some(dir) = matches.opt_str("L") {
        config.log_dir = PathBuf::from(dir);
    }

    Ok(ConsoleOpts {
        config,
        log_at_start: matches.opt_present("l"),
        verbose: matches.opt_present("v"),
        debugging: matches.opt_present("d"),
        time_format: matches.opt_str("t").unwrap_or("%T%.3f ".to_string()),
        enumerate: matches.opt_present("enum"),
        help: matches.opt_present("h"),
    })
}

/// A line typed by the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum OperatorInput {
    Request(Request),
    ShowFields,
    Help,
    Empty,
}

#[derive(Error, Debug, PartialEq)]
pub enum InputError {
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
}

pub const OPERATOR_HELP: &str = "\
menu <code> [value]   send a menu selection or setter (P, D, N, V)
raw <text>            send +++COMMAND:<text>
reset                 clear the display
log on|off            start or stop the log file
fields                show the current field values
quit                  exit";

pub fn parse_operator_line(line: &str) -> Result<OperatorInput, InputError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let input = match verb {
        "" => OperatorInput::Empty,
        "menu" => {
            let (code, arg) = match rest.split_once(char::is_whitespace) {
                Some((code, arg)) => (code, Some(arg)),
                None => (rest, None),
            };
            let mut chars = code.chars();
            let code = match (chars.next(), chars.next()) {
                (Some(c), None) => c,
                _ => return Err(InputError::Usage("menu <code> [value]")),
            };
            OperatorInput::Request(Request::Submit(Command::from_menu(code, arg)?))
        }
        "raw" => OperatorInput::Request(Request::Submit(Command::raw(rest)?)),
        "reset" => OperatorInput::Request(Request::ResetDisplay),
        "log" => match rest {
            "on" => OperatorInput::Request(Request::Logging(true)),
            "off" => OperatorInput::Request(Request::Logging(false)),
            _ => return Err(InputError::Usage("log on|off")),
        },
        "fields" => OperatorInput::ShowFields,
        "quit" | "exit" => OperatorInput::Request(Request::Quit),
        "help" | "?" => OperatorInput::Help,
        other => return Err(InputError::Unknown(other.to_string())),
    };
    Ok(input)
}

#[derive(Error, Debug)]
pub enum EnumError {
    #[error("Failed to enumerate available serial ports")]
    EnumerationFailed(#[from] serialport::Error),
}

#[derive(Debug)]
pub enum PortInterface {
    /// USB serial adapter, with vendor and product ids.
    Usb(u16, u16, Option<String>),
    Other,
}

#[derive(Debug)]
pub struct SerialDevice {
    pub path: String,
    pub ifc: PortInterface,
}

/// Lists serial ports. Unless `all`, only USB adapters are returned.
pub fn enum_devices(all: bool) -> Result<Vec<SerialDevice>, EnumError> {
    let mut ports = Vec::new();
    for p in serialport::available_ports()? {
        let ifc = match &p.port_type {
            serialport::SerialPortType::UsbPort(info) => {
                PortInterface::Usb(info.vid, info.pid, info.product.clone())
            }
            _ => {
                if !all {
                    continue;
                }
                PortInterface::Other
            }
        };
        #[cfg(target_os = "macos")]
        if p.port_name.starts_with("/dev/tty.") && !all {
            continue;
        }
        ports.push(SerialDevice {
            path: p.port_name,
            ifc,
        });
    }
    Ok(ports)
}
