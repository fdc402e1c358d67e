//! wsg-console
//!
//! Terminal diagnostic console for a WSG30 temperature display attached
//! over a serial-to-USB cable. Device traffic, status messages, and field
//! updates are printed as they happen; operator commands are read from
//! stdin.

use crossterm::style::Stylize;
use std::collections::BTreeMap;
use std::env;
use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use wsgdiag::link::SerialConnector;
use wsgdiag::{ConsoleConfig, FieldId, Logfile, Presenter, Request, Scheduler};
use wsgdiag_tools::{
    console_opts, enum_devices, parse_console_opts, parse_operator_line, InputError,
    OperatorInput, PortInterface, OPERATOR_HELP,
};

/// `log` records printed to stderr with a local timestamp.
struct ConsoleLogger {
    level: log::LevelFilter,
    time_format: String,
}

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!(
                "{}{} {}",
                chrono::Local::now().format(&self.time_format),
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {}
}

type FieldPanel = Arc<Mutex<BTreeMap<FieldId, String>>>;

/// Prints to the terminal and mirrors field values for the `fields`
/// command.
struct Terminal {
    verbose: bool,
    fields: FieldPanel,
}

impl Presenter for Terminal {
    fn display_raw(&mut self, text: &str) {
        println!("{}", text);
    }

    fn display_status(&mut self, text: &str) {
        println!("{}", text.yellow());
    }

    fn set_field(&mut self, field: FieldId, text: &str) {
        let mut fields = self.fields.lock().unwrap_or_else(|e| e.into_inner());
        if fields.get(&field).map(String::as_str) == Some(text) {
            return;
        }
        fields.insert(field, text.to_string());
        if self.verbose {
            println!("{}", format!("{}: {}", field, text).cyan());
        }
    }

    fn clear_raw(&mut self) {
        log::debug!("raw display cleared");
    }

    fn clear_status(&mut self) {
        log::debug!("status display cleared");
    }
}

fn print_fields(fields: &FieldPanel) {
    let fields = fields.lock().unwrap_or_else(|e| e.into_inner());
    for id in FieldId::ALL {
        let value = fields.get(&id).map(String::as_str).unwrap_or(id.placeholder());
        println!("{:>16}  {}", id.label(), value);
    }
}

fn list_ports() -> ExitCode {
    match enum_devices(true) {
        Ok(devices) => {
            if devices.is_empty() {
                println!("No serial ports found");
            }
            for dev in devices {
                match dev.ifc {
                    PortInterface::Usb(vid, pid, product) => println!(
                        " * {} (vid: {:04x} pid: {:04x}{})",
                        dev.path,
                        vid,
                        pid,
                        product.map(|p| format!(" {}", p)).unwrap_or_default()
                    ),
                    PortInterface::Other => println!(" * {}", dev.path),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let opts = console_opts();
    let args: Vec<String> = env::args().collect();

    macro_rules! die{
        ($f:expr,$($a:tt)*)=>{
        {
            die!(format!($f, $($a)*));
        }
        };
        ($msg:expr)=>{
        {
            eprintln!("ERROR: {}", $msg);
            return ExitCode::FAILURE;
        }
        };
    }

    let usage = format!("Usage: {} [-p device] [-b baud] [-l] [-L dir] [-v] [-d] [-t fmt]  or {} --enum", &args[0], &args[0]);

    let parsed = match parse_console_opts(&opts, &args[1..], ConsoleConfig::from_env()) {
        Ok(p) => p,
        Err(e) => die!("{}\n{}", e, opts.usage(&usage)),
    };

    if parsed.help {
        print!("{}", opts.usage(&usage));
        println!("\nCommands:\n{}", OPERATOR_HELP);
        return ExitCode::SUCCESS;
    }

    if parsed.enumerate {
        return list_ports();
    }

    let level = if parsed.debugging {
        log::LevelFilter::Debug
    } else if parsed.verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Warn
    };
    let logger = ConsoleLogger {
        level,
        time_format: parsed.time_format.clone(),
    };
    if let Err(e) = log::set_logger(Box::leak(Box::new(logger))) {
        die!("cannot install logger: {}", e);
    }
    log::set_max_level(level);

    let config = parsed.config;
    log::info!(
        "device {} at {} baud, tick {:?}",
        config.device,
        config.baud,
        config.tick_interval
    );

    let connector = SerialConnector {
        max_line_len: config.max_line_len,
    };
    let mut sched = Scheduler::new(
        &config,
        Box::new(connector),
        Box::new(Logfile::new(&config.log_dir)),
    );

    let fields: FieldPanel = Arc::new(Mutex::new(BTreeMap::new()));
    let mut terminal = Terminal {
        verbose: parsed.verbose,
        fields: Arc::clone(&fields),
    };

    sched.start(&mut terminal);
    if parsed.log_at_start {
        if let Err(e) = sched.set_logging(true, &chrono::Local::now(), &mut terminal) {
            die!("cannot open log file in {}: {}", config.log_dir.display(), e);
        }
    }

    let (req_tx, requests) = crossbeam::channel::bounded::<Request>(16);
    // Held so that closing stdin does not stop the console.
    let _requests_alive = req_tx.clone();
    let input = std::thread::Builder::new()
        .name("operator".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        log::warn!("stdin: {}", e);
                        break;
                    }
                };
                match parse_operator_line(&line) {
                    Ok(OperatorInput::Request(req)) => {
                        let quit = req == Request::Quit;
                        if req_tx.send(req).is_err() || quit {
                            break;
                        }
                    }
                    Ok(OperatorInput::ShowFields) => print_fields(&fields),
                    Ok(OperatorInput::Help) => println!("{}", OPERATOR_HELP),
                    Ok(OperatorInput::Empty) => {}
                    Err(InputError::Command(e)) => println!("{}", e.to_string().yellow()),
                    Err(e) => println!("{}", e),
                }
            }
            log::debug!("operator input closed");
        });
    if let Err(e) = input {
        die!("cannot start operator input: {}", e);
    }

    sched.run(config.tick_interval, &requests, &mut terminal);
    ExitCode::SUCCESS
}
