//! Outputs of the console: the presentation layer and the persistent log.

use crate::interp::FieldId;
use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Where the console shows what it receives and derives.
///
/// Text handed to `display_raw` and `display_status` is a single line
/// without terminator; the presenter decides how lines are separated.
pub trait Presenter {
    fn display_raw(&mut self, text: &str);
    fn display_status(&mut self, text: &str);
    fn set_field(&mut self, field: FieldId, text: &str);
    fn clear_raw(&mut self);
    fn clear_status(&mut self);
}

/// Persistent record of every dequeued line. Lines are offered regardless
/// of whether the sink is open; a closed sink ignores them.
pub trait LogSink: Send {
    fn offer(&mut self, line: &str) -> io::Result<()>;

    /// Starts persisting. Returns a name for the destination.
    fn open(&mut self, now: &DateTime<Local>) -> io::Result<String>;

    /// Stops persisting. Returns the name of what was closed, if anything.
    fn close(&mut self) -> Option<String>;

    fn is_open(&self) -> bool;
}

/// Log file named after the time it was opened, e.g.
/// `20240131 1402 WSG30TempDisplay.txt`.
pub struct Logfile {
    dir: PathBuf,
    file: Option<(String, File)>,
}

impl Logfile {
    pub fn new<P: AsRef<Path>>(dir: P) -> Logfile {
        Logfile {
            dir: dir.as_ref().to_path_buf(),
            file: None,
        }
    }

    pub fn file_name(now: &DateTime<Local>) -> String {
        format!("{} WSG30TempDisplay.txt", now.format("%Y%m%d %H%M"))
    }

    fn write_line(file: &mut File, line: &str) -> io::Result<()> {
        file.write_all(line.as_bytes())?;
        file.write_all(b"\r\n")
    }
}

impl LogSink for Logfile {
    fn offer(&mut self, line: &str) -> io::Result<()> {
        match &mut self.file {
            Some((_, file)) => Logfile::write_line(file, line),
            None => Ok(()),
        }
    }

    fn open(&mut self, now: &DateTime<Local>) -> io::Result<String> {
        self.close();
        let name = Logfile::file_name(now);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(&name))?;
        let header = format!(
            "---------- WSG30 Temperature Display logfile, opened {} local time -----------",
            now.format("%Y.%m.%d %H:%M")
        );
        Logfile::write_line(&mut file, &header)?;
        log::info!("logging to {}", self.dir.join(&name).display());
        self.file = Some((name.clone(), file));
        Ok(name)
    }

    fn close(&mut self) -> Option<String> {
        let (name, mut file) = self.file.take()?;
        if let Err(e) = file.flush() {
            log::warn!("flushing {}: {}", name, e);
        }
        Some(name)
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }
}
