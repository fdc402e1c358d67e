//! Diagnostic console core for the WSG30 temperature display.
//!
//! The device reports its state as text lines over a serial link. A
//! [`link::Port`] thread frames incoming bytes into lines and pushes them
//! into a [`queue::MessageQueue`]; the [`sched::Scheduler`] drains the queue
//! on a fixed tick and hands each line to the [`interp::Interpreter`], which
//! publishes fields and status messages through a [`sink::Presenter`].

pub mod command;
pub mod config;
pub mod event;
pub mod interp;
pub mod link;
pub mod queue;
pub mod sched;
pub mod sink;

pub use command::Command;
pub use config::ConsoleConfig;
pub use interp::{FieldId, Interpreter};
pub use queue::MessageQueue;
pub use sched::{Request, Scheduler};
pub use sink::{LogSink, Logfile, Presenter};
