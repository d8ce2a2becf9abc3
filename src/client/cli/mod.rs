mod client;
mod io;
mod report;

pub use client::CliClient;
pub use io::{LineSource, Terminal};
pub use report::TurnReporter;
