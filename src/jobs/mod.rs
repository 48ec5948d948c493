//! Background jobs.

mod stats_poller;

pub use stats_poller::{CycleReport, StatsPoller};
