//! CLI glue for the `bonus-steward` binary.

pub mod logging;
pub mod output;
pub mod run_cmd;
