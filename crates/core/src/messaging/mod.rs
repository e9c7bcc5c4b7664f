//! Message store ports and retry selection policy

pub mod ports;
pub mod retry;
