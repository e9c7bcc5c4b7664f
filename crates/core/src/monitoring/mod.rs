//! Monitoring port and histogram helpers

pub mod ports;
pub mod timeline;
