//! Domain types and models

pub mod message;
pub mod monitoring;

pub use message::{MessageStatus, PublishedMessage, ReceivedMessage};
pub use monitoring::{MessageQuery, MessageType, MessageView, StatisticsSummary};
