//! Receipt intake adapters.
//!
//! OCR and mailbox collaborators hand extracted receipts to the engine
//! either by dropping JSON files into a spool directory or through an
//! in-process channel.

mod channel;
mod spool;

pub use channel::{receipt_channel, ChannelReceiptSource};
pub use spool::SpoolReceiptSource;
