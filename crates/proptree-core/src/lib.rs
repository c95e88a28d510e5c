//! # proptree-sync Core
//!
//! Property tree model and delta semantics for proptree-sync.
//!
//! This crate provides:
//! - The self-describing [`PropertyRecord`] exchanged between peers
//! - A producer tree ([`SenderProperty`]) that tracks dirty nodes and encodes
//!   only what changed since the last cycle
//! - A consumer tree ([`ReceiverTree`]) that merges incoming records, creating,
//!   updating, and deleting subtrees as directed
//! - An injectable [`Clock`] used to stamp outgoing records

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
mod dump;
pub mod error;
pub mod receiver;
pub mod record;
pub mod sender;
pub mod value;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{MergeIssue, SyncError};
pub use receiver::{GroupReceiverProperty, MergeReport, ReceiverProperty, ReceiverTree, ReceiverValue};
pub use record::{PropertyRecord, RecordError};
pub use sender::{GroupSenderProperty, LeafSenderProperty, SenderProperty};
pub use value::{Scalar, ValueType};
