//! # proptree-sync Agent
//!
//! Drives property-tree synchronization over TCP.
//!
//! ## Roles
//!
//! 1. **Producer**: owns a [`SenderProperty`](proptree_core::SenderProperty)
//!    tree, runs one encode cycle per interval, and sends only what changed.
//!    A full snapshot goes out right after connecting.
//! 2. **Consumer**: accepts producers one at a time, gives each session a fresh
//!    [`ReceiverTree`](proptree_core::ReceiverTree), and merges every delivered
//!    record in order.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod runtime;
pub mod transport;
pub mod workload;

pub use config::{AgentConfig, Mode};
pub use driver::{ConsumerDriver, DriverError, DriverStats, ProducerDriver};
pub use runtime::Agent;
pub use transport::{RecordListener, RecordStream, Session, TransportError};
