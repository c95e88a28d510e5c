//! # proptree-sync Protocol
//!
//! Wire codec and stream framing for property records.
//!
//! ## Codec
//!
//! One [`PropertyRecord`](proptree_core::PropertyRecord) is encoded as one CBOR
//! item. The encoding is self-describing: every record carries its own type tag.
//!
//! ## Framing
//!
//! A byte stream does not preserve record boundaries, so records sent over one
//! are prefixed with a 4-byte big-endian length (see [`RecordCodec`]).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod framing;

pub use codec::{decode_record, encode_record, CodecError};
pub use framing::{FramingError, RecordCodec, DEFAULT_MAX_FRAME};
