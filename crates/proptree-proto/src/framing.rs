//! Length-prefixed framing of records over a byte stream.
//!
//! Wire format:
//! ```text
//! ┌──────────────────┬──────────────────────────┐
//! │ Length (4B BE)   │ CBOR record (Length B)   │
//! └──────────────────┴──────────────────────────┘
//! ```
//!
//! A partial frame yields nothing until the rest arrives; coalesced frames are
//! decoded one at a time.

use crate::codec::{decode_record, encode_record, CodecError};
use bytes::{Bytes, BytesMut};
use proptree_core::PropertyRecord;
use tokio_util::codec::{Decoder, Encoder, LengthDelimitedCodec};

/// Default maximum frame payload: 16 MiB.
pub const DEFAULT_MAX_FRAME: usize = 16 * 1024 * 1024;

/// Errors from framed record streams.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    /// Transport I/O failed, or a frame exceeded the size limit
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A complete frame did not hold a valid record
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Encodes and decodes length-prefixed property records.
#[derive(Debug)]
pub struct RecordCodec {
    length_codec: LengthDelimitedCodec,
}

impl RecordCodec {
    /// Create a codec with the default frame limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_frame(DEFAULT_MAX_FRAME)
    }

    /// Create a codec that rejects frames longer than `max_frame` bytes.
    #[must_use]
    pub fn with_max_frame(max_frame: usize) -> Self {
        Self {
            length_codec: LengthDelimitedCodec::builder()
                .length_field_length(4)
                .max_frame_length(max_frame)
                .new_codec(),
        }
    }

    /// Configured frame limit.
    #[must_use]
    pub fn max_frame(&self) -> usize {
        self.length_codec.max_frame_length()
    }
}

impl Default for RecordCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for RecordCodec {
    type Item = PropertyRecord;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(frame) = self.length_codec.decode(src)? else {
            return Ok(None);
        };

        let record = decode_record(&frame)?;
        tracing::trace!(
            name = %record.name,
            frame_len = frame.len(),
            "Decoded record frame"
        );
        Ok(Some(record))
    }
}

impl Encoder<PropertyRecord> for RecordCodec {
    type Error = FramingError;

    fn encode(&mut self, item: PropertyRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        <Self as Encoder<&PropertyRecord>>::encode(self, &item, dst)
    }
}

impl Encoder<&PropertyRecord> for RecordCodec {
    type Error = FramingError;

    fn encode(&mut self, item: &PropertyRecord, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = encode_record(item)?;
        self.length_codec.encode(Bytes::from(payload), dst)?;
        Ok(())
    }
}
