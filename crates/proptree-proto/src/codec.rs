//! CBOR encoding of property records.

use proptree_core::{PropertyRecord, RecordError};

/// Encode a record to CBOR bytes.
///
/// # Errors
///
/// Returns error if the record violates the schema invariants or
/// serialization fails.
pub fn encode_record(record: &PropertyRecord) -> Result<Vec<u8>, CodecError> {
    record.validate()?;
    let mut bytes = Vec::new();
    ciborium::into_writer(record, &mut bytes).map_err(|e| CodecError::Serialize(e.to_string()))?;
    Ok(bytes)
}

/// Decode a record from CBOR bytes.
///
/// The input must hold exactly one complete record.
///
/// # Errors
///
/// Returns error if deserialization fails, bytes remain after the record, or
/// the decoded record violates the schema invariants.
pub fn decode_record(bytes: &[u8]) -> Result<PropertyRecord, CodecError> {
    let mut rest = bytes;
    let record: PropertyRecord =
        ciborium::from_reader(&mut rest).map_err(|e| CodecError::Deserialize(e.to_string()))?;
    if !rest.is_empty() {
        return Err(CodecError::Deserialize(format!(
            "{} trailing bytes after record",
            rest.len()
        )));
    }
    record.validate()?;
    Ok(record)
}

/// Errors for record serialization/deserialization.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
    /// The record is structurally invalid
    #[error(transparent)]
    Invalid(#[from] RecordError),
}
