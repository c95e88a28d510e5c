//! Sync drivers: one encode-and-send cycle on the producer side, one
//! receive-and-merge step per record on the consumer side.
//!
//! Drivers own their tree and never block on their own; the transport is
//! supplied by the caller as a [`Sink`] of records (producer) or a [`Stream`]
//! of decoded frames (consumer).

use futures_util::{Sink, SinkExt, Stream, StreamExt};
use proptree_core::{Clock, MergeReport, PropertyRecord, ReceiverTree, SenderProperty};
use proptree_proto::{decode_record, CodecError, FramingError};

/// Counters kept by a driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverStats {
    /// Cycles run (producer) or records received (consumer)
    pub cycles: u64,
    /// Cycles that had nothing to send
    pub idle_cycles: u64,
    /// Records sent or merged
    pub records: u64,
    /// Node-level merge issues seen
    pub merge_issues: u64,
}

/// Producer-side driver.
pub struct ProducerDriver<C: Clock> {
    root: SenderProperty,
    clock: C,
    stats: DriverStats,
}

impl<C: Clock> ProducerDriver<C> {
    /// Create a driver around a producer tree.
    pub fn new(root: SenderProperty, clock: C) -> Self {
        Self {
            root,
            clock,
            stats: DriverStats::default(),
        }
    }

    /// The producer tree.
    pub fn root(&self) -> &SenderProperty {
        &self.root
    }

    /// Mutable access for applying changes between cycles.
    pub fn root_mut(&mut self) -> &mut SenderProperty {
        &mut self.root
    }

    /// Counters so far.
    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// A consumer has connected: the next cycle sends the whole tree.
    pub fn on_connected(&mut self) {
        self.root.mark_all_dirty();
        tracing::info!(root = %self.root.name(), "Consumer connected, scheduling full snapshot");
    }

    /// Run the encode half of a cycle. `None` means nothing changed.
    pub fn tick(&mut self) -> Option<PropertyRecord> {
        self.stats.cycles += 1;
        let Some(record) = self.root.encode_dirty(&self.clock) else {
            self.stats.idle_cycles += 1;
            tracing::trace!("Idle cycle");
            return None;
        };

        self.stats.records += 1;
        tracing::debug!(
            name = %record.name,
            records = record.count(),
            timestamp = record.timestamp,
            "Encoded dirty subtree"
        );
        Some(record)
    }

    /// Run one full cycle: encode what changed and hand it to `sink`.
    ///
    /// Returns whether anything was sent.
    ///
    /// # Errors
    ///
    /// Returns error if the sink fails. The encoded changes are lost in that
    /// case; call [`on_connected`](Self::on_connected) after reconnecting.
    pub async fn run_cycle<S>(&mut self, sink: &mut S) -> Result<bool, DriverError>
    where
        S: Sink<PropertyRecord> + Unpin,
        S::Error: std::fmt::Display,
    {
        let Some(record) = self.tick() else {
            return Ok(false);
        };
        sink.send(record)
            .await
            .map_err(|e| DriverError::Send(e.to_string()))?;
        Ok(true)
    }
}

/// Consumer-side driver.
pub struct ConsumerDriver {
    tree: ReceiverTree,
    stats: DriverStats,
}

impl ConsumerDriver {
    /// Create a driver around a consumer tree.
    #[must_use]
    pub fn new(tree: ReceiverTree) -> Self {
        Self {
            tree,
            stats: DriverStats::default(),
        }
    }

    /// The consumer tree.
    #[must_use]
    pub fn tree(&self) -> &ReceiverTree {
        &self.tree
    }

    /// Take the consumer tree.
    #[must_use]
    pub fn into_tree(self) -> ReceiverTree {
        self.tree
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    /// Merge one delivered record.
    pub fn on_record(&mut self, record: &PropertyRecord) -> MergeReport {
        self.stats.cycles += 1;
        self.stats.records += 1;
        let report = self.tree.merge(record);
        for issue in &report.issues {
            self.stats.merge_issues += 1;
            tracing::warn!(path = %issue.path, error = %issue.error, "Failed to merge node");
        }
        report
    }

    /// Decode and merge a chunk holding exactly one unframed record.
    ///
    /// # Errors
    ///
    /// Returns error if the chunk does not decode; the tree is untouched.
    pub fn on_bytes(&mut self, bytes: &[u8]) -> Result<MergeReport, DriverError> {
        let record = decode_record(bytes)?;
        Ok(self.on_record(&record))
    }

    /// Merge every record delivered by `stream`, in order, until it ends.
    ///
    /// `observe` runs after each merge. Frames that arrive intact but hold an
    /// invalid record are skipped.
    ///
    /// # Errors
    ///
    /// Returns error if the transport fails.
    pub async fn run<St, F>(&mut self, mut stream: St, mut observe: F) -> Result<(), DriverError>
    where
        St: Stream<Item = Result<PropertyRecord, FramingError>> + Unpin,
        F: FnMut(&ReceiverTree, &MergeReport),
    {
        while let Some(item) = stream.next().await {
            match item {
                Ok(record) => {
                    let report = self.on_record(&record);
                    tracing::debug!(dump = %self.tree.dump(), "Tree after merge");
                    observe(&self.tree, &report);
                }
                Err(FramingError::Codec(err)) => {
                    self.stats.cycles += 1;
                    tracing::warn!(error = %err, "Skipping undecodable record");
                }
                Err(FramingError::Io(err)) => return Err(DriverError::Receive(err.to_string())),
            }
        }

        tracing::info!(
            records = self.stats.records,
            merge_issues = self.stats.merge_issues,
            "Producer stream ended"
        );
        Ok(())
    }
}

/// Errors surfaced by drivers.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The transport rejected an outgoing record
    #[error("send failed: {0}")]
    Send(String),
    /// The transport failed while receiving
    #[error("receive failed: {0}")]
    Receive(String),
    /// An unframed chunk did not decode
    #[error(transparent)]
    Decode(#[from] CodecError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::portfolio;
    use futures_util::stream;
    use proptree_core::{ManualClock, Scalar, ValueType};
    use proptree_proto::{encode_record, RecordCodec};
    use tokio_test::io::Builder;
    use tokio_util::codec::FramedRead;

    fn frame(record: &PropertyRecord) -> Vec<u8> {
        let payload = encode_record(record).unwrap();
        let mut bytes = u32::try_from(payload.len()).unwrap().to_be_bytes().to_vec();
        bytes.extend_from_slice(&payload);
        bytes
    }

    #[tokio::test]
    async fn producer_sends_only_on_change() {
        let mut driver = ProducerDriver::new(portfolio().unwrap(), ManualClock::new(1));
        let mut sent: Vec<PropertyRecord> = Vec::new();

        assert!(driver.run_cycle(&mut sent).await.unwrap());
        assert!(!driver.run_cycle(&mut sent).await.unwrap());

        driver
            .root_mut()
            .set_value_at("TICKER1/Price", 150.0_f32)
            .unwrap();
        assert!(driver.run_cycle(&mut sent).await.unwrap());

        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].count(), 9);
        assert_eq!(sent[1].count(), 3);
        assert_eq!(
            driver.stats(),
            DriverStats {
                cycles: 3,
                idle_cycles: 1,
                records: 2,
                merge_issues: 0,
            }
        );
    }

    #[test]
    fn reconnect_triggers_full_snapshot() {
        let mut driver = ProducerDriver::new(portfolio().unwrap(), ManualClock::new(1));
        let full = driver.tick().unwrap();
        assert!(driver.tick().is_none());

        driver.on_connected();

        assert_eq!(driver.tick(), Some(full));
    }

    #[tokio::test]
    async fn consumer_merges_in_delivery_order() {
        let first = PropertyRecord::scalar("Price", 1, &Scalar::from(1.0_f32));
        let second = PropertyRecord::scalar("Price", 0, &Scalar::from(2.0_f32));
        let items = vec![Ok(first), Ok(second)];

        let mut driver = ConsumerDriver::new(ReceiverTree::new(0));
        let mut seen = 0;
        driver
            .run(stream::iter(items), |_, report| {
                assert!(report.is_clean());
                seen += 1;
            })
            .await
            .unwrap();

        // Arrival order wins, not the embedded timestamp.
        let price = driver.tree().get("Price").unwrap();
        assert_eq!(price.as_scalar(), Some(&Scalar::Float(2.0)));
        assert_eq!(price.timestamp(), 0);
        assert_eq!(seen, 2);
    }

    #[tokio::test]
    async fn consumer_reads_length_prefixed_socket_bytes() {
        let mut producer = ProducerDriver::new(portfolio().unwrap(), ManualClock::new(1));
        let snapshot = producer.tick().unwrap();
        producer
            .root_mut()
            .set_value_at("TICKER2/Currency", "CHF")
            .unwrap();
        let delta = producer.tick().unwrap();

        let mut wire = frame(&snapshot);
        wire.extend(frame(&delta));
        let (head, tail) = wire.split_at(7);
        let reader = Builder::new().read(head).read(tail).build();

        let mut driver = ConsumerDriver::new(ReceiverTree::new(0));
        driver
            .run(FramedRead::new(reader, RecordCodec::new()), |_, _| {})
            .await
            .unwrap();

        assert_eq!(driver.stats().records, 2);
        assert_eq!(driver.tree().dump(), producer.root().describe());
    }

    #[tokio::test]
    async fn consumer_skips_bad_frames_and_stops_on_io_error() {
        let items = vec![
            Err(FramingError::Codec(CodecError::Deserialize("bad".to_string()))),
            Ok(PropertyRecord::scalar("Volume", 1, &Scalar::from(5))),
            Err(FramingError::Io(std::io::Error::other("reset"))),
            Ok(PropertyRecord::scalar("Late", 2, &Scalar::from(true))),
        ];

        let mut driver = ConsumerDriver::new(ReceiverTree::new(0));
        let result = driver.run(stream::iter(items), |_, _| {}).await;

        assert!(matches!(result, Err(DriverError::Receive(_))));
        assert!(driver.tree().get("Volume").is_some());
        assert!(driver.tree().get("Late").is_none());
    }

    #[test]
    fn unframed_chunk_is_one_record() {
        let mut driver = ConsumerDriver::new(ReceiverTree::new(0));
        let bytes = encode_record(&PropertyRecord::subtree(
            "TICKER1",
            3,
            vec![PropertyRecord::scalar("Currency", 3, &Scalar::from("USD"))],
        ))
        .unwrap();

        let report = driver.on_bytes(&bytes).unwrap();
        assert_eq!(report.created, 2);

        assert!(driver.on_bytes(&bytes[..bytes.len() - 1]).is_err());
        assert_eq!(driver.tree().root().len(), 1);
    }

    #[test]
    fn chunk_with_two_records_is_rejected() {
        let mut driver = ConsumerDriver::new(ReceiverTree::new(0));
        let mut chunk =
            encode_record(&PropertyRecord::scalar("Volume", 1, &Scalar::from(5))).unwrap();
        chunk.extend(encode_record(&PropertyRecord::scalar("Price", 2, &Scalar::from(1.5_f32))).unwrap());

        assert!(matches!(
            driver.on_bytes(&chunk),
            Err(DriverError::Decode(CodecError::Deserialize(_)))
        ));
        assert!(driver.tree().root().is_empty());
    }

    #[test]
    fn merge_issues_are_counted() {
        let mut driver = ConsumerDriver::new(ReceiverTree::new(0));
        driver.on_record(&PropertyRecord::scalar("Volume", 1, &Scalar::from(5)));

        let conflicting = PropertyRecord::subtree("Volume", 2, Vec::new());
        let report = driver.on_record(&conflicting);

        assert_eq!(report.issues.len(), 1);
        assert_eq!(driver.stats().merge_issues, 1);
        assert_eq!(
            driver.tree().get("Volume").unwrap().value_type(),
            ValueType::Int
        );
    }
}
