//! Agent runtime orchestration.

use crate::config::{AgentConfig, Mode};
use crate::driver::{ConsumerDriver, ProducerDriver};
use crate::transport::{self, RecordListener, Session, TransportError};
use crate::workload;
use anyhow::{Context, Result};
use futures_util::{stream, Stream, StreamExt};
use proptree_core::{Clock, PropertyRecord, ReceiverTree, SystemClock};
use proptree_proto::FramingError;
use std::time::Duration;
use tracing::Instrument;

/// The agent process.
pub struct Agent {
    config: AgentConfig,
}

impl Agent {
    /// Create an agent.
    #[must_use]
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Run until the work is done or Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns error if setup or the transport fails.
    pub async fn run(self) -> Result<()> {
        tokio::select! {
            result = self.run_mode() => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
        }
    }

    async fn run_mode(&self) -> Result<()> {
        match self.config.mode {
            Mode::Send => self.run_producer().await,
            Mode::Receive => self.run_consumer().await,
        }
    }

    async fn run_producer(&self) -> Result<()> {
        let root = match &self.config.tree_json {
            Some(json) => workload::parse_tree(json)?,
            None => workload::portfolio()?,
        };
        println!("{}", root.describe());

        let mut stream = transport::connect(&self.config.endpoint, self.config.max_frame)
            .await
            .context("Failed to connect to consumer")?;

        let mut driver = ProducerDriver::new(root, SystemClock);
        driver.on_connected();

        let mut interval = tokio::time::interval(self.config.interval);
        let mut cycle = 0_u64;
        loop {
            interval.tick().await;
            if cycle > 0 && !workload::bump(driver.root_mut(), &self.config.update_path)? {
                tracing::warn!(path = %self.config.update_path, "No leaf to update");
            }

            driver
                .run_cycle(&mut stream)
                .await
                .context("Failed to send record")?;

            cycle += 1;
            if self.config.cycles.is_some_and(|limit| cycle >= limit) {
                break;
            }
        }

        let stats = driver.stats();
        tracing::info!(
            cycles = stats.cycles,
            records = stats.records,
            idle_cycles = stats.idle_cycles,
            "Producer finished"
        );
        Ok(())
    }

    async fn run_consumer(&self) -> Result<()> {
        let listener = RecordListener::bind(&self.config.endpoint, self.config.max_frame)
            .await
            .context("Failed to bind listener")?;

        let incoming = stream::unfold(&listener, |listener| async move {
            Some((listener.accept().await, listener))
        });
        let incoming = std::pin::pin!(incoming);
        serve_sessions(incoming, |_, tree| println!("{}", tree.dump())).await;
        Ok(())
    }
}

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Serve producer sessions one after another until `incoming` ends.
///
/// Every session starts from a fresh [`ReceiverTree`] and `observe` runs
/// after each merge. A failed accept or a session that ends with a transport
/// error is logged and the loop moves on. Returns the number of sessions
/// served.
pub async fn serve_sessions<I, S, F>(mut incoming: I, mut observe: F) -> u64
where
    I: Stream<Item = Result<(Session, S), TransportError>> + Unpin,
    S: Stream<Item = Result<PropertyRecord, FramingError>> + Unpin,
    F: FnMut(&Session, &ReceiverTree),
{
    let mut served = 0;
    while let Some(accepted) = incoming.next().await {
        let (session, stream) = match accepted {
            Ok(accepted) => accepted,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to accept producer");
                tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                continue;
            }
        };
        let span = tracing::info_span!("session", session_id = %session.id, peer = %session.peer);

        let mut driver = ConsumerDriver::new(ReceiverTree::new(SystemClock.now()));
        let result = driver
            .run(stream, |tree, _| observe(&session, tree))
            .instrument(span)
            .await;

        if let Err(err) = result {
            tracing::warn!(session_id = %session.id, error = %err, "Session ended with error");
        }
        served += 1;
    }
    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptree_core::Scalar;
    use uuid::Uuid;

    fn session(port: u16) -> Session {
        Session {
            id: Uuid::new_v4(),
            peer: ([127, 0, 0, 1], port).into(),
        }
    }

    #[tokio::test]
    async fn failed_accept_keeps_serving() {
        let records: Vec<Result<PropertyRecord, FramingError>> =
            vec![Ok(PropertyRecord::scalar("Volume", 1, &Scalar::from(5)))];
        let incoming = stream::iter(vec![
            Err(TransportError::Io(std::io::Error::other("too many open files"))),
            Ok((session(4000), stream::iter(records))),
        ]);

        let mut dumps = Vec::new();
        let served = serve_sessions(incoming, |_, tree| dumps.push(tree.dump())).await;

        assert_eq!(served, 1);
        assert_eq!(dumps, ["{\n  \"Volume\": 5\n}"]);
    }

    #[tokio::test]
    async fn broken_session_does_not_stop_the_next_one() {
        let first: Vec<Result<PropertyRecord, FramingError>> = vec![
            Ok(PropertyRecord::scalar("Volume", 1, &Scalar::from(5))),
            Err(FramingError::Io(std::io::Error::other("reset"))),
        ];
        let second: Vec<Result<PropertyRecord, FramingError>> =
            vec![Ok(PropertyRecord::scalar("Listed", 2, &Scalar::from(true)))];
        let incoming = stream::iter(vec![
            Ok((session(4001), stream::iter(first))),
            Ok((session(4002), stream::iter(second))),
        ]);

        let mut seen = Vec::new();
        let served = serve_sessions(incoming, |session, tree| {
            seen.push((session.peer.port(), tree.root().len()));
        })
        .await;

        assert_eq!(served, 2);
        assert_eq!(seen, [(4001, 1), (4002, 1)]);
    }
}
