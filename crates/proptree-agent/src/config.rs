//! Agent configuration.

use anyhow::{bail, Context, Result};
use proptree_proto::DEFAULT_MAX_FRAME;
use std::time::Duration;

/// Which side of the sync this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Producer: owns a tree and streams its changes
    Send,
    /// Consumer: accepts producers and mirrors their trees
    Receive,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "send" | "sender" => Ok(Mode::Send),
            "receive" | "receiver" => Ok(Mode::Receive),
            other => bail!("unknown mode '{other}' (expected 'send' or 'receive')"),
        }
    }
}

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Producer or consumer
    pub mode: Mode,

    /// `tcp://host:port` or `host:port`; connect target or listen address
    pub endpoint: String,

    /// Delay between producer cycles
    pub interval: Duration,

    /// Stop the producer after this many cycles (runs until Ctrl+C if unset)
    pub cycles: Option<u64>,

    /// Largest accepted frame payload in bytes
    pub max_frame: usize,

    /// Producer tree as a JSON object; the portfolio workload if unset
    pub tree_json: Option<String>,

    /// Path of the leaf the producer bumps every cycle, relative to the root
    pub update_path: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            mode: Mode::Receive,
            endpoint: "tcp://127.0.0.1:7878".to_string(),
            interval: Duration::from_secs(1),
            cycles: None,
            max_frame: DEFAULT_MAX_FRAME,
            tree_json: None,
            update_path: "TICKER1/Price".to_string(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PROPTREE_MODE`: "send" or "receive"
    /// - `PROPTREE_ENDPOINT`: `tcp://host:port` or `host:port`
    /// - `PROPTREE_INTERVAL_MS`: Producer cycle interval in milliseconds
    /// - `PROPTREE_CYCLES`: Number of producer cycles before exiting
    /// - `PROPTREE_MAX_FRAME`: Maximum frame payload in bytes
    /// - `PROPTREE_TREE`: Producer tree as JSON
    /// - `PROPTREE_UPDATE_PATH`: Leaf bumped on every producer cycle
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(mode) = std::env::var("PROPTREE_MODE") {
            config.mode = mode.parse().context("Invalid PROPTREE_MODE")?;
        }

        if let Ok(endpoint) = std::env::var("PROPTREE_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(ms) = std::env::var("PROPTREE_INTERVAL_MS") {
            let ms: u64 = ms.parse().context("Invalid PROPTREE_INTERVAL_MS")?;
            config.interval = Duration::from_millis(ms);
        }

        if let Ok(cycles) = std::env::var("PROPTREE_CYCLES") {
            config.cycles = Some(cycles.parse().context("Invalid PROPTREE_CYCLES")?);
        }

        if let Ok(max) = std::env::var("PROPTREE_MAX_FRAME") {
            config.max_frame = max.parse().context("Invalid PROPTREE_MAX_FRAME")?;
        }

        if let Ok(tree) = std::env::var("PROPTREE_TREE") {
            config.tree_json = Some(tree);
        }

        if let Ok(path) = std::env::var("PROPTREE_UPDATE_PATH") {
            config.update_path = path;
        }

        Ok(config)
    }

    /// Apply positional arguments: `[mode] [endpoint]`.
    ///
    /// # Errors
    ///
    /// Returns error if the mode is unknown or there are extra arguments.
    pub fn apply_args<I>(mut self, args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        if let Some(mode) = args.next() {
            self.mode = mode.parse()?;
        }
        if let Some(endpoint) = args.next() {
            self.endpoint = endpoint;
        }
        if let Some(extra) = args.next() {
            bail!("unexpected argument '{extra}'");
        }
        Ok(self)
    }
}
