//! TCP transport for framed property records.
//!
//! Each connection carries a stream of length-prefixed records in one
//! direction, producer to consumer.

use proptree_proto::RecordCodec;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use url::Url;
use uuid::Uuid;

/// Default port when an endpoint omits one.
pub const DEFAULT_PORT: u16 = 7878;

/// A TCP connection speaking length-prefixed records.
pub type RecordStream = Framed<TcpStream, RecordCodec>;

/// Connect to a consumer.
///
/// # Errors
///
/// Returns error if the endpoint is invalid or the connection fails.
pub async fn connect(endpoint: &str, max_frame: usize) -> Result<RecordStream, TransportError> {
    let (host, port) = parse_endpoint(endpoint)?;
    let stream = TcpStream::connect((host.as_str(), port)).await?;
    stream.set_nodelay(true)?;

    tracing::info!(%host, port, "Connected to consumer");
    Ok(Framed::new(stream, RecordCodec::with_max_frame(max_frame)))
}

/// Identity of one accepted producer connection.
#[derive(Debug, Clone, Copy)]
pub struct Session {
    /// Unique session identifier
    pub id: Uuid,
    /// Remote address
    pub peer: SocketAddr,
}

/// Accepts producer connections.
pub struct RecordListener {
    listener: TcpListener,
    max_frame: usize,
}

impl RecordListener {
    /// Bind to a listen endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is invalid or binding fails.
    pub async fn bind(endpoint: &str, max_frame: usize) -> Result<Self, TransportError> {
        let (host, port) = parse_endpoint(endpoint)?;
        let listener = TcpListener::bind((host.as_str(), port)).await?;

        tracing::info!(addr = %listener.local_addr()?, "Listening for producers");
        Ok(Self {
            listener,
            max_frame,
        })
    }

    /// Address actually bound (useful with port 0).
    ///
    /// # Errors
    ///
    /// Returns error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        Ok(self.listener.local_addr()?)
    }

    /// Wait for the next producer.
    ///
    /// # Errors
    ///
    /// Returns error if accepting fails.
    pub async fn accept(&self) -> Result<(Session, RecordStream), TransportError> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;

        let session = Session {
            id: Uuid::new_v4(),
            peer,
        };
        tracing::info!(session_id = %session.id, %peer, "Producer connected");
        Ok((
            session,
            Framed::new(stream, RecordCodec::with_max_frame(self.max_frame)),
        ))
    }
}

/// Parse an endpoint into host and port.
///
/// Accepts `tcp://host:port`, `host:port`, or a bare `host`.
///
/// # Errors
///
/// Returns error if the endpoint cannot be parsed.
pub fn parse_endpoint(input: &str) -> Result<(String, u16), TransportError> {
    if input.contains("://") {
        let url = Url::parse(input)
            .map_err(|e| TransportError::InvalidEndpoint(format!("{input}: {e}")))?;

        if url.scheme() != "tcp" {
            return Err(TransportError::InvalidEndpoint(format!(
                "{input}: unsupported scheme '{}'",
                url.scheme()
            )));
        }

        let host = url
            .host_str()
            .ok_or_else(|| TransportError::InvalidEndpoint(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        return Ok((host.trim_matches(['[', ']']).to_string(), port));
    }

    let (host, port) = match input.rsplit_once(':') {
        None => (input, DEFAULT_PORT),
        Some((host, port)) => {
            let port = port.parse().map_err(|_| {
                TransportError::InvalidEndpoint(format!("{input}: invalid port '{port}'"))
            })?;
            (host, port)
        }
    };
    if host.is_empty() {
        return Err(TransportError::InvalidEndpoint(format!(
            "{input}: missing host"
        )));
    }
    if host.contains(':') {
        return Err(TransportError::InvalidEndpoint(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Endpoint string could not be parsed
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Socket I/O failed
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_forms() {
        assert_eq!(
            parse_endpoint("tcp://localhost:9000").unwrap(),
            ("localhost".to_string(), 9000)
        );
        assert_eq!(
            parse_endpoint("tcp://10.0.0.1").unwrap(),
            ("10.0.0.1".to_string(), DEFAULT_PORT)
        );
        assert_eq!(
            parse_endpoint("127.0.0.1:1234").unwrap(),
            ("127.0.0.1".to_string(), 1234)
        );
        assert_eq!(
            parse_endpoint("receiver").unwrap(),
            ("receiver".to_string(), DEFAULT_PORT)
        );
    }

    #[test]
    fn invalid_endpoints() {
        assert!(parse_endpoint("udp://localhost:1").is_err());
        assert!(parse_endpoint(":80").is_err());
        assert!(parse_endpoint("host:port").is_err());
        assert!(parse_endpoint("a:b:1").is_err());
    }
}
