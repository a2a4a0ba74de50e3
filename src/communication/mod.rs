//! TCP transport for RTU frames.
//!
//! One request/response cycle at a time: the connection sits behind an async
//! mutex that is held from the first byte written until the last byte of the
//! reply has been read. Replies are matched to requests by that ordering
//! alone, RTU frames carry no transaction id.

mod socket;

pub use socket::{ModbusConnector, ModbusSocket, TcpConnector};

use crate::codec::length;
use crate::common::{format_hex, DEFAULT_TIMEOUT, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
use crate::config::RtuOverTcpConfig;
use crate::error::{ModbusError, ModbusResult};

use std::io;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

pub struct RtuOverTcpTransport {
    address: String,
    timeout: Duration,
    connector: Box<dyn ModbusConnector>,
    comm: Mutex<Option<Box<dyn ModbusSocket>>>,
}

impl RtuOverTcpTransport {
    pub fn new(address: impl Into<String>) -> Self {
        Self::with_timeout(address, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(address: impl Into<String>, timeout: Duration) -> Self {
        Self::with_connector(address, timeout, TcpConnector)
    }

    pub fn with_connector(
        address: impl Into<String>,
        timeout: Duration,
        connector: impl ModbusConnector + 'static,
    ) -> Self {
        RtuOverTcpTransport {
            address: address.into(),
            timeout,
            connector: Box::new(connector),
            comm: Mutex::new(None),
        }
    }

    pub fn from_config(config: &RtuOverTcpConfig) -> ModbusResult<Self> {
        config.validate()?;
        Ok(Self::with_timeout(config.address.clone(), config.timeout))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn is_connected(&self) -> bool {
        self.comm.lock().await.is_some()
    }

    /// Dials the configured address unless a connection is already open.
    pub async fn connect(&self) -> ModbusResult<()> {
        let mut comm = self.comm.lock().await;
        if comm.is_none() {
            *comm = Some(self.dial().await?);
        }
        Ok(())
    }

    /// Closes the connection if there is one. The next `send` re-dials.
    pub async fn close(&self) -> ModbusResult<()> {
        let mut comm = self.comm.lock().await;
        if let Some(mut socket) = comm.take() {
            debug!(address = %self.address, "closing connection");
            if let Err(err) = socket.shutdown().await {
                debug!(address = %self.address, error = %err, "shutdown failed, dropping connection");
            }
        }
        Ok(())
    }

    /// Writes `request` and reads back exactly one reply frame, undecoded.
    ///
    /// Connects first when needed. Transport failures drop the connection
    /// so the following call starts on a fresh one; nothing is retried here.
    /// A reply whose length can't be worked out is returned as it arrived and
    /// the connection is dropped after it.
    pub async fn send(&self, request: &[u8]) -> ModbusResult<Vec<u8>> {
        let mut comm = self.comm.lock().await;

        let mut socket = match comm.take() {
            Some(socket) => socket,
            None => self.dial().await?,
        };

        debug!(address = %self.address, frame = %format_hex(request), "sending frame");

        let result = match timeout(self.timeout, exchange(&mut *socket, request)).await {
            Ok(result) => result,
            Err(_) => Err(ModbusError::Timeout(self.timeout)),
        };

        match result {
            Ok(Reply { frame, delimited }) => {
                debug!(address = %self.address, frame = %format_hex(&frame), "received frame");
                if delimited {
                    *comm = Some(socket);
                } else {
                    // the rest of an unmeasured reply may still be in flight
                    warn!(address = %self.address, "reply length unknown, dropping connection");
                }
                Ok(frame)
            }
            Err(err) => {
                warn!(address = %self.address, error = %err, "exchange failed, dropping connection");
                Err(err)
            }
        }
    }

    async fn dial(&self) -> ModbusResult<Box<dyn ModbusSocket>> {
        debug!(address = %self.address, "connecting");
        match timeout(self.timeout, self.connector.connect(&self.address)).await {
            Ok(Ok(socket)) => {
                debug!(address = %self.address, "connected");
                Ok(socket)
            }
            Ok(Err(source)) => Err(ModbusError::Connection {
                address: self.address.clone(),
                source,
            }),
            Err(_) => Err(ModbusError::Connection {
                address: self.address.clone(),
                source: io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("no connection within {:?}", self.timeout),
                ),
            }),
        }
    }
}

struct Reply {
    frame: Vec<u8>,
    /// False when the length wasn't known and the frame is whatever had arrived.
    delimited: bool,
}

/// Write, then read until the reply length implied by the request is reached.
///
/// Only transport errors come out of here, the frame itself is checked by the codec.
async fn exchange(socket: &mut dyn ModbusSocket, request: &[u8]) -> ModbusResult<Reply> {
    socket.write(request).await.map_err(ModbusError::Write)?;

    let mut response = Vec::with_capacity(MAX_FRAME_SIZE);

    // whatever arrives, up to a full frame, until the minimum is there
    while response.len() < MIN_FRAME_SIZE {
        read_chunk(socket, &mut response, MAX_FRAME_SIZE).await?;
    }

    let (expected, delimited) = match length::response_length(request, &response) {
        Some(expected) => (expected, true),
        None => {
            debug!(
                function = request.get(1).copied().unwrap_or_default(),
                received = response.len(),
                "no known reply layout, taking what has arrived"
            );
            (response.len(), false)
        }
    };

    if expected > MAX_FRAME_SIZE {
        return Err(ModbusError::Read(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "reply announces {} bytes, frames are at most {}",
                expected, MAX_FRAME_SIZE
            ),
        )));
    }

    while response.len() < expected {
        read_chunk(socket, &mut response, expected).await?;
    }

    if response.len() > expected {
        warn!(
            expected,
            received = response.len(),
            "discarding bytes past the end of the reply"
        );
        response.truncate(expected);
    }

    Ok(Reply {
        frame: response,
        delimited,
    })
}

/// One read, never growing `response` past `limit` bytes.
async fn read_chunk(
    socket: &mut dyn ModbusSocket,
    response: &mut Vec<u8>,
    limit: usize,
) -> ModbusResult<()> {
    let mut buffer = [0u8; MAX_FRAME_SIZE];
    let wanted = limit.saturating_sub(response.len()).min(MAX_FRAME_SIZE);

    let read = socket
        .read(&mut buffer[..wanted])
        .await
        .map_err(ModbusError::Read)?;

    if read == 0 {
        return Err(ModbusError::Read(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("connection closed after {} bytes of the reply", response.len()),
        )));
    }

    response.extend_from_slice(&buffer[..read]);
    Ok(())
}
