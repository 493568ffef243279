//! UDP transport to the charging station
//!
//! The station listens and answers on the same UDP port. A single socket is
//! bound to the configured local port; a receiver task forwards every inbound
//! datagram as text to the driver.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{HeliosError, Result};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};

/// Largest datagram the station sends (report 100+ responses stay below this)
pub const MAX_DATAGRAM_LEN: usize = 4096;

/// Pause before receiving again after a socket error
pub const RECEIVE_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Outbound side of the station link
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, host: &str, port: u16, payload: &[u8]) -> Result<()>;
}

/// Inbound side of the station link
#[async_trait::async_trait]
trait DatagramSource: Send + Sync + 'static {
    async fn recv_datagram(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)>;
}

#[async_trait::async_trait]
impl DatagramSource for UdpSocket {
    async fn recv_datagram(&self, buf: &mut [u8]) -> std::io::Result<(usize, SocketAddr)> {
        self.recv_from(buf).await
    }
}

fn listener_logger(listen_port: u16) -> StructuredLogger {
    get_logger_with_context(
        LogContext::new("transport").with_field("listen_port", listen_port.to_string()),
    )
}

fn forward_datagrams<S: DatagramSource>(
    source: Arc<S>,
    tx: mpsc::UnboundedSender<String>,
    logger: StructuredLogger,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            match source.recv_datagram(&mut buf).await {
                Ok((len, peer)) => {
                    let text = String::from_utf8_lossy(&buf[..len]).into_owned();
                    logger.trace(&format!("Received from {}: {}", peer, text.trim_end()));
                    if tx.send(text).is_err() {
                        logger.debug("Inbound channel closed, stopping receiver");
                        break;
                    }
                }
                Err(e) => {
                    logger.warn(&format!(
                        "UDP receive failed: {}; retrying in {:?}",
                        e, RECEIVE_RETRY_DELAY
                    ));
                    tokio::time::sleep(RECEIVE_RETRY_DELAY).await;
                }
            }
        }
    })
}

/// Resolve a host/port pair to the first socket address
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let mut addrs = tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| HeliosError::host_resolution(host.to_string(), e.to_string()))?;
    addrs.next().ok_or_else(|| {
        HeliosError::host_resolution(host.to_string(), "no address returned".to_string())
    })
}

/// Tokio UDP socket shared by the send worker and the receiver task
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    logger: StructuredLogger,
}

impl UdpTransport {
    /// Bind the local listen port on all interfaces
    pub async fn bind(listen_port: u16) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", listen_port))
            .await
            .map_err(|e| {
                HeliosError::transport(format!("Failed to bind UDP port {}: {}", listen_port, e))
            })?;
        let logger = listener_logger(listen_port);
        logger.info(&format!(
            "Listening for station datagrams on {}",
            socket
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| listen_port.to_string())
        ));
        Ok(Self {
            socket: Arc::new(socket),
            logger,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Forward inbound datagrams to `tx` until the receiver side is dropped
    pub fn spawn_receiver(&self, tx: mpsc::UnboundedSender<String>) -> JoinHandle<()> {
        forward_datagrams(Arc::clone(&self.socket), tx, self.logger.clone())
    }
}

#[async_trait::async_trait]
impl Transport for UdpTransport {
    async fn send(&self, host: &str, port: u16, payload: &[u8]) -> Result<()> {
        let addr = resolve(host, port).await?;
        self.socket
            .send_to(payload, addr)
            .await
            .map_err(|e| HeliosError::transport(format!("Send to {} failed: {}", addr, e)))?;
        self.logger.debug(&format!(
            "Sent to {}: {}",
            addr,
            String::from_utf8_lossy(payload)
        ));
        Ok(())
    }
}
