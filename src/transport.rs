//! The connector's UDP endpoint and its read loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, warn};

use crate::config::ConnectorConfig;
use crate::dispatch::{Dispatcher, Response};
use crate::errors::Error;
use crate::history::{MessageHistory, Traffic};
use crate::message::Message;
use crate::runtime::{AsyncUdpSocket, Mutex, UdpSocket};

type Result<T> = std::result::Result<T, Error>;

/// One bound UDP socket with broadcast enabled.
pub(crate) struct Transport {
    socket: UdpSocket,
    broadcast_addr: SocketAddr,
    read_buffer_size: usize,
}

impl Transport {
    pub async fn bind(config: &ConnectorConfig) -> Result<Self> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .map_err(|e| Error::socket("bind", e))?;

        socket
            .set_broadcast(true)
            .map_err(|e| Error::socket("set_broadcast", e))?;

        Ok(Transport {
            socket,
            broadcast_addr: config.broadcast_addr,
            read_buffer_size: config.read_buffer_size,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.socket
            .local_addr()
            .map_err(|e| Error::socket("local_addr", e))
    }

    /// Send one datagram to `addr`, or to the broadcast address if `None`.
    pub async fn send_datagram(&self, addr: Option<SocketAddr>, buf: &[u8]) -> Result<()> {
        let addr = addr.unwrap_or(self.broadcast_addr);
        self.socket
            .send_to(buf, addr)
            .await
            .map_err(|e| Error::socket("send_to", e))?;
        Ok(())
    }

    /// Receive until the socket fails, handing every decoded device reply to
    /// `dispatcher`.
    ///
    /// Undecodable datagrams and client-to-device types are dropped. A receive
    /// error stops the loop and is delivered to every pending wait, except a
    /// connection reset, which only reports an earlier datagram that went
    /// unanswered.
    pub async fn read_loop(
        self: Arc<Self>,
        dispatcher: Arc<Dispatcher>,
        history: Arc<Mutex<MessageHistory>>,
    ) {
        let mut buffer = vec![0u8; self.read_buffer_size];

        loop {
            let (size, addr) = match self.socket.recv_from(&mut buffer).await {
                Ok(received) => received,
                Err(e) if is_transient(&e) => {
                    debug!("Ignoring receive error: {}", e);
                    continue;
                }
                Err(e) => {
                    let err = Error::socket("receive", e);
                    error!("Read loop stopped: {}", err);
                    history.lock().await.record_error(&err.to_string());
                    dispatcher.fail_all(err);
                    return;
                }
            };

            let message = match Message::decode(&buffer[..size]) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Dropping datagram from {}: {}", addr, e);
                    continue;
                }
            };

            if !message.kind().is_receivable() {
                debug!("Ignoring {} from {}", message.kind(), addr);
                continue;
            }

            history
                .lock()
                .await
                .record(Traffic::Receive, &message, Some(addr));

            let response = Response { message, addr };
            let matched = dispatcher.dispatch(&response);
            if matched == 0 {
                debug!(
                    "No waiter for {} from {} (source {:#x})",
                    response.message.kind(),
                    addr,
                    response.message.header.source
                );
            }
        }
    }
}

/// Errors that concern one earlier datagram rather than the socket.
///
/// Windows reports an ICMP port unreachable as `ConnectionReset` on the next
/// receive.
fn is_transient(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ConnectionReset
}
