//! Runtime-agnostic async abstractions.
//!
//! The connector needs four things from an async runtime: a UDP socket, a way
//! to start its read loop in the background, timers and an async mutex. Each
//! supported runtime provides them in its own module, selected at compile time.
//!
//! # Feature Flags
//!
//! Enable exactly one of the following features to select your runtime:
//!
//! - `runtime-tokio` (default) - Use the tokio runtime
//! - `runtime-async-std` - Use the async-std runtime
//! - `runtime-smol` - Use the smol runtime
//!
//! # Example
//!
//! ```toml
//! [dependencies]
//! # Using async-std
//! lifx-lan-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//!
//! # Using smol
//! lifx-lan-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

#[cfg(feature = "runtime-tokio")]
mod tokio_impl;

#[cfg(feature = "runtime-async-std")]
mod async_std_impl;

#[cfg(feature = "runtime-smol")]
mod smol_impl;

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::{UdpSocket, spawn_detached};

#[cfg(feature = "runtime-async-std")]
pub use async_std_impl::{UdpSocket, spawn_detached};

#[cfg(feature = "runtime-smol")]
pub use smol_impl::{UdpSocket, spawn_detached};

#[cfg(feature = "runtime-tokio")]
use tokio_impl::timeout_impl;

#[cfg(feature = "runtime-async-std")]
use async_std_impl::timeout_impl;

#[cfg(feature = "runtime-smol")]
use smol_impl::timeout_impl;

/// A UDP socket shared by a connector's read loop and all of its senders.
///
/// Every operation takes `&self`, so one socket can be read and written from
/// different tasks at once.
pub trait AsyncUdpSocket: Send + Sync + Sized {
    /// Bind to `addr`.
    fn bind(addr: SocketAddr) -> impl Future<Output = io::Result<Self>> + Send;

    /// Send one datagram to `addr`.
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> impl Future<Output = io::Result<usize>> + Send;

    /// Receive one datagram and the address it came from.
    fn recv_from(
        &self,
        buf: &mut [u8],
    ) -> impl Future<Output = io::Result<(usize, SocketAddr)>> + Send;

    /// Allow sending to broadcast addresses.
    fn set_broadcast(&self, broadcast: bool) -> io::Result<()>;

    fn local_addr(&self) -> io::Result<SocketAddr>;
}

/// Run a future with a timeout.
///
/// Returns `Err(TimedOut)` if the timeout expires before the future completes.
/// The future is dropped in that case.
pub async fn timeout<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    timeout_impl(duration, future).await
}

/// Error returned when a timeout expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl std::fmt::Display for TimedOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "operation timed out")
    }
}

impl std::error::Error for TimedOut {}

/// Monotonic clock reading used for deadlines.
#[derive(Debug, Clone, Copy)]
pub struct Instant(std::time::Instant);

impl Instant {
    pub fn now() -> Self {
        Instant(std::time::Instant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }

    /// Time left until `self + budget`, saturating at zero.
    pub fn remaining(&self, budget: Duration) -> Duration {
        budget.saturating_sub(self.elapsed())
    }
}

// Async mutex re-export
#[cfg(feature = "runtime-tokio")]
pub use tokio::sync::Mutex;

#[cfg(feature = "runtime-async-std")]
pub use async_std::sync::Mutex;

#[cfg(feature = "runtime-smol")]
pub use async_lock::Mutex;

// Compile-time check to ensure exactly one runtime is selected
#[cfg(not(any(
    feature = "runtime-tokio",
    feature = "runtime-async-std",
    feature = "runtime-smol"
)))]
compile_error!(
    "One of \"runtime-tokio\", \"runtime-async-std\", or \"runtime-smol\" features must be enabled"
);

#[cfg(all(feature = "runtime-tokio", feature = "runtime-async-std"))]
compile_error!("Features \"runtime-tokio\" and \"runtime-async-std\" are mutually exclusive");

#[cfg(all(feature = "runtime-tokio", feature = "runtime-smol"))]
compile_error!("Features \"runtime-tokio\" and \"runtime-smol\" are mutually exclusive");

#[cfg(all(feature = "runtime-async-std", feature = "runtime-smol"))]
compile_error!("Features \"runtime-async-std\" and \"runtime-smol\" are mutually exclusive");

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_timeout_expires() {
        let result = timeout(Duration::from_millis(10), std::future::pending::<()>()).await;
        assert_eq!(result, Err(TimedOut));
    }

    #[tokio::test]
    async fn test_socket_round_trip() {
        let a = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let b = UdpSocket::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        a.send_to(b"ping", b.local_addr().unwrap()).await.unwrap();

        let mut buf = [0u8; 8];
        let (size, from) = b.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..size], b"ping");
        assert_eq!(from, a.local_addr().unwrap());
    }

    #[test]
    fn test_remaining_saturates() {
        let start = Instant::now();
        assert_eq!(start.remaining(Duration::ZERO), Duration::ZERO);
        assert!(start.remaining(Duration::from_secs(60)) > Duration::from_secs(59));
    }
}
