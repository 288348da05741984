//! Sending messages and correlating the replies.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use futures::future::{AbortHandle, Abortable};
use log::{debug, error};
use serde_json::{Value, json};

use crate::catalog::MessageType;
use crate::config::ConnectorConfig;
use crate::dispatch::{Dispatcher, Response, Subscription};
use crate::errors::{EncodeError, Error};
use crate::history::{MessageHistory, Traffic};
use crate::message::{Message, MessageBuilder};
use crate::registry::{Device, DeviceRegistry};
use crate::runtime::{self, Instant, Mutex};
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Extra condition a reply must meet, on top of token and device matching.
///
/// Filters run on the read loop while the pending waits are locked, so they
/// must not call back into the [`Connector`].
pub type Filter = Box<dyn Fn(&Response) -> bool + Send + Sync>;

/// Produces the correlation tokens stamped into the `source` header field.
///
/// Tokens only need to be unique among requests in flight at the same time.
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> u32;
}

/// Random nonzero tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokens;

impl TokenSource for RandomTokens {
    fn next_token(&self) -> u32 {
        fastrand::u32(1..)
    }
}

/// Consecutive tokens from a starting value, skipping zero.
///
/// # Examples
///
/// ```
/// use lifx_lan_rs::{SequentialTokens, TokenSource};
///
/// let tokens = SequentialTokens::new(u32::MAX);
/// assert_eq!(tokens.next_token(), u32::MAX);
/// assert_eq!(tokens.next_token(), 1);
/// ```
#[derive(Debug)]
pub struct SequentialTokens(AtomicU32);

impl SequentialTokens {
    pub fn new(start: u32) -> Self {
        SequentialTokens(AtomicU32::new(start))
    }
}

impl TokenSource for SequentialTokens {
    fn next_token(&self) -> u32 {
        loop {
            let token = self.0.fetch_add(1, Ordering::Relaxed);
            if token != 0 {
                return token;
            }
        }
    }
}

/// Replies collected from several devices, at most one per identity, in
/// arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSet {
    responses: Vec<Response>,
}

impl ResponseSet {
    /// Keep `response` unless its device already answered.
    pub(crate) fn insert(&mut self, response: Response) -> bool {
        if self.contains(response.identity()) {
            return false;
        }
        self.responses.push(response);
        true
    }

    pub fn contains(&self, identity: u64) -> bool {
        self.get(identity).is_some()
    }

    pub fn get(&self, identity: u64) -> Option<&Response> {
        self.responses.iter().find(|r| r.identity() == identity)
    }

    pub fn identities(&self) -> Vec<u64> {
        self.responses.iter().map(Response::identity).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Response> {
        self.responses.iter()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

impl IntoIterator for ResponseSet {
    type Item = Response;
    type IntoIter = std::vec::IntoIter<Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResponseSet {
    type Item = &'a Response;
    type IntoIter = std::slice::Iter<'a, Response>;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}

/// A LAN client bound to one UDP socket.
///
/// A background task reads the socket for as long as the connector lives and
/// routes every reply to the operations waiting for it, so any number of
/// requests can be in flight at once.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use lifx_lan_rs::{Connector, Payload};
///
/// # async fn run() -> Result<(), lifx_lan_rs::Error> {
/// let connector = Connector::connect().await?;
/// for device in connector.discover(Duration::from_secs(1), None).await? {
///     let msg = connector.builder().get_label();
///     let reply = connector.request(&device, msg, None, Duration::from_millis(500)).await?;
///     if let Payload::StateLabel(label) = reply.message.payload {
///         println!("{device}: {label}");
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct Connector {
    pub(crate) transport: Arc<Transport>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) registry: SyncMutex<DeviceRegistry>,
    pub(crate) history: Arc<Mutex<MessageHistory>>,
    tokens: Box<dyn TokenSource>,
    sequence: AtomicU8,
    abort: AbortHandle,
}

impl Connector {
    /// Bind with the default configuration on port 56700.
    pub async fn connect() -> Result<Self> {
        Self::with_config(ConnectorConfig::default()).await
    }

    pub async fn with_config(config: ConnectorConfig) -> Result<Self> {
        Self::with_tokens(config, RandomTokens).await
    }

    /// Bind with a custom correlation token source.
    pub async fn with_tokens(config: ConnectorConfig, tokens: impl TokenSource + 'static) -> Result<Self> {
        let transport = Arc::new(Transport::bind(&config).await?);
        let dispatcher = Arc::new(Dispatcher::new());
        let history = Arc::new(Mutex::new(MessageHistory::with_max_entries(config.history_size)));

        let (abort, registration) = AbortHandle::new_pair();
        let read_loop = Arc::clone(&transport).read_loop(Arc::clone(&dispatcher), Arc::clone(&history));
        runtime::spawn_detached(async move {
            if Abortable::new(read_loop, registration).await.is_err() {
                debug!("Read loop aborted");
            }
        });

        debug!("Connector listening on {:?}", transport.local_addr());

        Ok(Connector {
            transport,
            dispatcher,
            registry: SyncMutex::new(DeviceRegistry::new()),
            history,
            tokens: Box::new(tokens),
            sequence: AtomicU8::new(0),
            abort,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A message builder stamped with the next sequence number.
    pub fn builder(&self) -> MessageBuilder {
        MessageBuilder::new().sequence(self.sequence.fetch_add(1, Ordering::Relaxed))
    }

    /// A filter accepting only replies of type `kind`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::{Connector, MessageType};
    ///
    /// let filter = Connector::type_filter(MessageType::StatePower);
    /// # let _ = filter;
    /// ```
    pub fn type_filter(kind: MessageType) -> Filter {
        Box::new(move |r: &Response| r.message.kind() == kind)
    }

    pub(crate) fn next_token(&self) -> u32 {
        self.tokens.next_token()
    }

    /// Send `msg` to one device without waiting for a reply.
    pub async fn send_unicast(&self, device: &Device, msg: Message) -> Result<()> {
        self.send(msg, Some(device)).await
    }

    /// Send `msg` to each of `devices` without waiting for replies.
    ///
    /// Stops at the first device that cannot be sent to.
    pub async fn send_to(&self, devices: &[Device], msg: Message) -> Result<()> {
        for device in devices {
            self.send(msg.clone(), Some(device)).await?;
        }
        Ok(())
    }

    /// Send `msg` to every device on the network without waiting for replies.
    pub async fn send_broadcast(&self, msg: Message) -> Result<()> {
        self.send(msg, None).await
    }

    /// Send `msg` to `device` and wait for its reply.
    ///
    /// The first reply carrying this request's token, coming from `device` and
    /// accepted by `filter` is returned. Nothing else is retried or awaited.
    pub async fn request(
        &self,
        device: &Device,
        mut msg: Message,
        filter: Option<Filter>,
        timeout: Duration,
    ) -> Result<Response> {
        let token = self.next_token();
        msg.header.source = token;
        msg.header.res_required = true;

        let identity = device.identity;
        let mut wait = self.dispatcher.register(Box::new(move |r: &Response| {
            r.message.header.source == token
                && r.identity() == identity
                && filter.as_ref().is_none_or(|f| f(r))
        }))?;

        self.send(msg, Some(device)).await?;

        match runtime::timeout(timeout, wait.receiver().next()).await {
            Ok(Some(result)) => result,
            Ok(None) => Err(Error::Closed),
            Err(_) => {
                debug!("Request to {} timed out after {:?}", device, timeout);
                Err(Error::Timeout)
            }
        }
    }

    /// Send `msg` to each of `devices` and collect one reply per device.
    ///
    /// Returns when every device has answered or `timeout` expires; devices
    /// that stay silent are simply absent from the result.
    pub async fn request_all(
        &self,
        devices: &[Device],
        mut msg: Message,
        filter: Option<Filter>,
        timeout: Duration,
    ) -> Result<ResponseSet> {
        let token = self.next_token();
        msg.header.source = token;
        msg.header.res_required = true;

        let identities: HashSet<u64> = devices.iter().map(|d| d.identity).collect();
        let expected = identities.len();
        let mut wait = self.dispatcher.register(Box::new(move |r: &Response| {
            r.message.header.source == token
                && identities.contains(&r.identity())
                && filter.as_ref().is_none_or(|f| f(r))
        }))?;

        for device in devices {
            self.send(msg.clone(), Some(device)).await?;
        }

        collect(&mut wait, Some(expected), timeout).await
    }

    /// Broadcast `msg` once and collect one reply from every device that
    /// answers before `timeout`.
    pub async fn request_broadcast(
        &self,
        mut msg: Message,
        filter: Option<Filter>,
        timeout: Duration,
    ) -> Result<ResponseSet> {
        let token = self.next_token();
        msg.header.source = token;
        msg.header.res_required = true;

        let mut wait = self.dispatcher.register(Box::new(move |r: &Response| {
            r.message.header.source == token && filter.as_ref().is_none_or(|f| f(r))
        }))?;

        self.send(msg, None).await?;

        collect(&mut wait, None, timeout).await
    }

    /// Address, encode and send one message. `None` broadcasts.
    pub(crate) async fn send(&self, mut msg: Message, device: Option<&Device>) -> Result<()> {
        if self.dispatcher.closed().is_some() {
            return Err(Error::Closed);
        }

        let kind = msg.kind();
        if !kind.is_sendable() {
            return Err(EncodeError::NotSendable(kind).into());
        }
        match device {
            Some(device) if device.identity == 0 => return Err(EncodeError::ZeroTarget.into()),
            Some(device) => msg.set_unicast(device.identity),
            None if kind.is_broadcastable() => msg.set_broadcast(),
            None => return Err(EncodeError::NotBroadcastable(kind).into()),
        }

        let bytes = msg.encode()?;
        let addr = device.map(|d| d.addr);

        if let Err(err) = self.transport.send_datagram(addr, &bytes).await {
            error!("Failed to send {}: {}", kind, err);
            self.history.lock().await.record_error(&err.to_string());
            self.shutdown(err.clone());
            return Err(err);
        }

        debug!(
            "Sent {} to {} (source {:#x}, sequence {})",
            kind,
            addr.map_or_else(|| "broadcast".to_string(), |a| a.to_string()),
            msg.header.source,
            msg.header.sequence
        );
        self.history.lock().await.record(Traffic::Send, &msg, addr);
        Ok(())
    }

    fn registry(&self) -> MutexGuard<'_, DeviceRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every device registered so far.
    pub fn devices(&self) -> Vec<Device> {
        self.registry().devices()
    }

    pub fn find_device(&self, identity: u64) -> Result<Device> {
        self.registry().find(identity).copied()
    }

    /// Register a device known by other means. Returns `true` if it was new.
    pub fn add_device(&self, device: Device) -> bool {
        self.registry().add(device)
    }

    pub fn remove_device(&self, identity: u64) -> Result<Device> {
        self.registry().remove(identity)
    }

    pub async fn history(&self) -> MessageHistory {
        self.history.lock().await.clone()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// Returns diagnostics including socket state, devices and history.
    pub async fn diagnostics(&self) -> Value {
        let mut diag = json!({
            "local_addr": self.local_addr().ok().map(|a| a.to_string()),
            "closed": self.dispatcher.closed().map(|e| e.to_string()),
            "pending_waits": self.dispatcher.pending(),
            "devices": self.devices().iter().map(Device::to_string).collect::<Vec<_>>(),
        });

        let history = self.history.lock().await;
        diag["history"] = serde_json::to_value(history.summary()).unwrap_or(Value::Null);

        diag
    }

    /// Stop the read loop. Pending and later operations fail with
    /// [`Error::Closed`].
    pub fn close(&self) {
        self.shutdown(Error::Closed);
    }

    pub fn is_closed(&self) -> bool {
        self.dispatcher.closed().is_some()
    }

    fn shutdown(&self, err: Error) {
        self.abort.abort();
        self.dispatcher.fail_all(err);
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        self.shutdown(Error::Closed);
    }
}

/// Gather distinct-by-identity replies until `limit` is reached or `timeout`
/// expires.
async fn collect(
    wait: &mut Subscription,
    limit: Option<usize>,
    timeout: Duration,
) -> Result<ResponseSet> {
    let start = Instant::now();
    let mut responses = ResponseSet::default();

    while limit.is_none_or(|n| responses.len() < n) {
        let remaining = start.remaining(timeout);
        if remaining.is_zero() {
            break;
        }
        match runtime::timeout(remaining, wait.receiver().next()).await {
            Ok(Some(Ok(response))) => {
                if !responses.insert(response) {
                    debug!("Ignoring duplicate reply");
                }
            }
            Ok(Some(Err(err))) => return Err(err),
            Ok(None) | Err(_) => break,
        }
    }

    Ok(responses)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::payload::Payload;
    use crate::types::{Label, PowerLevel};
    use tokio::net::UdpSocket as TokioUdpSocket;

    /// A device simulated with a plain loopback socket.
    pub(crate) struct FakeDevice {
        pub socket: TokioUdpSocket,
        pub identity: u64,
    }

    impl FakeDevice {
        pub async fn new(identity: u64) -> Self {
            FakeDevice {
                socket: TokioUdpSocket::bind("127.0.0.1:0").await.unwrap(),
                identity,
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.socket.local_addr().unwrap()
        }

        pub fn device(&self) -> Device {
            Device::new(self.addr(), self.identity)
        }

        pub async fn recv(&self) -> (Message, SocketAddr) {
            let mut buf = [0u8; 256];
            let (size, from) = self.socket.recv_from(&mut buf).await.unwrap();
            (Message::decode(&buf[..size]).unwrap(), from)
        }

        pub async fn reply(&self, to: SocketAddr, source: u32, payload: Payload) {
            let mut msg = Message::new(payload);
            msg.header.source = source;
            msg.set_unicast(self.identity);
            self.socket.send_to(&msg.encode().unwrap(), to).await.unwrap();
        }
    }

    pub(crate) async fn connector(broadcast: SocketAddr, first_token: u32) -> Connector {
        let config = ConnectorConfig::default()
            .bind_addr("127.0.0.1:0".parse().unwrap())
            .broadcast_addr(broadcast);
        Connector::with_tokens(config, SequentialTokens::new(first_token))
            .await
            .unwrap()
    }

    #[test]
    fn test_sequential_tokens_skip_zero() {
        let tokens = SequentialTokens::new(u32::MAX - 1);
        let got: Vec<u32> = (0..4).map(|_| tokens.next_token()).collect();
        assert_eq!(got, vec![u32::MAX - 1, u32::MAX, 1, 2]);
    }

    #[test]
    fn test_random_tokens_nonzero() {
        for _ in 0..1000 {
            assert_ne!(RandomTokens.next_token(), 0);
        }
    }

    #[tokio::test]
    async fn test_send_unicast_addresses_device() {
        let fake = FakeDevice::new(0xd073_d500_0001).await;
        let connector = connector(fake.addr(), 1).await;

        let msg = connector.builder().set_power(PowerLevel::ENABLED);
        connector.send_unicast(&fake.device(), msg).await.unwrap();

        let (msg, from) = fake.recv().await;
        assert_eq!(from, connector.local_addr().unwrap());
        assert!(!msg.header.tagged);
        assert_eq!(msg.header.target, fake.identity);
        assert_eq!(msg.payload, Payload::SetPower(PowerLevel::ENABLED));
    }

    #[tokio::test]
    async fn test_send_broadcast_is_tagged() {
        let fake = FakeDevice::new(1).await;
        let connector = connector(fake.addr(), 1).await;

        let msg = connector.builder().target(0xd073_d500_0001).get_label();
        connector.send_broadcast(msg).await.unwrap();

        let (msg, _) = fake.recv().await;
        assert!(msg.header.tagged);
        assert_eq!(msg.header.target, 0);
        assert_eq!(msg.kind(), MessageType::GetLabel);
    }

    #[tokio::test]
    async fn test_send_rejects_wrong_direction() {
        let fake = FakeDevice::new(1).await;
        let connector = connector(fake.addr(), 1).await;

        let err = connector
            .send_broadcast(connector.builder().set_label("hall"))
            .await
            .unwrap_err();
        assert_eq!(err, Error::Encode(EncodeError::NotBroadcastable(MessageType::SetLabel)));

        let msg = Message::new(Payload::StatePower(PowerLevel::ENABLED));
        let err = connector.send_unicast(&fake.device(), msg).await.unwrap_err();
        assert_eq!(err, Error::Encode(EncodeError::NotSendable(MessageType::StatePower)));
    }

    #[tokio::test]
    async fn test_encode_error_sends_nothing() {
        let fake = FakeDevice::new(1).await;
        let connector = connector(fake.addr(), 1).await;

        let msg = connector.builder().set_label(&"x".repeat(33));
        let err = connector.send_unicast(&fake.device(), msg).await.unwrap_err();
        assert_eq!(err, Error::Encode(EncodeError::LabelTooLong(33)));
        assert!(connector.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_request_returns_matching_reply() {
        let fake = FakeDevice::new(0xd073_d500_0002).await;
        let connector = connector(fake.addr(), 500).await;

        let responder = async {
            let (msg, from) = fake.recv().await;
            assert_eq!(msg.header.source, 500);
            assert!(msg.header.res_required);
            // Wrong token first; must be ignored.
            fake.reply(from, 499, Payload::StateLabel(Label::new("other")))
                .await;
            fake.reply(from, 500, Payload::StateLabel(Label::new("kitchen")))
                .await;
        };

        let device = fake.device();
        let (response, ()) = tokio::join!(
            connector.request(
                &device,
                connector.builder().get_label(),
                None,
                Duration::from_secs(2)
            ),
            responder
        );

        let response = response.unwrap();
        assert_eq!(response.addr, fake.addr());
        assert_eq!(response.identity(), fake.identity);
        assert_eq!(response.message.payload, Payload::StateLabel(Label::new("kitchen")));
        assert_eq!(connector.dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn test_request_filter() {
        let fake = FakeDevice::new(7).await;
        let connector = connector(fake.addr(), 10).await;

        let responder = async {
            let (msg, from) = fake.recv().await;
            let token = msg.header.source;
            fake.reply(from, token, Payload::Acknowledgement).await;
            fake.reply(from, token, Payload::StatePower(PowerLevel::STANDBY))
                .await;
        };

        let filter = Connector::type_filter(MessageType::StatePower);
        let device = fake.device();
        let (response, ()) = tokio::join!(
            connector.request(
                &device,
                connector.builder().get_power(),
                Some(filter),
                Duration::from_secs(2)
            ),
            responder
        );
        assert_eq!(
            response.unwrap().message.payload,
            Payload::StatePower(PowerLevel::STANDBY)
        );
    }

    #[tokio::test]
    async fn test_request_times_out() {
        let fake = FakeDevice::new(7).await;
        let connector = connector(fake.addr(), 10).await;

        let timeout = Duration::from_millis(100);
        let start = std::time::Instant::now();
        let result = connector
            .request(&fake.device(), connector.builder().get_power(), None, timeout)
            .await;

        assert_eq!(result, Err(Error::Timeout));
        assert!(start.elapsed() >= timeout);
        assert_eq!(connector.dispatcher.pending(), 0);
    }

    #[tokio::test]
    async fn test_unknown_type_is_not_delivered() {
        let fake = FakeDevice::new(3).await;
        let connector = connector(fake.addr(), 42).await;

        let responder = async {
            let (_, from) = fake.recv().await;
            let mut bogus = Message::new(Payload::StatePower(PowerLevel::ENABLED));
            bogus.header.source = 42;
            bogus.set_unicast(fake.identity);
            let mut bytes = bogus.encode().unwrap();
            bytes[32] = 0xff;
            bytes[33] = 0x1f;
            fake.socket.send_to(&bytes, from).await.unwrap();
            fake.socket.send_to(&[0x01, 0x02, 0x03], from).await.unwrap();
            fake.reply(from, 42, Payload::StatePower(PowerLevel::STANDBY))
                .await;
        };

        let device = fake.device();
        let (response, ()) = tokio::join!(
            connector.request(
                &device,
                connector.builder().get_power(),
                None,
                Duration::from_secs(2)
            ),
            responder
        );
        assert_eq!(
            response.unwrap().message.payload,
            Payload::StatePower(PowerLevel::STANDBY)
        );
    }

    #[tokio::test]
    async fn test_request_all_returns_responders_only() {
        let first = FakeDevice::new(0xa1).await;
        let second = FakeDevice::new(0xa2).await;
        let connector = connector(first.addr(), 77).await;

        let responder = async {
            let (msg, from) = first.recv().await;
            // Two copies of the same answer count once.
            first.reply(from, msg.header.source, Payload::StatePower(PowerLevel::ENABLED))
                .await;
            first.reply(from, msg.header.source, Payload::StatePower(PowerLevel::ENABLED))
                .await;
            // The second device receives the request but stays silent.
            let (msg, _) = second.recv().await;
            assert_eq!(msg.header.source, 77);
            assert_eq!(msg.header.target, 0xa2);
        };

        let devices = [first.device(), second.device()];
        let timeout = Duration::from_millis(200);
        let start = std::time::Instant::now();
        let (responses, ()) = tokio::join!(
            connector.request_all(&devices, connector.builder().get_power(), None, timeout),
            responder
        );

        assert!(start.elapsed() < timeout + Duration::from_secs(1));
        let responses = responses.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses.identities(), vec![0xa1]);
        assert!(!responses.contains(0xa2));
    }

    #[tokio::test]
    async fn test_request_all_finishes_when_everyone_answered() {
        let first = FakeDevice::new(0xb1).await;
        let second = FakeDevice::new(0xb2).await;
        let connector = connector(first.addr(), 5).await;

        let responder = async {
            for fake in [&second, &first] {
                let (msg, from) = fake.recv().await;
                fake.reply(from, msg.header.source, Payload::StateLabel(Label::new("x")))
                    .await;
            }
        };

        let devices = [first.device(), second.device()];
        let start = std::time::Instant::now();
        let (responses, ()) = tokio::join!(
            connector.request_all(
                &devices,
                connector.builder().get_label(),
                None,
                Duration::from_secs(10)
            ),
            responder
        );

        assert!(start.elapsed() < Duration::from_secs(10));
        assert_eq!(responses.unwrap().identities(), vec![0xb2, 0xb1]);
    }

    #[tokio::test]
    async fn test_request_broadcast_collects() {
        let fake = FakeDevice::new(0xc1).await;
        let other = FakeDevice::new(0xc2).await;
        let connector = connector(fake.addr(), 900).await;

        let responder = async {
            let (msg, from) = fake.recv().await;
            assert!(msg.header.tagged);
            fake.reply(from, msg.header.source, Payload::StatePower(PowerLevel::ENABLED))
                .await;
            other
                .reply(from, msg.header.source, Payload::StatePower(PowerLevel::STANDBY))
                .await;
        };

        let (responses, ()) = tokio::join!(
            connector.request_broadcast(
                connector.builder().get_power(),
                None,
                Duration::from_millis(200)
            ),
            responder
        );

        let responses = responses.unwrap();
        assert_eq!(responses.identities(), vec![0xc1, 0xc2]);
        assert_eq!(responses.get(0xc2).unwrap().addr, other.addr());
    }

    #[tokio::test]
    async fn test_close_fails_later_operations() {
        let fake = FakeDevice::new(1).await;
        let connector = connector(fake.addr(), 1).await;

        connector.close();
        assert!(connector.is_closed());

        let result = connector
            .request(
                &fake.device(),
                connector.builder().get_power(),
                None,
                Duration::from_millis(50),
            )
            .await;
        assert_eq!(result, Err(Error::Closed));
        assert_eq!(
            connector.send_broadcast(connector.builder().get_power()).await,
            Err(Error::Closed)
        );
    }

    #[tokio::test]
    async fn test_builder_sequence_advances() {
        let fake = FakeDevice::new(1).await;
        let connector = connector(fake.addr(), 1).await;

        let first = connector.builder().get_power();
        let second = connector.builder().get_power();
        assert_eq!(second.header.sequence, first.header.sequence.wrapping_add(1));
    }

    #[tokio::test]
    async fn test_registry_operations() {
        let fake = FakeDevice::new(0xd1).await;
        let connector = connector(fake.addr(), 1).await;

        assert!(connector.add_device(fake.device()));
        assert_eq!(connector.find_device(0xd1).unwrap(), fake.device());
        assert_eq!(connector.devices().len(), 1);
        assert_eq!(connector.remove_device(0xd1).unwrap(), fake.device());
        assert_eq!(connector.find_device(0xd1), Err(Error::NotFound(0xd1)));
    }

    #[tokio::test]
    async fn test_diagnostics() {
        let fake = FakeDevice::new(0xd073_d500_0042).await;
        let connector = connector(fake.addr(), 1).await;
        connector.add_device(fake.device());
        connector
            .send_unicast(&fake.device(), connector.builder().get_power())
            .await
            .unwrap();

        let diag = connector.diagnostics().await;
        assert_eq!(
            diag["local_addr"],
            connector.local_addr().unwrap().to_string()
        );
        assert_eq!(diag["closed"], Value::Null);
        assert_eq!(diag["devices"].as_array().unwrap().len(), 1);
        assert_eq!(diag["history"]["send_count"], 1);
    }

    #[tokio::test]
    async fn test_send_to_every_device() {
        let first = FakeDevice::new(0xe1).await;
        let second = FakeDevice::new(0xe2).await;
        let connector = connector(first.addr(), 1).await;

        let devices = [first.device(), second.device()];
        connector
            .send_to(&devices, connector.builder().set_power(PowerLevel::STANDBY))
            .await
            .unwrap();

        for fake in [&first, &second] {
            let (msg, _) = fake.recv().await;
            assert!(!msg.header.tagged);
            assert_eq!(msg.header.target, fake.identity);
            assert_eq!(msg.payload, Payload::SetPower(PowerLevel::STANDBY));
        }
        assert_eq!(connector.history().await.summary().send_count, 2);
    }

    #[tokio::test]
    async fn test_unicast_to_identity_zero_is_rejected() {
        let fake = FakeDevice::new(0).await;
        let connector = connector(fake.addr(), 1).await;

        let err = connector
            .send_unicast(&fake.device(), connector.builder().get_power())
            .await
            .unwrap_err();
        assert_eq!(err, Error::Encode(EncodeError::ZeroTarget));
        assert!(connector.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_see_only_their_replies() {
        let shared = FakeDevice::new(0xf1).await;
        let other = FakeDevice::new(0xf2).await;
        let connector = connector(shared.addr(), 100).await;

        let responder = async {
            for _ in 0..2 {
                let (msg, from) = shared.recv().await;
                shared
                    .reply(from, msg.header.source, Payload::StatePower(PowerLevel::ENABLED))
                    .await;
            }
            let (msg, from) = other.recv().await;
            other
                .reply(from, msg.header.source, Payload::StatePower(PowerLevel::STANDBY))
                .await;
        };

        let only_shared = [shared.device()];
        let both = [shared.device(), other.device()];
        let timeout = Duration::from_secs(2);
        let start = std::time::Instant::now();
        let (first, second, ()) = tokio::join!(
            connector.request_all(&only_shared, connector.builder().get_power(), None, timeout),
            connector.request_all(&both, connector.builder().get_power(), None, timeout),
            responder
        );

        assert!(start.elapsed() < timeout);
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_eq!(first.identities(), vec![0xf1]);
        let mut identities = second.identities();
        identities.sort();
        assert_eq!(identities, vec![0xf1, 0xf2]);

        let first_source = first.iter().next().unwrap().message.header.source;
        assert!(first.iter().all(|r| r.message.header.source == first_source));
        let second_source = second.iter().next().unwrap().message.header.source;
        assert!(second.iter().all(|r| r.message.header.source == second_source));
        assert_ne!(first_source, second_source);
    }

    #[tokio::test]
    async fn test_close_releases_pending_request() {
        let fake = FakeDevice::new(0xf3).await;
        let connector = connector(fake.addr(), 1).await;

        let closer = async {
            fake.recv().await;
            connector.close();
        };

        let device = fake.device();
        let timeout = Duration::from_secs(10);
        let start = std::time::Instant::now();
        let (result, ()) = tokio::join!(
            connector.request(&device, connector.builder().get_power(), None, timeout),
            closer
        );

        assert_eq!(result, Err(Error::Closed));
        assert!(start.elapsed() < timeout);
        assert_eq!(connector.dispatcher.pending(), 0);
    }
}
