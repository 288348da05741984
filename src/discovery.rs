//! Device discovery via UDP broadcast.

use std::collections::HashSet;
use std::time::Duration;

use futures::StreamExt;
use log::debug;

use crate::connector::Connector;
use crate::dispatch::Response;
use crate::errors::Error;
use crate::payload::Payload;
use crate::registry::Device;
use crate::runtime::{self, Instant};
use crate::types::Service;

type Result<T> = std::result::Result<T, Error>;

/// Decides what to do with each newly seen device during discovery.
///
/// Returns `(register, continue)`: whether to keep the device, and whether to
/// keep listening for more.
pub type DiscoverFilter = Box<dyn FnMut(&Response, &Device) -> (bool, bool) + Send>;

impl Connector {
    /// Discover devices on the local network.
    ///
    /// Broadcasts a service query and collects every device that advertises
    /// the UDP service until `timeout` expires or `filter` asks to stop. Each
    /// identity is considered once per call; if it answers from several
    /// addresses the first reply wins. Accepted devices are added to the
    /// connector's registry and returned in arrival order.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use lifx_lan_rs::{Connector, DiscoverFilter};
    ///
    /// # async fn run() -> Result<(), lifx_lan_rs::Error> {
    /// let connector = Connector::connect().await?;
    ///
    /// // Stop as soon as one particular light shows up.
    /// let wanted = 0xd073_d512_3456;
    /// let filter: DiscoverFilter = Box::new(move |_, device| {
    ///     let found = device.identity == wanted;
    ///     (found, !found)
    /// });
    /// let devices = connector.discover(Duration::from_secs(2), Some(filter)).await?;
    /// println!("Found {} devices", devices.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn discover(
        &self,
        timeout: Duration,
        filter: Option<DiscoverFilter>,
    ) -> Result<Vec<Device>> {
        self.discover_until(timeout, filter, None).await
    }

    /// Like [`Connector::discover`], but stops once `n` devices are found.
    pub async fn discover_n(&self, n: usize, timeout: Duration) -> Result<Vec<Device>> {
        self.discover_until(timeout, None, Some(n)).await
    }

    async fn discover_until(
        &self,
        timeout: Duration,
        mut filter: Option<DiscoverFilter>,
        limit: Option<usize>,
    ) -> Result<Vec<Device>> {
        let mut found = Vec::new();
        if limit == Some(0) {
            return Ok(found);
        }

        let token = self.next_token();
        let mut wait = self.dispatcher.register(Box::new(move |r: &Response| {
            r.message.header.source == token
                && matches!(&r.message.payload, Payload::StateService(s) if s.service() == Some(Service::Udp))
        }))?;

        let msg = self.builder().source(token).res_required(true).get_service();
        self.send(msg, None).await?;

        let start = Instant::now();
        let mut seen = HashSet::new();

        loop {
            let remaining = start.remaining(timeout);
            if remaining.is_zero() {
                break;
            }

            let response = match runtime::timeout(remaining, wait.receiver().next()).await {
                Ok(Some(Ok(response))) => response,
                Ok(Some(Err(err))) => return Err(err),
                Ok(None) | Err(_) => break,
            };

            let device = Device::new(response.addr, response.identity());
            if !seen.insert(device.identity) {
                debug!("Ignoring repeated discovery reply from {}", device);
                continue;
            }

            let (register, keep_going) = match filter.as_mut() {
                Some(filter) => filter(&response, &device),
                None => (true, true),
            };

            if register {
                debug!("Discovered {}", device);
                self.add_device(device);
                found.push(device);
            }

            if !keep_going || limit.is_some_and(|n| found.len() >= n) {
                break;
            }
        }

        Ok(found)
    }
}
