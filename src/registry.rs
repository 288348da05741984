//! Devices known to a connector, keyed by hardware identity.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// A LIFX device on the local network.
///
/// `identity` is the device's hardware address and never changes; `addr` is
/// where it last answered from and may go stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    pub addr: SocketAddr,
    pub identity: u64,
}

impl Device {
    /// # Examples
    ///
    /// ```
    /// use lifx_lan_rs::Device;
    ///
    /// let device = Device::new("192.168.1.20:56700".parse().unwrap(), 0xd073_d512_3456);
    /// assert_eq!(device.to_string(), "d0:73:d5:12:34:56@192.168.1.20:56700");
    /// ```
    pub fn new(addr: SocketAddr, identity: u64) -> Self {
        Device { addr, identity }
    }
}

impl fmt::Display for Device {
    /// Formats the identity as a MAC address when it fits 48 bits.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.identity > 0xffff_ffff_ffff {
            return write!(f, "{:016x}@{}", self.identity, self.addr);
        }
        let bytes = self.identity.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}@{}",
            bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7], self.addr
        )
    }
}

/// Collection of devices, one per identity. Nothing is evicted implicitly.
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: HashMap<u64, Device>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `device`, returning `true` if its identity was not yet known.
    ///
    /// A known identity keeps its entry but takes the new address.
    pub fn add(&mut self, device: Device) -> bool {
        self.devices.insert(device.identity, device).is_none()
    }

    pub fn remove(&mut self, identity: u64) -> Result<Device> {
        self.devices
            .remove(&identity)
            .ok_or(Error::NotFound(identity))
    }

    pub fn find(&self, identity: u64) -> Result<&Device> {
        self.devices.get(&identity).ok_or(Error::NotFound(identity))
    }

    /// All registered devices, in no particular order.
    pub fn devices(&self) -> Vec<Device> {
        self.devices.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
