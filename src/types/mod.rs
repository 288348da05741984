//! Value types carried inside message payloads.

mod hsbk;
mod kelvin;
mod label;
mod power;
mod service;
mod timestamp;

pub use hsbk::Hsbk;
pub use kelvin::Kelvin;
pub use label::Label;
pub use power::PowerLevel;
pub use service::Service;
pub use timestamp::Timestamp;
