//! Bench hardware for thermoramp.
//!
//! Two serial instruments sit behind the [`TemperatureSource`] and
//! [`PowerSink`] traits:
//! - a PT100 probe read through a microcontroller bridge ([`Pt100Bridge`])
//! - a programmable DC supply speaking SCPI ([`ScpiSupply`])
//!
//! Ports are found by matching the USB description ([`select_port`]).
//! [`mock`] provides scripted devices for exercising the control loop
//! without hardware.

pub mod discovery;
pub mod error;
pub mod mock;
pub mod probe;
pub mod supply;
pub mod traits;
pub mod transport;

pub use discovery::{PortDescriptor, find_port, list_ports, select_port};
pub use error::{DeviceError, DeviceResult};
pub use probe::Pt100Bridge;
pub use supply::ScpiSupply;
pub use traits::{PowerSink, TemperatureSource};
pub use transport::{LineChannel, Transport};
