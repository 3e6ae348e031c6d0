//! Device seams used by the control loop.
//!
//! The loop only sees these two traits. Serial adapters, mocks and anything
//! else the bench grows later implement them.

use crate::error::DeviceResult;

/// Something that yields one temperature sample per call.
pub trait TemperatureSource {
    /// Read one sample in °C.
    ///
    /// Returns `Ok(None)` when the device answered with something that is not a
    /// usable number, or did not answer in time. `Err` is reserved for a link
    /// that cannot be used at all.
    fn read(&mut self) -> DeviceResult<Option<f64>>;

    /// Release the underlying link. Calling it twice is harmless.
    fn close(&mut self) -> DeviceResult<()>;
}

/// A programmable DC supply driving the heater.
pub trait PowerSink {
    /// Put the instrument into a known state under remote control.
    fn initialize(&mut self) -> DeviceResult<()>;

    fn set_voltage(&mut self, volts: f64) -> DeviceResult<()>;

    fn enable_output(&mut self) -> DeviceResult<()>;

    fn disable_output(&mut self) -> DeviceResult<()>;

    /// Voltage read back from the output terminals.
    fn measured_voltage(&mut self) -> DeviceResult<f64>;

    /// Current read back from the output terminals.
    fn measured_current(&mut self) -> DeviceResult<f64>;

    /// Release the underlying link. Calling it twice is harmless.
    fn close(&mut self) -> DeviceResult<()>;
}
