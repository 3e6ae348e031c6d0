//! PT100 probe behind a microcontroller bridge.
//!
//! Protocol: the host writes the single byte `r`; the bridge answers with
//! one line holding the temperature in °C, or a fault message such as
//! `Fault detected!` when the RTD amplifier reports a fault.

use std::thread;
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::error::{DeviceError, DeviceResult};
use crate::traits::TemperatureSource;
use crate::transport::{LineChannel, Transport, is_timeout, open_serial};

const DEVICE: &str = "PT100 bridge";

/// Request byte for one reading.
pub const READ_COMMAND: &[u8] = b"r";

/// Parse a bridge reply. Anything that is not a finite number is no reading.
pub fn parse_temperature(reply: &str) -> Option<f64> {
    reply
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|t| t.is_finite())
}

pub struct Pt100Bridge<T: Transport> {
    link: Option<LineChannel<T>>,
}

impl Pt100Bridge<Box<dyn SerialPort>> {
    /// Open the bridge's serial port.
    ///
    /// Opening the port resets most bridge boards, so this waits `settle`
    /// before returning.
    pub fn open(
        port: &str,
        baud_rate: u32,
        timeout: Duration,
        settle: Duration,
    ) -> DeviceResult<Self> {
        let link = open_serial(port, baud_rate, timeout)?;
        thread::sleep(settle);
        info!(port, "temperature bridge connected");
        Ok(Self::new(link))
    }
}

impl<T: Transport> Pt100Bridge<T> {
    pub fn new(transport: T) -> Self {
        Self {
            link: Some(LineChannel::new(transport)),
        }
    }
}

impl<T: Transport> TemperatureSource for Pt100Bridge<T> {
    fn read(&mut self) -> DeviceResult<Option<f64>> {
        let link = self
            .link
            .as_mut()
            .ok_or(DeviceError::Closed { device: DEVICE })?;

        link.discard_input()
            .map_err(|e| DeviceError::transport(DEVICE, e))?;
        link.send(READ_COMMAND)
            .map_err(|e| DeviceError::transport(DEVICE, e))?;

        match link.read_line() {
            Ok(reply) => {
                let reading = parse_temperature(&reply);
                if reading.is_none() {
                    warn!(reply = %reply, "invalid data received from temperature bridge");
                }
                Ok(reading)
            }
            Err(e) if is_timeout(&e) => {
                warn!("temperature bridge did not answer in time");
                Ok(None)
            }
            Err(e) => Err(DeviceError::transport(DEVICE, e)),
        }
    }

    fn close(&mut self) -> DeviceResult<()> {
        if self.link.take().is_some() {
            debug!("temperature bridge link closed");
        }
        Ok(())
    }
}
