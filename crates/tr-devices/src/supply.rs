//! SCPI power supply over a serial line.

use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::{DeviceError, DeviceResult};
use crate::traits::PowerSink;
use crate::transport::{LineChannel, Transport, open_serial};

const DEVICE: &str = "power supply";

pub mod commands {
    pub const RESET: &str = "*RST";
    pub const REMOTE: &str = "SYST:REM";
    pub const OUTPUT_ON: &str = "OUTP ON";
    pub const OUTPUT_OFF: &str = "OUTP OFF";
    pub const MEASURE_VOLTAGE: &str = "MEAS:VOLT?";
    pub const MEASURE_CURRENT: &str = "MEAS:CURR?";

    /// `VOLT <v>` with millivolt resolution.
    pub fn set_voltage(volts: f64) -> String {
        format!("VOLT {volts:.3}")
    }
}

pub struct ScpiSupply<T: Transport> {
    link: Option<LineChannel<T>>,
}

impl ScpiSupply<Box<dyn SerialPort>> {
    pub fn open(port: &str, baud_rate: u32, timeout: Duration) -> DeviceResult<Self> {
        let link = open_serial(port, baud_rate, timeout)?;
        info!(port, "power supply connected");
        Ok(Self::new(link))
    }
}

impl<T: Transport> ScpiSupply<T> {
    pub fn new(transport: T) -> Self {
        Self {
            link: Some(LineChannel::new(transport)),
        }
    }

    fn link(&mut self) -> DeviceResult<&mut LineChannel<T>> {
        self.link
            .as_mut()
            .ok_or(DeviceError::Closed { device: DEVICE })
    }

    fn write(&mut self, command: &str) -> DeviceResult<()> {
        debug!(command, "supply write");
        self.link()?
            .send_line(command)
            .map_err(|e| DeviceError::transport(DEVICE, e))
    }

    fn query_f64(&mut self, command: &'static str) -> DeviceResult<f64> {
        let link = self.link()?;
        link.send_line(command)
            .map_err(|e| DeviceError::transport(DEVICE, e))?;
        let reply = link
            .read_line()
            .map_err(|e| DeviceError::transport(DEVICE, e))?;
        reply
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or(DeviceError::Parse {
                device: DEVICE,
                command,
                reply,
            })
    }
}

impl<T: Transport> PowerSink for ScpiSupply<T> {
    fn initialize(&mut self) -> DeviceResult<()> {
        self.write(commands::RESET)?;
        self.write(commands::REMOTE)
    }

    fn set_voltage(&mut self, volts: f64) -> DeviceResult<()> {
        self.write(&commands::set_voltage(volts))
    }

    fn enable_output(&mut self) -> DeviceResult<()> {
        self.write(commands::OUTPUT_ON)
    }

    fn disable_output(&mut self) -> DeviceResult<()> {
        self.write(commands::OUTPUT_OFF)
    }

    fn measured_voltage(&mut self) -> DeviceResult<f64> {
        self.query_f64(commands::MEASURE_VOLTAGE)
    }

    fn measured_current(&mut self) -> DeviceResult<f64> {
        self.query_f64(commands::MEASURE_CURRENT)
    }

    fn close(&mut self) -> DeviceResult<()> {
        if self.link.take().is_some() {
            debug!("power supply link closed");
        }
        Ok(())
    }
}
