//! Scripted stand-ins for the bench hardware.
//!
//! Used by the run service tests and by dry runs without instruments.

use std::io;

use crate::error::{DeviceError, DeviceResult};
use crate::traits::{PowerSink, TemperatureSource};

/// One scripted probe answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScriptedReading {
    Value(f64),
    /// Unparseable or missing reply.
    Absent,
    /// The link dies.
    Fault,
}

type Script = Box<dyn FnMut(u64) -> ScriptedReading + Send>;
type Hook = Box<dyn FnMut() + Send>;

/// Temperature source that answers from a script indexed by read number
/// (1-based).
pub struct ScriptedTemperatureSource {
    script: Script,
    hooks: Vec<(u64, Hook)>,
    reads: u64,
    closes: u32,
    closed: bool,
}

impl ScriptedTemperatureSource {
    pub fn from_fn(script: impl FnMut(u64) -> ScriptedReading + Send + 'static) -> Self {
        Self {
            script: Box::new(script),
            hooks: Vec::new(),
            reads: 0,
            closes: 0,
            closed: false,
        }
    }

    pub fn constant(celsius: f64) -> Self {
        Self::from_fn(move |_| ScriptedReading::Value(celsius))
    }

    /// Answers in order; the last entry repeats forever.
    pub fn sequence(readings: Vec<ScriptedReading>) -> Self {
        Self::from_fn(move |n| {
            let idx = (n.saturating_sub(1) as usize).min(readings.len().saturating_sub(1));
            readings.get(idx).copied().unwrap_or(ScriptedReading::Absent)
        })
    }

    /// Run `hook` just before answering read `n`.
    pub fn with_hook_at(mut self, n: u64, hook: impl FnMut() + Send + 'static) -> Self {
        self.hooks.push((n, Box::new(hook)));
        self
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    pub fn closes(&self) -> u32 {
        self.closes
    }
}

impl TemperatureSource for ScriptedTemperatureSource {
    fn read(&mut self) -> DeviceResult<Option<f64>> {
        if self.closed {
            return Err(DeviceError::Closed {
                device: "mock probe",
            });
        }
        self.reads += 1;
        let n = self.reads;
        for (_, hook) in self.hooks.iter_mut().filter(|(at, _)| *at == n) {
            hook();
        }
        match (self.script)(n) {
            ScriptedReading::Value(t) => Ok(Some(t).filter(|t| t.is_finite())),
            ScriptedReading::Absent => Ok(None),
            ScriptedReading::Fault => Err(DeviceError::transport(
                "mock probe",
                io::Error::new(io::ErrorKind::BrokenPipe, "scripted fault"),
            )),
        }
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.closes += 1;
        self.closed = true;
        Ok(())
    }
}

/// A call received by [`RecordingPowerSink`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SinkCall {
    Initialize,
    SetVoltage(f64),
    EnableOutput,
    DisableOutput,
    MeasureVoltage,
    MeasureCurrent,
    Close,
}

/// Power sink that records every call and models a resistive load.
///
/// Measured voltage reads back the last set point; current is that voltage
/// over the load resistance.
#[derive(Debug)]
pub struct RecordingPowerSink {
    calls: Vec<SinkCall>,
    load_ohms: f64,
    set_point: f64,
    voltage_queries: u64,
    fail_voltage_query_on: Option<u64>,
    fail_disable: bool,
    closed: bool,
}

impl Default for RecordingPowerSink {
    fn default() -> Self {
        Self::new(10.0)
    }
}

impl RecordingPowerSink {
    pub fn new(load_ohms: f64) -> Self {
        Self {
            calls: Vec::new(),
            load_ohms,
            set_point: 0.0,
            voltage_queries: 0,
            fail_voltage_query_on: None,
            fail_disable: false,
            closed: false,
        }
    }

    /// Make the `n`-th voltage query (1-based) fail with a transport fault.
    pub fn fail_voltage_query_on(mut self, n: u64) -> Self {
        self.fail_voltage_query_on = Some(n);
        self
    }

    /// Make `disable_output` fail.
    pub fn fail_disable(mut self) -> Self {
        self.fail_disable = true;
        self
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    pub fn set_voltages(&self) -> Vec<f64> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                SinkCall::SetVoltage(v) => Some(*v),
                _ => None,
            })
            .collect()
    }

    pub fn disable_count(&self) -> usize {
        self.count(SinkCall::DisableOutput)
    }

    pub fn close_count(&self) -> usize {
        self.count(SinkCall::Close)
    }

    fn count(&self, call: SinkCall) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    fn record(&mut self, call: SinkCall) -> DeviceResult<()> {
        self.calls.push(call);
        if self.closed {
            return Err(DeviceError::Closed {
                device: "mock supply",
            });
        }
        Ok(())
    }
}

fn scripted_fault(what: &str) -> DeviceError {
    DeviceError::transport(
        "mock supply",
        io::Error::new(io::ErrorKind::BrokenPipe, format!("scripted {what} fault")),
    )
}

impl PowerSink for RecordingPowerSink {
    fn initialize(&mut self) -> DeviceResult<()> {
        self.record(SinkCall::Initialize)
    }

    fn set_voltage(&mut self, volts: f64) -> DeviceResult<()> {
        self.record(SinkCall::SetVoltage(volts))?;
        self.set_point = volts;
        Ok(())
    }

    fn enable_output(&mut self) -> DeviceResult<()> {
        self.record(SinkCall::EnableOutput)
    }

    fn disable_output(&mut self) -> DeviceResult<()> {
        self.record(SinkCall::DisableOutput)?;
        if self.fail_disable {
            return Err(scripted_fault("disable"));
        }
        Ok(())
    }

    fn measured_voltage(&mut self) -> DeviceResult<f64> {
        self.record(SinkCall::MeasureVoltage)?;
        self.voltage_queries += 1;
        if self.fail_voltage_query_on == Some(self.voltage_queries) {
            return Err(scripted_fault("voltage query"));
        }
        Ok(self.set_point)
    }

    fn measured_current(&mut self) -> DeviceResult<f64> {
        self.record(SinkCall::MeasureCurrent)?;
        Ok(self.set_point / self.load_ohms)
    }

    fn close(&mut self) -> DeviceResult<()> {
        self.calls.push(SinkCall::Close);
        self.closed = true;
        Ok(())
    }
}
