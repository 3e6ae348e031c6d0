//! Ramp / regulation state machine.
//!
//! A run starts in [`ControlMode::Ramping`]: the supply voltage climbs by a
//! fixed step per tick until it reaches the ramp target. Once enough valid
//! readings have been seen and the probe sits within tolerance of the target
//! temperature, the loop switches to [`ControlMode::Regulating`] for the rest
//! of the run. The switch happens at most once and never reverses.
//!
//! This module holds only the decision logic. Reading the probe, driving the
//! supply and pacing the ticks are the run service's job.

use crate::error::{ControlError, ControlResult};
use crate::pid::{PidRegulator, PidState};
use serde::{Deserialize, Serialize};
use std::fmt;
use tr_core::{ensure_finite, ensure_non_negative, ensure_positive, within};

/// Control regime for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ControlMode {
    /// Open-loop linear voltage ramp.
    #[default]
    Ramping,
    /// Closed-loop regulation around the target temperature.
    Regulating,
}

impl ControlMode {
    pub fn label(&self) -> &'static str {
        match self {
            ControlMode::Ramping => "Ramping",
            ControlMode::Regulating => "Regulating",
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Open-loop ramp parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RampProfile {
    /// Voltage the ramp climbs to and then holds.
    pub target_voltage: f64,
    /// Voltage added per tick.
    pub voltage_step: f64,
}

impl RampProfile {
    pub fn new(target_voltage: f64, voltage_step: f64) -> ControlResult<Self> {
        ensure_non_negative(target_voltage, "target_voltage must be non-negative")?;
        ensure_positive(voltage_step, "voltage_step must be positive")?;
        Ok(Self {
            target_voltage,
            voltage_step,
        })
    }

    /// Command after `ticks` ramp ticks.
    ///
    /// Computed from the tick count so the ramp lands exactly on target.
    pub fn voltage_after(&self, ticks: u64) -> f64 {
        (ticks as f64 * self.voltage_step).min(self.target_voltage)
    }
}

/// Condition for leaving the ramp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    /// Target temperature (°C).
    pub target_temperature: f64,
    /// Allowed distance from target (°C, inclusive).
    pub tolerance: f64,
    /// Number of valid readings that must be exceeded before switching.
    pub warmup_readings: u32,
}

impl TransitionRule {
    pub fn new(target_temperature: f64, tolerance: f64, warmup_readings: u32) -> ControlResult<Self> {
        ensure_finite(target_temperature, "target_temperature must be finite")?;
        ensure_non_negative(tolerance, "tolerance must be non-negative")?;
        Ok(Self {
            target_temperature,
            tolerance,
            warmup_readings,
        })
    }
}

impl Default for TransitionRule {
    fn default() -> Self {
        Self {
            target_temperature: 20.0,
            tolerance: 0.1,
            warmup_readings: 3,
        }
    }
}

/// What the loop does once it is regulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegulationPolicy {
    /// Run the PID regulator on every tick with a reading.
    #[default]
    Pid,
    /// Hold the voltage reached at the switch.
    Hold,
}

/// Mutable state of the control loop, owned by one run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControllerState {
    pub mode: ControlMode,
    /// Voltage commanded on the most recent tick.
    pub command_voltage: f64,
    pub pid: PidState,
    /// Ticks with a present temperature, counted while ramping.
    pub valid_readings: u32,
    /// Ramp ticks taken so far.
    pub ramp_ticks: u64,
}

/// Per-run control loop core.
#[derive(Debug, Clone)]
pub struct ControlLoop {
    ramp: RampProfile,
    rule: TransitionRule,
    regulator: PidRegulator,
    policy: RegulationPolicy,
    state: ControllerState,
}

impl ControlLoop {
    /// Create a loop in the `Ramping` state with a 0 V command.
    ///
    /// # Errors
    ///
    /// Returns error if the ramp target exceeds the regulator ceiling.
    pub fn new(
        ramp: RampProfile,
        rule: TransitionRule,
        regulator: PidRegulator,
        policy: RegulationPolicy,
    ) -> ControlResult<Self> {
        if ramp.target_voltage > regulator.voltage_ceiling {
            return Err(ControlError::InvalidArg {
                what: "ramp target_voltage must not exceed voltage_ceiling",
            });
        }
        Ok(Self {
            ramp,
            rule,
            regulator,
            policy,
            state: ControllerState::default(),
        })
    }

    pub fn mode(&self) -> ControlMode {
        self.state.mode
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn rule(&self) -> &TransitionRule {
        &self.rule
    }

    /// Decide this tick's voltage command from this tick's reading.
    ///
    /// While ramping the reading is ignored. While regulating, an absent
    /// reading holds the previous command and leaves the regulator untouched.
    pub fn next_command(&mut self, temperature: Option<f64>) -> f64 {
        match self.state.mode {
            ControlMode::Ramping => {
                self.state.ramp_ticks += 1;
                self.state.command_voltage = self.ramp.voltage_after(self.state.ramp_ticks);
            }
            ControlMode::Regulating => {
                if let (RegulationPolicy::Pid, Some(measured)) = (self.policy, finite(temperature)) {
                    let step = self.regulator.step(
                        &self.state.pid,
                        self.rule.target_temperature,
                        measured,
                    );
                    if step.saturated {
                        tracing::debug!(command = step.command, "regulator output saturated");
                    }
                    self.state.pid = step.state;
                    self.state.command_voltage = step.command;
                }
            }
        }
        self.state.command_voltage
    }

    /// Feed this tick's reading into the transition check.
    ///
    /// Returns `true` on the one tick where the loop switches to `Regulating`.
    pub fn observe(&mut self, temperature: Option<f64>) -> bool {
        if self.state.mode != ControlMode::Ramping {
            return false;
        }
        let Some(measured) = finite(temperature) else {
            return false;
        };

        // Any present reading counts, near target or not.
        self.state.valid_readings = self.state.valid_readings.saturating_add(1);

        if self.state.valid_readings > self.rule.warmup_readings
            && within(measured, self.rule.target_temperature, self.rule.tolerance)
        {
            self.state.mode = ControlMode::Regulating;
            return true;
        }
        false
    }
}

fn finite(temperature: Option<f64>) -> Option<f64> {
    temperature.filter(|t| t.is_finite())
}
