//! Discrete PID regulator for the heater supply.
//!
//! The regulator works on whole ticks: the integral is a plain running sum
//! of errors and the derivative a plain backward difference, so the gains
//! are per-tick gains. Output is clamped to `[0, voltage_ceiling]`.
//!
//! Anti-windup: when the raw output falls outside the clamp range, this
//! tick's error is taken back out of the integral, so the accumulator stays
//! frozen at its pre-tick value while the supply is pinned.

use crate::error::ControlResult;
use serde::{Deserialize, Serialize};
use tr_core::{ensure_non_negative, ensure_positive};

/// PID gains, fixed for the lifetime of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain (volts per °C).
    pub kp: f64,
    /// Integral gain (volts per °C·tick).
    pub ki: f64,
    /// Derivative gain (volts·tick per °C).
    pub kd: f64,
}

impl PidGains {
    /// Create a gain set. All gains must be finite and non-negative.
    pub fn new(kp: f64, ki: f64, kd: f64) -> ControlResult<Self> {
        ensure_non_negative(kp, "kp must be finite and non-negative")?;
        ensure_non_negative(ki, "ki must be finite and non-negative")?;
        ensure_non_negative(kd, "kd must be finite and non-negative")?;
        Ok(Self { kp, ki, kd })
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 0.65,
            ki: 0.01,
            kd: 0.05,
        }
    }
}

/// Accumulated regulator state carried from one tick to the next.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PidState {
    /// Running sum of errors.
    pub integral: f64,
    /// Error seen on the previous regulated tick.
    pub prev_error: f64,
}

/// Result of one regulator step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidStep {
    /// Clamped voltage command.
    pub command: f64,
    /// State to feed into the next step.
    pub state: PidState,
    /// Whether the raw output was clamped on this step.
    pub saturated: bool,
}

/// PID regulator configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidRegulator {
    pub gains: PidGains,
    /// Upper clamp, the bench's maximum supply voltage. The lower clamp is 0.
    pub voltage_ceiling: f64,
}

impl PidRegulator {
    /// Create a regulator.
    ///
    /// # Arguments
    ///
    /// * `gains` - PID gains
    /// * `voltage_ceiling` - Maximum commanded voltage (must be positive)
    pub fn new(gains: PidGains, voltage_ceiling: f64) -> ControlResult<Self> {
        let gains = PidGains::new(gains.kp, gains.ki, gains.kd)?;
        ensure_positive(voltage_ceiling, "voltage_ceiling must be positive")?;
        Ok(Self {
            gains,
            voltage_ceiling,
        })
    }

    /// Compute the next command.
    ///
    /// `measured` must be a finite reading; callers skip the step entirely when
    /// no reading is available.
    ///
    /// # Arguments
    ///
    /// * `state` - Regulator state from the previous step
    /// * `target` - Target temperature
    /// * `measured` - Measured temperature
    pub fn step(&self, state: &PidState, target: f64, measured: f64) -> PidStep {
        let PidGains { kp, ki, kd } = self.gains;

        let error = target - measured;
        let mut integral = state.integral + error;
        let derivative = error - state.prev_error;

        let raw = kp * error + ki * integral + kd * derivative;
        let saturated = !(0.0..=self.voltage_ceiling).contains(&raw);
        let command = raw.clamp(0.0, self.voltage_ceiling);

        if saturated {
            integral -= error;
        }

        PidStep {
            command,
            state: PidState {
                integral,
                prev_error: error,
            },
            saturated,
        }
    }
}
