//! Control primitives for the thermoramp bench.
//!
//! The bench drives a heater from a programmable supply while a PT100 probe
//! reports its temperature. A run ramps the supply voltage open-loop, then
//! hands over to a discrete PID regulator once the probe reaches the target.
//!
//! - [`pid`]: the pure PID step with output clamping and anti-windup
//! - [`regime`]: the ramp / regulation state machine that decides each
//!   tick's command and the one-way switch between the two regimes
//!
//! Nothing here performs I/O.

pub mod error;
pub mod pid;
pub mod regime;

pub use error::{ControlError, ControlResult};
pub use pid::{PidGains, PidRegulator, PidState, PidStep};
pub use regime::{
    ControlLoop, ControlMode, ControllerState, RampProfile, RegulationPolicy, TransitionRule,
};
