//! Bench configuration: loading, saving, validation.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! standard bench: ramp to 6 V in 0.05 V steps, regulate at 20 °C, 120 s at
//! one tick per second.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tr_controls::{
    ControlLoop, PidGains, PidRegulator, RampProfile, RegulationPolicy, TransitionRule,
};

use crate::error::{AppError, AppResult};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    pub version: u32,
    pub name: String,
    pub devices: DevicesConfig,
    pub ramp: RampConfig,
    pub regulation: RegulationConfig,
    pub run: RunConfig,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            name: "pt100-heater".to_string(),
            devices: DevicesConfig::default(),
            ramp: RampConfig::default(),
            regulation: RegulationConfig::default(),
            run: RunConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DevicesConfig {
    pub probe: ProbeConfig,
    pub supply: SupplyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Substring of the port description, matched case-insensitively.
    pub description: String,
    /// Explicit port; skips discovery when set.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub timeout_ms: u64,
    /// Wait after opening the port while the bridge resets.
    pub settle_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            description: "ch340".to_string(),
            port: None,
            baud_rate: 9600,
            timeout_ms: 1000,
            settle_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SupplyConfig {
    pub description: String,
    pub port: Option<String>,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            description: "PL2303GT".to_string(),
            port: None,
            baud_rate: 9600,
            timeout_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RampConfig {
    pub target_voltage: f64,
    pub voltage_step: f64,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            target_voltage: 6.0,
            voltage_step: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegulationConfig {
    pub target_temperature_c: f64,
    pub tolerance_c: f64,
    pub warmup_readings: u32,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub voltage_ceiling: f64,
    pub policy: RegulationPolicy,
}

impl Default for RegulationConfig {
    fn default() -> Self {
        let rule = TransitionRule::default();
        let gains = PidGains::default();
        Self {
            target_temperature_c: rule.target_temperature,
            tolerance_c: rule.tolerance,
            warmup_readings: rule.warmup_readings,
            kp: gains.kp,
            ki: gains.ki,
            kd: gains.kd,
            voltage_ceiling: 12.0,
            policy: RegulationPolicy::Pid,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    pub duration_s: f64,
    pub tick_period_ms: u64,
    /// Directory under which each run creates its own output directory.
    pub output_root: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            duration_s: 120.0,
            tick_period_ms: 1000,
            output_root: PathBuf::from("."),
        }
    }
}

/// Command-line overrides applied on top of a loaded config.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub duration_s: Option<f64>,
    pub target_temperature_c: Option<f64>,
    pub output_root: Option<PathBuf>,
}

impl BenchConfig {
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(duration_s) = overrides.duration_s {
            self.run.duration_s = duration_s;
        }
        if let Some(target) = overrides.target_temperature_c {
            self.regulation.target_temperature_c = target;
        }
        if let Some(root) = &overrides.output_root {
            self.run.output_root = root.clone();
        }
        self
    }

    pub fn duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.run.duration_s).unwrap_or(Duration::MAX)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.run.tick_period_ms)
    }

    /// Build a fresh control loop for one run.
    pub fn control_loop(&self) -> AppResult<ControlLoop> {
        let reg = &self.regulation;
        let regulator = PidRegulator::new(PidGains::new(reg.kp, reg.ki, reg.kd)?, reg.voltage_ceiling)?;
        let ramp = RampProfile::new(self.ramp.target_voltage, self.ramp.voltage_step)?;
        let rule = TransitionRule::new(reg.target_temperature_c, reg.tolerance_c, reg.warmup_readings)?;
        Ok(ControlLoop::new(ramp, rule, regulator, reg.policy)?)
    }
}

/// Load a config from a YAML file.
pub fn load_config(path: &Path) -> AppResult<BenchConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: BenchConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse config YAML: {}", e)))?;

    Ok(config)
}

/// Save a config to a YAML file.
pub fn save_config(path: &Path, config: &BenchConfig) -> AppResult<()> {
    let content = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize config: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ConfigFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

fn invalid(msg: impl Into<String>) -> AppError {
    AppError::Validation(msg.into())
}

/// Check a config before any device is opened.
pub fn validate_config(config: &BenchConfig) -> AppResult<()> {
    if config.version != CONFIG_VERSION {
        return Err(invalid(format!(
            "Unsupported config version: {}",
            config.version
        )));
    }

    let run = &config.run;
    if !(run.duration_s.is_finite() && run.duration_s > 0.0) {
        return Err(invalid("run.duration_s must be positive"));
    }
    if run.tick_period_ms == 0 {
        return Err(invalid("run.tick_period_ms must be positive"));
    }

    for (name, pattern, port) in [
        ("probe", &config.devices.probe.description, &config.devices.probe.port),
        ("supply", &config.devices.supply.description, &config.devices.supply.port),
    ] {
        if pattern.trim().is_empty() && port.is_none() {
            return Err(invalid(format!(
                "devices.{name} needs a description pattern or an explicit port"
            )));
        }
    }

    let reg = &config.regulation;
    if !(reg.voltage_ceiling.is_finite() && reg.voltage_ceiling > 0.0) {
        return Err(invalid("regulation.voltage_ceiling must be positive"));
    }
    if !(0.0..=reg.voltage_ceiling).contains(&config.ramp.target_voltage) {
        return Err(invalid(format!(
            "ramp.target_voltage {} must lie within [0, {}]",
            config.ramp.target_voltage, reg.voltage_ceiling
        )));
    }

    // Remaining parameter checks live with the control types.
    config
        .control_loop()
        .map(|_| ())
        .map_err(|e| invalid(e.to_string()))
}
