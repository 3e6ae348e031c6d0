//! Run execution.
//!
//! [`execute_run`] drives one run against whatever devices it is handed:
//! read the probe, decide the command, drive the supply, record a sample,
//! check the transition, sleep. Every exit path then goes through the same
//! cleanup stage and a single export. [`run_bench`] wires the real serial
//! devices into it.

use chrono::Local;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tr_controls::ControlLoop;
use tr_devices::{
    DeviceResult, PowerSink, Pt100Bridge, ScpiSupply, TemperatureSource, select_port,
};
use tr_results::{
    DirectoryExporter, ExportArtifacts, ResultsError, Run, RunExporter, RunRecorder, RunStatus,
    RunStore, Sample,
};

use crate::cancel::{CancelToken, install_signal_handlers};
use crate::clock::{Clock, SystemClock};
use crate::config::{BenchConfig, validate_config};
use crate::error::AppResult;
use crate::progress::RunProgressEvent;

/// Outcome of a run that got as far as the control loop.
#[derive(Debug)]
pub struct RunReport {
    pub run: Run,
    /// Export result. A failed export does not change the run status.
    pub export: Result<ExportArtifacts, ResultsError>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        self.run.status
    }
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    event: RunProgressEvent,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(event);
    }
}

/// Execute one run.
///
/// Device faults end the run as `Failed`; they are not returned as `Err`.
/// `Err` means the config was unusable: the devices are released without
/// being driven and nothing is exported.
#[allow(clippy::too_many_arguments)]
pub fn execute_run(
    config: &BenchConfig,
    source: &mut dyn TemperatureSource,
    sink: &mut dyn PowerSink,
    clock: &mut dyn Clock,
    cancel: &CancelToken,
    exporter: &mut dyn RunExporter,
    output_dir: &Path,
    mut progress: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunReport> {
    let mut control = match validate_config(config).and_then(|()| config.control_loop()) {
        Ok(control) => control,
        Err(e) => {
            release_devices(sink, source);
            return Err(e);
        }
    };

    let mut recorder = RunRecorder::new(output_dir.to_path_buf(), clock.wall_time());
    info!(
        name = %config.name,
        dir = %output_dir.display(),
        duration_s = config.run.duration_s,
        "run started"
    );
    emit_progress(
        &mut progress,
        RunProgressEvent::Started {
            output_dir: output_dir.to_path_buf(),
            duration_s: config.run.duration_s,
        },
    );

    let mut ticker = Ticker {
        control: &mut control,
        recorder: &mut recorder,
        source: &mut *source,
        sink: &mut *sink,
        clock: &mut *clock,
        cancel,
        duration: config.duration(),
        period: config.tick_period(),
        progress: &mut progress,
    };
    let outcome = ticker.drive();

    release_devices(sink, source);

    let (status, failure) = match outcome {
        Ok(status) => (status, None),
        Err(e) => {
            error!(
                error = %e,
                transport = e.is_transport(),
                samples = recorder.len(),
                "run aborted by device fault"
            );
            (RunStatus::Failed, Some(e.to_string()))
        }
    };
    let run = recorder.finalize(status, failure, clock.wall_time());
    info!(status = %run.status, samples = run.samples.len(), "run finished");

    let export = exporter.export(&run);
    if let Err(e) = &export {
        error!(error = %e, dir = %run.output_dir.display(), "failed to export run data");
    }

    emit_progress(
        &mut progress,
        RunProgressEvent::Finished {
            status: run.status,
            samples: run.samples.len(),
        },
    );

    Ok(RunReport { run, export })
}

/// Per-run loop state borrowed for the duration of [`Ticker::drive`].
struct Ticker<'a, 'p> {
    control: &'a mut ControlLoop,
    recorder: &'a mut RunRecorder,
    source: &'a mut dyn TemperatureSource,
    sink: &'a mut dyn PowerSink,
    clock: &'a mut dyn Clock,
    cancel: &'a CancelToken,
    duration: Duration,
    period: Duration,
    progress: &'a mut Option<&'p mut dyn FnMut(RunProgressEvent)>,
}

impl Ticker<'_, '_> {
    fn drive(&mut self) -> DeviceResult<RunStatus> {
        self.sink.initialize()?;

        let mut tick = 0u64;
        while self.clock.elapsed() < self.duration {
            if self.cancel.is_cancelled() {
                info!(ticks = tick, "run cancelled");
                return Ok(RunStatus::Interrupted);
            }
            tick += 1;
            self.tick(tick)?;
            self.clock.sleep(self.period);
        }
        Ok(RunStatus::Completed)
    }

    fn tick(&mut self, tick: u64) -> DeviceResult<()> {
        let temperature = self.source.read()?;

        let mode = self.control.mode();
        let command = self.control.next_command(temperature);
        self.sink.set_voltage(command)?;
        self.sink.enable_output()?;
        let measured_voltage = self.sink.measured_voltage()?;
        let measured_current = self.sink.measured_current()?;

        let sample = Sample {
            tick,
            timestamp: self.clock.wall_time(),
            elapsed_s: self.clock.elapsed().as_secs_f64(),
            mode,
            set_voltage: command,
            measured_voltage,
            measured_current,
            temperature,
        };
        debug!(
            tick,
            mode = %mode,
            set_v = command,
            measured_v = measured_voltage,
            current_a = measured_current,
            temperature = ?temperature,
            "tick"
        );
        self.recorder.push(sample.clone());
        emit_progress(self.progress, RunProgressEvent::Tick(sample));

        if self.control.observe(temperature) {
            let temperature = temperature.unwrap_or(self.control.rule().target_temperature);
            info!(tick, temperature, "target temperature reached, switching to PID control");
            self.recorder.mark_transition(tick);
            emit_progress(
                self.progress,
                RunProgressEvent::Transition { tick, temperature },
            );
        }
        Ok(())
    }
}

/// Disable the output and close both links, attempting every step.
fn release_devices(sink: &mut dyn PowerSink, source: &mut dyn TemperatureSource) {
    if let Err(e) = sink.disable_output() {
        warn!(error = %e, "failed to disable supply output");
    }
    if let Err(e) = sink.close() {
        warn!(error = %e, "failed to close power supply");
    }
    if let Err(e) = source.close() {
        warn!(error = %e, "failed to close temperature bridge");
    }
}

fn resolve_port(explicit: &Option<String>, pattern: &str) -> AppResult<String> {
    match explicit {
        Some(port) => Ok(port.clone()),
        None => Ok(select_port(pattern)?),
    }
}

/// Run the bench on real hardware.
///
/// Discovery, port opening and output directory creation happen before the
/// loop; a failure there is returned as `Err` and nothing is exported.
pub fn run_bench(
    config: &BenchConfig,
    progress: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunReport> {
    validate_config(config)?;
    let probe_cfg = &config.devices.probe;
    let supply_cfg = &config.devices.supply;

    let probe_port = resolve_port(&probe_cfg.port, &probe_cfg.description)?;
    let supply_port = resolve_port(&supply_cfg.port, &supply_cfg.description)?;

    let mut probe = Pt100Bridge::open(
        &probe_port,
        probe_cfg.baud_rate,
        Duration::from_millis(probe_cfg.timeout_ms),
        Duration::from_millis(probe_cfg.settle_ms),
    )?;
    let mut supply = ScpiSupply::open(
        &supply_port,
        supply_cfg.baud_rate,
        Duration::from_millis(supply_cfg.timeout_ms),
    )?;

    let cancel = install_signal_handlers()?;
    let store = RunStore::new(&config.run.output_root);
    let output_dir = store.create_run_dir(Local::now())?;
    let mut clock = SystemClock::start();

    execute_run(
        config,
        &mut probe,
        &mut supply,
        &mut clock,
        &cancel,
        &mut DirectoryExporter,
        &output_dir,
        progress,
    )
}
