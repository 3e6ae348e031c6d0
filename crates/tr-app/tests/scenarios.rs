//! End-to-end runs against scripted devices and a virtual clock.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tr_app::{BenchConfig, CancelToken, ManualClock, RunProgressEvent, RunReport, execute_run};
use tr_controls::{ControlMode, PidGains, PidRegulator, PidState};
use tr_devices::mock::{RecordingPowerSink, ScriptedReading, ScriptedTemperatureSource, SinkCall};
use tr_results::{
    DirectoryExporter, ExportArtifacts, ResultsResult, Run, RunExporter, RunStatus, Sample,
};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    dir.push(format!("{}_{}", prefix, nanos));
    dir
}

/// Keeps what it was asked to export instead of writing files.
#[derive(Default)]
struct CapturingExporter {
    exported: Vec<Vec<Sample>>,
}

impl RunExporter for CapturingExporter {
    fn export(&mut self, run: &Run) -> ResultsResult<ExportArtifacts> {
        self.exported.push(run.samples.clone());
        Ok(ExportArtifacts {
            data_file: run.output_dir.join("data.csv"),
            plot_file: None,
            manifest_file: run.output_dir.join("manifest.json"),
        })
    }
}

struct Bench {
    probe: ScriptedTemperatureSource,
    supply: RecordingPowerSink,
    clock: ManualClock,
    cancel: CancelToken,
    exporter: CapturingExporter,
    events: Vec<RunProgressEvent>,
}

impl Bench {
    fn new(probe: ScriptedTemperatureSource) -> Self {
        Self {
            probe,
            supply: RecordingPowerSink::default(),
            clock: ManualClock::default(),
            cancel: CancelToken::new(),
            exporter: CapturingExporter::default(),
            events: Vec::new(),
        }
    }

    fn run(&mut self, config: &BenchConfig) -> RunReport {
        let events = &mut self.events;
        let mut on_event = |e: RunProgressEvent| events.push(e);
        execute_run(
            config,
            &mut self.probe,
            &mut self.supply,
            &mut self.clock,
            &self.cancel,
            &mut self.exporter,
            Path::new("unused"),
            Some(&mut on_event),
        )
        .expect("config is valid")
    }
}

fn voltages(run: &Run) -> Vec<f64> {
    run.samples.iter().map(|s| s.set_voltage).collect()
}

#[test]
fn scenario_a_normal_completion() {
    let mut bench = Bench::new(ScriptedTemperatureSource::constant(25.0));
    let report = bench.run(&BenchConfig::default());
    let run = &report.run;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.samples.len(), 120);
    assert!(run.samples.iter().all(|s| s.mode == ControlMode::Ramping));
    assert_eq!(run.transition_tick, None);
    assert_eq!(run.final_set_voltage(), Some(6.0));

    let v = voltages(run);
    assert!(v.windows(2).all(|w| w[1] >= w[0]));
    assert!(v.iter().all(|&x| (0.0..=6.0).contains(&x)));

    let ticks: Vec<u64> = run.samples.iter().map(|s| s.tick).collect();
    assert_eq!(ticks, (1..=120).collect::<Vec<_>>());

    assert_eq!(bench.exporter.exported.len(), 1);
    assert_eq!(bench.supply.disable_count(), 1);
    assert_eq!(bench.supply.close_count(), 1);
    assert_eq!(bench.probe.closes(), 1);
}

#[test]
fn scenario_b_early_transition() {
    let mut script = vec![ScriptedReading::Value(25.0); 4];
    script.push(ScriptedReading::Value(20.05));
    let mut bench = Bench::new(ScriptedTemperatureSource::sequence(script));
    let config = BenchConfig::default();

    let report = bench.run(&config);
    let run = &report.run;

    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.transition_tick, Some(5));
    for s in &run.samples[..5] {
        assert_eq!(s.mode, ControlMode::Ramping, "tick {}", s.tick);
    }
    for s in &run.samples[5..] {
        assert_eq!(s.mode, ControlMode::Regulating, "tick {}", s.tick);
    }
    assert!((run.samples[4].set_voltage - 0.25).abs() < 1e-12);

    // After the switch, commands follow the regulator, not the ramp.
    let regulator = PidRegulator::new(PidGains::default(), 12.0).unwrap();
    let mut state = PidState::default();
    for s in &run.samples[5..] {
        let step = regulator.step(&state, 20.0, 20.05);
        state = step.state;
        assert_eq!(s.set_voltage, step.command, "tick {}", s.tick);
    }

    let transitions = bench
        .events
        .iter()
        .filter(|e| matches!(e, RunProgressEvent::Transition { tick: 5, .. }))
        .count();
    assert_eq!(transitions, 1);
}

#[test]
fn scenario_c_cancellation() {
    let cancel = CancelToken::new();
    let hook_token = cancel.clone();
    let probe = ScriptedTemperatureSource::constant(25.0).with_hook_at(30, move || hook_token.cancel());
    let mut bench = Bench::new(probe);
    bench.cancel = cancel;

    let report = bench.run(&BenchConfig::default());

    assert_eq!(report.status(), RunStatus::Interrupted);
    assert_eq!(report.run.samples.len(), 30);
    assert_eq!(bench.probe.reads(), 30);
    assert_eq!(bench.supply.set_voltages().len(), 30);
    assert_eq!(bench.supply.disable_count(), 1);
    assert_eq!(bench.supply.close_count(), 1);
    assert_eq!(bench.probe.closes(), 1);
    assert_eq!(bench.exporter.exported, vec![report.run.samples.clone()]);
}

#[test]
fn scenario_d_instrument_fault() {
    let mut bench = Bench::new(ScriptedTemperatureSource::constant(25.0));
    bench.supply = RecordingPowerSink::default().fail_voltage_query_on(10);

    let report = bench.run(&BenchConfig::default());

    assert_eq!(report.status(), RunStatus::Failed);
    assert_eq!(report.run.samples.len(), 9);
    assert!(report.run.failure.as_deref().unwrap().contains("voltage query"));
    assert_eq!(bench.exporter.exported.len(), 1);
    assert_eq!(bench.exporter.exported[0].len(), 9);
    assert_eq!(bench.supply.disable_count(), 1);
    assert_eq!(bench.supply.close_count(), 1);
    assert_eq!(bench.probe.closes(), 1);
}

#[test]
fn absent_readings_while_regulating_hold_command() {
    let mut script = vec![ScriptedReading::Value(25.0); 4];
    script.extend([
        ScriptedReading::Value(19.95),
        ScriptedReading::Value(19.95),
        ScriptedReading::Absent,
        ScriptedReading::Absent,
        ScriptedReading::Value(19.95),
    ]);
    let mut bench = Bench::new(ScriptedTemperatureSource::sequence(script));
    let mut config = BenchConfig::default();
    config.run.duration_s = 10.0;

    let report = bench.run(&config);
    let s = &report.run.samples;

    assert_eq!(report.run.transition_tick, Some(5));
    assert_eq!(s[6].temperature, None);
    assert_eq!(s[7].temperature, None);
    assert_eq!(s[6].mode, ControlMode::Regulating);
    assert_eq!(s[6].set_voltage, s[5].set_voltage);
    assert_eq!(s[7].set_voltage, s[5].set_voltage);

    // Tick 9 continues from the regulator state left by tick 6.
    let regulator = PidRegulator::new(PidGains::default(), 12.0).unwrap();
    let tick6 = regulator.step(&PidState::default(), 20.0, 19.95);
    assert_eq!(s[5].set_voltage, tick6.command);
    let tick9 = regulator.step(&tick6.state, 20.0, 19.95);
    assert_eq!(s[8].set_voltage, tick9.command);
    assert_ne!(tick9.command, tick6.command);
}

#[test]
fn probe_fault_fails_run() {
    let script = vec![
        ScriptedReading::Value(25.0),
        ScriptedReading::Absent,
        ScriptedReading::Fault,
    ];
    let mut bench = Bench::new(ScriptedTemperatureSource::sequence(script));

    let report = bench.run(&BenchConfig::default());

    assert_eq!(report.status(), RunStatus::Failed);
    assert_eq!(report.run.samples.len(), 2);
    assert_eq!(report.run.samples[1].temperature, None);
    assert_eq!(bench.supply.disable_count(), 1);
}

#[test]
fn cleanup_continues_past_disable_failure() {
    let mut bench = Bench::new(ScriptedTemperatureSource::constant(25.0));
    bench.supply = RecordingPowerSink::default().fail_disable();
    let mut config = BenchConfig::default();
    config.run.duration_s = 3.0;

    let report = bench.run(&config);

    assert_eq!(report.status(), RunStatus::Completed);
    assert_eq!(bench.supply.disable_count(), 1);
    assert_eq!(bench.supply.close_count(), 1);
    assert_eq!(bench.probe.closes(), 1);
}

#[test]
fn duration_is_measured_in_time_not_ticks() {
    let mut bench = Bench::new(ScriptedTemperatureSource::constant(25.0));
    let mut config = BenchConfig::default();
    config.run.tick_period_ms = 2000;

    let report = bench.run(&config);

    assert_eq!(report.run.samples.len(), 60);
    assert_eq!(report.run.samples.last().unwrap().elapsed_s, 118.0);
}

#[test]
fn invalid_config_releases_devices_without_driving_them() {
    let mut bench = Bench::new(ScriptedTemperatureSource::constant(25.0));
    let mut config = BenchConfig::default();
    config.ramp.target_voltage = 20.0;

    let events = &mut bench.events;
    let mut on_event = |e: RunProgressEvent| events.push(e);
    let result = execute_run(
        &config,
        &mut bench.probe,
        &mut bench.supply,
        &mut bench.clock,
        &bench.cancel,
        &mut bench.exporter,
        Path::new("unused"),
        Some(&mut on_event),
    );

    assert!(result.is_err());
    assert_eq!(
        bench.supply.calls(),
        &[SinkCall::DisableOutput, SinkCall::Close]
    );
    assert_eq!(bench.probe.reads(), 0);
    assert_eq!(bench.probe.closes(), 1);
    assert!(bench.exporter.exported.is_empty());
    assert!(bench.events.is_empty());
}

#[test]
fn progress_events_bracket_the_run() {
    let mut bench = Bench::new(ScriptedTemperatureSource::constant(25.0));
    let mut config = BenchConfig::default();
    config.run.duration_s = 5.0;

    bench.run(&config);

    assert!(matches!(bench.events.first(), Some(RunProgressEvent::Started { .. })));
    assert!(matches!(
        bench.events.last(),
        Some(RunProgressEvent::Finished {
            status: RunStatus::Completed,
            samples: 5
        })
    ));
    let ticks = bench
        .events
        .iter()
        .filter(|e| matches!(e, RunProgressEvent::Tick(_)))
        .count();
    assert_eq!(ticks, 5);
}

#[test]
fn failed_run_is_written_with_error_names() {
    let output_dir = unique_temp_dir("tr_app_failed_run");
    let mut probe = ScriptedTemperatureSource::constant(25.0);
    let mut supply = RecordingPowerSink::default().fail_voltage_query_on(4);
    let mut clock = ManualClock::default();

    let report = execute_run(
        &BenchConfig::default(),
        &mut probe,
        &mut supply,
        &mut clock,
        &CancelToken::new(),
        &mut DirectoryExporter,
        &output_dir,
        None,
    )
    .unwrap();

    assert_eq!(report.status(), RunStatus::Failed);
    let artifacts = report.export.expect("export should succeed");
    assert!(artifacts.data_file.ends_with("power_supply_temp_log_ERROR.csv"));
    assert!(artifacts.plot_file.unwrap().is_file());

    let (manifest, samples) = tr_app::load_run(&output_dir).unwrap();
    assert_eq!(manifest.status, RunStatus::Failed);
    assert_eq!(samples.len(), 3);
}
