use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tr_app::{
    AppResult, BenchConfig, ConfigOverrides, RunProgressEvent, RunReport, get_run_summary,
    list_runs, load_config, load_run, run_bench, save_config, validate_config,
};
use tr_devices::{find_port, list_ports};
use tr_results::{RunStatus, Sample};

#[derive(Parser)]
#[command(name = "tr-cli")]
#[command(about = "Thermoramp - PT100 heater ramp and PID regulation bench", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ramp the supply and regulate the probe temperature
    Run {
        /// Bench config YAML (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Run duration in seconds
        #[arg(long)]
        duration: Option<f64>,
        /// Target temperature in °C
        #[arg(long)]
        target_temp: Option<f64>,
        /// Directory that receives the run's output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List serial ports and which ones discovery would pick
    Ports {
        /// Bench config YAML providing the description patterns
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Show details of a stored run
    ShowRun {
        /// Run output directory
        dir: PathBuf,
    },
    /// List stored runs
    Runs {
        /// Output root to scan
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
    /// Write the default bench config
    InitConfig {
        /// Destination YAML file
        path: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            duration,
            target_temp,
            output,
        } => cmd_run(
            config.as_deref(),
            ConfigOverrides {
                duration_s: duration,
                target_temperature_c: target_temp,
                output_root: output,
            },
        ),
        Commands::Ports { config } => cmd_ports(config.as_deref()).map(|_| ExitCode::SUCCESS),
        Commands::ShowRun { dir } => cmd_show_run(&dir).map(|_| ExitCode::SUCCESS),
        Commands::Runs { output } => cmd_runs(&output).map(|_| ExitCode::SUCCESS),
        Commands::InitConfig { path } => cmd_init_config(&path).map(|_| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_or_default(path: Option<&Path>) -> AppResult<BenchConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(BenchConfig::default()),
    }
}

fn cmd_run(config_path: Option<&Path>, overrides: ConfigOverrides) -> AppResult<ExitCode> {
    let config = load_or_default(config_path)?.with_overrides(&overrides);
    validate_config(&config)?;

    let report = run_bench(&config, Some(&mut print_progress))?;
    print_outcome(&report);

    Ok(match report.status() {
        RunStatus::Failed => ExitCode::FAILURE,
        RunStatus::Completed | RunStatus::Interrupted => ExitCode::SUCCESS,
    })
}

fn print_progress(event: RunProgressEvent) {
    match event {
        RunProgressEvent::Started {
            output_dir,
            duration_s,
        } => {
            println!("Output directory: {}", output_dir.display());
            println!("Running for {duration_s:.0}s. Press Ctrl+C to stop.");
        }
        RunProgressEvent::Tick(sample) => print_sample(&sample),
        RunProgressEvent::Transition { temperature, .. } => {
            println!("\nTarget temperature reached at {temperature:.2}°C! Switching to PID control.");
        }
        RunProgressEvent::Finished { .. } => {}
    }
}

fn print_sample(sample: &Sample) {
    println!("\nElapsed time: {:.1}s", sample.elapsed_s);
    println!("Time: {}", sample.timestamp.format("%H:%M:%S"));
    println!("Set Voltage: {:.3}V", sample.set_voltage);
    println!("Measured Voltage: {:.3}V", sample.measured_voltage);
    println!("Measured Current: {:.3}A", sample.measured_current);
    match sample.temperature {
        Some(t) => println!("Temperature: {t:.2}°C"),
        None => println!("Temperature: Reading Error"),
    }
    println!("{}", "-".repeat(50));
}

fn print_outcome(report: &RunReport) {
    let run = &report.run;
    let (data_label, plot_label) = match run.status {
        RunStatus::Completed => {
            println!("\nMeasurement complete!");
            ("Data", "Plots")
        }
        RunStatus::Interrupted => {
            println!("\nProgram interrupted by user.");
            ("Partial data", "Partial plots")
        }
        RunStatus::Failed => {
            println!(
                "\nAn error occurred: {}",
                run.failure.as_deref().unwrap_or("unknown failure")
            );
            ("Partial data", "Partial plots")
        }
    };

    match &report.export {
        Ok(artifacts) => {
            println!("{data_label} saved to: {}", artifacts.data_file.display());
            match &artifacts.plot_file {
                Some(plot) => println!("{plot_label} saved to: {}", plot.display()),
                None => println!("No plots written ({} samples)", run.samples.len()),
            }
        }
        Err(e) => eprintln!("Failed to save run data: {e}"),
    }
}

fn cmd_ports(config_path: Option<&Path>) -> AppResult<()> {
    let config = load_or_default(config_path)?;
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }

    let probe = find_port(&ports, &config.devices.probe.description);
    let supply = find_port(&ports, &config.devices.supply.description);

    println!("Serial ports:");
    for port in &ports {
        let mut roles = Vec::new();
        if probe.is_some_and(|p| p.port_name == port.port_name) {
            roles.push("probe");
        }
        if supply.is_some_and(|p| p.port_name == port.port_name) {
            roles.push("supply");
        }
        let roles = if roles.is_empty() {
            String::new()
        } else {
            format!("  <- {}", roles.join(", "))
        };
        println!("  {} - {}{}", port.port_name, port.description, roles);
    }

    for (role, pattern, found) in [
        ("probe", &config.devices.probe.description, probe),
        ("supply", &config.devices.supply.description, supply),
    ] {
        if found.is_none() {
            println!("No port matches {role} pattern '{pattern}'");
        }
    }
    Ok(())
}

fn cmd_show_run(dir: &Path) -> AppResult<()> {
    println!("Loading run: {}", dir.display());

    let (manifest, samples) = load_run(dir)?;
    let summary = get_run_summary(&manifest, &samples);

    println!("\nRun Summary:");
    println!("  Run: {}", manifest.run_id);
    println!("  Status: {}", summary.status);
    if let Some(failure) = &manifest.failure {
        println!("  Failure: {failure}");
    }
    println!(
        "  Started: {}",
        manifest.started_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!("  Samples: {}", summary.sample_count);
    println!("  Duration: {:.1} s", summary.last_elapsed_s);
    println!("  Missing readings: {}", summary.absent_readings);
    if let Some((lo, hi)) = summary.temperature_range {
        println!("  Temperature range: {lo:.2} - {hi:.2} °C");
    }
    if let Some(v) = summary.peak_set_voltage {
        println!("  Peak set voltage: {v:.3} V");
    }
    if let Some(v) = summary.final_set_voltage {
        println!("  Final set voltage: {v:.3} V");
    }
    match summary.transition_tick {
        Some(tick) => println!("  Switched to PID at tick {tick}"),
        None => println!("  Never switched to PID"),
    }

    println!("\nFiles:");
    println!("  {}", manifest.data_file);
    if let Some(plot) = &manifest.plot_file {
        println!("  {plot}");
    }
    Ok(())
}

fn cmd_runs(output_root: &Path) -> AppResult<()> {
    let runs = list_runs(output_root)?;

    if runs.is_empty() {
        println!("No runs found under: {}", output_root.display());
    } else {
        println!("Runs under '{}':", output_root.display());
        for run in runs {
            println!(
                "  {} ({}, {} samples)",
                run.manifest.run_id, run.manifest.status, run.manifest.sample_count
            );
        }
    }
    Ok(())
}

fn cmd_init_config(path: &Path) -> AppResult<()> {
    save_config(path, &BenchConfig::default())?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(())
}
