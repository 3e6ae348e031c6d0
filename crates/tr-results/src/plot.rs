//! Four-panel measurement plot (SVG).
//!
//! Every panel plots temperature against one other quantity: elapsed time,
//! set voltage, measured voltage and measured current. Ticks without a
//! temperature reading are left out.

use crate::types::Sample;
use crate::{ResultsError, ResultsResult};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

struct Panel {
    title: &'static str,
    x_label: &'static str,
    x: fn(&Sample) -> f64,
    color: RGBColor,
}

const PANELS: [Panel; 4] = [
    Panel {
        title: "Temperature vs Time",
        x_label: "Time (seconds)",
        x: elapsed_s,
        color: BLUE,
    },
    Panel {
        title: "Temperature vs Set Voltage",
        x_label: "Set Voltage (V)",
        x: set_voltage,
        color: RED,
    },
    Panel {
        title: "Temperature vs Measured Voltage",
        x_label: "Measured Voltage (V)",
        x: measured_voltage,
        color: GREEN,
    },
    Panel {
        title: "Temperature vs Current",
        x_label: "Current (A)",
        x: measured_current,
        color: MAGENTA,
    },
];

fn elapsed_s(s: &Sample) -> f64 {
    s.elapsed_s
}

fn set_voltage(s: &Sample) -> f64 {
    s.set_voltage
}

fn measured_voltage(s: &Sample) -> f64 {
    s.measured_voltage
}

fn measured_current(s: &Sample) -> f64 {
    s.measured_current
}

fn plot_err(e: impl std::fmt::Display) -> ResultsError {
    ResultsError::Plot(e.to_string())
}

pub fn render_measurement_plots(path: &Path, samples: &[Sample]) -> ResultsResult<()> {
    let root = SVGBackend::new(path, (1500, 1000)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let areas = root.split_evenly((2, 2));
    for (area, panel) in areas.iter().zip(PANELS.iter()) {
        draw_panel(area, panel, samples)?;
    }

    root.present().map_err(plot_err)?;
    Ok(())
}

fn draw_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    panel: &Panel,
    samples: &[Sample],
) -> ResultsResult<()> {
    let points: Vec<(f64, f64)> = samples
        .iter()
        .filter_map(|s| s.temperature.map(|t| ((panel.x)(s), t)))
        .collect();

    let (x_min, x_max) = axis_range(points.iter().map(|p| p.0));
    let (y_min, y_max) = axis_range(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(panel.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(panel.x_label)
        .y_desc("Temperature (°C)")
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(points, &panel.color))
        .map_err(plot_err)?;
    Ok(())
}

/// Padded `[min, max]` of `values`, never empty or degenerate.
fn axis_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let pad = ((max - min) * 0.05).max(0.05);
    (min - pad, max + pad)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_range_handles_empty_and_flat() {
        assert_eq!(axis_range(std::iter::empty()), (0.0, 1.0));
        let (lo, hi) = axis_range([20.0, 20.0].into_iter());
        assert!(lo < 20.0 && hi > 20.0);
    }

    #[test]
    fn axis_range_covers_values() {
        let (lo, hi) = axis_range([1.0, 5.0, 3.0].into_iter());
        assert!(lo < 1.0);
        assert!(hi > 5.0);
    }
}
