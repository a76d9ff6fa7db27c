/// Plot script generation and the gnuplot process that renders it
use log::debug;
use std::fmt::Write as _;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::models::{Reading, TemperatureUnit, TimeRange};
use crate::series::{min_max_humidity, min_max_temperature, min_max_value, Series};
use crate::utils::format_plot_time;

const PLOT_BUFFER: f64 = 2.0;
const POINT_STYLE: &str = "with linespoints pt 7 ps 1.5";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotKind {
    #[default]
    Both,
    Temperature,
    Humidity,
}

impl PlotKind {
    pub fn name(&self) -> &'static str {
        match self {
            PlotKind::Both => "BOTH",
            PlotKind::Temperature => "TEMPERATURE",
            PlotKind::Humidity => "HUMIDITY",
        }
    }
}

fn write_block<F>(script: &mut String, series: &Series, value: F)
where
    F: Fn(&Reading) -> f64,
{
    for reading in series {
        let _ = writeln!(
            script,
            "{} {:.2}",
            format_plot_time(&reading.timestamp()),
            value(reading)
        );
    }
    script.push_str("e\n");
}

/// Build the gnuplot script for `series` over `range`
///
/// Readings are sorted by time first. Returns None for an empty series
/// or a range that does not name real calendar hours.
pub fn plot_script(
    series: Series,
    range: &TimeRange,
    kind: PlotKind,
    unit: TemperatureUnit,
) -> Option<String> {
    let series = series.sorted();
    let bounds = match kind {
        PlotKind::Both => min_max_value(&series, PLOT_BUFFER, unit),
        PlotKind::Temperature => min_max_temperature(&series, PLOT_BUFFER, unit),
        PlotKind::Humidity => min_max_humidity(&series, PLOT_BUFFER),
    }?;
    let (start, end) = range.bounds().ok()?;

    let mut script = String::new();
    script.push_str("set terminal wxt\n");
    script.push_str("set xdata time\n");
    script.push_str("set timefmt '%Y-%m-%d%H:%M:%S'\n");
    script.push_str("set format x '%H:%M'\n");
    script.push_str("set xlabel 'Time'\n");
    let _ = writeln!(
        script,
        "set xrange ['{}':'{}']",
        format_plot_time(&start),
        format_plot_time(&end)
    );
    let _ = writeln!(
        script,
        "set yrange [{:.6}:{:.6}]",
        bounds.min - PLOT_BUFFER,
        bounds.max + PLOT_BUFFER
    );

    let symbol = unit.symbol();
    match kind {
        PlotKind::Both => {
            let _ = writeln!(script, "set ylabel 'Temperature ({symbol}) / Humidity'");
            let _ = writeln!(
                script,
                "plot '-' using 1:2 title 'Temperature' {POINT_STYLE}, '-' using 1:2 title 'Humidity' {POINT_STYLE}"
            );
        }
        PlotKind::Temperature => {
            let _ = writeln!(script, "set ylabel 'Temperature ({symbol})'");
            let _ = writeln!(script, "plot '-' using 1:2 title 'Temperature' {POINT_STYLE}");
        }
        PlotKind::Humidity => {
            script.push_str("set ylabel 'Humidity'\n");
            let _ = writeln!(script, "plot '-' using 1:2 title 'Humidity' {POINT_STYLE}");
        }
    }

    if kind != PlotKind::Humidity {
        write_block(&mut script, &series, |r| r.temperature(unit));
    }
    if kind != PlotKind::Temperature {
        write_block(&mut script, &series, |r| r.humidity());
    }

    Some(script)
}

/// Feed `script` to a persistent gnuplot window
pub async fn spawn_plot(script: &str) -> Result<(), String> {
    let mut child = Command::new("gnuplot")
        .arg("-persistent")
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|e| format!("Failed to open gnuplot: {}", e))?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or("Failed to open gnuplot stdin")?;
    stdin
        .write_all(script.as_bytes())
        .await
        .map_err(|e| format!("Failed to write plot script: {}", e))?;
    // Closing stdin lets gnuplot finish reading and exit
    drop(stdin);

    let status = child
        .wait()
        .await
        .map_err(|e| format!("gnuplot did not exit cleanly: {}", e))?;
    debug!("gnuplot exited with {}", status);
    Ok(())
}
