use super::{IMAGE_HEIGHT, IMAGE_WIDTH, YRANGE_MAX, YRANGE_MIN};
use crate::normalize::Normalized;
use crate::scale::{scale_all, ScaleFactor};
use crate::utils::*;
use std::fs;
use std::path::{Path, PathBuf};

pub const TIME_INPUT_FMT: &str = "%H:%M:%S";
pub const TIME_DISPLAY_FMT: &str = "%H:%M";
pub const MISSING_TOKENS: [&str; 2] = ["NaN", "Infinity"];

/// How the renderer joins the points of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Smoothing {
    #[default]
    None,
    Bezier,
    Csplines,
}

impl Smoothing {
    /// The text appended to each plot clause, empty for straight lines.
    pub fn as_gnuplot(&self) -> &'static str {
        match self {
            Smoothing::None => "",
            Smoothing::Bezier => "smooth bezier",
            Smoothing::Csplines => "smooth csplines",
        }
    }
}

/// One line of the chart.
/// `column` is the 1-based column in the data table.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesEntry {
    pub column: usize,
    pub scale: ScaleFactor,
    pub title: String,
    pub max: f64,
}

impl SeriesEntry {
    pub fn label(&self) -> String {
        format!("{} * {}", self.scale, self.title)
    }
}

/// The series list handed to a renderer, built once all maxima are known.
/// The time is always the first column of the data table.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotDescriptor {
    pub time_column: usize,
    pub series: Vec<SeriesEntry>,
}

impl PlotDescriptor {
    pub fn from_normalized(n: &Normalized) -> PlotDescriptor {
        let series = n
            .series_titles()
            .iter()
            .zip(n.maxes.iter())
            .zip(scale_all(&n.maxes))
            .enumerate()
            .map(|(i, ((title, max), scale))| SeriesEntry {
                column: i + 2,
                scale,
                title: title.clone(),
                max: *max,
            })
            .collect();
        PlotDescriptor {
            time_column: 1,
            series,
        }
    }
}

/// Chart level settings, fixed for the whole invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSettings {
    pub output: PathBuf,
    pub title: String,
    pub smoothing: Smoothing,
}

/// Build the gnuplot script: fixed preamble, then a single plot statement
/// with one clause per series.
pub fn script_text(
    settings: &ChartSettings,
    scratch: &Path,
    data: &Path,
    descriptor: &PlotDescriptor,
) -> String {
    let mut lines: Vec<String> = vec![
        format!("set terminal png size {},{}", IMAGE_WIDTH, IMAGE_HEIGHT),
        format!("set output {}", quote(&settings.output.to_string_lossy())),
        format!("set title {}", quote(&settings.title)),
        "set xdata time".to_string(),
        format!("set timefmt {}", quote(TIME_INPUT_FMT)),
        format!("set format x {}", quote(TIME_DISPLAY_FMT)),
        format!("set yrange [{}:{}]", YRANGE_MIN, YRANGE_MAX),
        "set grid".to_string(),
    ];
    for token in MISSING_TOKENS.iter() {
        lines.push(format!("set datafile missing {}", quote(token)));
    }
    lines.push(format!("cd {}", quote(&scratch.to_string_lossy())));
    let titles: Vec<&str> = descriptor.series.iter().map(|e| e.title.as_str()).collect();
    let maxes: Vec<f64> = descriptor.series.iter().map(|e| e.max).collect();
    lines.push(format!("# cols  {:?}", titles));
    lines.push(format!("# maxes {:?}", maxes));
    let data = quote(&data.to_string_lossy());
    let clauses: Vec<String> = descriptor
        .series
        .iter()
        .map(|e| {
            let mut clause = format!(
                "{} using {}:({}*${}) with lines title {}",
                data,
                descriptor.time_column,
                e.scale,
                e.column,
                quote(&e.label())
            );
            let smooth = settings.smoothing.as_gnuplot();
            if !smooth.is_empty() {
                clause.push(' ');
                clause.push_str(smooth);
            }
            clause
        })
        .collect();
    lines.push(format!("plot {}", clauses.join(",")));
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

/// Write the script next to the data table, return its path.
pub fn write_script(
    settings: &ChartSettings,
    scratch: &Path,
    data: &Path,
    descriptor: &PlotDescriptor,
) -> Result<PathBuf, PlotError> {
    let script_path = scratch.join(super::SCRIPT_NAME);
    let text = script_text(settings, scratch, data, descriptor);
    fs::write(&script_path, text).map_err(|e| PlotError::io("write", &script_path, e))?;
    Ok(script_path)
}
