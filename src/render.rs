use super::{IMAGE_HEIGHT, IMAGE_WIDTH, YRANGE_MAX, YRANGE_MIN};
use crate::gnuplot::{ChartSettings, PlotDescriptor, Smoothing, MISSING_TOKENS};
use crate::utils::*;
use chrono::NaiveTime;
use plotters::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

pub const RENDERERS: [&str; 2] = ["gnuplot", "plotters"];

/// Everything a renderer may need: the script for script driven renderers,
/// the data table and series list for the ones that draw by themselves.
#[derive(Debug, Clone, Copy)]
pub struct RenderJob<'a> {
    pub script: &'a Path,
    pub scratch: &'a Path,
    pub data: &'a Path,
    pub settings: &'a ChartSettings,
    pub descriptor: &'a PlotDescriptor,
}

/// Exit status and captured output of one rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub status: i32,
    pub output: String,
}

impl RenderOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Turns a render job into an image.
/// A non-zero status in the output is not an error for the renderer itself,
/// `run_renderer` decides what to do with it.
pub trait Renderer {
    fn name(&self) -> &str;
    fn render(&self, job: &RenderJob) -> Result<RenderOutput, PlotError>;
}

/// Run the renderer once and turn a non-zero status into an error
/// carrying the captured output.
pub fn run_renderer(renderer: &dyn Renderer, job: &RenderJob) -> Result<RenderOutput, PlotError> {
    let out = renderer.render(job)?;
    if !out.success() {
        return Err(PlotError::Renderer {
            renderer: renderer.name().to_string(),
            status: out.status,
            output: out.output,
        });
    }
    Ok(out)
}

/// Pick a renderer by the name given on the command line.
pub fn renderer_by_name(name: &str, gnuplot_program: &str) -> Box<dyn Renderer> {
    match name {
        "plotters" => Box::new(PlottersRenderer),
        _ => Box::new(Gnuplot::new(gnuplot_program)),
    }
}

/// The external gnuplot program, run on the script with the C locale.
#[derive(Debug, Clone)]
pub struct Gnuplot {
    pub program: String,
}

impl Gnuplot {
    pub fn new(program: &str) -> Gnuplot {
        Gnuplot {
            program: program.to_string(),
        }
    }
}

impl Renderer for Gnuplot {
    fn name(&self) -> &str {
        &self.program
    }

    fn render(&self, job: &RenderJob) -> Result<RenderOutput, PlotError> {
        debug!("run: LC_ALL=C {} {}", self.program, job.script.display());
        let out = Command::new(&self.program)
            .arg(job.script)
            .env("LC_ALL", "C")
            .output()
            .map_err(|e| PlotError::Spawn {
                program: self.program.clone(),
                source: e,
            })?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        // killed by a signal, no exit code
        let status = out.status.code().unwrap_or(-1);
        if status != 0 {
            debug!("return status: [{}]", status);
        }
        Ok(RenderOutput {
            status,
            output: output.trim_end().to_string(),
        })
    }
}

/// Draws the chart in-process with plotters, without any script.
/// Lines are always straight.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlottersRenderer;

impl Renderer for PlottersRenderer {
    fn name(&self) -> &str {
        "plotters"
    }

    fn render(&self, job: &RenderJob) -> Result<RenderOutput, PlotError> {
        if job.settings.smoothing != Smoothing::None {
            warn!(
                "the plotters renderer does not support {:?} smoothing, drawing straight lines",
                job.settings.smoothing
            );
        }
        let out = match draw(job) {
            Ok(()) => RenderOutput {
                status: 0,
                output: String::new(),
            },
            Err(e) => RenderOutput {
                status: 1,
                output: e.to_string(),
            },
        };
        Ok(out)
    }
}

/// Seconds since the first midnight for a `HH:MM:SS` time,
/// hours may go past 24 after the wrap correction.
pub fn parse_clock(time: &str) -> Option<f64> {
    let mut parts = time.split(':');
    let h: u32 = parts.next()?.parse().ok()?;
    let m: u32 = parts.next()?.parse().ok()?;
    let s: f64 = match parts.next() {
        Some(s) => s.parse().ok()?,
        None => 0.,
    };
    if parts.next().is_some() || !s.is_finite() {
        return None;
    }
    Some(h as f64 * 3600. + m as f64 * 60. + s)
}

/// `HH:MM` label for an axis position, wrapping at midnight.
pub fn clock_label(secs: f64) -> String {
    let secs = (secs.floor() as i64).rem_euclid(86400) as u32;
    match NaiveTime::from_num_seconds_from_midnight_opt(secs, 0) {
        Some(t) => t.format("%H:%M").to_string(),
        None => String::new(),
    }
}

/// A table value scaled for display, None for the missing tokens and garbage.
fn table_value(token: &str, scale: f64) -> Option<f64> {
    if MISSING_TOKENS.contains(&token) {
        return None;
    }
    match token.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v * scale),
        _ => None,
    }
}

/// Read the normalized table back: one time vector and one value vector per series.
/// Rows with an unreadable time are dropped.
pub fn read_table(
    data: &Path,
    descriptor: &PlotDescriptor,
) -> Result<(Vec<f64>, Vec<Vec<Option<f64>>>), PlotError> {
    let file = File::open(data).map_err(|e| PlotError::io("open", data, e))?;
    let buf = BufReader::new(file);
    let scales: Vec<f64> = descriptor.series.iter().map(|e| e.scale.value()).collect();
    let mut times: Vec<f64> = Vec::new();
    let mut columns: Vec<Vec<Option<f64>>> = vec![Vec::new(); descriptor.series.len()];
    for l in buf.lines() {
        let line = l.map_err(|e| PlotError::io("read", data, e))?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        let time = match fields
            .get(descriptor.time_column - 1)
            .and_then(|t| parse_clock(t))
        {
            Some(t) => t,
            None => continue,
        };
        times.push(time);
        for ((entry, scale), column) in descriptor
            .series
            .iter()
            .zip(scales.iter())
            .zip(columns.iter_mut())
        {
            column.push(
                fields
                    .get(entry.column - 1)
                    .and_then(|v| table_value(v, *scale)),
            );
        }
    }
    Ok((times, columns))
}

/// Split a series on its missing values, so gaps are not bridged.
fn segments(times: &[f64], values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut segments: Vec<Vec<(f64, f64)>> = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    for (t, v) in times.iter().zip(values.iter()) {
        match v {
            Some(y) => current.push((*t, *y)),
            None => {
                if !current.is_empty() {
                    segments.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

fn draw(job: &RenderJob) -> Result<(), Box<dyn std::error::Error>> {
    let (times, columns) = read_table(job.data, job.descriptor)?;
    let (xmin, xmax) = match min_and_max(times.iter()) {
        Some((a, b)) if b > a => (a, b),
        Some((a, _)) => (a, a + 60.),
        None => (0., 60.),
    };
    let root = BitMapBackend::new(&job.settings.output, (IMAGE_WIDTH, IMAGE_HEIGHT))
        .into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(&job.settings.title, ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(xmin..xmax, YRANGE_MIN..YRANGE_MAX)?;
    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(RGBColor(100, 100, 100).mix(0.5).stroke_width(1))
        .set_all_tick_mark_size(2)
        .label_style(("sans-serif", 16))
        .x_labels(12)
        .y_labels(22)
        .x_label_formatter(&|x: &f64| clock_label(*x))
        .y_label_formatter(&|y: &f64| format!("{}", y))
        .draw()?;
    for (i, (entry, values)) in job.descriptor.series.iter().zip(columns.iter()).enumerate() {
        let color = Palette99::pick(i).to_rgba();
        for (k, segment) in segments(&times, values).into_iter().enumerate() {
            let anno = chart.draw_series(LineSeries::new(segment, color.stroke_width(2)))?;
            if k == 0 {
                anno.label(entry.label()).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
        }
    }
    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gnuplot::SeriesEntry;
    use crate::scale::ScaleFactor;
    use std::fs;
    use std::path::PathBuf;

    struct Failing;

    impl Renderer for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn render(&self, _job: &RenderJob) -> Result<RenderOutput, PlotError> {
            Ok(RenderOutput {
                status: 3,
                output: "line 1: unknown command".into(),
            })
        }
    }

    fn descriptor() -> PlotDescriptor {
        PlotDescriptor {
            time_column: 1,
            series: vec![
                SeriesEntry {
                    column: 2,
                    scale: ScaleFactor::ONE,
                    title: "A".into(),
                    max: 20.,
                },
                SeriesEntry {
                    column: 3,
                    scale: ScaleFactor { exponent: -2 },
                    title: "B".into(),
                    max: 10000.,
                },
            ],
        }
    }

    fn settings() -> ChartSettings {
        ChartSettings {
            output: PathBuf::from("unused.png"),
            title: "t".into(),
            smoothing: Smoothing::None,
        }
    }

    #[test]
    fn non_zero_status_is_an_error() {
        let d = descriptor();
        let s = settings();
        let p = Path::new("unused");
        let job = RenderJob {
            script: p,
            scratch: p,
            data: p,
            settings: &s,
            descriptor: &d,
        };
        match run_renderer(&Failing, &job) {
            Err(PlotError::Renderer {
                renderer,
                status,
                output,
            }) => {
                assert_eq!(renderer, "failing");
                assert_eq!(status, 3);
                assert_eq!(output, "line 1: unknown command");
            }
            other => panic!("expected a renderer error, got {:?}", other),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let d = descriptor();
        let s = settings();
        let p = Path::new("unused");
        let job = RenderJob {
            script: p,
            scratch: p,
            data: p,
            settings: &s,
            descriptor: &d,
        };
        let gp = Gnuplot::new("tcsv2png-no-such-program");
        assert!(matches!(gp.render(&job), Err(PlotError::Spawn { .. })));
    }

    #[test]
    fn clock_parsing_and_labels() {
        assert_eq!(parse_clock("00:00:01"), Some(1.));
        assert_eq!(parse_clock("24:01:00"), Some(86460.));
        assert_eq!(parse_clock("01:02:03.5"), Some(3723.5));
        assert_eq!(parse_clock("garbage"), None);
        assert_eq!(parse_clock("1:2:3:4"), None);
        assert_eq!(clock_label(3723.5), "01:02");
        assert_eq!(clock_label(86460.), "00:01");
    }

    #[test]
    fn table_is_read_back_scaled() {
        let dir = make_scratch_dir("tcsv2png_render_test_").unwrap();
        let data = dir.join("t.dat");
        fs::write(&data, "00:00:01 10 5000\n00:00:02 Infinity 10000\nbad 1 1\n00:00:03 NaN x\n").unwrap();
        let (times, columns) = read_table(&data, &descriptor()).unwrap();
        assert_eq!(times, vec![1., 2., 3.]);
        assert_eq!(columns[0], vec![Some(10.), None, None]);
        assert_eq!(columns[1], vec![Some(50.), Some(100.), None]);
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn gaps_split_segments() {
        let times = [1., 2., 3., 4., 5.];
        let values = [Some(1.), Some(2.), None, Some(4.), None];
        let s = segments(&times, &values);
        assert_eq!(s, vec![vec![(1., 1.), (2., 2.)], vec![(4., 4.)]]);
    }
}
