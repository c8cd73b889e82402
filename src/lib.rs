use crate::gnuplot::{write_script, ChartSettings, PlotDescriptor};
use crate::normalize::{normalize, Normalized};
use crate::render::{run_renderer, RenderJob, Renderer};
use crate::utils::*;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
pub mod gnuplot;
pub mod normalize;
pub mod render;
pub mod scale;
pub mod tcsv2png;
pub mod utils;

// constants
pub const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");
pub const IMAGE_WIDTH: u32 = 1024;
pub const IMAGE_HEIGHT: u32 = 768;
pub const YRANGE_MIN: f64 = 0.;
pub const YRANGE_MAX: f64 = 105.;
/// Scaled series peaks stay at or below this value.
pub const DISPLAY_BAND: f64 = 110.;
pub const SCRATCH_PREFIX: &str = "tcsv2png_";
pub const SCRIPT_NAME: &str = "script.gplot";

/// A csv file with a time column and the columns selected for the chart.
/// Column 0 of the selection is the time, an empty selection means all columns.
#[derive(Debug, Clone)]
pub struct TimedCsv {
    pub csv_path: PathBuf,
    pub cols: Vec<usize>,
}

impl TimedCsv {
    pub fn new<P>(csv_path: P, cols: Vec<usize>) -> TimedCsv
    where
        P: AsRef<Path>,
    {
        TimedCsv {
            csv_path: csv_path.as_ref().to_path_buf(),
            cols,
        }
    }

    /// The data table name inside the scratch directory, `<input stem>.dat`.
    pub fn table_path(&self, scratch: &Path) -> PathBuf {
        let stem = self
            .csv_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data".to_string());
        scratch.join(format!("{}.dat", stem))
    }

    /// Stream the csv once into the data table,
    /// returning the titles, resolved columns and per series maxima.
    pub fn normalize(&self, scratch: &Path) -> Result<(Normalized, PathBuf), PlotError> {
        debug!("processing: {}", self.csv_path.display());
        let file = File::open(&self.csv_path).map_err(|e| PlotError::io("open", &self.csv_path, e))?;
        let table_path = self.table_path(scratch);
        let table = File::create(&table_path).map_err(|e| PlotError::io("create", &table_path, e))?;
        let normalized = normalize(
            BufReader::new(file),
            BufWriter::new(table),
            &self.cols,
            &self.csv_path,
            &table_path,
        )?;
        debug!(
            "{} rows written to {}, {} skipped",
            normalized.rows,
            table_path.display(),
            normalized.skipped
        );
        Ok((normalized, table_path))
    }

    /// Run the whole pipeline: normalize, scale, write the script and render.
    /// Return the absolute path of the chart.
    pub fn plot(
        &self,
        settings: &ChartSettings,
        scratch: &Path,
        renderer: &dyn Renderer,
    ) -> Result<PathBuf, PlotError> {
        let (normalized, table_path) = self.normalize(scratch)?;
        let descriptor = PlotDescriptor::from_normalized(&normalized);
        for e in descriptor.series.iter() {
            debug!("series {}: max {}, scale {}", e.title, e.max, e.scale);
        }
        let script_path = write_script(settings, scratch, &table_path, &descriptor)?;
        debug!("script written to {}", script_path.display());
        let job = RenderJob {
            script: &script_path,
            scratch,
            data: &table_path,
            settings,
            descriptor: &descriptor,
        };
        run_renderer(renderer, &job)?;
        let png = absolute(&settings.output)?;
        info!("chart written to {}", png.display());
        Ok(png)
    }
}
