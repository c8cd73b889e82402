use anyhow::{Context, Result};
use std::io;
use tcsv2png::render::renderer_by_name;
use tcsv2png::tcsv2png::parse_cli;
use tcsv2png::utils::{absolute, make_scratch_dir};
use tcsv2png::{TimedCsv, SCRATCH_PREFIX};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let mut opts = parse_cli();

    let default_level = if opts.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    // the script changes directory before plotting
    opts.output = absolute(&opts.output)?;
    debug!("{:?}", opts);

    let scratch = make_scratch_dir(SCRATCH_PREFIX)?;
    debug!("using tmp dir: {}", scratch.display());

    let renderer = renderer_by_name(&opts.renderer, &opts.gnuplot);
    let tc = TimedCsv::new(&opts.csvin, opts.cols.clone());
    let png = tc
        .plot(&opts.chart_settings(), &scratch, renderer.as_ref())
        .with_context(|| format!("could not chart {}", opts.csvin.display()))?;
    println!("{} done.", png.display());
    Ok(())
}
