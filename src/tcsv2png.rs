use super::VERSION;
use crate::gnuplot::{ChartSettings, Smoothing};
use crate::render::RENDERERS;
use clap::error::ErrorKind;
use clap::{value_parser, Arg, ArgAction, Command};
use std::ffi::OsString;
use std::path::PathBuf;

const ABOUT: &str = "Convert a csv file with a time column formatted %H:%M:%S into a png chart.
Every column is scaled by a power of ten so all of them fit the same chart.";

const AFTER_HELP: &str = "Column indices start at 0 and the first line must hold the column titles.
Fields are separated by tabs, spaces or semicolons.

Examples:
  tcsv2png data.csv
      creates data.png with all the columns, column 0 being the time
  tcsv2png -v -c -t \"Foo title\" -o foo.png data.csv 0 3 5
      creates foo.png titled \"Foo title\", column 0 is the time,
      columns 3 and 5 are plotted with smooth csplines";

/// Everything the command line controls.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub csvin: PathBuf,
    pub cols: Vec<usize>,
    pub output: PathBuf,
    pub title: String,
    pub smoothing: Smoothing,
    pub renderer: String,
    pub gnuplot: String,
    pub verbose: bool,
}

impl Options {
    pub fn chart_settings(&self) -> ChartSettings {
        ChartSettings {
            output: self.output.clone(),
            title: self.title.clone(),
            smoothing: self.smoothing,
        }
    }
}

fn command() -> Command {
    let arg_csvin = Arg::new("csv_file")
        .help("csv file with a time column, the first line holds the titles")
        .value_parser(value_parser!(PathBuf))
        .required(true);
    let arg_cols = Arg::new("cols")
        .help("column indices: COL0 is the time, the others are plotted (default: all)")
        .value_name("COL")
        .num_args(0..)
        .value_parser(value_parser!(usize));
    let arg_output = Arg::new("output")
        .help("png output file (default: the csv path with a png extension)")
        .short('o')
        .long("output")
        .num_args(1)
        .value_parser(value_parser!(PathBuf));
    let arg_title = Arg::new("title")
        .help("chart title (default: the csv path)")
        .short('t')
        .long("title")
        .num_args(1);
    let arg_bezier = Arg::new("bezier")
        .help("smooth bezier")
        .short('b')
        .long("bezier")
        .action(ArgAction::SetTrue)
        .overrides_with("csplines");
    let arg_csplines = Arg::new("csplines")
        .help("smooth csplines")
        .short('c')
        .long("csplines")
        .action(ArgAction::SetTrue)
        .overrides_with("bezier");
    let arg_renderer = Arg::new("renderer")
        .help("program drawing the chart")
        .short('r')
        .long("renderer")
        .num_args(1)
        .value_parser(RENDERERS)
        .default_value("gnuplot");
    let arg_gnuplot = Arg::new("gnuplot")
        .help("gnuplot executable")
        .long("gnuplot")
        .num_args(1)
        .default_value("gnuplot");
    let arg_verbose = Arg::new("verbose")
        .help("print verbose information")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue);
    Command::new("tcsv2png")
        .version(VERSION.unwrap_or("unknown"))
        .about(ABOUT)
        .after_help(AFTER_HELP)
        .arg(arg_csvin)
        .arg(arg_cols)
        .arg(arg_output)
        .arg(arg_title)
        .arg(arg_bezier)
        .arg(arg_csplines)
        .arg(arg_renderer)
        .arg(arg_gnuplot)
        .arg(arg_verbose)
}

/// Parse the given arguments, the first one being the program name.
pub fn parse_cli_from<I, T>(args: I) -> Result<Options, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut cmd = command();
    let cli_args = cmd.try_get_matches_from_mut(args)?;
    // csv_file is required and renderer, gnuplot have defaults,
    // clap guarantees they are present
    let csvin = cli_args
        .get_one::<PathBuf>("csv_file")
        .cloned()
        .unwrap_or_default();
    let cols: Vec<usize> = cli_args
        .get_many::<usize>("cols")
        .map(|c| c.copied().collect())
        .unwrap_or_default();
    if cols.len() == 1 {
        return Err(cmd.error(
            ErrorKind::TooFewValues,
            format!(
                "only the time column {} was given, select at least one column to plot",
                cols[0]
            ),
        ));
    }
    let output = match cli_args.get_one::<PathBuf>("output") {
        Some(p) => p.to_owned(),
        None => csvin.with_extension("png"),
    };
    let title = match cli_args.get_one::<String>("title") {
        Some(t) => t.to_owned(),
        None => csvin.to_string_lossy().into_owned(),
    };
    let smoothing = if cli_args.get_flag("bezier") {
        Smoothing::Bezier
    } else if cli_args.get_flag("csplines") {
        Smoothing::Csplines
    } else {
        Smoothing::None
    };
    let renderer = cli_args
        .get_one::<String>("renderer")
        .cloned()
        .unwrap_or_else(|| "gnuplot".to_string());
    let gnuplot = cli_args
        .get_one::<String>("gnuplot")
        .cloned()
        .unwrap_or_else(|| "gnuplot".to_string());
    let verbose = cli_args.get_flag("verbose");
    Ok(Options {
        csvin,
        cols,
        output,
        title,
        smoothing,
        renderer,
        gnuplot,
        verbose,
    })
}

/// Takes the CLI arguments that control the chart, exit on usage errors.
pub fn parse_cli() -> Options {
    match parse_cli_from(std::env::args_os()) {
        Ok(o) => o,
        Err(e) => e.exit(),
    }
}
