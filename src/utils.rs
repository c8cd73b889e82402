use chrono::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Everything that can stop a chart from being produced.
/// Malformed data rows are not errors, they are skipped with a warning.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("could not {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no header line found in {}", .0.display())]
    MissingHeader(PathBuf),
    #[error("header has {got} fields, column {wanted} was selected")]
    ShortHeader { got: usize, wanted: usize },
    #[error("nothing to plot, only the time column is selected")]
    NoSeries,
    #[error("line {line}: time field {value:?} does not start with a two-digit hour")]
    InvalidTime { line: usize, value: String },
    #[error("could not run renderer {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("renderer {renderer} returned status {status}, output: [{output}]")]
    Renderer {
        renderer: String,
        status: i32,
        output: String,
    },
}

impl PlotError {
    pub fn io<P: AsRef<Path>>(action: &'static str, path: P, source: io::Error) -> PlotError {
        PlotError::Io {
            action,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

/// Split a line on runs of spaces, tabs and semicolons.
/// Empty fields (leading or trailing separators, line endings) are dropped.
pub fn split_fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c == ' ' || c == '\t' || c == ';' || c == '\r' || c == '\n')
        .filter(|f| !f.is_empty())
        .collect()
}

/// Convert a field to f64.
/// Comma decimal separators are accepted.
/// Infinity and anything unparseable become 0, so they never drive the scale.
pub fn to_float(text: &str) -> f64 {
    if text == "Infinity" {
        return 0.;
    }
    match text.replace(',', ".").parse::<f64>() {
        Ok(x) if x.is_finite() => x,
        _ => 0.,
    }
}

/// Create a fresh scratch directory under the system temp dir.
/// The directory is left in place after the run.
pub fn make_scratch_dir(prefix: &str) -> Result<PathBuf, PlotError> {
    make_scratch_dir_in(std::env::temp_dir(), prefix)
}

pub fn make_scratch_dir_in<P>(parent: P, prefix: &str) -> Result<PathBuf, PlotError>
where
    P: AsRef<Path>,
{
    let stamp = Local::now().format("%Y%m%d%H%M%S");
    let pid = std::process::id();
    let mut attempt = 0u32;
    loop {
        let name = if attempt == 0 {
            format!("{}{}_{}", prefix, stamp, pid)
        } else {
            format!("{}{}_{}_{}", prefix, stamp, pid, attempt)
        };
        let dir = parent.as_ref().join(name);
        match fs::create_dir(&dir) {
            Ok(()) => return Ok(dir),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && attempt < 100 => attempt += 1,
            Err(e) => return Err(PlotError::io("create scratch directory", &dir, e)),
        }
    }
}

/// Smallest and largest item, None for an empty iterator.
pub fn min_and_max<'a, I, T>(mut s: I) -> Option<(T, T)>
where
    I: Iterator<Item = &'a T>,
    T: 'a + std::cmp::PartialOrd + Clone,
{
    let (mut min, mut max) = match s.next() {
        Some(v) => (v, v),
        None => return None,
    };
    for es in s {
        if es > max {
            max = es
        } else if es < min {
            min = es
        }
    }
    Some((min.clone(), max.clone()))
}

/// Escape a string for a gnuplot double-quoted literal.
pub fn quote(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Resolve a path against the current directory without requiring it to exist.
pub fn absolute<P: AsRef<Path>>(p: P) -> Result<PathBuf, PlotError> {
    let p = p.as_ref();
    if p.is_absolute() {
        return Ok(p.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| PlotError::io("read current directory", ".", e))?;
    Ok(cwd.join(p))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captured_logs_hold_the_message() {
        let (n, logs) = testlog::capture_logs(|| {
            tracing::warn!("skip invalid line {}: {}", 7, "x");
            42
        });
        assert_eq!(n, 42);
        assert!(logs.contains("skip invalid line 7: x"), "{}", logs);
    }

    #[test]
    fn split_on_mixed_separators() {
        assert_eq!(split_fields("a\tb  c;d"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_fields("00:00:01\t10\t5000\n"), vec!["00:00:01", "10", "5000"]);
        assert_eq!(split_fields(" \t;a;;\t\r\n"), vec!["a"]);
        assert!(split_fields("").is_empty());
    }

    #[test]
    fn coerce_values() {
        assert_eq!(to_float("3,14"), 3.14);
        assert_eq!(to_float("42"), 42.);
        assert_eq!(to_float("-1.5"), -1.5);
        assert_eq!(to_float("Infinity"), 0.);
        assert_eq!(to_float("inf"), 0.);
        assert_eq!(to_float("garbage"), 0.);
        assert_eq!(to_float(""), 0.);
    }

    #[test]
    fn min_and_max_of_floats() {
        let v = [3., -1., 7.5, 2.];
        assert_eq!(min_and_max(v.iter()), Some((-1., 7.5)));
        let empty: [f64; 0] = [];
        assert_eq!(min_and_max(empty.iter()), None);
    }

    #[test]
    fn quote_for_gnuplot() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote("a \"b\" c\\d"), "\"a \\\"b\\\" c\\\\d\"");
    }

    #[test]
    fn scratch_dirs_are_unique() {
        let parent = std::env::temp_dir();
        let a = make_scratch_dir_in(&parent, "tcsv2png_utils_test_").unwrap();
        let b = make_scratch_dir_in(&parent, "tcsv2png_utils_test_").unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
        fs::remove_dir(a).unwrap();
        fs::remove_dir(b).unwrap();
    }
}
