use crate::utils::*;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::warn;

/// Result of one pass over a timed csv.
/// `titles[0]` and `cols[0]` refer to the time column,
/// `maxes[i]` belongs to the series `titles[i + 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub titles: Vec<String>,
    pub cols: Vec<usize>,
    pub maxes: Vec<f64>,
    pub rows: usize,
    pub skipped: usize,
}

impl Normalized {
    pub fn series_titles(&self) -> &[String] {
        &self.titles[1..]
    }
}

/// Keeps the hours of the time column non-decreasing across midnight.
/// Once a wrap is seen every following hour is shifted by 24;
/// a second wrap, past 48h, is not detected.
#[derive(Debug, Clone, Default)]
pub struct HourWrap {
    last_hour: u32,
}

impl HourWrap {
    pub fn new() -> HourWrap {
        HourWrap { last_hour: 0 }
    }

    /// Return the time with its leading two-digit hour corrected.
    /// The rest of the string is left untouched.
    pub fn correct(&mut self, time: &str, line: usize) -> Result<String, PlotError> {
        let invalid = || PlotError::InvalidTime {
            line,
            value: time.to_string(),
        };
        let hh = time.get(..2).ok_or_else(invalid)?;
        if !hh.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let mut hour: u32 = hh.parse().map_err(|_| invalid())?;
        let corrected = if hour < self.last_hour {
            hour += 24;
            format!("{}{}", hour, &time[2..])
        } else {
            time.to_string()
        };
        self.last_hour = hour;
        Ok(corrected)
    }
}

/// Accumulate state of the parser: header titles, resolved columns,
/// running maxima and the hour correction.
/// Feed it raw lines in order, then call `finish`.
#[derive(Debug, Clone)]
pub struct Normalizer {
    cols: Vec<usize>,
    titles: Option<Vec<String>>,
    maxes: Vec<f64>,
    hours: HourWrap,
    rows: usize,
    skipped: usize,
}

impl Normalizer {
    /// An empty selection means every column of the header,
    /// the first one being the time.
    pub fn new(cols: &[usize]) -> Normalizer {
        Normalizer {
            cols: cols.to_vec(),
            titles: None,
            maxes: Vec::new(),
            hours: HourWrap::new(),
            rows: 0,
            skipped: 0,
        }
    }

    /// Process one line, `lineno` is 1-based.
    /// Return the normalized data row when the line is accepted as data,
    /// None for the header, blank lines before it and skipped rows.
    pub fn push_line(&mut self, lineno: usize, line: &str) -> Result<Option<String>, PlotError> {
        let row = split_fields(line);
        if self.titles.is_none() {
            if row.is_empty() {
                return Ok(None);
            }
            self.read_header(&row)?;
            return Ok(None);
        }
        let mut values: Vec<&str> = Vec::with_capacity(self.cols.len());
        for c in self.cols.iter() {
            match row.get(*c) {
                Some(v) => values.push(v.trim()),
                None => {
                    warn!("skip invalid line {}: {}", lineno, line.trim_end());
                    self.skipped += 1;
                    return Ok(None);
                }
            }
        }
        let time = self.hours.correct(values[0], lineno)?;
        for (m, v) in self.maxes.iter_mut().zip(values[1..].iter()) {
            *m = m.max(to_float(v));
        }
        self.rows += 1;
        let mut out = time;
        for v in values[1..].iter() {
            out.push(' ');
            out.push_str(v);
        }
        Ok(Some(out))
    }

    fn read_header(&mut self, row: &[&str]) -> Result<(), PlotError> {
        if self.cols.is_empty() {
            self.cols = (0..row.len()).collect();
        }
        if let Some(wanted) = self.cols.iter().copied().find(|c| *c >= row.len()) {
            return Err(PlotError::ShortHeader {
                got: row.len(),
                wanted,
            });
        }
        if self.cols.len() < 2 {
            return Err(PlotError::NoSeries);
        }
        self.titles = Some(self.cols.iter().map(|c| row[*c].trim().to_string()).collect());
        self.maxes = vec![0.; self.cols.len() - 1];
        Ok(())
    }

    pub fn finish<P: AsRef<Path>>(self, source: P) -> Result<Normalized, PlotError> {
        let titles = self
            .titles
            .ok_or_else(|| PlotError::MissingHeader(source.as_ref().to_path_buf()))?;
        Ok(Normalized {
            titles,
            cols: self.cols,
            maxes: self.maxes,
            rows: self.rows,
            skipped: self.skipped,
        })
    }
}

/// Stream the csv from `reader` once, writing the space separated data table to `table`.
/// `source` and `table_path` only name the two ends in errors.
pub fn normalize<R, W>(
    reader: R,
    mut table: W,
    cols: &[usize],
    source: &Path,
    table_path: &Path,
) -> Result<Normalized, PlotError>
where
    R: BufRead,
    W: Write,
{
    let mut normalizer = Normalizer::new(cols);
    for (i, l) in reader.lines().enumerate() {
        let line = l.map_err(|e| PlotError::io("read", source, e))?;
        if let Some(row) = normalizer.push_line(i + 1, &line)? {
            writeln!(table, "{}", row).map_err(|e| PlotError::io("write", table_path, e))?;
        }
    }
    table
        .flush()
        .map_err(|e| PlotError::io("write", table_path, e))?;
    normalizer.finish(source)
}
