//! CSV sample log
//!
//! One header per run, then one row per published sample. The file is
//! opened in append mode so successive runs accumulate in one log.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use cryo_core::sampler::TemperatureSample;

/// Column header written at the start of every run
pub const HEADER: &str = "timestamp(s),c_head_temp(K),film_burner_temp(K),mainplate_temp(K),he_pump_temp(K),heat_sw_temp(K)";

/// Sample log errors
#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to open sample log {}: {source}", path.display())]
    Open { path: PathBuf, source: io::Error },
    #[error("failed to write sample log: {0}")]
    Write(#[from] io::Error),
}

/// Format one sample as a CSV row (no newline)
pub fn format_row(sample: &TemperatureSample) -> String {
    format!(
        "{:.3},{},{},{},{},{}",
        sample.elapsed_ms as f64 / 1000.0,
        sample.cold_head_k,
        sample.film_burner_k,
        sample.mainplate_k,
        sample.helium_pump_k,
        sample.heat_switch_k,
    )
}

/// Open sample log for one run
pub struct SampleLog {
    writer: BufWriter<File>,
    path: PathBuf,
}

impl SampleLog {
    /// Open `path` for appending and write the header
    pub fn create(path: &Path) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| LogError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let mut log = Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
        };
        writeln!(log.writer, "{}", HEADER)?;
        log.writer.flush()?;
        Ok(log)
    }

    /// Append one sample and flush
    pub fn append(&mut self, sample: &TemperatureSample) -> Result<(), LogError> {
        writeln!(self.writer, "{}", format_row(sample))?;
        self.writer.flush()?;
        Ok(())
    }

    /// Destination path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(elapsed_ms: u64) -> TemperatureSample {
        TemperatureSample {
            cold_head_k: 3.5,
            film_burner_k: 5.25,
            mainplate_k: 4.5,
            helium_pump_k: 47.75,
            heat_switch_k: 10.0,
            elapsed_ms,
        }
    }

    #[test]
    fn test_row_format() {
        assert_eq!(format_row(&sample(12_345)), "12.345,3.5,5.25,4.5,47.75,10");
    }

    #[test]
    fn test_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_log.txt");

        let mut log = SampleLog::create(&path).unwrap();
        log.append(&sample(0)).unwrap();
        log.append(&sample(1000)).unwrap();

        // Flushed per row: readable while the log is still open
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![HEADER, "0.000,3.5,5.25,4.5,47.75,10", "1.000,3.5,5.25,4.5,47.75,10"]);
        assert_eq!(log.path(), path.as_path());
    }

    #[test]
    fn test_second_run_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_log.txt");

        SampleLog::create(&path).unwrap().append(&sample(0)).unwrap();
        SampleLog::create(&path).unwrap().append(&sample(0)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().filter(|l| *l == HEADER).count(), 2);
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("temp_log.txt");
        assert!(matches!(
            SampleLog::create(&path),
            Err(LogError::Open { .. })
        ));
    }
}
