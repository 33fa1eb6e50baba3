// ============================================================
// Metrics logger
// ============================================================
// Appends one CSV row per epoch so learning curves can be plotted
// after the fact, independent of whether the experiment tracker was
// enabled for the run.
//
// Output file: checkpoints/{project}_metrics.csv
//
//   epoch,train_loss,validation_loss
//   1,2.301402,2.289310
//   2,1.984176,
//   ...
//
// The validation column is empty on epochs without a validation
// check. The header is written only when the file is new, so
// successive runs of the same project append to one log.

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

/// Appends epoch metrics to a per-project CSV file.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger, writing the CSV header if the file does
    /// not exist yet.
    pub fn new(dir: impl AsRef<Path>, project: &str) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join(format!("{project}_metrics.csv"));
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)?;
            writeln!(f, "epoch,train_loss,validation_loss")?;
            tracing::debug!("Created metrics CSV '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one epoch's losses.
    pub fn log(&self, epoch: usize, train_loss: f64, validation_loss: Option<f64>) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        match validation_loss {
            Some(val) => writeln!(f, "{epoch},{train_loss:.6},{val:.6}")?,
            None => writeln!(f, "{epoch},{train_loss:.6},")?,
        }

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path(), "probe").unwrap();

        logger.log(1, 2.5, Some(2.25)).unwrap();
        logger.log(2, 2.0, None).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,validation_loss");
        assert_eq!(lines[1], "1,2.500000,2.250000");
        assert_eq!(lines[2], "2,2.000000,");
    }

    #[test]
    fn test_reopening_appends_without_second_header() {
        let dir = tempfile::tempdir().unwrap();
        {
            let logger = MetricsLogger::new(dir.path(), "probe").unwrap();
            logger.log(1, 1.0, None).unwrap();
        }
        {
            let logger = MetricsLogger::new(dir.path(), "probe").unwrap();
            logger.log(2, 0.5, None).unwrap();
        }

        let text = fs::read_to_string(dir.path().join("probe_metrics.csv")).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert_eq!(text.lines().filter(|l| l.starts_with("epoch")).count(), 1);
    }
}
