// ============================================================
// Bike-sharing CSV adapter
// ============================================================
// Reads the UCI bike-sharing `hour.csv` from data/bikes/ and turns
// it into one sample per calendar day: 24 hourly feature rows and
// 24 hourly rental-count targets.
//
// Per-hour features, in order:
//   season, yr, mnth, hr, holiday, weekday, workingday,
//   temp, atemp, hum, windspeed          (11 numeric columns)
//   weathersit one-hot over its 4 levels (4 columns)
// giving 15 features per hour. The target is the `cnt` column.
//
// Columns are located by header name, so extra columns or a
// different order in the file are harmless. Days with fewer than 24
// rows (the dataset has gaps from service outages) are dropped so
// every sequence has a fixed length.

use anyhow::{ensure, Context, Result};
use burn::data::dataset::Dataset;
use std::{fs, path::Path};

pub const HOURS_PER_DAY: usize = 24;
pub const FEATURES_PER_HOUR: usize = 15;

const NUMERIC_COLUMNS: [&str; 11] = [
    "season", "yr", "mnth", "hr", "holiday", "weekday", "workingday",
    "temp", "atemp", "hum", "windspeed",
];
const WEATHER_LEVELS: usize = 4;

/// One full day of hourly observations.
#[derive(Debug, Clone)]
pub struct DaySample {
    /// Flattened [HOURS_PER_DAY x FEATURES_PER_HOUR] feature rows
    pub features: Vec<f32>,

    /// Hourly rental counts, length HOURS_PER_DAY
    pub targets: Vec<f32>,
}

/// The whole dataset, one sample per complete day.
pub struct BikesDataset {
    days: Vec<DaySample>,
}

impl BikesDataset {
    /// Parse `hour.csv` under `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join("hour.csv");
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read bike-sharing data from '{}'", path.display()))?;

        let mut lines = text.lines();
        let header = lines.next().context("hour.csv is empty")?;
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();

        let column = |name: &str| -> Result<usize> {
            columns
                .iter()
                .position(|c| *c == name)
                .with_context(|| format!("hour.csv is missing the '{name}' column"))
        };

        let numeric: Vec<usize> = NUMERIC_COLUMNS
            .iter()
            .map(|name| column(name))
            .collect::<Result<_>>()?;
        let date_col = column("dteday")?;
        let weather_col = column("weathersit")?;
        let count_col = column("cnt")?;

        // Close out one day's rows: keep it only when all 24 hours
        // are present.
        fn flush(
            features: &mut Vec<f32>,
            targets: &mut Vec<f32>,
            hours: usize,
            days: &mut Vec<DaySample>,
            dropped: &mut usize,
        ) {
            if hours == HOURS_PER_DAY {
                days.push(DaySample {
                    features: std::mem::take(features),
                    targets: std::mem::take(targets),
                });
            } else if hours > 0 {
                features.clear();
                targets.clear();
                *dropped += 1;
            }
        }

        // Group consecutive rows by calendar date.
        let mut days: Vec<DaySample> = Vec::new();
        let mut current_date = String::new();
        let mut features: Vec<f32> = Vec::new();
        let mut targets: Vec<f32> = Vec::new();
        let mut hours = 0usize;
        let mut dropped = 0usize;

        for (line_no, line) in lines.enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            ensure!(
                fields.len() == columns.len(),
                "hour.csv line {}: {} fields (header has {})",
                line_no + 2,
                fields.len(),
                columns.len()
            );

            let date = fields[date_col];
            if date != current_date {
                flush(&mut features, &mut targets, hours, &mut days, &mut dropped);
                current_date = date.to_string();
                hours = 0;
            }

            for &idx in &numeric {
                let value: f32 = fields[idx].parse().with_context(|| {
                    format!("hour.csv line {}: bad number '{}'", line_no + 2, fields[idx])
                })?;
                features.push(value);
            }

            // weathersit is categorical (1..=4) — one-hot encode it
            let weather: usize = fields[weather_col].parse().with_context(|| {
                format!("hour.csv line {}: bad weathersit '{}'", line_no + 2, fields[weather_col])
            })?;
            ensure!(
                (1..=WEATHER_LEVELS).contains(&weather),
                "hour.csv line {}: weathersit {} out of range 1..={}",
                line_no + 2,
                weather,
                WEATHER_LEVELS
            );
            for level in 1..=WEATHER_LEVELS {
                features.push(if level == weather { 1.0 } else { 0.0 });
            }

            let count: f32 = fields[count_col].parse().with_context(|| {
                format!("hour.csv line {}: bad cnt '{}'", line_no + 2, fields[count_col])
            })?;
            targets.push(count);
            hours += 1;
        }
        flush(&mut features, &mut targets, hours, &mut days, &mut dropped);

        ensure!(!days.is_empty(), "hour.csv contains no complete 24-hour days");
        if dropped > 0 {
            tracing::warn!("Dropped {} incomplete days from hour.csv", dropped);
        }
        tracing::info!("Loaded {} complete days of bike-sharing data", days.len());

        Ok(Self { days })
    }

    /// Hand the samples over for splitting.
    pub fn into_samples(self) -> Vec<DaySample> {
        self.days
    }
}

impl Dataset<DaySample> for BikesDataset {
    fn get(&self, index: usize) -> Option<DaySample> {
        self.days.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.days.len()
    }
}
