use std::collections::BTreeMap;
use std::{fs::File, io::BufWriter, io::Write, path::PathBuf};

use serde::Serialize;

use crate::domain::DailyTable;
use crate::pipeline::AnalysisError;

use super::format_date;

/// One JSON object per calendar day, one line each.
pub struct DailyNdjsonSink {
    path: PathBuf,
}

#[derive(Serialize)]
struct MeterCells {
    cumulative: f64,
    normalized: f64,
    daily_delta: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    annual_delta: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annual_cost: Option<f64>,
}

#[derive(Serialize)]
struct DailyRow<'a> {
    date: String,
    meters: BTreeMap<&'a str, MeterCells>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_cost: Option<f64>,
}

impl DailyNdjsonSink {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn write(&self, table: &DailyTable) -> Result<(), AnalysisError> {
        let file = File::create(&self.path).map_err(|e| {
            AnalysisError::Sink(format!(
                "failed to create output file '{}': {e}",
                self.path.display()
            ))
        })?;
        write_to(BufWriter::new(file), table)?;
        tracing::info!(path = %self.path.display(), rows = table.dates.len(), "wrote daily table");
        Ok(())
    }
}

pub fn write_to<W: Write>(mut writer: W, table: &DailyTable) -> Result<(), AnalysisError> {
    for (i, date) in table.dates.iter().enumerate() {
        let meters = table
            .meters
            .iter()
            .map(|(id, series)| {
                (
                    id.name(),
                    MeterCells {
                        cumulative: series.cumulative[i],
                        normalized: series.cumulative[i] - series.baseline_offset,
                        daily_delta: series.daily_delta[i],
                        annual_delta: series.annual_delta[i],
                        annual_cost: series.annual_cost[i],
                    },
                )
            })
            .collect();

        let row = DailyRow {
            date: format_date(*date)?,
            meters,
            total_cost: table.total_cost[i],
        };

        serde_json::to_writer(&mut writer, &row)
            .map_err(|e| AnalysisError::Sink(e.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| AnalysisError::Sink(e.to_string()))?;
    }
    Ok(())
}
