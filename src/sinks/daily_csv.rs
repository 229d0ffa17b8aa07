use std::{fs::File, io::Write, path::PathBuf};

use crate::domain::DailyTable;
use crate::pipeline::AnalysisError;

use super::format_date;

/// Writes the annotated daily table as semicolon-delimited CSV.
///
/// One row per calendar day. Per meter, five columns: the raw cumulative
/// value, the baseline-normalized value (cumulative minus the first value,
/// the shape a chart plots), daily delta, annual delta and annual cost.
/// Undefined annual figures are written as empty cells. `total_cost` closes
/// each row.
pub struct DailyCsvSink {
    path: PathBuf,
}

impl DailyCsvSink {
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
        write_to(file, table)?;
        tracing::info!(path = %self.path.display(), rows = table.dates.len(), "wrote daily table");
        Ok(())
    }
}

pub fn write_to<W: Write>(writer: W, table: &DailyTable) -> Result<(), AnalysisError> {
    let mut wtr = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    let sink_err = |e: csv::Error| AnalysisError::Sink(e.to_string());

    let mut header = vec!["date".to_string()];
    for meter in table.meters.keys() {
        for column in [
            "cumulative",
            "normalized",
            "daily_delta",
            "annual_delta",
            "annual_cost",
        ] {
            header.push(format!("{meter}_{column}"));
        }
    }
    header.push("total_cost".to_string());
    wtr.write_record(&header).map_err(sink_err)?;

    let cell = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for (i, date) in table.dates.iter().enumerate() {
        let mut record = vec![format_date(*date)?];
        for series in table.meters.values() {
            record.push(series.cumulative[i].to_string());
            record.push((series.cumulative[i] - series.baseline_offset).to_string());
            record.push(series.daily_delta[i].to_string());
            record.push(cell(series.annual_delta[i]));
            record.push(cell(series.annual_cost[i]));
        }
        record.push(cell(table.total_cost[i]));
        wtr.write_record(&record).map_err(sink_err)?;
    }

    wtr.flush()
        .map_err(|e| AnalysisError::Sink(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TariffConfig;
    use crate::domain::{ReadingRow, ReadingsTable};
    use crate::pipeline;
    use time::macros::date;

    fn small_table() -> DailyTable {
        let readings = ReadingsTable {
            rows: vec![
                ReadingRow {
                    date: date!(2020 - 01 - 01),
                    electricity_low: Some(10.0),
                    electricity_high: Some(20.0),
                    gas: Some(100.0),
                },
                ReadingRow {
                    date: date!(2020 - 01 - 03),
                    electricity_low: Some(12.0),
                    electricity_high: Some(24.0),
                    gas: Some(101.0),
                },
            ],
        };
        let tariffs = TariffConfig {
            unit_rate_low: 0.2,
            unit_rate_high: 0.2,
            unit_rate_gas: 0.7,
            delivery_fee: 0.2,
            electricity_network_fee: 0.6,
            gas_network_fee: 0.5,
            rebate: 1.4,
        };
        pipeline::run(&readings, &tariffs).unwrap()
    }

    #[test]
    fn writes_header_and_one_row_per_day() {
        let mut buf = Vec::new();
        write_to(&mut buf, &small_table()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("date;electricity_low_cumulative;electricity_low_normalized"));
        assert!(lines[0].ends_with(";total_cost"));
        assert!(lines[1].starts_with("01-01-2020;10;0;0"));
    }

    #[test]
    fn undefined_annual_figures_are_empty_cells() {
        let mut buf = Vec::new();
        write_to(&mut buf, &small_table()).unwrap();
        let text = String::from_utf8(buf).unwrap();

        // Three-day series: every annual column and the total are empty.
        for line in text.lines().skip(1) {
            assert!(line.ends_with(';'));
        }
    }
}
