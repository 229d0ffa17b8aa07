use std::{fs::File, io::Read, path::PathBuf};

use csv::StringRecord;
use time::Date;

use crate::domain::{MeterId, ReadingRow, ReadingsTable, DATE_FORMAT, PHYSICAL_METERS};
use crate::pipeline::AnalysisError;

/// CSV source for cumulative meter readings.
///
/// Expected header columns (by name):
/// - date (day-month-year)
/// - electricity_low
/// - electricity_high
/// - gas
///
/// Rows need not be daily or ordered. The source sorts by date, merges rows
/// that cover the same date with disjoint meters, and rejects two rows that
/// give the same meter conflicting values for one date. Empty cells are
/// missing readings, filled later by the normalizer.
pub struct ReadingsCsvSource {
    path: PathBuf,
    delimiter: u8,
}

impl ReadingsCsvSource {
    pub fn new<P: Into<PathBuf>>(path: P, delimiter: u8) -> Self {
        Self {
            path: path.into(),
            delimiter,
        }
    }

    pub fn read(&self) -> Result<ReadingsTable, AnalysisError> {
        let file = File::open(&self.path).map_err(|e| {
            AnalysisError::Source(format!(
                "failed to open readings file '{}': {e}",
                self.path.display()
            ))
        })?;
        let table = parse_readings(file, self.delimiter)?;
        tracing::info!(
            rows = table.rows.len(),
            path = %self.path.display(),
            "loaded meter readings"
        );
        Ok(table)
    }
}

/// Column positions, resolved once from the header so no later stage goes
/// back to string matching.
struct ColumnMap {
    date: usize,
    meters: [(MeterId, usize); 3],
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self, AnalysisError> {
        let position = |name: &str| -> Result<usize, AnalysisError> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| AnalysisError::Source(format!("missing column '{name}' in CSV header")))
        };

        let date = position("date")?;
        let mut meters = [(MeterId::ElectricityLow, 0); 3];
        for (slot, meter) in meters.iter_mut().zip(PHYSICAL_METERS) {
            *slot = (meter, position(meter.name())?);
        }

        Ok(Self { date, meters })
    }
}

fn parse_optional_f64(s: &str) -> Result<Option<f64>, AnalysisError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|e| AnalysisError::Source(format!("invalid reading '{trimmed}': {e}")))
}

pub fn parse_readings<R: Read>(reader: R, delimiter: u8) -> Result<ReadingsTable, AnalysisError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| AnalysisError::Source(format!("failed to read CSV header: {e}")))?
        .clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| AnalysisError::Source(format!("failed to read CSV record: {e}")))?;

        let date_str = record.get(columns.date).unwrap_or("").trim();
        let date = Date::parse(date_str, DATE_FORMAT)
            .map_err(|e| AnalysisError::Source(format!("invalid date '{date_str}': {e}")))?;

        let mut row = ReadingRow::empty(date);
        for (meter, idx) in columns.meters {
            *row.value_mut(meter) = parse_optional_f64(record.get(idx).unwrap_or(""))?;
        }
        rows.push(row);
    }

    ReadingsTable::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn parse(input: &str) -> Result<ReadingsTable, AnalysisError> {
        parse_readings(input.as_bytes(), b';')
    }

    #[test]
    fn parses_and_sorts_unordered_rows() {
        let table = parse(
            "date;electricity_low;electricity_high;gas\n\
             03-01-2020;12.0;22.0;102.0\n\
             01-01-2020;10.0;20.0;100.0\n",
        )
        .unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].date, date!(2020 - 01 - 01));
        assert_eq!(table.rows[1].date, date!(2020 - 01 - 03));
        assert_eq!(table.rows[1].gas, Some(102.0));
    }

    #[test]
    fn empty_cells_are_missing_readings() {
        let table = parse(
            "date;electricity_low;electricity_high;gas\n\
             01-01-2020;10.0;;100.0\n",
        )
        .unwrap();

        assert_eq!(table.rows[0].electricity_low, Some(10.0));
        assert_eq!(table.rows[0].electricity_high, None);
    }

    #[test]
    fn same_date_rows_with_disjoint_meters_merge() {
        let table = parse(
            "date;electricity_low;electricity_high;gas\n\
             01-01-2020;10.0;;\n\
             01-01-2020;;20.0;100.0\n",
        )
        .unwrap();

        assert_eq!(table.rows.len(), 1);
        let row = &table.rows[0];
        assert_eq!(row.electricity_low, Some(10.0));
        assert_eq!(row.electricity_high, Some(20.0));
        assert_eq!(row.gas, Some(100.0));
    }

    #[test]
    fn conflicting_duplicate_date_is_rejected() {
        let err = parse(
            "date;electricity_low;electricity_high;gas\n\
             01-01-2020;10.0;20.0;100.0\n\
             01-01-2020;11.0;20.0;100.0\n",
        )
        .unwrap_err();

        assert!(matches!(
            err,
            AnalysisError::DuplicateDate {
                meter: MeterId::ElectricityLow,
                existing,
                conflicting,
                ..
            } if existing == 10.0 && conflicting == 11.0
        ));
    }

    #[test]
    fn identical_duplicate_is_deduplicated() {
        let table = parse(
            "date;electricity_low;electricity_high;gas\n\
             01-01-2020;10.0;20.0;100.0\n\
             01-01-2020;10.0;20.0;100.0\n",
        )
        .unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn comma_delimiter_is_supported() {
        let table = parse_readings(
            "date,electricity_low,electricity_high,gas\n01-01-2020,10.0,20.0,100.0\n".as_bytes(),
            b',',
        )
        .unwrap();
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn bad_date_is_a_source_error() {
        let err = parse(
            "date;electricity_low;electricity_high;gas\n\
             2020-01-01;10.0;20.0;100.0\n",
        )
        .unwrap_err();
        assert!(matches!(err, AnalysisError::Source(_)));
    }

    #[test]
    fn missing_meter_column_is_a_source_error() {
        let err = parse("date;electricity_low;gas\n01-01-2020;10.0;100.0\n").unwrap_err();
        assert!(err.to_string().contains("electricity_high"));
    }
}
