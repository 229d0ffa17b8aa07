pub mod daily_csv;
pub mod daily_ndjson;

pub use daily_csv::DailyCsvSink;
pub use daily_ndjson::DailyNdjsonSink;

use time::Date;

use crate::domain::DATE_FORMAT;
use crate::pipeline::AnalysisError;

fn format_date(date: Date) -> Result<String, AnalysisError> {
    date.format(DATE_FORMAT)
        .map_err(|e| AnalysisError::Sink(format!("failed to format date: {e}")))
}
