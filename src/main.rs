use anyhow::Result;
use usage_analyser::{
    config::{AppConfig, OutputFormat},
    observability, pipeline,
    sinks::{DailyCsvSink, DailyNdjsonSink},
    sources::ReadingsCsvSource,
};

fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    let source = ReadingsCsvSource::new(&cfg.readings.path, cfg.readings.delimiter_byte());
    let readings = source.read()?;

    let table = pipeline::run(&readings, &cfg.tariffs)?;

    // Latest day with a fully defined rolling year, if the series is long enough.
    if let Some(annual_cost) = table.total_cost.iter().rev().flatten().next() {
        tracing::info!(
            annual_cost = %format!("{annual_cost:.2}"),
            monthly_cost = %format!("{:.2}", annual_cost / 12.0),
            "estimated cost over the trailing year"
        );
    } else {
        tracing::warn!(
            days = table.dates.len(),
            "series shorter than 365 days, no annual figures defined"
        );
    }

    match cfg.output.format {
        OutputFormat::Csv => DailyCsvSink::new(&cfg.output.path).write(&table)?,
        OutputFormat::Ndjson => DailyNdjsonSink::new(&cfg.output.path).write(&table)?,
    }

    Ok(())
}
