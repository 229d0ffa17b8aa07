use time::Date;

use crate::config::TariffConfig;
use crate::domain::{DailyTable, MeterId, ReadingsTable};
use crate::transform;

#[derive(thiserror::Error, Debug)]
pub enum AnalysisError {
    #[error("source error: {0}")]
    Source(String),
    #[error("meter '{meter}' has no readings")]
    MissingMeterData { meter: MeterId },
    #[error("conflicting readings for meter '{meter}' on {date}: {existing} vs {conflicting}")]
    DuplicateDate {
        meter: MeterId,
        date: Date,
        existing: f64,
        conflicting: f64,
    },
    #[error("meter '{meter}' has no interpolation anchor at {date}")]
    UnresolvableGap { meter: MeterId, date: Date },
    #[error("meter '{meter}' decreased on {date}: {previous} -> {value}")]
    NonMonotonicReading {
        meter: MeterId,
        date: Date,
        previous: f64,
        value: f64,
    },
    #[error("meter '{meter}' has no tariff class")]
    UnknownTariffClass { meter: MeterId },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("sink error: {0}")]
    Sink(String),
}

/// Runs the three stages in order on an ingested readings table.
///
/// Normalize onto a contiguous daily calendar, roll the daily deltas into a
/// trailing 365-day total, then price the rolled totals. Pure: the same
/// readings and tariffs always produce the same table, and no stage output
/// is altered by a later stage.
pub fn run(readings: &ReadingsTable, tariffs: &TariffConfig) -> Result<DailyTable, AnalysisError> {
    let normalized = transform::normalize(readings)?;
    tracing::info!(
        days = normalized.dates.len(),
        meters = normalized.meters.len(),
        "normalized readings onto daily calendar"
    );

    let rolled = transform::rolling_annual(normalized);
    let table = transform::apply_costs(rolled, tariffs)?;

    tracing::info!(days = table.dates.len(), "daily table complete");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ReadingRow;
    use time::macros::date;
    use time::Duration;

    fn synthetic_readings(days: i64) -> ReadingsTable {
        let start = date!(2020 - 01 - 01);
        let mut rows = Vec::new();
        for i in 0..days {
            // Readings every third day only; the normalizer fills the rest.
            if i % 3 != 0 && i != days - 1 {
                continue;
            }
            rows.push(ReadingRow {
                date: start + Duration::days(i),
                electricity_low: Some(1000.0 + i as f64 * 2.0),
                electricity_high: Some(2000.0 + i as f64 * 3.0),
                gas: Some(500.0 + i as f64),
            });
        }
        ReadingsTable { rows }
    }

    fn tariffs() -> TariffConfig {
        TariffConfig {
            unit_rate_low: 0.20,
            unit_rate_high: 0.22,
            unit_rate_gas: 0.77,
            delivery_fee: 0.23,
            electricity_network_fee: 0.63,
            gas_network_fee: 0.50,
            rebate: 1.44,
        }
    }

    #[test]
    fn run_produces_fully_annotated_table() {
        let readings = synthetic_readings(400);
        let table = run(&readings, &tariffs()).unwrap();

        assert_eq!(table.dates.len(), 400);
        assert_eq!(table.meters.len(), 4);
        assert_eq!(table.total_cost.len(), 400);

        let gas = table.series(MeterId::Gas).unwrap();
        assert!(gas.annual_delta[364].is_none());
        assert!(gas.annual_delta[365].is_some());
        assert!(table.total_cost[365].is_some());
    }

    #[test]
    fn run_is_idempotent_bit_for_bit() {
        let readings = synthetic_readings(400);
        let cfg = tariffs();

        let first = run(&readings, &cfg).unwrap();
        let second = run(&readings, &cfg).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn run_on_short_series_leaves_annual_columns_undefined() {
        let readings = synthetic_readings(100);
        let table = run(&readings, &tariffs()).unwrap();

        for series in table.meters.values() {
            assert!(series.annual_delta.iter().all(Option::is_none));
            assert!(series.annual_cost.iter().all(Option::is_none));
        }
        assert!(table.total_cost.iter().all(Option::is_none));
    }

    #[test]
    fn scaling_deltas_scales_consumption_but_not_fixed_fees() {
        let start = date!(2020 - 01 - 01);
        let k = 3.0;
        let build = |scale: f64| {
            let rows = (0..400)
                .map(|i| ReadingRow {
                    date: start + Duration::days(i),
                    electricity_low: Some(100.0 + scale * i as f64),
                    electricity_high: Some(200.0 + scale * 2.0 * i as f64),
                    gas: Some(50.0 + scale * i as f64),
                })
                .collect();
            ReadingsTable { rows }
        };

        let cfg = tariffs();
        let base = run(&build(1.0), &cfg).unwrap();
        let scaled = run(&build(k), &cfg).unwrap();

        let d = 399;
        for meter in [MeterId::ElectricityLow, MeterId::ElectricityHigh, MeterId::Gas] {
            let a = base.series(meter).unwrap().annual_delta[d].unwrap();
            let b = scaled.series(meter).unwrap().annual_delta[d].unwrap();
            assert!((b - k * a).abs() < 1e-6);
        }

        // Rate-derived cost scales by k; fixed fees and the rebate do not.
        let fixed = 365.0
            * (2.0 * cfg.delivery_fee + cfg.electricity_network_fee + cfg.gas_network_fee
                - cfg.rebate);
        let base_var = base.total_cost[d].unwrap() - fixed;
        let scaled_var = scaled.total_cost[d].unwrap() - fixed;
        assert!((scaled_var - k * base_var).abs() < 1e-6);
    }
}
