use crate::config::TariffConfig;
use crate::domain::{DailyTable, MeterId, MeterSeries, NormalizedTable, DAYS_PER_YEAR};
use crate::pipeline::AnalysisError;

/// Prices the rolled consumption totals.
///
/// Per-unit costs are linear in `annual_delta`. Fixed annual fees are added
/// once per output day (they are not metered quantities, so they are never
/// rolled): delivery plus network fee on the gas and electricity-total
/// series, and the rebate is subtracted exactly once, at the grand total.
/// Cost stays undefined wherever `annual_delta` is undefined.
pub fn apply_costs(
    table: NormalizedTable,
    tariffs: &TariffConfig,
) -> Result<DailyTable, AnalysisError> {
    let NormalizedTable { dates, mut meters } = table;
    let year = DAYS_PER_YEAR as f64;

    for meter in [MeterId::ElectricityLow, MeterId::ElectricityHigh] {
        let series = meters
            .remove(&meter)
            .ok_or(AnalysisError::MissingMeterData { meter })?;
        meters.insert(meter, with_unit_cost(series, tariffs, 0.0)?);
    }

    let gas_fixed = year * (tariffs.delivery_fee + tariffs.gas_network_fee);
    let gas = meters
        .remove(&MeterId::Gas)
        .ok_or(AnalysisError::MissingMeterData {
            meter: MeterId::Gas,
        })?;
    let gas = with_unit_cost(gas, tariffs, gas_fixed)?;

    // Electricity total: sum of the component costs plus its own fixed fees.
    let electricity_fixed = year * (tariffs.delivery_fee + tariffs.electricity_network_fee);
    let low_cost = &meters[&MeterId::ElectricityLow].annual_cost;
    let high_cost = &meters[&MeterId::ElectricityHigh].annual_cost;
    let combined_cost: Vec<Option<f64>> = low_cost
        .iter()
        .zip(high_cost)
        .map(|(l, h)| match (l, h) {
            (Some(l), Some(h)) => Some(l + h + electricity_fixed),
            _ => None,
        })
        .collect();

    let electricity_total = meters
        .remove(&MeterId::ElectricityTotal)
        .ok_or(AnalysisError::MissingMeterData {
            meter: MeterId::ElectricityTotal,
        })?;
    let electricity_total = MeterSeries {
        annual_cost: combined_cost,
        ..electricity_total
    };

    // Grand total, with the rebate applied once.
    let rebate = year * tariffs.rebate;
    let total_cost: Vec<Option<f64>> = electricity_total
        .annual_cost
        .iter()
        .zip(&gas.annual_cost)
        .map(|(e, g)| match (e, g) {
            (Some(e), Some(g)) => Some(e + g - rebate),
            _ => None,
        })
        .collect();

    meters.insert(MeterId::Gas, gas);
    meters.insert(MeterId::ElectricityTotal, electricity_total);

    Ok(DailyTable {
        dates,
        meters,
        total_cost,
    })
}

/// `annual_cost = unit_rate * annual_delta + fixed`, undefined where
/// `annual_delta` is undefined. Fails for a meter without a tariff class.
fn with_unit_cost(
    series: MeterSeries,
    tariffs: &TariffConfig,
    fixed: f64,
) -> Result<MeterSeries, AnalysisError> {
    let class = series
        .meter
        .tariff_class()
        .ok_or(AnalysisError::UnknownTariffClass {
            meter: series.meter,
        })?;
    let rate = tariffs.unit_rate(class);

    let annual_cost = series
        .annual_delta
        .iter()
        .map(|delta| delta.map(|d| d * rate + fixed))
        .collect();

    Ok(MeterSeries {
        annual_cost,
        ..series
    })
}
