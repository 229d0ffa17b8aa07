use std::collections::BTreeMap;

use time::{Date, Duration};

use crate::domain::{
    MeterId, MeterSeries, NormalizedTable, ReadingRow, ReadingsTable, PHYSICAL_METERS,
};
use crate::pipeline::AnalysisError;

/// Expands sparse readings onto a contiguous daily calendar.
///
/// Rows may arrive in any order; they are sorted and merged by date before
/// anything else, and conflicting duplicate dates fail.
///
/// The calendar runs from the earliest to the latest date observed across
/// all meters, so every meter ends up on identical day boundaries. Missing
/// cumulative values are filled by linear interpolation between the nearest
/// earlier and later readings of the same meter; a gap touching the first or
/// last calendar day has no anchor on one side and is a hard failure.
///
/// Also synthesizes the `electricity_total` series by summing the low- and
/// high-tariff cumulative values per day after interpolation, then
/// differencing it like any other meter.
pub fn normalize(readings: &ReadingsTable) -> Result<NormalizedTable, AnalysisError> {
    // Callers may hand rows in any order; re-sorting an already sorted
    // table is a no-op, and conflicting duplicate dates fail here too.
    let rows = ReadingsTable::from_rows(readings.rows.clone())?.rows;

    let first = rows
        .first()
        .ok_or_else(|| AnalysisError::Source("readings table is empty".to_string()))?;
    let last = rows.last().unwrap_or(first);
    let dates = daily_calendar(first.date, last.date);

    let mut meters = BTreeMap::new();
    for meter in PHYSICAL_METERS {
        let series = normalize_meter(&rows, &dates, meter)?;
        meters.insert(meter, series);
    }

    let low = &meters[&MeterId::ElectricityLow];
    let high = &meters[&MeterId::ElectricityHigh];
    let combined: Vec<f64> = low
        .cumulative
        .iter()
        .zip(&high.cumulative)
        .map(|(a, b)| a + b)
        .collect();
    meters.insert(
        MeterId::ElectricityTotal,
        series_from_cumulative(MeterId::ElectricityTotal, combined),
    );

    Ok(NormalizedTable { dates, meters })
}

fn daily_calendar(start: Date, end: Date) -> Vec<Date> {
    let days = (end - start).whole_days() + 1;
    (0..days).map(|i| start + Duration::days(i)).collect()
}

fn normalize_meter(
    rows: &[ReadingRow],
    dates: &[Date],
    meter: MeterId,
) -> Result<MeterSeries, AnalysisError> {
    let start = dates[0];

    // Anchors: (calendar index, value) for every day this meter was read.
    let mut anchors: Vec<(usize, f64)> = Vec::new();
    for row in rows {
        if let Some(value) = row.value(meter) {
            let idx = (row.date - start).whole_days() as usize;
            if let Some(&(_, previous)) = anchors.last() {
                if value < previous {
                    return Err(AnalysisError::NonMonotonicReading {
                        meter,
                        date: row.date,
                        previous,
                        value,
                    });
                }
            }
            anchors.push((idx, value));
        }
    }

    if anchors.is_empty() {
        return Err(AnalysisError::MissingMeterData { meter });
    }

    // The counter is only defined between its first and last reading; a
    // calendar day outside that range has no anchor to interpolate from.
    let (first_idx, _) = anchors[0];
    let (last_idx, _) = anchors[anchors.len() - 1];
    if first_idx != 0 {
        return Err(AnalysisError::UnresolvableGap { meter, date: start });
    }
    if last_idx != dates.len() - 1 {
        return Err(AnalysisError::UnresolvableGap {
            meter,
            date: dates[dates.len() - 1],
        });
    }

    let mut cumulative = vec![0.0; dates.len()];
    for pair in anchors.windows(2) {
        let (i0, v0) = pair[0];
        let (i1, v1) = pair[1];
        let span = (i1 - i0) as f64;
        for i in i0..i1 {
            cumulative[i] = v0 + (v1 - v0) * (i - i0) as f64 / span;
        }
    }
    cumulative[last_idx] = anchors[anchors.len() - 1].1;

    Ok(series_from_cumulative(meter, cumulative))
}

fn series_from_cumulative(meter: MeterId, cumulative: Vec<f64>) -> MeterSeries {
    let n = cumulative.len();
    let mut daily_delta = vec![0.0; n];
    for i in 1..n {
        daily_delta[i] = cumulative[i] - cumulative[i - 1];
    }

    MeterSeries {
        meter,
        baseline_offset: cumulative.first().copied().unwrap_or(0.0),
        cumulative,
        daily_delta,
        annual_delta: vec![None; n],
        annual_cost: vec![None; n],
    }
}
