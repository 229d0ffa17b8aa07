use crate::domain::{MeterSeries, NormalizedTable, DAYS_PER_YEAR};

/// Fills `annual_delta` for every meter in the table.
pub fn rolling_annual(table: NormalizedTable) -> NormalizedTable {
    let meters = table
        .meters
        .into_iter()
        .map(|(id, series)| (id, rolling_annual_series(series)))
        .collect();

    NormalizedTable {
        dates: table.dates,
        meters,
    }
}

/// Trailing 365-day sum of `daily_delta`, maintained as a running sum that
/// slides one day at a time, so the whole series is a single linear pass.
///
/// `annual_delta[i]` is defined only once 365 prior days exist (`i >= 365`)
/// and covers the half-open window `(i - 365, i]`: the 365 deltas at indices
/// `i - 364 ..= i`.
pub fn rolling_annual_series(series: MeterSeries) -> MeterSeries {
    let n = series.len();
    let mut annual_delta = vec![None; n];
    let mut window_sum = 0.0;

    for i in 0..n {
        window_sum += series.daily_delta[i];
        if i >= DAYS_PER_YEAR {
            window_sum -= series.daily_delta[i - DAYS_PER_YEAR];
            annual_delta[i] = Some(window_sum);
        }
    }

    MeterSeries {
        annual_delta,
        ..series
    }
}
