use std::collections::BTreeMap;
use std::fmt;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::Date;

/// Dates cross the external interfaces in a fixed day-month-year format,
/// e.g. `17-12-2019`.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[day]-[month]-[year]");

/// Number of days in the rolling "annual" window. Fixed fees and the rebate
/// are prorated on the same 365-day basis.
pub const DAYS_PER_YEAR: usize = 365;

/// Tariff classes with a per-unit rate in the tariff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffClass {
    ElectricityLow,
    ElectricityHigh,
    Gas,
}

/// Identity of a meter series in the daily table.
///
/// The first three are physical counters read from the input table.
/// `ElectricityTotal` is synthesized by the normalizer as the per-day sum of
/// the low- and high-tariff cumulative values; it has no tariff class of its
/// own and is costed from its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MeterId {
    ElectricityLow,
    ElectricityHigh,
    Gas,
    ElectricityTotal,
}

/// The physical meters expected in every input table, in column order.
pub const PHYSICAL_METERS: [MeterId; 3] = [
    MeterId::ElectricityLow,
    MeterId::ElectricityHigh,
    MeterId::Gas,
];

impl MeterId {
    pub fn tariff_class(self) -> Option<TariffClass> {
        match self {
            MeterId::ElectricityLow => Some(TariffClass::ElectricityLow),
            MeterId::ElectricityHigh => Some(TariffClass::ElectricityHigh),
            MeterId::Gas => Some(TariffClass::Gas),
            MeterId::ElectricityTotal => None,
        }
    }

    /// Stable name used for input column headers and output columns.
    pub fn name(self) -> &'static str {
        match self {
            MeterId::ElectricityLow => "electricity_low",
            MeterId::ElectricityHigh => "electricity_high",
            MeterId::Gas => "gas",
            MeterId::ElectricityTotal => "electricity_total",
        }
    }
}

impl fmt::Display for MeterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One ingested row: a date plus whichever cumulative readings it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRow {
    pub date: Date,
    pub electricity_low: Option<f64>,
    pub electricity_high: Option<f64>,
    pub gas: Option<f64>,
}

impl ReadingRow {
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            electricity_low: None,
            electricity_high: None,
            gas: None,
        }
    }

    pub fn value(&self, meter: MeterId) -> Option<f64> {
        match meter {
            MeterId::ElectricityLow => self.electricity_low,
            MeterId::ElectricityHigh => self.electricity_high,
            MeterId::Gas => self.gas,
            MeterId::ElectricityTotal => None,
        }
    }

    pub fn value_mut(&mut self, meter: MeterId) -> &mut Option<f64> {
        match meter {
            MeterId::ElectricityLow => &mut self.electricity_low,
            MeterId::ElectricityHigh => &mut self.electricity_high,
            MeterId::Gas => &mut self.gas,
            MeterId::ElectricityTotal => {
                unreachable!("electricity_total is never ingested")
            }
        }
    }
}

/// Sparse readings as ingested: rows sorted by date, one row per date.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReadingsTable {
    pub rows: Vec<ReadingRow>,
}

impl ReadingsTable {
    /// Builds a table from rows in any order. Rows are sorted by date; two
    /// rows covering the same date merge when their meters are disjoint or
    /// agree exactly, and conflicting values for one meter on one date fail.
    pub fn from_rows(rows: Vec<ReadingRow>) -> Result<Self, crate::pipeline::AnalysisError> {
        use crate::pipeline::AnalysisError;

        let mut by_date: BTreeMap<Date, ReadingRow> = BTreeMap::new();
        for row in rows {
            let merged = by_date
                .entry(row.date)
                .or_insert_with(|| ReadingRow::empty(row.date));
            for meter in PHYSICAL_METERS {
                let Some(value) = row.value(meter) else { continue };
                let slot = merged.value_mut(meter);
                match *slot {
                    Some(existing) if existing != value => {
                        return Err(AnalysisError::DuplicateDate {
                            meter,
                            date: row.date,
                            existing,
                            conflicting: value,
                        });
                    }
                    _ => *slot = Some(value),
                }
            }
        }

        Ok(Self {
            rows: by_date.into_values().collect(),
        })
    }
}

/// A fully gap-filled daily series for one meter.
///
/// All vectors have the calendar length of the run. `annual_delta` and
/// `annual_cost` hold `None` until their stage has run, and stay `None` for
/// the first 365 days of the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterSeries {
    pub meter: MeterId,
    /// First cumulative value; used only to normalize the series for display.
    pub baseline_offset: f64,
    /// Interpolated counter values, non-decreasing over the whole series.
    pub cumulative: Vec<f64>,
    /// `cumulative[i] - cumulative[i-1]`; index 0 is 0.0 (no prior day).
    pub daily_delta: Vec<f64>,
    /// Trailing 365-day sum of `daily_delta`.
    pub annual_delta: Vec<Option<f64>>,
    /// Annualized cost derived from `annual_delta` and the tariffs.
    pub annual_cost: Vec<Option<f64>>,
}

impl MeterSeries {
    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }
}

/// Output of the normalizer and rolling aggregator: every meter on one
/// contiguous daily calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub dates: Vec<Date>,
    pub meters: BTreeMap<MeterId, MeterSeries>,
}

/// The final annotated daily table handed to downstream consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyTable {
    pub dates: Vec<Date>,
    pub meters: BTreeMap<MeterId, MeterSeries>,
    /// Grand total: electricity-total cost plus gas cost minus the rebate.
    pub total_cost: Vec<Option<f64>>,
}

impl DailyTable {
    pub fn series(&self, meter: MeterId) -> Option<&MeterSeries> {
        self.meters.get(&meter)
    }
}
