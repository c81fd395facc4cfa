#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use impactcalc::domain::decimal::{Amount, Decimal};
use impactcalc::domain::error::ImpactError;
pub use impactcalc::domain::measurement::ExternalValue;
use impactcalc::domain::series::{DataPoint, DataSeries};
use impactcalc::domain::unit::{CompoundUnit, Unit};
use impactcalc::ports::record_port::RecordPort;
use impactcalc::ports::unit_port::UnitCatalog;
use std::collections::HashMap;

pub struct MockRecordPort {
    pub data: HashMap<String, Vec<ExternalValue>>,
    pub errors: HashMap<String, String>,
}

impl MockRecordPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_records(mut self, name: &str, records: Vec<ExternalValue>) -> Self {
        self.data.insert(name.to_string(), records);
        self
    }

    pub fn with_error(mut self, name: &str, reason: &str) -> Self {
        self.errors.insert(name.to_string(), reason.to_string());
        self
    }
}

impl RecordPort for MockRecordPort {
    fn fetch_records(&self, name: &str) -> Result<Vec<ExternalValue>, ImpactError> {
        if let Some(reason) = self.errors.get(name) {
            return Err(ImpactError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(name).cloned().unwrap_or_default())
    }
}

/// Fixed factors for kWh, MJ, g and kg in both directions.
pub struct EnergyCatalog;

impl UnitCatalog for EnergyCatalog {
    fn factor(&self, from: &Unit, to: &Unit) -> Option<Amount> {
        match (from.symbol(), to.symbol()) {
            ("kWh", "MJ") => Some(Amount::new(36, 1)),
            ("MJ", "kWh") => Some(Amount::ONE / Amount::new(36, 1)),
            ("g", "kg") => Some(Amount::new(1, 3)),
            ("kg", "g") => Some(Amount::from(1000)),
            _ => None,
        }
    }
}

pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2010, 1, d, 0, 0, 0).unwrap()
}

pub fn dec(value: &str) -> Decimal {
    Decimal::parse(value).unwrap()
}

pub fn make_series(points: &[(u32, &str)]) -> DataSeries {
    let mut series = DataSeries::new();
    for (d, v) in points {
        series.add_data_point(DataPoint::new(day(*d), dec(v)));
    }
    series
}

/// `[(01, 1), (03, 0), (04, 0.5)]`
pub fn series_a() -> DataSeries {
    make_series(&[(1, "1"), (3, "0"), (4, "0.5")])
}

/// `[(01, 0), (03, 1), (04, 2)]`
pub fn series_b() -> DataSeries {
    make_series(&[(1, "0"), (3, "1"), (4, "2")])
}

/// `[(01, 0), (02, 1), (04, 3)]`
pub fn series_c() -> DataSeries {
    make_series(&[(1, "0"), (2, "1"), (4, "3")])
}

pub fn energy_record(value: &str, d: u32) -> ExternalValue {
    ExternalValue::decimal("energy", value, day(d))
        .with_unit(CompoundUnit::simple("kWh"))
        .with_canonical_unit(CompoundUnit::simple("MJ"))
}

pub fn intensity_record(value: &str, d: u32) -> ExternalValue {
    ExternalValue::decimal("intensity", value, day(d))
        .with_unit(CompoundUnit::per("g", "kWh"))
        .with_canonical_unit(CompoundUnit::per("kg", "MJ"))
}

/// Renders `[(day, value)]` pairs in the series textual form.
pub fn series_json(points: &[(u32, &str)]) -> String {
    let body: Vec<String> = points
        .iter()
        .map(|(d, v)| format!("[\"2010-01-{:02}T00:00:00.000Z\",\"{}\"]", d, v))
        .collect();
    format!("{{\"dataPoints\":[{}]}}", body.join(","))
}
