//! Normalization of external measurement records into engine values.
//!
//! Decimal records are converted into their canonical unit here, and only
//! here; everything downstream assumes canonical units.

use crate::domain::decimal::Decimal;
use crate::domain::error::ImpactError;
use crate::domain::measurement::{filter_item_values, ExternalValue};
use crate::domain::series::{DataPoint, DataSeries};
use crate::ports::unit_port::UnitCatalog;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum InternalValue {
    Decimal(Decimal),
    Text(String),
    Series(DataSeries),
    Records(Vec<ExternalValue>),
}

impl InternalValue {
    pub fn from_text(value: impl Into<String>) -> Self {
        InternalValue::Text(value.into())
    }

    pub fn from_external(
        value: &ExternalValue,
        catalog: &dyn UnitCatalog,
    ) -> Result<Self, ImpactError> {
        if value.is_decimal() {
            Ok(InternalValue::Decimal(as_internal_decimal(value, catalog)?))
        } else {
            Ok(InternalValue::Text(value.usable_value().to_string()))
        }
    }

    /// Builds a windowed series from records sorted by start date.
    ///
    /// Non-decimal sequences are passed through as records.
    pub fn from_records(
        values: &[ExternalValue],
        start_date: DateTime<Utc>,
        end_date: DateTime<Utc>,
        catalog: &dyn UnitCatalog,
    ) -> Result<Self, ImpactError> {
        let first = values.first().ok_or_else(|| ImpactError::NoRecords {
            label: "series".to_string(),
        })?;
        if !first.is_decimal() {
            return Ok(InternalValue::Records(values.to_vec()));
        }

        let mut series = DataSeries::new();
        for record in filter_item_values(values, start_date, end_date) {
            series.add_data_point(DataPoint::new(
                record.start_date,
                as_internal_decimal(record, catalog)?,
            ));
        }
        series.set_series_start_date(start_date);
        series.set_series_end_date(end_date);
        Ok(InternalValue::Series(series))
    }

    pub fn as_decimal(&self) -> Option<&Decimal> {
        match self {
            InternalValue::Decimal(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_series(&self) -> Option<&DataSeries> {
        match self {
            InternalValue::Series(s) => Some(s),
            _ => None,
        }
    }
}

/// Reads a decimal record, converting it to its canonical unit if it has one.
pub fn as_internal_decimal(
    record: &ExternalValue,
    catalog: &dyn UnitCatalog,
) -> Result<Decimal, ImpactError> {
    let unit = match record.compound_unit() {
        Some(unit) if record.has_unit() || record.has_per_unit() => unit,
        _ => return Decimal::parse(record.usable_value()),
    };

    let decimal = Decimal::parse_with_unit(record.usable_value(), unit.clone())?;
    match record.canonical_compound_unit() {
        Some(canonical) if decimal.has_different_units(canonical) => {
            let converted = decimal.convert(canonical, catalog)?;
            tracing::debug!(
                label = %record.label,
                external = %decimal,
                external_unit = %unit,
                internal = %converted,
                internal_unit = %canonical,
                "converted to canonical unit"
            );
            Ok(converted)
        }
        _ => Ok(decimal),
    }
}
