//! Measurement records as supplied by a record source, and window selection.

use crate::domain::unit::CompoundUnit;
use chrono::{DateTime, Utc};

/// One externally stored measurement, consumed read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalValue {
    pub label: String,
    pub value: String,
    pub decimal: bool,
    pub unit: Option<CompoundUnit>,
    pub canonical_unit: Option<CompoundUnit>,
    pub start_date: DateTime<Utc>,
}

impl ExternalValue {
    /// A decimal-typed record with no unit.
    pub fn decimal(label: &str, value: &str, start_date: DateTime<Utc>) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
            decimal: true,
            unit: None,
            canonical_unit: None,
            start_date,
        }
    }

    /// A non-numeric record, passed through untouched.
    pub fn text(label: &str, value: &str, start_date: DateTime<Utc>) -> Self {
        Self {
            decimal: false,
            ..Self::decimal(label, value, start_date)
        }
    }

    pub fn with_unit(mut self, unit: CompoundUnit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_canonical_unit(mut self, unit: CompoundUnit) -> Self {
        self.canonical_unit = Some(unit);
        self
    }

    pub fn usable_value(&self) -> &str {
        &self.value
    }

    pub fn is_decimal(&self) -> bool {
        self.decimal
    }

    pub fn has_unit(&self) -> bool {
        self.unit.as_ref().is_some_and(CompoundUnit::has_unit)
    }

    pub fn has_per_unit(&self) -> bool {
        self.unit.as_ref().is_some_and(CompoundUnit::has_per_unit)
    }

    /// Convertible records carry a canonical unit to normalize into.
    pub fn is_convertible(&self) -> bool {
        self.canonical_unit.is_some()
    }

    pub fn compound_unit(&self) -> Option<&CompoundUnit> {
        self.unit.as_ref()
    }

    pub fn canonical_compound_unit(&self) -> Option<&CompoundUnit> {
        self.canonical_unit.as_ref()
    }
}

/// Selects the records relevant to `[start_date, end_date)`.
///
/// Keeps every record starting inside the window, in input order, then appends
/// the record in force at `start_date`: the latest one starting before the
/// window, or the first record if none is later than it. The first record is
/// appended even when it was already kept, so a window containing the first
/// record yields it twice.
pub fn filter_item_values<'a>(
    values: &'a [ExternalValue],
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
) -> Vec<&'a ExternalValue> {
    let Some(mut previous) = values.first() else {
        return Vec::new();
    };
    let mut latest = previous.start_date;
    let mut filtered = Vec::new();

    for value in values {
        let current = value.start_date;
        if current >= start_date && current < end_date {
            filtered.push(value);
        } else if current < start_date && current > latest {
            latest = current;
            previous = value;
        }
    }

    filtered.push(previous);
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2010, 1, d, 0, 0, 0).unwrap()
    }

    fn records(points: &[(u32, &str)]) -> Vec<ExternalValue> {
        points
            .iter()
            .map(|(d, v)| ExternalValue::decimal("fuel", v, day(*d)))
            .collect()
    }

    fn values(filtered: &[&ExternalValue]) -> Vec<String> {
        filtered.iter().map(|r| r.value.clone()).collect()
    }

    #[test]
    fn keeps_in_window_records_then_baseline() {
        let input = records(&[(1, "a"), (3, "b"), (5, "c"), (7, "d"), (9, "e")]);
        let filtered = filter_item_values(&input, day(4), day(8));
        assert_eq!(values(&filtered), vec!["c", "d", "b"]);
    }

    #[test]
    fn end_is_exclusive_start_is_inclusive() {
        let input = records(&[(1, "a"), (4, "b"), (8, "c")]);
        let filtered = filter_item_values(&input, day(4), day(8));
        assert_eq!(values(&filtered), vec!["b", "a"]);
    }

    #[test]
    fn baseline_is_latest_before_window() {
        let input = records(&[(1, "a"), (2, "b"), (3, "c"), (6, "d")]);
        let filtered = filter_item_values(&input, day(5), day(9));
        assert_eq!(values(&filtered), vec!["d", "c"]);
    }

    #[test]
    fn first_record_inside_window_is_duplicated() {
        let input = records(&[(2, "a"), (3, "b")]);
        let filtered = filter_item_values(&input, day(1), day(9));
        assert_eq!(values(&filtered), vec!["a", "b", "a"]);
        assert!(std::ptr::eq(filtered[0], filtered[2]));
    }

    #[test]
    fn window_after_all_records_keeps_only_baseline() {
        let input = records(&[(1, "a"), (2, "b")]);
        let filtered = filter_item_values(&input, day(5), day(9));
        assert_eq!(values(&filtered), vec!["b"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(filter_item_values(&[], day(1), day(2)).is_empty());
    }

    #[test]
    fn unit_flags() {
        let plain = ExternalValue::decimal("x", "1", day(1));
        assert!(!plain.has_unit() && !plain.has_per_unit() && !plain.is_convertible());

        let rate = ExternalValue::decimal("x", "1", day(1))
            .with_unit(CompoundUnit::per("kg", "kWh"))
            .with_canonical_unit(CompoundUnit::per("kg", "MJ"));
        assert!(rate.has_unit() && rate.has_per_unit() && rate.is_convertible());
    }

    #[test]
    fn text_records_are_not_decimal() {
        assert!(!ExternalValue::text("x", "diesel", day(1)).is_decimal());
    }
}
