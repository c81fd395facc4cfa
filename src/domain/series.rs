//! Step-function time series.
//!
//! A [`DataSeries`] is read as a right-continuous step function: its value at
//! `t` is the value of the latest point at or before `t`. Combination and
//! integration evaluate that function rather than walking point lists, so they
//! do not depend on the order points were appended in.
//!
//! # Textual form
//!
//! ```text
//! {"dataPoints":[["2010-01-01T00:00:00.000Z","1.000000"],...]}
//! ```

use crate::domain::decimal::Decimal;
use crate::domain::error::ImpactError;
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal as Amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    at: DateTime<Utc>,
    value: Decimal,
}

impl DataPoint {
    pub fn new(at: DateTime<Utc>, value: Decimal) -> Self {
        Self { at, value }
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.at
    }

    pub fn value(&self) -> &Decimal {
        &self.value
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataSeries {
    points: Vec<DataPoint>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl DataSeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point. Callers keep timestamps ascending.
    pub fn add_data_point(&mut self, point: DataPoint) {
        self.points.push(point);
    }

    pub fn data_points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn series_start_date(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn series_end_date(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn set_series_start_date(&mut self, start: DateTime<Utc>) {
        self.start = Some(start);
    }

    pub fn set_series_end_date(&mut self, end: DateTime<Utc>) {
        self.end = Some(end);
    }

    /// An independent deep copy, window included.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// The step function's value at `t`, or `None` before the first point.
    pub fn value_at(&self, t: DateTime<Utc>) -> Option<&Decimal> {
        self.points
            .iter()
            .filter(|p| p.at <= t)
            .max_by_key(|p| p.at)
            .map(|p| &p.value)
    }

    pub fn plus(&self, other: &DataSeries) -> Result<DataSeries, ImpactError> {
        self.combine(other, Decimal::checked_add)
    }

    pub fn multiply(&self, other: &DataSeries) -> Result<DataSeries, ImpactError> {
        self.combine(other, Decimal::checked_mul)
    }

    /// Evaluates both step functions at every timestamp either series defines.
    ///
    /// An operand with no point yet at a breakpoint is left out, so the
    /// result there is the other operand's value. The result has no window.
    fn combine<F>(&self, other: &DataSeries, op: F) -> Result<DataSeries, ImpactError>
    where
        F: Fn(&Decimal, &Decimal) -> Result<Decimal, ImpactError>,
    {
        let breakpoints: BTreeSet<DateTime<Utc>> = self
            .points
            .iter()
            .chain(other.points.iter())
            .map(|p| p.at)
            .collect();

        let mut result = DataSeries::new();
        for t in breakpoints {
            let value = match (self.value_at(t), other.value_at(t)) {
                (Some(a), Some(b)) => op(a, b)?,
                (Some(only), None) | (None, Some(only)) => only.clone(),
                (None, None) => continue,
            };
            result.add_data_point(DataPoint::new(t, value));
        }
        Ok(result)
    }

    /// Duration-weighted average of the step function over `[start, end)`,
    /// with each span weighted by its length in fractional days.
    ///
    /// Without explicit bounds the window is `[first point, last point)`. The
    /// span before the first point inside the window takes the value in force
    /// at `start`; a span with no value in force contributes nothing but still
    /// counts toward the window length. Fails with `Arithmetic` when the
    /// weighted sum leaves the decimal range.
    pub fn integrate(&self) -> Result<Decimal, ImpactError> {
        let Some(first) = self.points.iter().map(|p| p.at).min() else {
            return Ok(Decimal::zero());
        };
        let last = self.points.iter().map(|p| p.at).max().unwrap_or(first);
        let start = self.start.unwrap_or(first);
        let end = self.end.unwrap_or(last);
        let unit = self.points[0].value.unit().cloned();

        if end <= start {
            return Ok(self
                .value_at(start)
                .map(Decimal::rounded)
                .unwrap_or_else(Decimal::zero));
        }

        let mut boundaries: BTreeSet<DateTime<Utc>> = self
            .points
            .iter()
            .map(|p| p.at)
            .filter(|t| *t > start && *t < end)
            .collect();
        boundaries.insert(start);
        boundaries.insert(end);
        let boundaries: Vec<DateTime<Utc>> = boundaries.into_iter().collect();

        let mut sum = Amount::ZERO;
        for span in boundaries.windows(2) {
            if let Some(value) = self.value_at(span[0]) {
                sum = days(span[0], span[1])
                    .and_then(|weight| value.amount().checked_mul(weight))
                    .and_then(|weighted| sum.checked_add(weighted))
                    .ok_or_else(integration_overflow)?;
            }
        }

        let average = days(start, end)
            .and_then(|total| sum.checked_div(total))
            .ok_or_else(integration_overflow)?;
        let average = match unit {
            Some(unit) => Decimal::with_unit(average, unit),
            None => Decimal::new(average),
        };
        Ok(average.rounded())
    }

    /// Parses the textual form produced by `Display`.
    pub fn from_json(json: &str) -> Result<DataSeries, ImpactError> {
        let wire: SeriesWire = serde_json::from_str(json)?;
        let mut series = DataSeries::new();
        for (at, value) in wire.data_points {
            let at = DateTime::parse_from_rfc3339(&at)
                .map_err(|e| ImpactError::Data {
                    reason: format!("invalid instant {at:?}: {e}"),
                })?
                .with_timezone(&Utc);
            series.add_data_point(DataPoint::new(at, Decimal::parse(&value)?));
        }
        Ok(series)
    }

    fn to_wire(&self) -> SeriesWire {
        SeriesWire {
            data_points: self
                .points
                .iter()
                .map(|p| (format_instant(p.at), p.value.to_string()))
                .collect(),
        }
    }
}

const MILLIS_PER_DAY: i64 = 86_400_000;

fn days(from: DateTime<Utc>, to: DateTime<Utc>) -> Option<Amount> {
    Amount::from((to - from).num_milliseconds()).checked_div(Amount::from(MILLIS_PER_DAY))
}

fn integration_overflow() -> ImpactError {
    ImpactError::Arithmetic {
        reason: "integration overflow".to_string(),
    }
}

pub fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize, Deserialize)]
struct SeriesWire {
    #[serde(rename = "dataPoints")]
    data_points: Vec<(String, String)>,
}

impl fmt::Display for DataSeries {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string(&self.to_wire()).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
