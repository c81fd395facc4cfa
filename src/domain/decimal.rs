//! Fixed-output decimal numbers tagged with an optional compound unit.
//!
//! Amounts are held at full `rust_decimal` precision; only the textual form is
//! fixed at six places, rounded half away from zero.

use crate::domain::error::ImpactError;
use crate::domain::unit::{CompoundUnit, Unit};
use crate::ports::unit_port::UnitCatalog;
use rust_decimal::prelude::ToPrimitive;
pub use rust_decimal::Decimal as Amount;
use rust_decimal::RoundingStrategy;
use std::fmt;
use std::str::FromStr;

/// Places in the textual form.
pub const SCALE: u32 = 6;

#[derive(Debug, Clone, PartialEq)]
pub struct Decimal {
    amount: Amount,
    unit: Option<CompoundUnit>,
}

impl Decimal {
    pub fn new(amount: Amount) -> Self {
        Self { amount, unit: None }
    }

    pub fn with_unit(amount: Amount, unit: CompoundUnit) -> Self {
        Self {
            amount,
            unit: Some(unit),
        }
    }

    pub fn zero() -> Self {
        Self::new(Amount::ZERO)
    }

    pub fn parse(value: &str) -> Result<Self, ImpactError> {
        let trimmed = value.trim();
        Amount::from_str(trimmed)
            .or_else(|_| Amount::from_scientific(trimmed))
            .map(Self::new)
            .map_err(|_| ImpactError::InvalidDecimal {
                value: value.to_string(),
            })
    }

    pub fn parse_with_unit(value: &str, unit: CompoundUnit) -> Result<Self, ImpactError> {
        Ok(Self::parse(value)?.tagged(Some(unit)))
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn unit(&self) -> Option<&CompoundUnit> {
        self.unit.as_ref()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    pub fn has_different_units(&self, target: &CompoundUnit) -> bool {
        self.unit.as_ref() != Some(target)
    }

    pub fn to_f64(&self) -> f64 {
        self.amount.to_f64().unwrap_or(f64::NAN)
    }

    /// The same amount rounded to [`SCALE`] places, keeping the unit.
    pub fn rounded(&self) -> Self {
        Self {
            amount: self
                .amount
                .round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero),
            unit: self.unit.clone(),
        }
    }

    fn tagged(mut self, unit: Option<CompoundUnit>) -> Self {
        self.unit = unit;
        self
    }

    /// Re-express this value in `target` using factors from `catalog`.
    pub fn convert(
        &self,
        target: &CompoundUnit,
        catalog: &dyn UnitCatalog,
    ) -> Result<Decimal, ImpactError> {
        let conversion_error = || ImpactError::Conversion {
            from: self.unit_label(),
            to: target.to_string(),
        };
        let current = self.unit.as_ref().ok_or_else(conversion_error)?;
        if current == target {
            return Ok(self.clone());
        }

        let unit_factor = lookup(catalog, &current.unit, &target.unit).ok_or_else(conversion_error)?;
        let per_factor = match (&current.per_unit, &target.per_unit) {
            (None, None) => Amount::ONE,
            (Some(from), Some(to)) => lookup(catalog, from, to).ok_or_else(conversion_error)?,
            _ => return Err(conversion_error()),
        };

        let amount = self
            .amount
            .checked_mul(unit_factor)
            .and_then(|scaled| scaled.checked_div(per_factor))
            .ok_or_else(conversion_error)?;
        Ok(Decimal::with_unit(amount, target.clone()))
    }

    pub fn checked_add(&self, other: &Decimal) -> Result<Decimal, ImpactError> {
        let unit = self.sum_unit(other)?;
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or_else(|| overflow("addition"))?;
        Ok(Decimal::new(amount).tagged(unit))
    }

    pub fn checked_sub(&self, other: &Decimal) -> Result<Decimal, ImpactError> {
        let unit = self.sum_unit(other)?;
        let amount = self
            .amount
            .checked_sub(other.amount)
            .ok_or_else(|| overflow("subtraction"))?;
        Ok(Decimal::new(amount).tagged(unit))
    }

    /// Products keep a unit only where one can be named: an untagged operand
    /// adopts the other's unit, and a per-unit cancels against a matching unit.
    pub fn checked_mul(&self, other: &Decimal) -> Result<Decimal, ImpactError> {
        let unit = match (&self.unit, &other.unit) {
            (None, None) => None,
            (Some(u), None) | (None, Some(u)) => Some(u.clone()),
            (Some(a), Some(b)) => a.multiply(b),
        };
        let amount = self
            .amount
            .checked_mul(other.amount)
            .ok_or_else(|| overflow("multiplication"))?;
        Ok(Decimal::new(amount).tagged(unit))
    }

    pub fn checked_div(&self, other: &Decimal) -> Result<Decimal, ImpactError> {
        if other.amount.is_zero() {
            return Err(ImpactError::Arithmetic {
                reason: "division by zero".to_string(),
            });
        }
        let unit = match &other.unit {
            None => self.unit.clone(),
            Some(_) => None,
        };
        let amount = self
            .amount
            .checked_div(other.amount)
            .ok_or_else(|| overflow("division"))?;
        Ok(Decimal::new(amount).tagged(unit))
    }

    fn sum_unit(&self, other: &Decimal) -> Result<Option<CompoundUnit>, ImpactError> {
        match (&self.unit, &other.unit) {
            (None, None) => Ok(None),
            (Some(u), None) | (None, Some(u)) => Ok(Some(u.clone())),
            (Some(a), Some(b)) if a == b => Ok(Some(a.clone())),
            (Some(a), Some(b)) => Err(ImpactError::UnitMismatch {
                left: a.to_string(),
                right: b.to_string(),
            }),
        }
    }

    fn unit_label(&self) -> String {
        self.unit
            .as_ref()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "(none)".to_string())
    }
}

fn lookup(catalog: &dyn UnitCatalog, from: &Unit, to: &Unit) -> Option<Amount> {
    if from == to {
        Some(Amount::ONE)
    } else {
        catalog.factor(from, to)
    }
}

fn overflow(operation: &str) -> ImpactError {
    ImpactError::Arithmetic {
        reason: format!("{operation} overflow"),
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        Self::new(amount)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self::new(Amount::from(value))
    }
}

impl FromStr for Decimal {
    type Err = ImpactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut fixed = self
            .amount
            .round_dp_with_strategy(SCALE, RoundingStrategy::MidpointAwayFromZero);
        if fixed.is_zero() {
            fixed.set_sign_positive(true);
        }
        fixed.rescale(SCALE);
        write!(f, "{fixed}")?;
        // Amounts near the range limit cannot carry six places internally.
        let missing = SCALE.saturating_sub(fixed.scale());
        if missing > 0 {
            if fixed.scale() == 0 {
                f.write_str(".")?;
            }
            write!(f, "{:0<width$}", "", width = missing as usize)?;
        }
        Ok(())
    }
}
