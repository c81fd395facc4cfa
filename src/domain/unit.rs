//! Units and compound units.
//!
//! A [`CompoundUnit`] is a unit with an optional per-unit divisor, written
//! `"kg"` or `"kg/kWh"`. Conversion factors between units are not known here;
//! they come from a [`crate::ports::unit_port::UnitCatalog`].

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Unit(String);

impl Unit {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into().trim().to_string())
    }

    /// The dimensionless unit, used as the numerator of `1/h`.
    pub fn one() -> Self {
        Self(String::new())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }

    pub fn is_one(&self) -> bool {
        self.0.is_empty() || self.0 == "1"
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_one() {
            write!(f, "1")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompoundUnit {
    pub unit: Unit,
    pub per_unit: Option<Unit>,
}

impl CompoundUnit {
    pub fn new(unit: Unit, per_unit: Option<Unit>) -> Self {
        Self { unit, per_unit }
    }

    pub fn simple(symbol: &str) -> Self {
        Self::new(Unit::new(symbol), None)
    }

    pub fn per(symbol: &str, per_symbol: &str) -> Self {
        Self::new(Unit::new(symbol), Some(Unit::new(per_symbol)))
    }

    pub fn has_unit(&self) -> bool {
        !self.unit.is_one()
    }

    pub fn has_per_unit(&self) -> bool {
        self.per_unit.is_some()
    }

    /// The unit of a product, when it can be expressed as a compound unit.
    ///
    /// `kg/kWh × kWh = kg`. `None` means the product is untracked.
    pub fn multiply(&self, other: &CompoundUnit) -> Option<CompoundUnit> {
        let left_cancels = self.per_unit.as_ref() == Some(&other.unit);
        let right_cancels = other.per_unit.as_ref() == Some(&self.unit);
        match (left_cancels, right_cancels) {
            (true, false) => Some(CompoundUnit::new(self.unit.clone(), other.per_unit.clone())),
            (false, true) => Some(CompoundUnit::new(other.unit.clone(), self.per_unit.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for CompoundUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.per_unit {
            Some(per) => write!(f, "{}/{}", self.unit, per),
            None => write!(f, "{}", self.unit),
        }
    }
}

impl FromStr for CompoundUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty unit".to_string());
        }
        match s.split_once('/') {
            Some((unit, per)) => {
                let per = per.trim();
                if per.is_empty() || per.contains('/') {
                    return Err(format!("malformed compound unit: {s}"));
                }
                Ok(CompoundUnit::new(Unit::new(unit), Some(Unit::new(per))))
            }
            None => Ok(CompoundUnit::simple(s)),
        }
    }
}
