//! Unit conversion catalog loaded from the `[units]` config section.
//!
//! ```ini
//! [units]
//! kWh -> MJ = 3.6
//! g -> kg = 0.001
//! ```
//!
//! Each entry also defines its inverse unless the inverse is listed itself.

use crate::domain::decimal::Amount;
use crate::domain::error::ImpactError;
use crate::domain::unit::Unit;
use crate::ports::config_port::ConfigPort;
use crate::ports::unit_port::UnitCatalog;
use std::collections::HashMap;
use std::str::FromStr;

const SECTION: &str = "units";

#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    factors: HashMap<(Unit, Unit), Amount>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, ImpactError> {
        let mut table = Self::new();
        for (key, value) in config.get_section(SECTION) {
            let (from, to) = parse_key(&key)?;
            let factor = parse_factor(&key, &value)?;
            table = table.with_factor(from, to, factor);
        }
        tracing::debug!(factors = table.len(), "loaded unit table");
        Ok(table)
    }

    /// Adds `from -> to` and, unless already present, its inverse. A later
    /// explicit factor replaces a derived inverse.
    pub fn with_factor(mut self, from: &str, to: &str, factor: Amount) -> Self {
        let (from, to) = (Unit::new(from), Unit::new(to));
        if let Some(inverse) = Amount::ONE.checked_div(factor) {
            self.factors.entry((to.clone(), from.clone())).or_insert(inverse);
        }
        self.factors.insert((from, to), factor);
        self
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

fn parse_key(key: &str) -> Result<(&str, &str), ImpactError> {
    match key.split_once("->") {
        Some((from, to)) if !from.trim().is_empty() && !to.trim().is_empty() => {
            Ok((from.trim(), to.trim()))
        }
        _ => Err(ImpactError::ConfigInvalid {
            section: SECTION.to_string(),
            key: key.to_string(),
            reason: "expected `FROM -> TO`".to_string(),
        }),
    }
}

fn parse_factor(key: &str, value: &str) -> Result<Amount, ImpactError> {
    let value = value.trim();
    let factor = Amount::from_str(value)
        .or_else(|_| Amount::from_scientific(value))
        .map_err(|_| ImpactError::ConfigInvalid {
            section: SECTION.to_string(),
            key: key.to_string(),
            reason: format!("invalid factor {value:?}"),
        })?;
    if factor <= Amount::ZERO {
        return Err(ImpactError::ConfigInvalid {
            section: SECTION.to_string(),
            key: key.to_string(),
            reason: "factor must be positive".to_string(),
        });
    }
    Ok(factor)
}

impl UnitCatalog for UnitTable {
    fn factor(&self, from: &Unit, to: &Unit) -> Option<Amount> {
        if from == to {
            return Some(Amount::ONE);
        }
        self.factors.get(&(from.clone(), to.clone())).copied()
    }
}
