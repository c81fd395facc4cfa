//! Unit conversion catalog port.

use crate::domain::unit::Unit;
use rust_decimal::Decimal as Amount;

/// Source of multiplicative factors between units.
///
/// `factor(from, to)` is the number that turns a quantity in `from` into the
/// same quantity in `to`. Implementations need not handle identity; callers
/// short-circuit equal units.
pub trait UnitCatalog {
    fn factor(&self, from: &Unit, to: &Unit) -> Option<Amount>;
}
