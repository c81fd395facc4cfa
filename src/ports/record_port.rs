//! Measurement record source port.

use crate::domain::error::ImpactError;
use crate::domain::measurement::ExternalValue;

pub trait RecordPort {
    /// All records for the named measurement, sorted by start date.
    fn fetch_records(&self, name: &str) -> Result<Vec<ExternalValue>, ImpactError>;
}
