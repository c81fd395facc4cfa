//! Domain error types.

use rhai::EvalAltResult;

/// The explicit rejection a formula raises when its input is unusable.
///
/// Scripts throw this with `throw illegal_argument("...")`; callers recover it
/// from a [`ImpactError::ScriptFailure`] via [`crate::domain::rejection::rejected_input`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rejected input: {message}")]
pub struct RejectedInput {
    pub message: String,
}

impl RejectedInput {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Top-level error type for impactcalc.
#[derive(Debug, thiserror::Error)]
pub enum ImpactError {
    #[error("algorithm result is null ({label})")]
    Evaluation { label: String },

    #[error("algorithm {label} failed: {cause}")]
    ScriptFailure {
        label: String,
        #[source]
        cause: Box<EvalAltResult>,
    },

    #[error("algorithm {label} failed to compile: {reason}")]
    Compile { label: String, reason: String },

    #[error("no conversion factor from {from} to {to}")]
    Conversion { from: String, to: String },

    #[error("unit mismatch: {left} vs {right}")]
    UnitMismatch { left: String, right: String },

    #[error("invalid decimal value: {value:?}")]
    InvalidDecimal { value: String },

    #[error("arithmetic error: {reason}")]
    Arithmetic { reason: String },

    #[error("no records for {label}")]
    NoRecords { label: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&ImpactError> for std::process::ExitCode {
    fn from(err: &ImpactError) -> Self {
        let code: u8 = match err {
            ImpactError::Io(_) => 1,
            ImpactError::ConfigParse { .. }
            | ImpactError::ConfigMissing { .. }
            | ImpactError::ConfigInvalid { .. } => 2,
            ImpactError::Data { .. } | ImpactError::NoRecords { .. } | ImpactError::Json(_) => 3,
            ImpactError::Evaluation { .. }
            | ImpactError::ScriptFailure { .. }
            | ImpactError::Compile { .. } => 4,
            ImpactError::Conversion { .. }
            | ImpactError::UnitMismatch { .. }
            | ImpactError::InvalidDecimal { .. }
            | ImpactError::Arithmetic { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
