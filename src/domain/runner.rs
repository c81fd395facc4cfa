//! Evaluation of compiled algorithms against named bindings.
//!
//! One [`AlgorithmRunner`] owns one script engine. The engine is built with
//! rhai's `sync` feature and evaluation only borrows it, so a runner can be
//! shared across threads. Every call to [`AlgorithmRunner::evaluate`] builds
//! its own scope; nothing a script binds survives the call.

use crate::domain::algorithm::Algorithm;
use crate::domain::decimal::Decimal;
use crate::domain::error::ImpactError;
use crate::domain::internal_value::InternalValue;
use crate::domain::measurement::ExternalValue;
use crate::domain::sandbox::{register_host_api, ScriptLogger, SeriesHandle};
use crate::domain::series::{format_instant, DataSeries};
use chrono::{DateTime, Utc};
use rhai::{Array, Dynamic, Engine, Scope};
use std::collections::HashMap;

/// Name under which every evaluation receives its logger.
pub const LOGGER_BINDING: &str = "logger";

/// Sandbox resource limits. Exceeding any of them aborts the script with a
/// [`ImpactError::ScriptFailure`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_operations: 1_000_000,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 1 << 20,
        }
    }
}

/// A value bound into a script scope under a name.
#[derive(Debug, Clone)]
pub enum Binding {
    Text(String),
    Decimal(Decimal),
    /// Shared with the caller: window changes made by the script are visible
    /// through the caller's handle.
    Series(SeriesHandle),
    Instant(DateTime<Utc>),
    Records(Vec<ExternalValue>),
    /// Any other host value, passed through to the script untouched.
    Value(Dynamic),
}

impl Binding {
    fn into_dynamic(self) -> Dynamic {
        match self {
            Binding::Text(text) => Dynamic::from(text),
            Binding::Decimal(decimal) => Dynamic::from(decimal),
            Binding::Series(handle) => Dynamic::from(handle),
            Binding::Instant(at) => Dynamic::from(at),
            Binding::Records(records) => Dynamic::from_array(
                records.into_iter().map(Dynamic::from).collect::<Array>(),
            ),
            Binding::Value(value) => value,
        }
    }
}

impl From<String> for Binding {
    fn from(value: String) -> Self {
        Binding::Text(value)
    }
}

impl From<&str> for Binding {
    fn from(value: &str) -> Self {
        Binding::Text(value.to_string())
    }
}

impl From<Decimal> for Binding {
    fn from(value: Decimal) -> Self {
        Binding::Decimal(value)
    }
}

impl From<DataSeries> for Binding {
    fn from(value: DataSeries) -> Self {
        Binding::Series(SeriesHandle::new(value))
    }
}

impl From<SeriesHandle> for Binding {
    fn from(value: SeriesHandle) -> Self {
        Binding::Series(value)
    }
}

impl From<DateTime<Utc>> for Binding {
    fn from(value: DateTime<Utc>) -> Self {
        Binding::Instant(value)
    }
}

impl From<Dynamic> for Binding {
    fn from(value: Dynamic) -> Self {
        Binding::Value(value)
    }
}

impl From<InternalValue> for Binding {
    fn from(value: InternalValue) -> Self {
        match value {
            InternalValue::Decimal(d) => Binding::Decimal(d),
            InternalValue::Text(t) => Binding::Text(t),
            InternalValue::Series(s) => Binding::from(s),
            InternalValue::Records(r) => Binding::Records(r),
        }
    }
}

pub type Bindings = HashMap<String, Binding>;

pub struct AlgorithmRunner {
    engine: Engine,
}

impl AlgorithmRunner {
    pub fn new() -> Self {
        Self::with_config(&RunnerConfig::default())
    }

    pub fn with_config(config: &RunnerConfig) -> Self {
        let mut engine = Engine::new();
        engine.set_max_operations(config.max_operations);
        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_string_size(config.max_string_size);
        register_host_api(&mut engine);
        Self { engine }
    }

    pub fn compile(&self, label: &str, source: &str) -> Result<Algorithm, ImpactError> {
        let ast = self.engine.compile(source).map_err(|e| ImpactError::Compile {
            label: label.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Algorithm::new(label, source, ast))
    }

    /// Evaluates `algorithm` against `bindings` and returns its result as text.
    ///
    /// A script that finishes without a value fails with
    /// [`ImpactError::Evaluation`]. Anything the script raises, including a
    /// thrown `illegal_argument`, fails with [`ImpactError::ScriptFailure`];
    /// see [`crate::domain::rejection::rejected_input`] to tell the two apart.
    pub fn evaluate(&self, algorithm: &Algorithm, bindings: &Bindings) -> Result<String, ImpactError> {
        let label = algorithm.label();
        tracing::debug!(label, bindings = bindings.len(), "evaluating algorithm");

        let mut scope = Scope::new();
        for (name, binding) in bindings {
            scope.push_dynamic(name.as_str(), binding.clone().into_dynamic());
        }
        scope.push(LOGGER_BINDING, ScriptLogger::new(label));

        let result = self
            .engine
            .eval_ast_with_scope::<Dynamic>(&mut scope, algorithm.ast())
            .map_err(|cause| {
                tracing::warn!(label, error = %cause, "algorithm failed");
                ImpactError::ScriptFailure {
                    label: label.to_string(),
                    cause,
                }
            })?;

        stringify(result).ok_or_else(|| ImpactError::Evaluation {
            label: label.to_string(),
        })
    }
}

impl Default for AlgorithmRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn stringify(value: Dynamic) -> Option<String> {
    if value.is_unit() {
        return None;
    }
    if let Some(decimal) = value.clone().try_cast::<Decimal>() {
        return Some(decimal.to_string());
    }
    if let Some(handle) = value.clone().try_cast::<SeriesHandle>() {
        return Some(handle.read().to_string());
    }
    if let Some(at) = value.clone().try_cast::<DateTime<Utc>>() {
        return Some(format_instant(at));
    }
    Some(value.to_string())
}
