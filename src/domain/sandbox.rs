//! Host objects exposed to formula scripts.
//!
//! Registered types: `Decimal`, `DataSeries`, `Instant`, `ExternalValue`,
//! `IllegalArgument` and `Logger`.
//!
//! ```rhai
//! let total = seriesA.plus(seriesB);
//! total.set_series_start_date(startDate);
//! total.set_series_end_date(endDate);
//! total.integrate()
//! ```
//!
//! Series are bound as shared handles: a script that moves the window of a
//! bound series moves it for the caller too. `copy()` detaches.

use crate::domain::decimal::Decimal;
use crate::domain::error::{ImpactError, RejectedInput};
use crate::domain::measurement::ExternalValue;
use crate::domain::series::{format_instant, DataSeries};
use chrono::{DateTime, NaiveDate, Utc};
use rhai::{Engine, EvalAltResult, INT};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A [`DataSeries`] shared between the caller and a script scope.
#[derive(Debug, Clone, Default)]
pub struct SeriesHandle(Arc<RwLock<DataSeries>>);

impl SeriesHandle {
    pub fn new(series: DataSeries) -> Self {
        Self(Arc::new(RwLock::new(series)))
    }

    pub fn read(&self) -> RwLockReadGuard<'_, DataSeries> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, DataSeries> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DataSeries {
        self.read().clone()
    }

    /// A handle to a deep copy; nothing is shared with `self`.
    pub fn detached(&self) -> Self {
        Self::new(self.snapshot())
    }

    pub fn shares_with(&self, other: &SeriesHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<DataSeries> for SeriesHandle {
    fn from(series: DataSeries) -> Self {
        Self::new(series)
    }
}

/// The `logger` binding. Messages go to `tracing` under the `algorithm` target.
#[derive(Debug, Clone)]
pub struct ScriptLogger {
    label: String,
}

impl ScriptLogger {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "algorithm", label = %self.label, "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "algorithm", label = %self.label, "{message}");
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "algorithm", label = %self.label, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "algorithm", label = %self.label, "{message}");
    }
}

type ScriptResult<T> = Result<T, Box<EvalAltResult>>;
type DecimalOp = fn(&Decimal, &Decimal) -> Result<Decimal, ImpactError>;

const DECIMAL_OPS: [(&str, DecimalOp); 4] = [
    ("+", Decimal::checked_add),
    ("-", Decimal::checked_sub),
    ("*", Decimal::checked_mul),
    ("/", Decimal::checked_div),
];

fn host<T>(result: Result<T, ImpactError>) -> ScriptResult<T> {
    result.map_err(|e| e.to_string().into())
}

pub(crate) fn register_host_api(engine: &mut Engine) {
    engine.on_print(|text| tracing::info!(target: "algorithm", "{text}"));
    engine.on_debug(|text, source, pos| {
        tracing::debug!(target: "algorithm", source = source.unwrap_or(""), %pos, "{text}")
    });

    register_decimal(engine);
    register_series(engine);
    register_instant(engine);
    register_records(engine);
    register_logger(engine);
}

fn register_decimal(engine: &mut Engine) {
    engine
        .register_type_with_name::<Decimal>("Decimal")
        .register_fn("decimal", |text: &str| host(Decimal::parse(text)))
        .register_fn("decimal", |value: INT| Decimal::from(value))
        .register_fn("to_float", |d: &mut Decimal| d.to_f64())
        .register_fn("to_string", |d: &mut Decimal| d.to_string())
        .register_fn("to_debug", |d: &mut Decimal| format!("{d:?}"));

    for (name, op) in DECIMAL_OPS {
        engine.register_fn(name, move |a: Decimal, b: Decimal| host(op(&a, &b)));
        engine.register_fn(name, move |a: Decimal, b: INT| host(op(&a, &Decimal::from(b))));
        engine.register_fn(name, move |a: INT, b: Decimal| host(op(&Decimal::from(a), &b)));
    }
}

fn register_series(engine: &mut Engine) {
    engine
        .register_type_with_name::<SeriesHandle>("DataSeries")
        .register_fn("plus", |a: &mut SeriesHandle, b: SeriesHandle| {
            let left = a.snapshot();
            host(left.plus(&b.read()).map(SeriesHandle::new))
        })
        .register_fn("multiply", |a: &mut SeriesHandle, b: SeriesHandle| {
            let left = a.snapshot();
            host(left.multiply(&b.read()).map(SeriesHandle::new))
        })
        .register_fn("+", |a: SeriesHandle, b: SeriesHandle| {
            let left = a.snapshot();
            host(left.plus(&b.read()).map(SeriesHandle::new))
        })
        .register_fn("*", |a: SeriesHandle, b: SeriesHandle| {
            let left = a.snapshot();
            host(left.multiply(&b.read()).map(SeriesHandle::new))
        })
        .register_fn("integrate", |s: &mut SeriesHandle| host(s.read().integrate()))
        .register_fn("copy", |s: &mut SeriesHandle| s.detached())
        .register_fn("set_series_start_date", |s: &mut SeriesHandle, at: DateTime<Utc>| {
            s.write().set_series_start_date(at)
        })
        .register_fn("set_series_end_date", |s: &mut SeriesHandle, at: DateTime<Utc>| {
            s.write().set_series_end_date(at)
        })
        .register_fn("len", |s: &mut SeriesHandle| s.read().len() as INT)
        .register_fn("to_string", |s: &mut SeriesHandle| s.read().to_string())
        .register_fn("to_debug", |s: &mut SeriesHandle| s.read().to_string());
}

fn register_instant(engine: &mut Engine) {
    engine
        .register_type_with_name::<DateTime<Utc>>("Instant")
        .register_fn("instant", |text: &str| -> ScriptResult<DateTime<Utc>> {
            DateTime::parse_from_rfc3339(text)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| format!("invalid instant {text:?}: {e}").into())
        })
        .register_fn("date", |y: INT, m: INT, d: INT| -> ScriptResult<DateTime<Utc>> {
            let ymd = (i32::try_from(y), u32::try_from(m), u32::try_from(d));
            match ymd {
                (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d)
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|t| t.and_utc())
                    .ok_or_else(|| format!("invalid date {y}-{m}-{d}").into()),
                _ => Err(format!("invalid date {y}-{m}-{d}").into()),
            }
        })
        .register_fn("to_string", |t: &mut DateTime<Utc>| format_instant(*t))
        .register_fn("to_debug", |t: &mut DateTime<Utc>| format_instant(*t));
}

fn register_records(engine: &mut Engine) {
    engine
        .register_type_with_name::<ExternalValue>("ExternalValue")
        .register_get("value", |r: &mut ExternalValue| r.value.clone())
        .register_get("label", |r: &mut ExternalValue| r.label.clone())
        .register_get("start_date", |r: &mut ExternalValue| r.start_date)
        .register_get("is_decimal", |r: &mut ExternalValue| r.decimal);

    engine
        .register_type_with_name::<RejectedInput>("IllegalArgument")
        .register_fn("illegal_argument", |message: &str| RejectedInput::new(message))
        .register_get("message", |r: &mut RejectedInput| r.message.clone())
        .register_fn("to_string", |r: &mut RejectedInput| r.to_string());
}

fn register_logger(engine: &mut Engine) {
    engine
        .register_type_with_name::<ScriptLogger>("Logger")
        .register_fn("debug", |l: &mut ScriptLogger, m: &str| l.debug(m))
        .register_fn("info", |l: &mut ScriptLogger, m: &str| l.info(m))
        .register_fn("warn", |l: &mut ScriptLogger, m: &str| l.warn(m))
        .register_fn("error", |l: &mut ScriptLogger, m: &str| l.error(m));
}
