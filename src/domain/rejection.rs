//! Recovery of deliberate input rejections from script failures.
//!
//! A formula rejects its input by throwing an `IllegalArgument` host object.
//! By the time the failure reaches the host it may be wrapped twice:
//!
//! 1. in engine call frames (`ErrorInFunctionCall`, `ErrorInModule`) when the
//!    throw happened inside a script function, and
//! 2. in a thrown object map, under `host_error` or else `cause`, when the
//!    formula rethrows a structured error. A property holding a plain script
//!    value is passed over in favour of the next one.
//!
//! Only this module knows those shapes.

use crate::domain::error::{ImpactError, RejectedInput};
use rhai::{Dynamic, EvalAltResult, Map};

/// Map properties that may hold a wrapped host object, checked in order.
/// A property only counts when it holds a host object.
pub const WRAPPER_PROPERTIES: [&str; 2] = ["host_error", "cause"];

const MAX_CALL_FRAMES: usize = 2;

/// The rejection behind a [`ImpactError::ScriptFailure`], if the formula raised one.
pub fn rejected_input(err: &ImpactError) -> Option<RejectedInput> {
    match err {
        ImpactError::ScriptFailure { cause, .. } => find_rejection(cause),
        _ => None,
    }
}

pub fn find_rejection(cause: &EvalAltResult) -> Option<RejectedInput> {
    let thrown = thrown_value(cause)?;
    if thrown.is::<RejectedInput>() {
        return thrown.try_cast::<RejectedInput>();
    }
    unwrap_host_value(thrown).try_cast::<RejectedInput>()
}

fn thrown_value(cause: &EvalAltResult) -> Option<Dynamic> {
    let mut current = cause;
    for _ in 0..=MAX_CALL_FRAMES {
        match current {
            EvalAltResult::ErrorRuntime(value, _) => return Some(value.clone()),
            EvalAltResult::ErrorInFunctionCall(_, _, inner, _)
            | EvalAltResult::ErrorInModule(_, inner, _) => current = inner,
            _ => return None,
        }
    }
    None
}

fn unwrap_host_value(value: Dynamic) -> Dynamic {
    let Some(map) = value.clone().try_cast::<Map>() else {
        return value;
    };
    WRAPPER_PROPERTIES
        .iter()
        .filter_map(|property| map.get(*property))
        .find(|wrapped| wrapped.is_variant())
        .cloned()
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Position;

    fn failure(cause: EvalAltResult) -> ImpactError {
        ImpactError::ScriptFailure {
            label: "test".into(),
            cause: Box::new(cause),
        }
    }

    fn thrown(value: Dynamic) -> EvalAltResult {
        EvalAltResult::ErrorRuntime(value, Position::NONE)
    }

    fn in_call(inner: EvalAltResult) -> EvalAltResult {
        EvalAltResult::ErrorInFunctionCall(
            "check".into(),
            String::new(),
            Box::new(inner),
            Position::NONE,
        )
    }

    fn bang() -> Dynamic {
        Dynamic::from(RejectedInput::new("Bang!"))
    }

    #[test]
    fn direct_rejection() {
        let found = rejected_input(&failure(thrown(bang()))).unwrap();
        assert_eq!(found.message, "Bang!");
    }

    #[test]
    fn rejection_inside_call_frames() {
        let err = failure(in_call(in_call(thrown(bang()))));
        assert_eq!(rejected_input(&err).unwrap().message, "Bang!");
    }

    #[test]
    fn too_many_call_frames() {
        let err = failure(in_call(in_call(in_call(thrown(bang())))));
        assert_eq!(rejected_input(&err), None);
    }

    #[test]
    fn rejection_wrapped_in_map() {
        let mut map = Map::new();
        map.insert("cause".into(), bang());
        let err = failure(thrown(Dynamic::from_map(map)));
        assert_eq!(rejected_input(&err).unwrap().message, "Bang!");
    }

    #[test]
    fn plain_host_error_falls_through_to_cause() {
        let mut map = Map::new();
        map.insert("host_error".into(), Dynamic::from("just a message"));
        map.insert("cause".into(), bang());
        let err = failure(thrown(Dynamic::from_map(map)));
        assert_eq!(rejected_input(&err).unwrap().message, "Bang!");
    }

    #[test]
    fn host_error_object_wins_over_cause() {
        let mut map = Map::new();
        map.insert("host_error".into(), Dynamic::from(RejectedInput::new("first")));
        map.insert("cause".into(), bang());
        let err = failure(thrown(Dynamic::from_map(map)));
        assert_eq!(rejected_input(&err).unwrap().message, "first");
    }

    #[test]
    fn other_host_object_in_host_error_is_not_rejection() {
        #[derive(Clone)]
        struct Timeout;

        let mut map = Map::new();
        map.insert("host_error".into(), Dynamic::from(Timeout));
        map.insert("cause".into(), bang());
        let err = failure(thrown(Dynamic::from_map(map)));
        assert_eq!(rejected_input(&err), None);
    }

    #[test]
    fn map_without_host_objects_is_not_rejection() {
        let mut map = Map::new();
        map.insert("host_error".into(), Dynamic::from("a"));
        map.insert("cause".into(), Dynamic::from("b"));
        let err = failure(thrown(Dynamic::from_map(map)));
        assert_eq!(rejected_input(&err), None);
    }

    #[test]
    fn plain_thrown_string_is_not_rejection() {
        let err = failure(thrown(Dynamic::from("Bang!")));
        assert_eq!(rejected_input(&err), None);
    }

    #[test]
    fn other_failures_are_not_rejection() {
        let err = failure(EvalAltResult::ErrorTooManyOperations(Position::NONE));
        assert_eq!(rejected_input(&err), None);
        let err = ImpactError::Evaluation {
            label: "test".into(),
        };
        assert_eq!(rejected_input(&err), None);
    }
}
