// src/engine/common.rs
//
// Common utilities shared across engine modules.

use crate::error::CanvasError;
use std::panic::{catch_unwind, AssertUnwindSafe};

pub type EngineResult<T> = std::result::Result<T, CanvasError>;

/// Run codec work and turn a panic inside it into `InternalPanic`.
///
/// Third-party decoders occasionally panic on hostile input; callers get an
/// error instead of a poisoned thread. Guards created inside `f` are still
/// dropped during unwinding.
pub fn run_with_panic_policy<T, F>(context: &'static str, f: F) -> EngineResult<T>
where
    F: FnOnce() -> EngineResult<T>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let detail = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(context, %detail, "panic inside codec");
            Err(CanvasError::internal_panic(format!("{context}: {detail}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_ok_and_err() {
        assert_eq!(run_with_panic_policy("t", || Ok(5)).unwrap(), 5);
        let err = run_with_panic_policy::<(), _>("t", || Err(CanvasError::empty_collage()));
        assert_eq!(err.unwrap_err(), CanvasError::EmptyCollage);
    }

    #[test]
    fn converts_panic_to_internal_error() {
        let err = run_with_panic_policy::<(), _>("decode:test", || panic!("boom")).unwrap_err();
        match err {
            CanvasError::InternalPanic { message } => {
                assert!(message.contains("decode:test"));
                assert!(message.contains("boom"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
