//! Unwrap helpers for test code.
//!
//! These replace `unwrap()` and `expect()` in tests. `#[track_caller]`
//! reports the calling line on failure.

use std::fmt::Debug;

/// Unwrap a `Result`, panicking with the error value.
///
/// ```rust
/// use fieldcycle_test_helpers::must;
///
/// let result: Result<u64, &str> = Ok(1_000_000);
/// assert_eq!(must(result), 1_000_000);
/// ```
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must: unexpected Err: {e:?}"),
    }
}

/// Unwrap an `Option`, panicking with `msg` if `None`.
///
/// ```rust
/// use fieldcycle_test_helpers::must_some;
///
/// assert_eq!(must_some(Some(3), "expected a device"), 3);
/// ```
///
/// # Panics
///
/// Panics if the option is `None`.
#[track_caller]
pub fn must_some<T>(option: Option<T>, msg: &str) -> T {
    match option {
        Some(v) => v,
        None => panic!("must_some: {msg}"),
    }
}

/// Unwrap a `Result` with a context message.
///
/// # Panics
///
/// Panics if the result is `Err`, with the context and error value.
#[track_caller]
pub fn must_with<T, E: Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must_with: {context}: {e:?}"),
    }
}

/// Unwrap an `Err`, panicking if the result is `Ok`.
///
/// ```rust
/// use fieldcycle_test_helpers::must_err;
///
/// let result: Result<(), &str> = Err("already running");
/// assert_eq!(must_err(result), "already running");
/// ```
///
/// # Panics
///
/// Panics if the result is `Ok`.
#[track_caller]
pub fn must_err<T: Debug, E>(result: Result<T, E>) -> E {
    match result {
        Ok(v) => panic!("must_err: unexpected Ok: {v:?}"),
        Err(e) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_must_ok() {
        let r: Result<i32, &str> = Ok(7);
        assert_eq!(must(r), 7);
    }

    #[test]
    #[should_panic(expected = "must: unexpected Err")]
    fn test_must_err_panics() {
        let r: Result<i32, &str> = Err("boom");
        let _ = must(r);
    }

    #[test]
    #[should_panic(expected = "must_some: missing")]
    fn test_must_some_none_panics() {
        let _: i32 = must_some(None, "missing");
    }

    #[test]
    fn test_must_err_returns_error() {
        let r: Result<i32, &str> = Err("bad");
        assert_eq!(must_err(r), "bad");
    }

    #[test]
    #[should_panic(expected = "must_with: loading config")]
    fn test_must_with_context() {
        let r: Result<i32, &str> = Err("io");
        let _ = must_with(r, "loading config");
    }
}
