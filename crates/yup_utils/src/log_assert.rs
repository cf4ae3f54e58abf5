/// Checks an invariant without taking the process down in release builds.
///
/// Debug builds panic on a violation. Release builds emit an error event with the given fields
/// and message instead. Evaluates to the checked condition, so callers can still bail out.
#[macro_export]
macro_rules! log_assert {
    ($check:expr, $($event:tt)+) => {{
        let holds: bool = $check;
        if !holds {
            debug_assert!(holds, "invariant violated: {}", stringify!($check));
            $crate::__tracing::error!($($event)+);
        }
        holds
    }};
}
