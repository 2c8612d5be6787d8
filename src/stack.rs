//! Stack growth for the recursive evaluator.
//!
//! Deferred values can nest evaluation hundreds of levels deep before the
//! evaluator's depth limit trips, which is more than a default 2MB thread
//! stack holds. Wrapping each descent in [`ensure_sufficient_stack`] moves the
//! rest of the recursion onto a freshly allocated segment when the current one
//! runs low.

/// Grow the stack when less than this remains.
const RED_ZONE: usize = 256 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

#[inline]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
