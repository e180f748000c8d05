//! Small, dependency-free helpers shared by the rest of the workspace.

/// Extension trait mirroring `bool::then`/`then_some` but as a free function,
/// useful when the condition and the value come from unrelated expressions.
pub trait OptionExt<T> {
    fn when(cond: bool, thunk: impl FnOnce() -> T) -> Option<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn when(cond: bool, thunk: impl FnOnce() -> T) -> Option<T> {
        if cond { Some(thunk()) } else { None }
    }
}

#[macro_export]
macro_rules! option_when {
    ($cond:expr, $then:expr) => {
        if $cond { Some($then) } else { None }
    };
}
