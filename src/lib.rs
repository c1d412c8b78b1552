pub mod engine;

// ============================================================================
// Profiling Macros
// ============================================================================

/// Conditionally log messages based on a frame interval when perf_stats feature is enabled.
///
/// This macro logs a message every 100 frames. When the perf_stats feature is disabled,
/// this macro compiles to nothing and its arguments are never evaluated.
///
/// # Example
/// ```ignore
/// profile_log!(controller.frame(), "Active region has {} updatables", region.updatable_count());
/// ```
#[macro_export]
#[cfg(feature = "perf_stats")]
macro_rules! profile_log {
    ($frame:expr, $($arg:tt)*) => {
        if $frame % 100 == 0 {
            ::tracing::info!($($arg)*);
        }
    };
}

#[macro_export]
#[cfg(not(feature = "perf_stats"))]
macro_rules! profile_log {
    ($frame:expr, $($arg:tt)*) => {};
}
