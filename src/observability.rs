//! Structured diagnostics for the verification pipeline.
//!
//! The `log_metric!` macro emits one key/value line per event through the `log`
//! facade at debug level. Calls are compiled out of release builds.

/// Logs a structured key-value metric line, only in debug builds.
///
/// # Example
/// ```
/// use mgard_verify::log_metric;
/// let ratio = 3.5;
/// log_metric!("event"="verified", "ratio"=&ratio);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+
            log::debug!("MGARD_VERIFY_METRIC: {{ {} }}", parts.join(", "));
        }
    };
}
