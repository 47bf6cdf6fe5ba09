//! Diagnostic logging macros used throughout the core.
//!
//! These are thin wrappers around `println!`/`eprintln!` gated by the
//! `debug` feature for the verbose variant, matching the style of the
//! `panic_gb!`/`assert_gb!` family in [`crate::diag`].

#[cfg(feature = "debug")]
#[macro_export]
macro_rules! debugln {
    ($($rest:tt)*) => {
        std::println!($($rest)*)
    }
}

#[cfg(not(feature = "debug"))]
#[macro_export]
macro_rules! debugln {
    ($($rest:tt)*) => {
        ()
    };
}

/// Emits an informational diagnostic message, always active regardless
/// of the `debug` feature, useful for events that hosts typically want
/// surfaced through `debug_message` style callbacks.
#[macro_export]
macro_rules! infoln {
    ($($rest:tt)*) => {
        std::println!($($rest)*)
    }
}

/// Emits a warning diagnostic message for recoverable anomalies (eg:
/// reads from unmapped MMIO addresses) that should not abort execution.
#[macro_export]
macro_rules! warnln {
    ($($rest:tt)*) => {
        std::eprintln!($($rest)*)
    }
}

/// Emits an error diagnostic message for anomalies that are still
/// non-fatal to the emulation loop but more severe than a warning.
#[macro_export]
macro_rules! errorln {
    ($($rest:tt)*) => {
        std::eprintln!($($rest)*)
    }
}
