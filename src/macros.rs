//! Logging shims for handshake diagnostics.
//!
//! Failures in this crate are reported through these macros rather than
//! returned to the caller, so they must compile with or without the `log`
//! feature. With the feature off the arguments are still type-checked but
//! nothing is emitted. Only the levels the handshake emits are defined:
//! `error` for failed branches, `info` for key acknowledgements, `debug`
//! for choreography milestones.

macro_rules! error {
    ($($t:tt)*) => {{
        #[cfg(feature = "log")]
        log::error!($($t)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($t)*);
    }};
}

macro_rules! info {
    ($($t:tt)*) => {{
        #[cfg(feature = "log")]
        log::info!($($t)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($t)*);
    }};
}

macro_rules! debug {
    ($($t:tt)*) => {{
        #[cfg(feature = "log")]
        log::debug!($($t)*);
        #[cfg(not(feature = "log"))]
        let _ = format_args!($($t)*);
    }};
}
