//! Logging shim.
//!
//! The crate logs through `defmt` when the `defmt` feature is enabled, through
//! the `log` facade when the `log` feature is enabled, and not at all
//! otherwise. Format strings must stay within the subset both backends accept
//! (`{}` for integers and `&str`, `{:?}` for everything else).

#![macro_use]
#![allow(unused_macros)]

macro_rules! log_with {
    ($level:ident, $s:literal $(, $x:expr)* $(,)?) => {{
        #[cfg(feature = "defmt")]
        ::defmt::$level!($s $(, $x)*);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::$level!($s $(, $x)*);
        #[cfg(not(any(feature = "defmt", feature = "log")))]
        {
            $( let _ = &$x; )*
        }
    }};
}

macro_rules! trace {
    ($($arg:tt)*) => { log_with!(trace, $($arg)*) };
}

macro_rules! debug {
    ($($arg:tt)*) => { log_with!(debug, $($arg)*) };
}

macro_rules! info {
    ($($arg:tt)*) => { log_with!(info, $($arg)*) };
}

macro_rules! warn {
    ($($arg:tt)*) => { log_with!(warn, $($arg)*) };
}

macro_rules! error {
    ($($arg:tt)*) => { log_with!(error, $($arg)*) };
}
