//! # AT command link
//!
//! Drives a WiFi co-processor (ESP8266/ESP32 AT firmware family) through its
//! textual command interface. The module is layered bottom-up:
//!
//! - [`channel`]: the send-and-wait primitive every other layer is built on
//! - [`mode`]: command mode vs. transparent mode tracking
//! - [`lifecycle`]: association, socket establishment and the state machine
//!   leading to a transparent tunnel
//!
//! Each layer owns the one below it, so a single value (and therefore a single
//! task) drives the link and only one exchange is ever outstanding.
//!
//! ## Wire format
//!
//! Directives are ASCII lines terminated by CR LF and are matched against
//! their replies by substring containment:
//!
//! ```text
//! AT\r\n                                   -> OK
//! ATE0\r\n                                 -> OK
//! AT+CWMODE=3\r\n                          -> OK
//! AT+CWJAP="<ssid>","<password>"\r\n       -> OK
//! AT+CIPMODE=1\r\n                         -> OK
//! AT+CIPSTART="TCP","<host>",<port>\r\n    -> OK
//! AT+CIPSEND\r\n                           -> OK   (link is now transparent)
//! +++                                      -> any  (back to command mode)
//! ```

/// Send-and-wait primitive.
pub mod channel;

/// Length-checked command assembly.
pub mod command;

/// Connection lifecycle state machine.
pub mod lifecycle;

/// Link mode tracking.
pub mod mode;

pub use channel::{CommandChannel, PendingExchange};
pub use command::{CommandBuf, CommandBuilder, WifiMode};
pub use lifecycle::{ConnectionLifecycle, ConnectionState, LinkStatus};
pub use mode::{LinkMode, ModeController};

/// Success token of every directive.
pub const OK: &str = "OK";

/// Liveness probe.
pub const PROBE: &str = "AT\r\n";

/// Disable command echo.
pub const ECHO_OFF: &str = "ATE0\r\n";

/// Select transparent (pass-through) transfer for the next connection.
pub const TRANSPARENT_TRANSFER: &str = "AT+CIPMODE=1\r\n";

/// Start sending; in transparent transfer mode this opens the tunnel.
pub const START_SEND: &str = "AT+CIPSEND\r\n";

/// Leaves transparent mode. Sent without a line terminator.
pub const ESCAPE_SEQUENCE: &str = "+++";
