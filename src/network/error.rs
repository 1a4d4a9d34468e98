//! Common error types for network operations

/// A common error type for link and cloud operations.
///
/// Every public operation in the crate reports failure through this enum.
/// None of them is fatal: the caller decides whether to retry, back off or
/// simply wait for the next cadence tick.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// No response containing the expected text arrived within the timeout.
    ///
    /// A reply that arrived but never contained the expected text is reported
    /// the same way.
    Timeout,
    /// The transport refused or failed to transmit the command.
    WriteError,
    /// An assembled command or payload does not fit its fixed-size buffer.
    CapacityExceeded,
    /// The operation is not valid in the current connection state or link mode.
    InvalidState,
    /// A reply arrived but its content could not be used.
    ProtocolError,
    /// The device configuration could not be parsed.
    InvalidConfig,
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::CapacityExceeded => defmt::write!(f, "CapacityExceeded"),
            Error::InvalidState => defmt::write!(f, "InvalidState"),
            Error::ProtocolError => defmt::write!(f, "ProtocolError"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
        }
    }
}
