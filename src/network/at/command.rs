//! Length-checked command assembly.
//!
//! Commands and payloads are built into a fixed-size [`heapless::String`].
//! Anything that does not fit is rejected with
//! [`Error::CapacityExceeded`](crate::network::error::Error::CapacityExceeded)
//! instead of being truncated, so a half-built directive never reaches the
//! wire.

use crate::network::error::Error;
use core::fmt::Write as _;
use heapless::String;

/// Capacity of an assembled command or transparent payload, in bytes.
pub const COMMAND_CAPACITY: usize = 128;

/// An assembled command ready to hand to the channel.
pub type CommandBuf = String<COMMAND_CAPACITY>;

/// Radio mode selected with `AT+CWMODE`.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WifiMode {
    /// Station only.
    Station,
    /// Soft access point only.
    SoftAp,
    /// Station and soft access point together.
    #[default]
    StationAndAp,
}

impl WifiMode {
    /// The directive selecting this mode.
    pub fn command(self) -> &'static str {
        match self {
            WifiMode::Station => "AT+CWMODE=1\r\n",
            WifiMode::SoftAp => "AT+CWMODE=2\r\n",
            WifiMode::StationAndAp => "AT+CWMODE=3\r\n",
        }
    }
}

/// Incremental builder over a [`CommandBuf`].
///
/// ```rust
/// use atcloud::network::at::command::CommandBuilder;
///
/// let mut builder = CommandBuilder::new();
/// builder.push("AT+CIPSTART=\"TCP\",\"")?.push("bemfa.com")?.push("\",")?.push_u16(8344)?;
/// assert_eq!(builder.as_str(), "AT+CIPSTART=\"TCP\",\"bemfa.com\",8344");
/// # Ok::<(), atcloud::network::error::Error>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct CommandBuilder {
    buf: CommandBuf,
}

impl CommandBuilder {
    /// Start an empty command.
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    /// Append text.
    pub fn push(&mut self, text: &str) -> Result<&mut Self, Error> {
        self.buf
            .push_str(text)
            .map_err(|_| Error::CapacityExceeded)?;
        Ok(self)
    }

    /// Append a decimal number.
    pub fn push_u16(&mut self, value: u16) -> Result<&mut Self, Error> {
        write!(self.buf, "{}", value).map_err(|_| Error::CapacityExceeded)?;
        Ok(self)
    }

    /// The command assembled so far.
    pub fn as_str(&self) -> &str {
        self.buf.as_str()
    }

    /// Consume the builder, yielding the command.
    pub fn finish(self) -> CommandBuf {
        self.buf
    }
}

/// `AT+CWJAP="<ssid>","<password>"\r\n`
pub fn join_access_point(ssid: &str, password: &str) -> Result<CommandBuf, Error> {
    let mut cmd = CommandBuilder::new();
    cmd.push("AT+CWJAP=\"")?
        .push(ssid)?
        .push("\",\"")?
        .push(password)?
        .push("\"\r\n")?;
    Ok(cmd.finish())
}

/// `AT+CIPSTART="TCP","<host>",<port>\r\n`
pub fn start_tcp(host: &str, port: u16) -> Result<CommandBuf, Error> {
    let mut cmd = CommandBuilder::new();
    cmd.push("AT+CIPSTART=\"TCP\",\"")?
        .push(host)?
        .push("\",")?
        .push_u16(port)?
        .push("\r\n")?;
    Ok(cmd.finish())
}
