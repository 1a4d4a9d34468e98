//! Payload assembly and field parsing for the broker's `key=value&...` format.

use crate::network::at::command::{CommandBuf, CommandBuilder};
use crate::network::error::Error;

/// Acknowledgement of a subscription.
pub const SUBSCRIBE_ACK: &str = "cmd=1&res=1";
/// Acknowledgement of a publish.
pub const PUBLISH_ACK: &str = "cmd=2&res=1";
/// Keep-alive payload.
pub const HEARTBEAT: &str = "cmd=0&msg=ping";
/// Acknowledgement of a keep-alive.
pub const HEARTBEAT_ACK: &str = "cmd=0&res=1";
/// Ends every line the broker sends.
pub const LINE_END: &str = "\r\n";

/// Representation of the broker time returned by a time request.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeFormat {
    /// `YYYY-MM-DD HH:MM:SS`
    #[default]
    DateTime,
    /// `HH:MM:SS`
    Time,
    /// Seconds since the Unix epoch.
    Timestamp,
}

impl TimeFormat {
    fn code(self) -> &'static str {
        match self {
            TimeFormat::DateTime => "1",
            TimeFormat::Time => "2",
            TimeFormat::Timestamp => "3",
        }
    }
}

/// `cmd=1&uid=<account>&topic=<topic>`
pub fn subscribe(account: &str, topic: &str) -> Result<CommandBuf, Error> {
    let mut cmd = CommandBuilder::new();
    cmd.push("cmd=1&uid=")?
        .push(account)?
        .push("&topic=")?
        .push(topic)?;
    Ok(cmd.finish())
}

/// `cmd=2&uid=<account>&topic=<topic>&msg=<message>`
pub fn publish(account: &str, topic: &str, message: &str) -> Result<CommandBuf, Error> {
    let mut cmd = CommandBuilder::new();
    cmd.push("cmd=2&uid=")?
        .push(account)?
        .push("&topic=")?
        .push(topic)?
        .push("&msg=")?
        .push(message)?;
    Ok(cmd.finish())
}

/// `cmd=7&uid=<account>&type=<format>`
pub fn time_request(account: &str, format: TimeFormat) -> Result<CommandBuf, Error> {
    let mut cmd = CommandBuilder::new();
    cmd.push("cmd=7&uid=")?
        .push(account)?
        .push("&type=")?
        .push(format.code())?;
    Ok(cmd.finish())
}

/// Split a payload into `(key, value)` pairs on `&`, then on the first `=`.
///
/// Values containing `&` or `=` cannot be told apart from field separators;
/// such payloads do not split back into the fields they were built from.
///
/// ```rust
/// use atcloud::network::application::cloud::payload::fields;
///
/// let mut it = fields("cmd=2&uid=acct1&topic=topicA&msg=#25.5#60");
/// assert_eq!(it.next(), Some(("cmd", "2")));
/// assert_eq!(it.next(), Some(("uid", "acct1")));
/// assert_eq!(it.next(), Some(("topic", "topicA")));
/// assert_eq!(it.next(), Some(("msg", "#25.5#60")));
/// assert_eq!(it.next(), None);
/// ```
pub fn fields(payload: &str) -> impl Iterator<Item = (&str, &str)> {
    payload
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

/// A message the broker pushed for a subscribed topic.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct InboundMessage<'a> {
    /// Command code, `2` for a forwarded publish.
    pub cmd: &'a str,
    /// Account the message belongs to.
    pub uid: Option<&'a str>,
    /// Topic it was published on.
    pub topic: Option<&'a str>,
    /// Message body.
    pub msg: Option<&'a str>,
}

impl<'a> InboundMessage<'a> {
    /// Parse drained inbound bytes. Returns `None` when they are not UTF-8 or
    /// carry no `cmd` field.
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        let text = core::str::from_utf8(bytes).ok()?.trim();
        let mut message = InboundMessage {
            cmd: "",
            uid: None,
            topic: None,
            msg: None,
        };
        let mut has_cmd = false;
        for (key, value) in fields(text) {
            match key {
                "cmd" => {
                    message.cmd = value;
                    has_cmd = true;
                }
                "uid" => message.uid = Some(value),
                "topic" => message.topic = Some(value),
                "msg" => message.msg = Some(value),
                _ => {}
            }
        }
        has_cmd.then_some(message)
    }
}
