//! Simulated co-processor for integration tests.
//!
//! The simulator owns a virtual clock. Every command written to it is logged
//! and matched against scripted rules; a matching rule schedules its reply on
//! the virtual clock, and the reply lands in the shared receive buffer once
//! enough virtual time has passed through [`SimClock`].

#![allow(dead_code)]

use atcloud::config::LinkOptions;
use atcloud::network::application::cloud::Client;
use atcloud::network::at::{CommandChannel, ConnectionLifecycle};
use atcloud::network::buffer::SharedResponseBuffer;
use atcloud::network::{Delay, Write};
use std::cell::RefCell;
use std::rc::Rc;

pub type Rx = &'static SharedResponseBuffer<256>;
pub type SimChannel = CommandChannel<SimTransport, SimClock, Rx>;
pub type SimLifecycle = ConnectionLifecycle<SimTransport, SimClock, Rx>;
pub type SimClient = Client<SimTransport, SimClock, Rx>;

/// Default latency of a scripted reply.
pub const REPLY_DELAY_MS: u64 = 5;

pub const SSID: &str = "ElevatedNetwork.lt";
pub const PASSWORD: &str = "798798798";
pub const HOST: &str = "bemfa.com";
pub const PORT: u16 = 8344;
pub const ACCOUNT: &str = "acct1";
pub const BROKER_TIME: &str = "2026-10-16 12:00:00";

struct Rule {
    prefix: Vec<u8>,
    reply: Option<Vec<u8>>,
    after_ms: u64,
    remaining: Option<usize>,
}

#[derive(Default)]
struct SimState {
    now_ms: u64,
    rules: Vec<Rule>,
    pending: Vec<(u64, Vec<u8>)>,
    sent: Vec<(u64, Vec<u8>)>,
    fail_writes: bool,
}

impl SimState {
    fn schedule(&mut self, at_ms: u64, bytes: Vec<u8>) {
        let pos = self.pending.partition_point(|(t, _)| *t <= at_ms);
        self.pending.insert(pos, (at_ms, bytes));
    }

    fn deliver_due(&mut self, rx: Rx) {
        let due = self.pending.partition_point(|(t, _)| *t <= self.now_ms);
        for (_, bytes) in self.pending.drain(..due) {
            rx.fill(&bytes);
        }
    }
}

/// Handle on the simulated co-processor.
#[derive(Clone)]
pub struct Sim {
    state: Rc<RefCell<SimState>>,
    rx: Rx,
}

impl Sim {
    pub fn new() -> Self {
        Self {
            state: Rc::default(),
            rx: Box::leak(Box::new(SharedResponseBuffer::new())),
        }
    }

    /// Answer every command starting with `prefix`.
    ///
    /// Later rules take precedence over earlier ones.
    pub fn reply(&self, prefix: &str, reply: &str) {
        self.rule(prefix, Some(reply), REPLY_DELAY_MS, None);
    }

    pub fn reply_after(&self, prefix: &str, reply: &str, after_ms: u64) {
        self.rule(prefix, Some(reply), after_ms, None);
    }

    /// Answer the next `times` matching commands, then fall through to
    /// earlier rules.
    pub fn reply_times(&self, prefix: &str, reply: &str, times: usize) {
        self.rule(prefix, Some(reply), REPLY_DELAY_MS, Some(times));
    }

    /// Never answer commands starting with `prefix`.
    pub fn ignore(&self, prefix: &str) {
        self.rule(prefix, None, 0, None);
    }

    fn rule(&self, prefix: &str, reply: Option<&str>, after_ms: u64, remaining: Option<usize>) {
        self.state.borrow_mut().rules.push(Rule {
            prefix: prefix.as_bytes().to_vec(),
            reply: reply.map(|r| r.as_bytes().to_vec()),
            after_ms,
            remaining,
        });
    }

    /// Deliver unsolicited bytes at virtual time `at_ms`.
    pub fn push_at(&self, at_ms: u64, bytes: &str) {
        self.state
            .borrow_mut()
            .schedule(at_ms, bytes.as_bytes().to_vec());
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.borrow_mut().fail_writes = fail;
    }

    pub fn now_ms(&self) -> u64 {
        self.state.borrow().now_ms
    }

    /// Every command written so far, in order.
    pub fn sent(&self) -> Vec<String> {
        self.state
            .borrow()
            .sent
            .iter()
            .map(|(_, bytes)| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// Virtual send times of the commands starting with `prefix`.
    pub fn sent_times(&self, prefix: &str) -> Vec<u64> {
        self.state
            .borrow()
            .sent
            .iter()
            .filter(|(_, bytes)| bytes.starts_with(prefix.as_bytes()))
            .map(|(at, _)| *at)
            .collect()
    }

    pub fn clear_sent(&self) {
        self.state.borrow_mut().sent.clear();
    }

    pub fn rx(&self) -> Rx {
        self.rx
    }

    pub fn transport(&self) -> SimTransport {
        SimTransport {
            state: self.state.clone(),
            rx: self.rx,
        }
    }

    pub fn clock(&self) -> SimClock {
        SimClock {
            state: self.state.clone(),
            rx: self.rx,
        }
    }

    pub fn channel(&self) -> SimChannel {
        CommandChannel::new(self.transport(), self.clock(), self.rx)
    }

    pub fn lifecycle(&self) -> SimLifecycle {
        self.lifecycle_with(LinkOptions::default())
    }

    pub fn lifecycle_with(&self, options: LinkOptions) -> SimLifecycle {
        ConnectionLifecycle::new(self.channel(), options)
    }

    pub fn client(&self) -> SimClient {
        Client::new(self.lifecycle())
    }

    /// A co-processor in command mode that accepts every association and
    /// connection step. The escape sequence goes unanswered.
    pub fn script_link(&self) {
        self.reply("AT\r\n", "\r\nOK\r\n");
        self.reply("ATE0", "ATE0\r\r\n\r\nOK\r\n");
        self.reply("AT+CWMODE", "\r\nOK\r\n");
        self.reply_after("AT+CWJAP", "WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n", 50);
        self.reply("AT+CIPMODE", "\r\nOK\r\n");
        self.reply_after("AT+CIPSTART", "CONNECT\r\n\r\nOK\r\n", 20);
        self.reply("AT+CIPSEND", "\r\nOK\r\n\r\n>");
    }

    /// A broker acknowledging every request.
    pub fn script_broker(&self) {
        self.reply("cmd=0&msg=ping", "cmd=0&res=1\r\n");
        self.reply("cmd=1&", "cmd=1&res=1\r\n");
        self.reply("cmd=2&", "cmd=2&res=1\r\n");
        self.reply("cmd=7&", "2026-10-16 12:00:00\r\n");
    }

    /// A client with the tunnel open and the send log cleared.
    pub fn connected_client(&self) -> SimClient {
        self.script_link();
        self.script_broker();
        let mut client = self.client();
        client
            .associate_wifi(SSID, PASSWORD)
            .expect("association");
        client.connect_server(HOST, PORT).expect("connection");
        self.clear_sent();
        client
    }
}

#[derive(Debug)]
pub struct SimError;

/// Transmit side of the simulator.
pub struct SimTransport {
    state: Rc<RefCell<SimState>>,
    rx: Rx,
}

impl Write for SimTransport {
    type Error = SimError;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.fail_writes {
            return Err(SimError);
        }
        let now = state.now_ms;
        state.sent.push((now, buf.to_vec()));

        let scheduled = state
            .rules
            .iter_mut()
            .rev()
            .find(|rule| rule.remaining != Some(0) && buf.starts_with(&rule.prefix))
            .and_then(|rule| {
                if let Some(left) = rule.remaining.as_mut() {
                    *left -= 1;
                }
                rule.reply.clone().map(|reply| (now + rule.after_ms, reply))
            });
        if let Some((at, reply)) = scheduled {
            state.schedule(at, reply);
        }
        state.deliver_due(self.rx);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Virtual clock of the simulator.
pub struct SimClock {
    state: Rc<RefCell<SimState>>,
    rx: Rx,
}

impl Delay for SimClock {
    fn delay_ms(&mut self, ms: u32) {
        let mut state = self.state.borrow_mut();
        state.now_ms += u64::from(ms);
        state.deliver_due(self.rx);
    }
}
