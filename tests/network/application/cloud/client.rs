use atcloud::network::application::cloud::payload;
use atcloud::network::application::cloud::{fields, InboundMessage, TimeFormat};
use atcloud::network::at::ConnectionState;
use atcloud::network::error::Error;
use crate::common::{ACCOUNT, BROKER_TIME, PASSWORD, SSID, Sim};
use rand::Rng;

#[test]
fn test_subscribe_acknowledged() {
    let sim = Sim::new();
    let mut client = sim.connected_client();

    assert_eq!(client.subscribe(ACCOUNT, "topicA"), Ok(()));
    assert_eq!(sim.sent(), vec!["cmd=1&uid=acct1&topic=topicA"]);
    assert!(sim.rx().is_empty());
}

#[test]
fn test_publish_acknowledged() {
    let sim = Sim::new();
    let mut client = sim.connected_client();

    assert_eq!(client.publish(ACCOUNT, "topicA", "#25.5#60"), Ok(()));
    assert_eq!(sim.sent(), vec!["cmd=2&uid=acct1&topic=topicA&msg=#25.5#60"]);
}

#[test]
fn test_publish_unacknowledged_within_a_second() {
    let sim = Sim::new();
    let mut client = sim.connected_client();
    sim.ignore("cmd=2&");

    let start = sim.now_ms();
    assert_eq!(
        client.publish(ACCOUNT, "topicA", "#25.5#60"),
        Err(Error::Timeout)
    );
    assert_eq!(sim.now_ms() - start, 1000);
    assert!(sim.rx().is_empty());
}

#[test]
fn test_heartbeat() {
    let sim = Sim::new();
    let mut client = sim.connected_client();

    assert_eq!(client.heartbeat(), Ok(()));
    assert_eq!(sim.sent(), vec!["cmd=0&msg=ping"]);
}

#[test]
fn test_payloads_refused_before_connection() {
    let sim = Sim::new();
    sim.script_link();
    sim.script_broker();
    let mut client = sim.client();

    assert_eq!(client.subscribe(ACCOUNT, "topicA"), Err(Error::InvalidState));
    assert_eq!(client.publish(ACCOUNT, "topicA", "1"), Err(Error::InvalidState));
    assert_eq!(client.heartbeat(), Err(Error::InvalidState));

    client.associate_wifi(SSID, PASSWORD).unwrap();
    sim.clear_sent();
    assert_eq!(client.heartbeat(), Err(Error::InvalidState));
    assert!(sim.sent().is_empty());
}

#[test]
fn test_oversized_publish_sends_nothing() {
    let sim = Sim::new();
    let mut client = sim.connected_client();
    let message = "9".repeat(120);

    assert_eq!(
        client.publish(ACCOUNT, "topicA", &message),
        Err(Error::CapacityExceeded)
    );
    assert!(sim.sent().is_empty());
}

#[test]
fn test_handshake_reaches_ready() {
    let sim = Sim::new();
    let mut client = sim.connected_client();

    assert_eq!(
        client.handshake(ACCOUNT, &["mydht004", "myMP25004", "myLUX004"]),
        Ok(())
    );
    assert_eq!(client.state(), ConnectionState::Ready);
    assert_eq!(
        sim.sent(),
        vec![
            "cmd=1&uid=acct1&topic=mydht004",
            "cmd=1&uid=acct1&topic=myMP25004",
            "cmd=1&uid=acct1&topic=myLUX004",
        ]
    );
}

#[test]
fn test_handshake_stops_at_refused_subscription() {
    let sim = Sim::new();
    let mut client = sim.connected_client();
    sim.ignore("cmd=1&uid=acct1&topic=myMP25004");

    assert_eq!(
        client.handshake(ACCOUNT, &["mydht004", "myMP25004", "myLUX004"]),
        Err(Error::Timeout)
    );
    assert_eq!(client.state(), ConnectionState::SubscriptionPending);
    assert!(!sim.sent().iter().any(|c| c.ends_with("myLUX004")));

    // A second handshake resumes from the pending state.
    sim.script_broker();
    assert_eq!(client.handshake(ACCOUNT, &["myMP25004", "myLUX004"]), Ok(()));
    assert_eq!(client.state(), ConnectionState::Ready);
}

#[test]
fn test_handshake_refused_before_connection() {
    let sim = Sim::new();
    let mut client = sim.client();

    assert_eq!(client.handshake(ACCOUNT, &["topicA"]), Err(Error::InvalidState));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(sim.sent().is_empty());
}

#[test]
fn test_drain_inbound() {
    let sim = Sim::new();
    let mut client = sim.connected_client();
    assert_eq!(client.drain_inbound(), None);

    sim.rx().fill(b"cmd=2&uid=acct1&topic=mydht004&msg=on\r\n");
    let start = sim.now_ms();
    let inbound = client.drain_inbound().unwrap();
    assert_eq!(sim.now_ms(), start);
    assert!(sim.rx().is_empty());

    let message = InboundMessage::parse(&inbound).unwrap();
    assert_eq!(message.cmd, "2");
    assert_eq!(message.uid, Some("acct1"));
    assert_eq!(message.topic, Some("mydht004"));
    assert_eq!(message.msg, Some("on"));

    assert_eq!(client.drain_inbound(), None);
}

#[test]
fn test_fetch_time() {
    let sim = Sim::new();
    let mut client = sim.connected_client();

    let time = client.fetch_time(ACCOUNT, TimeFormat::DateTime).unwrap();
    assert_eq!(time.as_str(), BROKER_TIME);
    assert_eq!(sim.sent(), vec!["cmd=7&uid=acct1&type=1"]);
}

#[test]
fn test_fetch_time_reply_in_two_arrivals() {
    let sim = Sim::new();
    let mut client = sim.connected_client();
    sim.ignore("cmd=7&");

    let now = sim.now_ms();
    sim.push_at(now + 2, "2026-10-16 ");
    sim.push_at(now + 4, "12:00:00\r\n");

    let time = client.fetch_time(ACCOUNT, TimeFormat::DateTime).unwrap();
    assert_eq!(time.as_str(), BROKER_TIME);
    assert_eq!(client.drain_inbound(), None);
}

#[test]
fn test_fetch_time_without_reply() {
    let sim = Sim::new();
    let mut client = sim.connected_client();
    sim.ignore("cmd=7&");

    assert_eq!(
        client.fetch_time(ACCOUNT, TimeFormat::Timestamp),
        Err(Error::Timeout)
    );
}

#[test]
fn test_fetch_time_blank_reply() {
    let sim = Sim::new();
    let mut client = sim.connected_client();
    sim.reply("cmd=7&", "\r\n");

    assert_eq!(
        client.fetch_time(ACCOUNT, TimeFormat::Time),
        Err(Error::ProtocolError)
    );
}

const FIELD_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789#.-_";

fn random_field(rng: &mut impl Rng, max_len: usize) -> String {
    let len = rng.gen_range(0..=max_len);
    (0..len)
        .map(|_| FIELD_CHARS[rng.gen_range(0..FIELD_CHARS.len())] as char)
        .collect()
}

#[test]
fn test_publish_fields_round_trip() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let account = random_field(&mut rng, 32);
        let topic = random_field(&mut rng, 32);
        let message = random_field(&mut rng, 32);

        let built = payload::publish(&account, &topic, &message).unwrap();
        let parsed: Vec<(&str, &str)> = fields(&built).collect();
        assert_eq!(
            parsed,
            vec![
                ("cmd", "2"),
                ("uid", account.as_str()),
                ("topic", topic.as_str()),
                ("msg", message.as_str()),
            ],
            "payload {built:?}"
        );
    }
}
