use std::ops::ControlFlow;
use std::time::Duration;

use lwes_config::EmitterConfig;
use lwes_engine::{
    Emitter, EngineError, Listener, RECEIPT_TIME, SENDER_IP, SENDER_PORT,
};
use lwes_protocols::{ControlKind, Event, Value};
use tokio::net::UdpSocket;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

fn quiet_emitter(address: String, heartbeat_secs: u64) -> EmitterConfig {
    EmitterConfig {
        address,
        heartbeat_secs,
        handle_interrupt: false,
        ..Default::default()
    }
}

async fn receive_named(listener: &Listener, name: &str) -> Event {
    timeout(WAIT, async {
        loop {
            let event = listener.receive().await.unwrap();
            if event.name == name {
                return event;
            }
        }
    })
    .await
    .expect("event never arrived")
}

fn sample() -> Event {
    Event::new("Test::Sample")
        .with("count", 7u32)
        .with("delta", -3i16)
        .with("label", "hello")
        .with("ok", true)
}

fn assert_enriched(event: &Event) {
    assert!(event.get(RECEIPT_TIME).and_then(Value::as_i64).unwrap() > 0);
    assert!(!event.get(SENDER_IP).and_then(Value::as_str).unwrap().is_empty());
    assert_ne!(event.get(SENDER_PORT), Some(&Value::U16(0)));
}

#[tokio::test]
async fn multicast_group_delivers_events() {
    let listener = Listener::bind("224.2.2.22:12345").await.unwrap();
    let emitter = Emitter::start(&quiet_emitter("224.2.2.22:12345".into(), 0), None)
        .await
        .unwrap();

    let sent = sample();
    emitter.emit(&sent).await.unwrap();
    let received = receive_named(&listener, "Test::Sample").await;
    emitter.close().await.unwrap();
    listener.close().unwrap();

    for (key, value) in sent.iter() {
        assert_eq!(received.get(key), Some(value), "{key}");
    }
    assert_eq!(received.len(), sent.len() + 3);
    assert_enriched(&received);
}

#[tokio::test]
async fn listeners_on_one_host_share_a_channel() {
    let first = Listener::bind("224.2.2.22:12346").await.unwrap();
    let second = Listener::bind("224.2.2.22:12346").await.unwrap();
    let emitter = Emitter::start(&quiet_emitter("224.2.2.22:12346".into(), 0), None)
        .await
        .unwrap();

    emitter.emit(&sample()).await.unwrap();
    for listener in [&first, &second] {
        let received = receive_named(listener, "Test::Sample").await;
        assert_enriched(&received);
    }
    emitter.close().await.unwrap();
}

#[tokio::test]
async fn unicast_round_trip_reports_sender() {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let emitter = Emitter::start(&quiet_emitter(format!("udp4://127.0.0.1:{port}"), 0), None)
        .await
        .unwrap();

    emitter.emit(&sample()).await.unwrap();
    let received = receive_named(&listener, "Test::Sample").await;

    assert_eq!(
        received.get(SENDER_IP),
        Some(&Value::String("127.0.0.1".into()))
    );
    assert_eq!(
        received.get(SENDER_PORT),
        Some(&Value::U16(emitter.local_addr().unwrap().port()))
    );
    emitter.close().await.unwrap();
}

#[tokio::test]
async fn heartbeat_cadence_over_three_seconds() {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let emitter = Emitter::start(&quiet_emitter(format!("127.0.0.1:{port}"), 1), None)
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(3200)).await;
    emitter.close().await.unwrap();

    let (mut startup, mut heartbeat, mut shutdown) = (0, 0, 0);
    timeout(
        WAIT,
        listener.for_each(|result| {
            match ControlKind::of(&result.unwrap()) {
                Some(ControlKind::Startup) => startup += 1,
                Some(ControlKind::Heartbeat) => heartbeat += 1,
                Some(ControlKind::Shutdown) => {
                    shutdown += 1;
                    return ControlFlow::Break(());
                }
                None => {}
            }
            ControlFlow::Continue(())
        }),
    )
    .await
    .expect("shutdown never arrived");

    assert_eq!(startup, 1);
    assert!(heartbeat >= 2, "only {heartbeat} heartbeats");
    assert_eq!(shutdown, 1);
}

#[tokio::test]
async fn corrupt_datagram_does_not_stop_iteration() {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap();

    let raw = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    raw.send_to(&[0x05, b'a', b'b'], target).await.unwrap();
    raw.send_to(&[0x01, b'E', 0x00, 0x01, 0x01, b'k', 0x2a], target)
        .await
        .unwrap();

    let emitter = Emitter::start(&quiet_emitter(target.to_string(), 0), None)
        .await
        .unwrap();
    emitter.emit(&sample()).await.unwrap();

    let mut decode_errors = 0;
    let last = timeout(
        WAIT,
        listener.for_each(|result| match result {
            Err(EngineError::Decode(_)) => {
                decode_errors += 1;
                ControlFlow::Continue(())
            }
            Ok(event) if event.name == "Test::Sample" => ControlFlow::Break(event),
            Ok(_) => ControlFlow::Continue(()),
            Err(e) => panic!("unexpected error: {e}"),
        }),
    )
    .await
    .expect("sample never arrived");

    assert_eq!(decode_errors, 2);
    assert_eq!(last.get("label"), Some(&Value::String("hello".into())));
    emitter.close().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn unixgram_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let address = format!("unixgram://{}", dir.path().join("lwes.sock").display());

    let listener = Listener::bind(&address).await.unwrap();
    let emitter = Emitter::start(&quiet_emitter(address, 0), None)
        .await
        .unwrap();
    emitter.emit(&sample()).await.unwrap();

    let received = receive_named(&listener, "Test::Sample").await;
    assert_eq!(received.get(SENDER_IP), Some(&Value::String(String::new())));
    assert_eq!(received.get(SENDER_PORT), Some(&Value::U16(0)));

    emitter.close().await.unwrap();
    listener.close().unwrap();
    assert!(!dir.path().join("lwes.sock").exists());
}

#[tokio::test]
async fn unsupported_scheme_fails_construction() {
    let err = Listener::bind("ip4://10.0.0.1:5").await.unwrap_err();
    assert!(err.is_construction());
}

#[tokio::test]
async fn concurrent_emit_racing_close_never_panics() {
    let listener = Listener::bind("127.0.0.1:0").await.unwrap();
    let target = listener.local_addr().unwrap().to_string();
    let emitter = std::sync::Arc::new(
        Emitter::start(&quiet_emitter(target, 0), None).await.unwrap(),
    );

    let racer = {
        let emitter = emitter.clone();
        tokio::spawn(async move {
            for _ in 0..200 {
                match emitter.emit(&sample()).await {
                    Ok(_) => {}
                    Err(e) => {
                        assert!(e.is_closed(), "{e}");
                        break;
                    }
                }
            }
        })
    };
    emitter.close().await.unwrap();
    racer.await.unwrap();
}
