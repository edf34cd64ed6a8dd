#![allow(clippy::unwrap_used)]
// Push channel over the long-polling transport, served by wiremock.

use std::time::Duration;

use secrecy::SecretString;
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crowdlens_api::{
    DisconnectReason, PushConfig, PushHandle, PushKind, PushSignal, ReconnectConfig,
    TransportConfig,
};

fn config(server: &MockServer, reconnect: ReconnectConfig) -> PushConfig {
    PushConfig {
        socket_url: Url::parse(&server.uri()).unwrap(),
        token: SecretString::from("jwt-abc"),
        reconnect,
        transport: TransportConfig {
            timeout: Duration::from_secs(5),
            ..TransportConfig::default()
        },
        websocket: false,
    }
}

#[tokio::test]
async fn polling_session_delivers_events() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("sid", "s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "40{\"sid\":\"n-1\"}\u{1e}42[\"alert\",{\"zone\":\"z-1\",\"direction\":\"zone-exit\"}]\u{1e}42[\"liveOccupancy\",{\"site\":\"site-1\",\"occupancy\":12}]",
        ))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "0{\"sid\":\"s-1\",\"upgrades\":[],\"pingInterval\":25000,\"pingTimeout\":20000}",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/socket.io/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let frames = PushHandle::frame_channel();
    let mut rx = frames.subscribe();
    let handle = PushHandle::spawn(
        config(&server, ReconnectConfig::default()),
        frames,
        CancellationToken::new(),
    );

    let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.kind, PushKind::Alert);
    assert_eq!(first.payload["zone"], "z-1");

    let second = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.kind, PushKind::LiveOccupancy);
    assert_eq!(second.payload["occupancy"], 12);

    handle.shutdown();
    let mut signals = handle.signals();
    tokio::time::timeout(
        Duration::from_secs(5),
        signals.wait_for(|s| matches!(s, PushSignal::Disconnected { .. })),
    )
    .await
    .unwrap()
    .unwrap();
}

#[tokio::test]
async fn gives_up_after_bounded_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        max_attempts: Some(2),
    };
    let handle = PushHandle::spawn(
        config(&server, reconnect),
        PushHandle::frame_channel(),
        CancellationToken::new(),
    );

    let mut signals = handle.signals();
    let end = tokio::time::timeout(
        Duration::from_secs(5),
        signals.wait_for(|s| matches!(s, PushSignal::Disconnected { .. })),
    )
    .await
    .unwrap()
    .unwrap()
    .clone();

    assert_eq!(
        end,
        PushSignal::Disconnected {
            reason: DisconnectReason::RetriesExhausted
        }
    );
    // One initial attempt plus two reconnects.
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

async fn mount_handshake(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "0{\"sid\":\"s-1\",\"upgrades\":[],\"pingInterval\":25000,\"pingTimeout\":20000}",
        ))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/socket.io/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(server)
        .await;
}

async fn handshakes(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "GET" && !r.url.query_pairs().any(|(k, _)| k == "sid"))
        .count()
}

#[tokio::test]
async fn ending_before_namespace_connect_uses_up_attempts() {
    for body in ["41", "1"] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/socket.io/"))
            .and(query_param("sid", "s-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .with_priority(1)
            .mount(&server)
            .await;
        mount_handshake(&server).await;

        let reconnect = ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            max_attempts: Some(2),
        };
        let handle = PushHandle::spawn(
            config(&server, reconnect),
            PushHandle::frame_channel(),
            CancellationToken::new(),
        );

        let mut signals = handle.signals();
        let end = tokio::time::timeout(
            Duration::from_secs(5),
            signals.wait_for(|s| matches!(s, PushSignal::Disconnected { .. })),
        )
        .await
        .unwrap_or_else(|_| panic!("body {body:?} never gave up"))
        .unwrap()
        .clone();

        assert_eq!(
            end,
            PushSignal::Disconnected {
                reason: DisconnectReason::RetriesExhausted
            },
            "body {body:?}"
        );
        // Handshake, CONNECT post, and one poll per attempt; three attempts.
        assert_eq!(handshakes(&server).await, 3, "body {body:?}");
        assert_eq!(
            server.received_requests().await.unwrap().len(),
            9,
            "body {body:?}"
        );
    }
}

#[tokio::test]
async fn server_disconnect_after_connect_reconnects() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("sid", "s-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("40{\"sid\":\"n-1\"}\u{1e}41"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/socket.io/"))
        .and(query_param("sid", "s-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("40{\"sid\":\"n-2\"}")
                .set_delay(Duration::from_millis(100)),
        )
        .with_priority(2)
        .mount(&server)
        .await;
    mount_handshake(&server).await;

    let reconnect = ReconnectConfig {
        initial_delay: Duration::from_secs(10),
        max_delay: Duration::from_secs(10),
        max_attempts: Some(0),
    };
    let handle = PushHandle::spawn(
        config(&server, reconnect),
        PushHandle::frame_channel(),
        CancellationToken::new(),
    );

    // The second handshake follows the disconnect without any backoff.
    tokio::time::timeout(Duration::from_secs(5), async {
        while handshakes(&server).await < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    let mut signals = handle.signals();
    tokio::time::timeout(
        Duration::from_secs(5),
        signals.wait_for(|s| matches!(s, PushSignal::Connected { .. })),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(!handle.is_finished());

    handle.shutdown();
}
