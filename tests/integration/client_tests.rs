//! Integration tests for the client stub against a bare listener.
//!
//! Using the listener directly lets the tests observe the exact wire bytes
//! and control when (or whether) a reply is sent.

use std::time::Duration;

use bytes::Bytes;

use zxtouch_ipc::ipc::channel::{ChannelOptions, ChannelState, Listener};
use zxtouch_ipc::ipc::client::ClientStub;
use zxtouch_ipc::models::reply::Reply;
use zxtouch_ipc::protocol::codec::encode_reply;
use zxtouch_ipc::{AppError, GlobalConfig};

use super::test_helpers::{test_options, unique_endpoint};

#[tokio::test]
async fn send_home_writes_home_literal() {
    let endpoint = unique_endpoint("home-wire");
    let mut listener = Listener::bind(&endpoint, &test_options()).unwrap();
    let mut client = ClientStub::new(endpoint, test_options());

    let (reply, ()) = tokio::join!(client.send_home(), async {
        let (message, sink) = listener.recv().await.unwrap();
        assert_eq!(&message[..], b"CMD_HOME");
        assert!(sink.send(encode_reply(&Reply::Ack)));
    });

    assert_eq!(reply.unwrap(), Reply::Ack);
}

#[tokio::test]
async fn send_task_writes_prefixed_payload() {
    let endpoint = unique_endpoint("task-wire");
    let mut listener = Listener::bind(&endpoint, &test_options()).unwrap();
    let mut client = ClientStub::new(endpoint, test_options());

    let (reply, ()) = tokio::join!(client.send_task("run-script-7"), async {
        let (message, sink) = listener.recv().await.unwrap();
        assert_eq!(&message[..], b"TASK::run-script-7");
        assert!(sink.send(encode_reply(&Reply::Data {
            data: b"ok:42".to_vec()
        })));
    });

    assert_eq!(
        reply.unwrap(),
        Reply::Data {
            data: b"ok:42".to_vec()
        }
    );
}

#[tokio::test]
async fn stub_is_unbound_until_first_request() {
    let client = ClientStub::new(unique_endpoint("lazy"), test_options());
    assert_eq!(client.state(), ChannelState::Unbound);
}

#[tokio::test]
async fn missing_daemon_surfaces_not_found() {
    let mut client = ClientStub::new(unique_endpoint("no-daemon"), test_options());
    let err = client.send_home().await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
    assert_eq!(client.state(), ChannelState::Unbound);
}

#[tokio::test]
async fn silent_daemon_surfaces_timeout_then_reconnects() {
    let endpoint = unique_endpoint("silent");
    let options = ChannelOptions {
        request_timeout: Duration::from_millis(200),
        ..test_options()
    };
    let mut listener = Listener::bind(&endpoint, &options).unwrap();
    let mut client = ClientStub::new(endpoint, options);

    let (first, server) = tokio::join!(client.send_home(), listener.recv());
    assert!(matches!(first, Err(AppError::Timeout(_))), "got {first:?}");
    assert_eq!(client.state(), ChannelState::Closed);
    let (_message, stale_sink) = server.unwrap();
    drop(stale_sink);

    let (second, ()) = tokio::join!(client.send_home(), async {
        let (_message, sink) = listener.recv().await.unwrap();
        assert!(sink.send(encode_reply(&Reply::Ack)));
    });
    assert_eq!(second.unwrap(), Reply::Ack);
    assert_eq!(client.state(), ChannelState::Connected);
}

#[tokio::test]
async fn closed_stub_reconnects_on_next_request() {
    let endpoint = unique_endpoint("reconnect");
    let mut listener = Listener::bind(&endpoint, &test_options()).unwrap();
    let mut client = ClientStub::new(endpoint, test_options());

    for _ in 0..2 {
        let (reply, ()) = tokio::join!(client.send_home(), async {
            let (_message, sink) = listener.recv().await.unwrap();
            assert!(sink.send(encode_reply(&Reply::Ack)));
        });
        assert_eq!(reply.unwrap(), Reply::Ack);
        assert_eq!(client.state(), ChannelState::Connected);

        client.close();
        client.close();
        assert_eq!(client.state(), ChannelState::Closed);
    }
}

#[tokio::test]
async fn malformed_reply_is_protocol_error() {
    let endpoint = unique_endpoint("bad-reply");
    let mut listener = Listener::bind(&endpoint, &test_options()).unwrap();
    let mut client = ClientStub::new(endpoint, test_options());

    let (reply, ()) = tokio::join!(client.send_home(), async {
        let (_message, sink) = listener.recv().await.unwrap();
        assert!(sink.send(Bytes::from_static(b"not a reply")));
    });

    let err = reply.unwrap_err();
    assert!(matches!(err, AppError::Protocol(_)), "got {err:?}");
}

#[tokio::test]
async fn stub_from_config_targets_configured_endpoint() {
    let endpoint = unique_endpoint("from-config");
    let config = GlobalConfig::from_toml_str(&format!(
        "endpoint_name = \"{endpoint}\"\nrequest_timeout_ms = 2000\n"
    ))
    .unwrap();
    let client = ClientStub::from_config(&config);
    assert_eq!(client.endpoint(), &endpoint);
}

#[tokio::test]
async fn stub_reuses_open_connection_across_requests() {
    let endpoint = unique_endpoint("reuse");
    let mut listener = Listener::bind(&endpoint, &test_options()).unwrap();
    let mut client = ClientStub::new(endpoint, test_options());

    for _ in 0..3 {
        let (reply, ()) = tokio::join!(client.send_home(), async {
            let (_message, sink) = listener.recv().await.unwrap();
            assert!(sink.send(encode_reply(&Reply::Ack)));
        });
        assert_eq!(reply.unwrap(), Reply::Ack);
        assert_eq!(client.state(), ChannelState::Connected);
    }
    assert_eq!(listener.accepted_peers(), 1);

    client.close();
    let (reply, ()) = tokio::join!(client.send_home(), async {
        let (_message, sink) = listener.recv().await.unwrap();
        assert!(sink.send(encode_reply(&Reply::Ack)));
    });
    assert_eq!(reply.unwrap(), Reply::Ack);
    assert_eq!(listener.accepted_peers(), 2);
}
