//! Tests for the push/pull feed

use std::time::Duration;

use bytes::Bytes;
use switchyard::error::FeedError;
use switchyard::feed::{Endpoint, Publisher, Subscriber};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

async fn wait_for(cond: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

fn loopback() -> Endpoint {
    "tcp://127.0.0.1:0".parse().unwrap()
}

async fn dead_endpoint() -> Endpoint {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Endpoint::Tcp {
        host: "127.0.0.1".to_string(),
        port,
    }
}

async fn connected_pair() -> (Publisher, Subscriber) {
    let publisher = Publisher::new();
    let bound = publisher.listen(&loopback()).await.unwrap();
    let subscriber = Subscriber::new();
    subscriber.dial(&bound);
    wait_for(|| subscriber.peer_count() == 1 && publisher.peer_count() == 1).await;
    (publisher, subscriber)
}

#[tokio::test]
async fn test_message_reaches_subscriber() {
    let (publisher, subscriber) = connected_pair().await;

    publisher
        .send(Bytes::from_static(b"10.0.0.1:9000"))
        .await
        .unwrap();
    let msg = timeout(Duration::from_secs(5), subscriber.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&msg[..], b"10.0.0.1:9000");
}

#[tokio::test]
async fn test_messages_keep_order_for_one_subscriber() {
    let (publisher, subscriber) = connected_pair().await;

    let sender = tokio::spawn(async move {
        for addr in ["a:1", "b:2", "c:3"] {
            publisher.send(Bytes::from(addr)).await.unwrap();
        }
        publisher
    });

    for expected in ["a:1", "b:2", "c:3"] {
        let msg = timeout(Duration::from_secs(5), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&msg[..], expected.as_bytes());
    }
    let _publisher = sender.await.unwrap();
}

#[tokio::test]
async fn test_recv_without_publisher_fails() {
    let subscriber = Subscriber::new();
    subscriber.dial(&dead_endpoint().await);

    let res = timeout(Duration::from_secs(5), subscriber.recv()).await.unwrap();
    assert!(matches!(res, Err(FeedError::NoPeer)));
}

#[tokio::test]
async fn test_recv_after_close_fails() {
    let (_publisher, subscriber) = connected_pair().await;
    subscriber.close();

    let res = subscriber.recv().await;
    assert!(matches!(res, Err(FeedError::Closed)));
}

#[tokio::test]
async fn test_publisher_spreads_messages_over_subscribers() {
    let publisher = Publisher::new();
    let bound = publisher.listen(&loopback()).await.unwrap();
    let first = Subscriber::new();
    let second = Subscriber::new();
    first.dial(&bound);
    second.dial(&bound);
    wait_for(|| publisher.peer_count() == 2).await;

    let sender = tokio::spawn(async move {
        for i in 0..4 {
            publisher.send(Bytes::from(format!("10.0.0.{i}:80"))).await.unwrap();
        }
        publisher
    });

    let a = timeout(Duration::from_secs(5), first.recv()).await;
    let b = timeout(Duration::from_secs(5), second.recv()).await;
    assert!(a.unwrap().is_ok());
    assert!(b.unwrap().is_ok());
    let _publisher = sender.await.unwrap();
}

#[tokio::test]
async fn test_publisher_speaks_pipeline_wire_format() {
    let publisher = Publisher::new();
    let bound = publisher.listen(&loopback()).await.unwrap();
    let Endpoint::Tcp { host, port } = bound else {
        panic!("expected a tcp endpoint");
    };

    let mut raw = TcpStream::connect((host.as_str(), port)).await.unwrap();
    raw.write_all(&[0, b'S', b'P', 0, 0x00, 0x51, 0, 0])
        .await
        .unwrap();
    let mut header = [0u8; 8];
    raw.read_exact(&mut header).await.unwrap();
    assert_eq!(header, [0, b'S', b'P', 0, 0x00, 0x50, 0, 0]);

    wait_for(|| publisher.peer_count() == 1).await;
    publisher.send(Bytes::from_static(b"host:1")).await.unwrap();

    let len = raw.read_u64().await.unwrap();
    assert_eq!(len, 6);
    let mut payload = vec![0u8; len as usize];
    raw.read_exact(&mut payload).await.unwrap();
    assert_eq!(payload, b"host:1");
}

#[tokio::test]
async fn test_publisher_rejects_wrong_protocol() {
    let publisher = Publisher::new();
    let bound = publisher.listen(&loopback()).await.unwrap();
    let Endpoint::Tcp { host, port } = bound else {
        panic!("expected a tcp endpoint");
    };

    let mut raw = TcpStream::connect((host.as_str(), port)).await.unwrap();
    // Another push socket is not a valid peer.
    raw.write_all(&[0, b'S', b'P', 0, 0x00, 0x50, 0, 0])
        .await
        .unwrap();
    let mut header = [0u8; 8];
    raw.read_exact(&mut header).await.unwrap();

    let mut rest = Vec::new();
    let n = timeout(Duration::from_secs(5), raw.read_to_end(&mut rest))
        .await
        .unwrap()
        .unwrap_or(0);
    assert_eq!(n, 0);
    assert_eq!(publisher.peer_count(), 0);
}

#[cfg(unix)]
#[tokio::test]
async fn test_subscriber_connects_once_publisher_appears() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = Endpoint::Ipc(dir.path().join("feed.sock"));

    let subscriber = Subscriber::new();
    subscriber.dial(&endpoint);
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(subscriber.peer_count(), 0);

    let publisher = Publisher::new();
    publisher.listen(&endpoint).await.unwrap();
    wait_for(|| subscriber.peer_count() == 1).await;

    publisher.send(Bytes::from_static(b"[::1]:80")).await.unwrap();
    let msg = timeout(Duration::from_secs(5), subscriber.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&msg[..], b"[::1]:80");
}
