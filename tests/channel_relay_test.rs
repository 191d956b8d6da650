// Integration tests for the TCP channel relay feeding the bridge

use devlogs::channel::{BrowserEvent, ChannelBridge, ChannelClient, ChannelServer, Dispatcher};
use devlogs::logs::{Level, LogRecord, LogStore, RecordType, Source};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::time::{sleep, Duration};

const EVENT: &str = "devlogs:log";

async fn wait_for_records(store: &LogStore, source: Source, count: usize) -> Vec<LogRecord> {
    for _ in 0..100 {
        let records = store.read(source, 100);
        if records.len() >= count {
            return records;
        }
        sleep(Duration::from_millis(20)).await;
    }
    store.read(source, 100)
}

async fn start_relay(
    store: &Arc<LogStore>,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let dispatcher = Arc::new(Dispatcher::new());
    ChannelBridge::new(Arc::clone(store), EVENT).attach(dispatcher.as_ref());

    let server = ChannelServer::bind("127.0.0.1:0", dispatcher).await.unwrap();
    let addr = server.local_addr().unwrap().to_string();

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .run_until(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (addr, tx, handle)
}

#[tokio::test]
async fn test_client_events_reach_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(LogStore::open(temp_dir.path().join(".devlogs")).unwrap());
    let (addr, shutdown, handle) = start_relay(&store).await;

    let mut client = ChannelClient::connect(&addr).await.unwrap();
    client
        .send_event(
            EVENT,
            &BrowserEvent::Console {
                level: Level::Warn,
                message: "deprecated prop".to_string(),
                args: vec!["deprecated prop".to_string()],
            },
        )
        .await
        .unwrap();
    client
        .send(
            EVENT,
            json!({
                "type": "error",
                "message": "TypeError: undefined is not a function",
                "filename": "http://localhost:5173/src/App.tsx",
                "lineno": 12,
                "colno": 7
            }),
        )
        .await
        .unwrap();
    client.close().await.unwrap();

    let records = wait_for_records(&store, Source::Browser, 2).await;
    assert_eq!(records.len(), 2);

    assert_eq!(records[0].kind, RecordType::Error);
    assert_eq!(records[0].line, Some(12));
    assert_eq!(records[0].column, Some(7));
    assert_eq!(records[0].source, Source::Browser);

    assert_eq!(records[1].kind, RecordType::Console);
    assert_eq!(records[1].level, Some(Level::Warn));
    assert_eq!(records[1].message, "deprecated prop");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_malformed_lines_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(LogStore::open(temp_dir.path().join(".devlogs")).unwrap());
    let (addr, shutdown, handle) = start_relay(&store).await;

    let mut stream = TcpStream::connect(&addr).await.unwrap();
    stream.write_all(b"this is not json\n").await.unwrap();
    stream
        .write_all(b"{\"event\":\"other:event\",\"data\":{\"message\":\"ignored\"}}\n")
        .await
        .unwrap();
    stream
        .write_all(b"{\"event\":\"devlogs:log\",\"data\":{\"type\":\"unhandledRejection\"}}\n")
        .await
        .unwrap();
    stream.shutdown().await.unwrap();

    let records = wait_for_records(&store, Source::Browser, 1).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, RecordType::UnhandledRejection);
    assert_eq!(records[0].message, "(no message)");

    shutdown.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_connect_fails_without_relay() {
    // Bind and drop to get a port nobody listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    assert!(ChannelClient::connect(&addr).await.is_err());
}
