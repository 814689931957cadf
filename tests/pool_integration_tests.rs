//! Integration tests for the connection pools.
//!
//! The first group drives `ChatClient` with the testkit fakes and a manual
//! scheduler. The second runs the pools on the tokio scheduler with paused
//! time, so maintenance ticks and rate windows fire on their own.

mod support;

use std::sync::Arc;
use std::time::Duration;

use tyggbot::app::ChatClient;
use tyggbot::domain::ChannelName;
use tyggbot::error::{ConfigError, Error, PoolError};
use tyggbot::infrastructure::pool::{ConnectionPool, PoolDeps, WhisperConnectionPool};
use tyggbot::infrastructure::scheduler::TokioScheduler;
use tyggbot::testkit;
use tyggbot::testkit::directory::StaticDirectory;
use tyggbot::testkit::scheduler::ManualScheduler;
use tyggbot::testkit::transport::MockConnector;

async fn wait_for_outbox(connector: &MockConnector, n: usize) {
    for _ in 0..500 {
        if connector.outbox().len() >= n {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("expected {n} lines, saw {:?}", connector.outbox());
}

fn tokio_deps(directory: Arc<StaticDirectory>, connector: Arc<MockConnector>) -> PoolDeps {
    PoolDeps {
        directory,
        connector,
        scheduler: Arc::new(TokioScheduler::current()),
    }
}

// ---------------------------------------------------------------------------
// ChatClient with a manual scheduler
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_routes_chat_and_whispers() {
    let config = support::config::parse(support::config::WITH_WHISPERS);
    let connector = Arc::new(MockConnector::new());
    let deps = testkit::deps(
        Arc::new(StaticDirectory::with_servers(3)),
        connector.clone(),
        Arc::new(ManualScheduler::new()),
    );

    let client = ChatClient::start(&config, deps).await.unwrap();
    assert_eq!(connector.connect_count(), 4, "2 chat + 2 whisper");

    client.say("hello chat").await.unwrap();
    client.whisper("alice", "psst").unwrap();
    wait_for_outbox(&connector, 2).await;

    let lines = connector.outbox();
    assert_eq!(lines[0].nickname, "tyggbot");
    assert_eq!(lines[0].target, "#pajlada");
    assert_eq!(lines[0].text, "hello chat");
    assert_eq!(lines[1].nickname, "whisperer0");
    assert_eq!(lines[1].target, "#jtv");
    assert_eq!(lines[1].text, "/w alice psst");

    let stats = client.stats();
    assert_eq!(stats.chat.connections, 2);
    assert_eq!(stats.chat.messages_sent, 1);
    let whisper = stats.whisper.expect("whisper pool enabled");
    assert_eq!(whisper.connections, 2);
    assert_eq!(whisper.messages_sent, 1);
    assert_eq!(whisper.queued, 0);
}

#[tokio::test]
async fn whisper_without_whisper_pool_is_a_config_error() {
    let config = support::config::parse(support::config::BASE);
    let deps = testkit::deps(
        Arc::new(StaticDirectory::with_servers(1)),
        Arc::new(MockConnector::new()),
        Arc::new(ManualScheduler::new()),
    );
    let client = ChatClient::start(&config, deps).await.unwrap();

    let err = client.whisper("alice", "hi").unwrap_err();
    assert!(matches!(
        err,
        Error::Config(ConfigError::InvalidValue {
            field: "whisper.enabled",
            ..
        })
    ));
    assert!(client.stats().whisper.is_none());
}

#[tokio::test]
async fn client_start_fails_when_directory_is_empty() {
    let config = support::config::parse(support::config::BASE);
    let deps = testkit::deps(
        Arc::new(StaticDirectory::with_servers(0)),
        Arc::new(MockConnector::new()),
        Arc::new(ManualScheduler::new()),
    );

    let err = ChatClient::start(&config, deps).await.err().unwrap();
    assert!(matches!(err, Error::Pool(PoolError::StartFailed(_))));
}

#[tokio::test]
async fn client_shutdown_closes_both_pools() {
    let config = support::config::parse(support::config::WITH_WHISPERS);
    let connector = Arc::new(MockConnector::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let deps = testkit::deps(
        Arc::new(StaticDirectory::with_servers(3)),
        connector.clone(),
        scheduler.clone(),
    );
    let client = ChatClient::start(&config, deps).await.unwrap();
    assert_eq!(scheduler.repeating_count(), 3, "chat tick, whisper tick, server refresh");

    client.shutdown();

    assert_eq!(scheduler.repeating_count(), 0);
    assert!(connector.transports().iter().all(|t| t.close_count() == 1));
    assert!(matches!(
        client.say("anyone?").await,
        Err(Error::Pool(PoolError::PoolClosed))
    ));
    assert!(matches!(
        client.whisper("alice", "hi"),
        Err(Error::Pool(PoolError::PoolClosed))
    ));
}

// ---------------------------------------------------------------------------
// Tokio scheduler, paused time
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn maintenance_tick_replaces_dead_connection() {
    let connector = Arc::new(MockConnector::new());
    let pool = ConnectionPool::new(
        testkit::config::chat_pool(2, 90),
        ChannelName::new("pajlada"),
        testkit::identity("tyggbot"),
        Vec::new(),
        tokio_deps(Arc::new(StaticDirectory::with_servers(5)), connector.clone()),
    )
    .unwrap();
    pool.start().await.unwrap();

    connector.transport(1).kill();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(pool.connection_count(), 3);
    assert_eq!(connector.connect_count(), 4);
    assert_eq!(pool.stats().evicted, 1);
}

#[tokio::test(start_paused = true)]
async fn rate_window_expires_on_its_own() {
    let connector = Arc::new(MockConnector::new());
    let pool = ConnectionPool::new(
        testkit::config::chat_pool(0, 1),
        ChannelName::new("pajlada"),
        testkit::identity("tyggbot"),
        Vec::new(),
        tokio_deps(Arc::new(StaticDirectory::with_servers(1)), connector.clone()),
    )
    .unwrap();
    pool.start().await.unwrap();

    pool.say("first").await.unwrap();
    assert!(matches!(
        pool.say("second").await,
        Err(Error::Pool(PoolError::NoUsableConnection))
    ));

    tokio::time::sleep(Duration::from_secs(31)).await;
    pool.say("third").await.unwrap();

    let texts: Vec<_> = connector.outbox().into_iter().map(|l| l.text).collect();
    assert_eq!(texts, vec!["first", "third"]);
    assert_eq!(connector.connect_count(), 1, "a busy main needs no backup");
}

#[tokio::test(start_paused = true)]
async fn whispers_drain_in_order_as_windows_expire() {
    let connector = Arc::new(MockConnector::new());
    let pool = WhisperConnectionPool::new(
        testkit::config::whisper_pool(1, 1),
        Vec::new(),
        tokio_deps(Arc::new(StaticDirectory::with_servers(1)), connector.clone()),
    )
    .unwrap();
    pool.start().await.unwrap();

    for target in ["alice", "bob", "carol"] {
        pool.enqueue_whisper(target, "hi").unwrap();
    }
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(connector.outbox().len(), 1);
    assert_eq!(pool.queue_len(), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;

    let texts: Vec<_> = connector.outbox().into_iter().map(|l| l.text).collect();
    assert_eq!(texts, vec!["/w alice hi", "/w bob hi", "/w carol hi"]);
    assert_eq!(pool.queue_len(), 0);
}
