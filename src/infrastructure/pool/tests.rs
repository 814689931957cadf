use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::error::Error;
use crate::port::ChatTransport;
use crate::testkit;
use crate::testkit::directory::StaticDirectory;
use crate::testkit::scheduler::ManualScheduler;
use crate::testkit::transport::MockConnector;

const WINDOW: Duration = Duration::from_secs(30);

struct Harness {
    pool: ConnectionPool,
    directory: Arc<StaticDirectory>,
    connector: Arc<MockConnector>,
    scheduler: Arc<ManualScheduler>,
}

fn harness(backup_count: usize, rate_limit: u32) -> Harness {
    let directory = Arc::new(StaticDirectory::with_servers(5));
    let connector = Arc::new(MockConnector::new());
    let scheduler = Arc::new(ManualScheduler::new());
    let pool = ConnectionPool::new(
        testkit::config::chat_pool(backup_count, rate_limit),
        ChannelName::new("pajlada"),
        testkit::identity("tyggbot"),
        vec!["twitch.tv/commands".into()],
        testkit::deps(directory.clone(), connector.clone(), scheduler.clone()),
    )
    .unwrap();
    Harness {
        pool,
        directory,
        connector,
        scheduler,
    }
}

async fn started(backup_count: usize, rate_limit: u32) -> Harness {
    let h = harness(backup_count, rate_limit);
    h.pool.start().await.unwrap();
    h
}

fn id(raw: u64) -> ConnectionId {
    ConnectionId::new(raw)
}

#[test]
fn rejects_zero_rate_limit() {
    let directory = Arc::new(StaticDirectory::with_servers(1));
    let result = ConnectionPool::new(
        testkit::config::chat_pool(2, 0),
        ChannelName::new("pajlada"),
        testkit::identity("tyggbot"),
        Vec::new(),
        testkit::deps(
            directory,
            Arc::new(MockConnector::new()),
            Arc::new(ManualScheduler::new()),
        ),
    );
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidValue {
            field: "rate_limit",
            ..
        }))
    ));
}

#[tokio::test]
async fn start_opens_main_plus_backups() {
    let h = started(2, 90).await;

    assert_eq!(h.pool.connection_count(), 3);
    assert_eq!(h.pool.main_connection(), Some(id(1)));
    assert_eq!(h.connector.connect_count(), 3);
    assert_eq!(h.scheduler.repeating_intervals(), vec![Duration::from_secs(4)]);

    let stats = h.pool.stats();
    assert_eq!(stats.idle, 2);
    assert_eq!(stats.usable, 3);
    assert_eq!(stats.created, 3);
}

#[tokio::test]
async fn second_start_is_noop() {
    let h = started(2, 90).await;
    h.pool.start().await.unwrap();

    assert_eq!(h.connector.connect_count(), 3);
    assert_eq!(h.scheduler.repeating_count(), 1);
}

#[tokio::test]
async fn start_fails_when_nothing_connects() {
    let h = harness(2, 90);
    h.connector.fail_next(3);

    let err = h.pool.start().await.unwrap_err();
    assert!(matches!(err, Error::Pool(PoolError::StartFailed(_))));
    assert_eq!(h.scheduler.repeating_count(), 0);
}

#[tokio::test]
async fn partial_start_is_topped_up_by_maintenance() {
    let h = harness(2, 90);
    h.connector.fail_next(1);
    h.pool.start().await.unwrap();
    assert_eq!(h.pool.connection_count(), 2);

    h.scheduler.run_repeating().await;
    assert_eq!(h.pool.connection_count(), 3);
    assert_eq!(h.pool.stats().creation_failures, 1);
}

#[tokio::test]
async fn steady_state_reconcile_opens_nothing() {
    let h = started(2, 90).await;

    let report = h.pool.reconcile().await;

    assert_eq!(report.requested, 0);
    assert_eq!(report.created, 0);
    assert_eq!(h.pool.connection_count(), 3);
    assert_eq!(h.connector.connect_count(), 3);
}

#[tokio::test]
async fn dead_backup_is_evicted_and_replaced() {
    let h = started(2, 90).await;
    h.connector.transport(2).kill();

    let report = h.pool.reconcile().await;

    assert_eq!(report.evicted, 1);
    assert_eq!(report.requested, 1);
    assert_eq!(report.created, 1);
    assert_eq!(h.pool.connection_ids(), vec![id(1), id(2), id(4)]);
    assert_eq!(h.connector.connect_count(), 4);
}

#[tokio::test]
async fn dead_connections_never_survive_reconcile() {
    let h = started(3, 90).await;
    h.connector.transport(0).kill();
    h.connector.transport(3).kill();
    let dead = [id(1), id(4)];

    h.pool.reconcile().await;

    let ids = h.pool.connection_ids();
    assert!(dead.iter().all(|d| !ids.contains(d)), "{ids:?}");
    assert_eq!(h.pool.stats().evicted, 2);
}

#[tokio::test]
async fn dead_main_is_replaced_by_next_alive() {
    let h = started(2, 90).await;
    h.connector.transport(0).kill();

    let report = h.pool.reconcile().await;

    assert_eq!(report.main, Some(id(2)));
    assert_eq!(h.pool.main_connection(), Some(id(2)));
    assert_eq!(h.pool.connection_ids(), vec![id(2), id(3), id(4)]);
    assert_eq!(h.pool.stats().idle, 2);
}

#[tokio::test]
async fn idle_capacity_converges_to_backup_count() {
    let h = started(3, 1).await;

    // Saturate main and two backups.
    for _ in 0..3 {
        h.pool.say("hello").await.unwrap();
    }
    assert_eq!(h.pool.stats().idle, 1);

    h.pool.reconcile().await;
    assert_eq!(h.pool.stats().idle, 3);
    assert_eq!(h.pool.connection_count(), 6);
}

#[tokio::test]
async fn excess_idle_connections_are_trimmed_newest_first() {
    let h = started(2, 1).await;
    for _ in 0..3 {
        h.pool.say("hello").await.unwrap();
    }
    h.pool.reconcile().await;
    assert_eq!(h.pool.connection_ids(), vec![id(1), id(2), id(3), id(4), id(5)]);

    // Every window expires, leaving four idle backups for a target of two.
    h.scheduler.advance(WINDOW);
    let report = h.pool.reconcile().await;

    assert_eq!(report.trimmed, 2);
    assert_eq!(report.requested, 0);
    assert_eq!(h.pool.connection_ids(), vec![id(1), id(2), id(3)]);
    assert_eq!(h.connector.transport(3).close_count(), 1);
    assert_eq!(h.connector.transport(4).close_count(), 1);
    assert_eq!(h.pool.main_connection(), Some(id(1)));
}

#[tokio::test]
async fn empty_directory_does_not_break_reconcile() {
    let h = started(2, 90).await;
    h.connector.transport(1).kill();
    h.directory.set_chat_servers(Vec::new());

    let report = h.pool.reconcile().await;
    assert_eq!(report.requested, 1);
    assert_eq!(report.created, 0);
    assert_eq!(h.pool.connection_count(), 2);

    h.directory.set_chat_servers(testkit::directory::servers("irc", 2));
    h.pool.reconcile().await;
    assert_eq!(h.pool.connection_count(), 3);
}

#[tokio::test]
async fn failing_directory_does_not_break_reconcile() {
    let h = started(2, 90).await;
    h.connector.transport(1).kill();
    h.directory.set_failing(true);

    let report = h.pool.reconcile().await;

    assert_eq!(report.created, 0);
    assert_eq!(h.pool.stats().creation_failures, 1);
}

#[tokio::test]
async fn selection_skips_saturated_connections() {
    let h = started(1, 2).await;

    assert_eq!(h.pool.select_connection().unwrap().id(), id(1));
    h.pool.say("one").await.unwrap();
    h.pool.say("two").await.unwrap();
    assert_eq!(h.pool.select_connection().unwrap().id(), id(2));

    h.pool.say("three").await.unwrap();
    let sent: Vec<_> = h.connector.outbox().into_iter().map(|l| l.text).collect();
    assert_eq!(sent, vec!["one", "two", "three"]);
    assert_eq!(h.connector.transport(0).sent().len(), 2);
    assert_eq!(h.connector.transport(1).sent().len(), 1);
}

#[tokio::test]
async fn saturated_pool_drops_message() {
    let h = started(0, 2).await;
    h.pool.say("one").await.unwrap();
    h.pool.say("two").await.unwrap();

    let err = h.pool.say("three").await.unwrap_err();

    assert!(matches!(err, Error::Pool(PoolError::NoUsableConnection)));
    assert!(h.pool.select_connection().is_err());
    let stats = h.pool.stats();
    assert_eq!(stats.messages_sent, 2);
    assert_eq!(stats.messages_dropped, 1);
}

#[tokio::test]
async fn ceiling_holds_under_concurrent_senders() {
    let h = Arc::new(started(1, 5).await);

    let sends = (0..30).map(|i| {
        let h = Arc::clone(&h);
        async move { h.pool.say(&format!("msg {i}")).await.is_ok() }
    });
    let delivered = futures_util::future::join_all(sends)
        .await
        .into_iter()
        .filter(|ok| *ok)
        .count();

    assert_eq!(delivered, 10);
    for transport in h.connector.transports() {
        assert!(transport.sent().len() <= 5);
    }
}

#[tokio::test]
async fn window_expiry_restores_capacity() {
    let h = started(0, 1).await;
    h.pool.say("first").await.unwrap();
    assert!(h.pool.say("blocked").await.is_err());

    h.scheduler.advance(WINDOW);

    h.pool.say("second").await.unwrap();
    assert_eq!(h.connector.transport(0).sent().len(), 2);
}

#[tokio::test]
async fn connections_join_exactly_once() {
    let h = started(2, 1).await;
    for _ in 0..3 {
        h.pool.say("hello").await.unwrap();
        h.pool.reconcile().await;
        h.scheduler.advance(WINDOW);
    }
    h.connector.transport(0).kill();
    h.pool.reconcile().await;

    for transport in h.connector.transports() {
        assert_eq!(transport.join_count(), 1);
        assert_eq!(transport.joined_channels(), vec!["pajlada".to_string()]);
    }
}

#[tokio::test]
async fn chat_commands_render_to_channel() {
    let h = started(0, 90).await;

    h.pool.say("hello chat").await.unwrap();
    h.pool.me("waves").await.unwrap();
    h.pool.timeout("spammer", 600, Some("links")).await.unwrap();
    h.pool.ban("troll", None).await.unwrap();
    h.pool.unban("troll").await.unwrap();
    h.pool.delete_message("abc-123").await.unwrap();

    let lines = h.connector.outbox();
    assert!(lines.iter().all(|l| l.target == "#pajlada"));
    let texts: Vec<_> = lines.into_iter().map(|l| l.text).collect();
    assert_eq!(
        texts,
        vec![
            "hello chat",
            "/me waves",
            "/timeout spammer 600 links",
            "/ban troll",
            "/unban troll",
            "/delete abc-123",
        ]
    );
}

#[tokio::test]
async fn failed_write_counts_as_dropped() {
    let h = started(0, 90).await;
    h.connector.transport(0).set_fail_sends(true);

    assert!(h.pool.say("lost").await.is_err());
    assert_eq!(h.pool.stats().messages_dropped, 1);
}

#[tokio::test]
async fn shutdown_closes_everything() {
    let h = started(2, 90).await;

    h.pool.shutdown();
    h.pool.shutdown();

    assert_eq!(h.pool.connection_count(), 0);
    assert_eq!(h.pool.main_connection(), None);
    assert_eq!(h.scheduler.repeating_count(), 0);
    for transport in h.connector.transports() {
        assert_eq!(transport.close_count(), 1);
    }
    let err = h.pool.say("too late").await.unwrap_err();
    assert!(matches!(err, Error::Pool(PoolError::PoolClosed)));
    assert!(matches!(
        h.pool.start().await,
        Err(Error::Pool(PoolError::PoolClosed))
    ));
}

#[tokio::test]
async fn drop_cancels_maintenance() {
    let h = started(1, 90).await;
    let scheduler = h.scheduler.clone();
    let connector = h.connector.clone();

    drop(h);

    assert_eq!(scheduler.repeating_count(), 0);
    assert!(connector.transports().iter().all(|t| !t.is_connected()));
}
