//! Lock fairness over real RMI calls against the root path (spec.md
//! §8, scenario 4).

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{path, Fixture};
use tokio::sync::Mutex;

#[tokio::test]
async fn root_lock_is_fifo_writer_priority_over_rmi() {
    let fixture = Arc::new(Fixture::new().await);
    let root = path("/");

    fixture.service.lock(&root, false).await.unwrap();
    fixture.service.lock(&root, false).await.unwrap(); // both readers in immediately

    let events = Arc::new(Mutex::new(Vec::<&'static str>::new()));

    let writer_fixture = Arc::clone(&fixture);
    let writer_events = Arc::clone(&events);
    let writer = tokio::spawn(async move {
        writer_fixture.service.lock(&path("/"), true).await.unwrap();
        writer_events.lock().await.push("writer");
        writer_fixture.service.unlock(&path("/"), true).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let late_fixture = Arc::clone(&fixture);
    let late_events = Arc::clone(&events);
    let late_reader_a = tokio::spawn({
        let fixture = Arc::clone(&late_fixture);
        let events = Arc::clone(&late_events);
        async move {
            fixture.service.lock(&path("/"), false).await.unwrap();
            events.lock().await.push("reader-a");
            fixture.service.unlock(&path("/"), false).await.unwrap();
        }
    });
    let late_reader_b = tokio::spawn({
        let fixture = Arc::clone(&late_fixture);
        let events = Arc::clone(&late_events);
        async move {
            fixture.service.lock(&path("/"), false).await.unwrap();
            events.lock().await.push("reader-b");
            fixture.service.unlock(&path("/"), false).await.unwrap();
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert!(events.lock().await.is_empty(), "writer and late readers must still be queued");

    fixture.service.unlock(&path("/"), false).await.unwrap();
    fixture.service.unlock(&path("/"), false).await.unwrap();

    writer.await.unwrap();
    late_reader_a.await.unwrap();
    late_reader_b.await.unwrap();

    let recorded = events.lock().await.clone();
    assert_eq!(recorded[0], "writer", "writer must go before either late reader");
    assert_eq!(recorded.len(), 3);
}
