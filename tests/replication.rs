//! Replication trigger and exclusive-access invalidation over real RMI
//! calls (spec.md §8, scenario 5).

mod common;

use common::{path, start_storage, Fixture};

#[tokio::test]
async fn shared_access_replicates_then_exclusive_invalidates() {
    let fixture = Fixture::new().await;

    // Only X is registered when the file is created, so X is
    // guaranteed to be its owner.
    let x = start_storage(&fixture).await;
    x.join(&fixture).await;

    let file = path("/file");
    assert!(fixture.service.create_file(&file).await.unwrap());

    let owner_stub = fixture.service.get_storage(&file).await.unwrap();
    owner_stub.write(&file, 0, b"hello").await.unwrap();

    // Y joins afterward: the only possible replication target.
    let y = start_storage(&fixture).await;
    y.join(&fixture).await;

    for _ in 0..30 {
        fixture.service.lock(&file, false).await.unwrap();
        fixture.service.unlock(&file, false).await.unwrap();
    }

    let replicated = y.server.read(&file, 0, 5).await.expect("replica should hold a copy by now");
    assert_eq!(replicated, b"hello");

    fixture.service.lock(&file, true).await.unwrap();
    fixture.service.unlock(&file, true).await.unwrap();

    let after_invalidation = y.server.size(&file).await;
    assert!(after_invalidation.is_err(), "exclusive access must invalidate the replica");
}
