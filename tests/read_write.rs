//! Read/write round-trip over real RMI calls (spec.md §8, scenario 6).

mod common;

use common::{path, start_storage, Fixture};

#[tokio::test]
async fn write_read_size_round_trip_via_rmi() {
    let fixture = Fixture::new().await;
    let storage = start_storage(&fixture).await;
    storage.join(&fixture).await;

    let file = path("/f");
    assert!(fixture.service.create_file(&file).await.unwrap());

    let client = fixture.service.get_storage(&file).await.unwrap();
    client.write(&file, 0, b"test data").await.unwrap();
    assert_eq!(client.read(&file, 0, 9).await.unwrap(), b"test data");
    assert_eq!(client.size(&file).await.unwrap(), 9);

    client.write(&file, 10, b"test data").await.unwrap();
    assert_eq!(client.size(&file).await.unwrap(), 19);
}

#[tokio::test]
async fn directory_and_deletion_semantics_via_rmi() {
    let fixture = Fixture::new().await;
    let storage = start_storage(&fixture).await;
    storage.join(&fixture).await;

    let file = path("/f");
    assert!(fixture.service.create_file(&file).await.unwrap());
    assert!(!fixture.service.is_directory(&file).await.unwrap());

    let dir = path("/d");
    assert!(fixture.service.create_directory(&dir).await.unwrap());
    assert!(fixture.service.is_directory(&dir).await.unwrap());

    assert!(!fixture.service.create_file(&file).await.unwrap(), "createFile is not idempotent");

    assert!(fixture.service.delete(&file).await.unwrap());
    assert!(fixture.service.is_directory(&file).await.is_err());
}

#[tokio::test]
async fn root_operations_are_rejected() {
    let fixture = Fixture::new().await;
    let root = path("/");

    assert!(!fixture.service.create_file(&root).await.unwrap());
    assert!(!fixture.service.create_directory(&root).await.unwrap());
    assert!(fixture.service.delete(&root).await.is_err());
}
