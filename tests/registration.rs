//! End-to-end registration scenarios over real RMI connections
//! (spec.md §8, scenarios 1-3).

mod common;

use common::{path, Fixture};

#[tokio::test]
async fn registration_merges_across_servers() {
    let fixture = Fixture::new().await;

    let a = common::start_storage(&fixture).await;
    let duplicates = a
        .register(
            &fixture,
            vec![
                path("/file"),
                path("/directory/file"),
                path("/directory/another_file"),
                path("/another_directory/file"),
            ],
        )
        .await;
    assert!(duplicates.is_empty());

    let b = common::start_storage(&fixture).await;
    let duplicates = b
        .register(
            &fixture,
            vec![path("/file"), path("/directory/file"), path("/another_directory/another_file")],
        )
        .await;
    assert_eq!(duplicates, vec![path("/file"), path("/directory/file")]);
}

#[tokio::test]
async fn registration_rejects_shadowed_paths() {
    let fixture = Fixture::new().await;

    let a = common::start_storage(&fixture).await;
    a.register(
        &fixture,
        vec![
            path("/file"),
            path("/directory/file"),
            path("/directory/another_file"),
            path("/another_directory/file"),
        ],
    )
    .await;

    let c = common::start_storage(&fixture).await;
    let duplicates = c.register(&fixture, vec![path("/directory"), path("/another_file")]).await;
    assert_eq!(duplicates, vec![path("/directory")]);
}

#[tokio::test]
async fn registration_ignores_root() {
    let fixture = Fixture::new().await;
    let d = common::start_storage(&fixture).await;
    let duplicates = d.register(&fixture, vec![path("/")]).await;
    assert!(duplicates.is_empty());
    assert!(fixture.service.is_directory(&path("/")).await.unwrap());
}

#[tokio::test]
async fn registering_same_stub_pair_twice_is_rejected() {
    let fixture = Fixture::new().await;
    let a = common::start_storage(&fixture).await;
    a.register(&fixture, vec![path("/file")]).await;

    let result =
        fixture.registration.register(&a.client, &a.command, &[path("/other")]).await;
    assert!(result.is_err());
}
