//! Successful refresh: one call, every waiter retried with the new token

use std::time::Duration;

use futures::future::join_all;
use pretty_assertions::assert_eq;
use tests::backend::TestBackend;
use tests::events::collect_events;
use tests::fixtures::{error_body, product_body, task_body, token_body, user_body};
use tests::{ApiError, SessionEvent, StoredTokens};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

use super::{mount_protected, mount_refresh};

#[tokio::test]
async fn test_retry_uses_refreshed_token_and_keeps_refresh_token() {
    let backend = TestBackend::signed_in("a1", "r1").await;
    let mut events = backend.subscribe();

    mount_protected(&backend.server, "/api/v1/users/1", "a1", "a2", user_body(1, "ada"), 1).await;
    mount_refresh(&backend.server, "r1", "a2", None).await;

    let user = backend.registry.users().unwrap().get_by_id(1).await.unwrap();

    assert_eq!(user.username, "ada");
    let session = backend.registry.session();
    assert_eq!(session.access_token().as_deref(), Some("a2"));
    assert_eq!(session.refresh_token().as_deref(), Some("r1"));
    assert_eq!(
        backend.storage.stored(),
        StoredTokens {
            access_token: Some("a2".to_string()),
            refresh_token: Some("r1".to_string()),
        }
    );
    assert_eq!(backend.redirect.count(), 0);
    assert_eq!(
        collect_events(&mut events, Duration::from_millis(100)).await,
        vec![SessionEvent::TokensRefreshed]
    );
}

#[tokio::test]
async fn test_rotated_refresh_token_replaces_old_one() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    mount_protected(&backend.server, "/api/v1/users/1", "a1", "a2", user_body(1, "ada"), 1).await;
    mount_refresh(&backend.server, "r1", "a2", Some("r2")).await;

    backend.registry.users().unwrap().get_by_id(1).await.unwrap();

    assert_eq!(
        backend.registry.session().refresh_token().as_deref(),
        Some("r2")
    );
}

#[tokio::test]
async fn test_concurrent_failures_across_services_share_one_refresh() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    mount_protected(&backend.server, "/api/v1/users/1", "a1", "a2", user_body(1, "ada"), 1).await;
    mount_protected(
        &backend.server,
        "/api/v1/products/2",
        "a1",
        "a2",
        product_body(2, "Lamp", "lighting"),
        1,
    )
    .await;
    mount_protected(
        &backend.server,
        "/api/v1/tasks/3",
        "a1",
        "a2",
        task_body(3, "Ship", "in_progress"),
        1,
    )
    .await;
    mount_refresh(&backend.server, "r1", "a2", None).await;

    let users = backend.registry.users().unwrap();
    let products = backend.registry.products().unwrap();
    let tasks = backend.registry.tasks().unwrap();

    let (user, product, task) = tokio::join!(
        users.get_by_id(1),
        products.get_by_id(2),
        tasks.get_by_id(3)
    );

    assert_eq!(user.unwrap().username, "ada");
    assert_eq!(product.unwrap().name, "Lamp");
    assert_eq!(task.unwrap().title, "Ship");
    assert_eq!(backend.redirect.count(), 0);
}

#[tokio::test]
async fn test_many_concurrent_failures_issue_exactly_one_refresh() {
    const REQUESTS: u64 = 8;
    let backend = TestBackend::signed_in("a1", "r1").await;

    mount_protected(
        &backend.server,
        "/api/v1/users/1",
        "a1",
        "a2",
        user_body(1, "ada"),
        REQUESTS,
    )
    .await;
    mount_refresh(&backend.server, "r1", "a2", None).await;

    let users = backend.registry.users().unwrap();
    let results = join_all((0..REQUESTS).map(|_| users.get_by_id(1))).await;

    for result in results {
        assert_eq!(result.unwrap().id, 1);
    }
    assert!(!backend.registry.coordinator().is_refreshing());
}

#[tokio::test]
async fn test_requests_after_refresh_attach_new_token() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    mount_protected(&backend.server, "/api/v1/users/1", "a1", "a2", user_body(1, "ada"), 1).await;
    mount_refresh(&backend.server, "r1", "a2", None).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/9"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/9"))
        .and(header("Authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(task_body(9, "Audit", "pending")))
        .expect(1)
        .mount(&backend.server)
        .await;

    backend.registry.users().unwrap().get_by_id(1).await.unwrap();
    let task = backend.registry.tasks().unwrap().get_by_id(9).await.unwrap();

    assert_eq!(task.id, 9);
}

#[tokio::test]
async fn test_retried_request_is_not_retried_twice() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    // The resource rejects both the old and the refreshed token
    Mock::given(method("GET"))
        .and(path("/api/v1/users/1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("forbidden user")))
        .expect(2)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", None)))
        .expect(1)
        .mount(&backend.server)
        .await;

    let err = backend
        .registry
        .users()
        .unwrap()
        .get_by_id(1)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::AuthenticationExpired { .. }));
    assert_eq!(err.to_string(), "forbidden user");
    assert_eq!(backend.redirect.count(), 0);
    assert_eq!(
        backend.registry.session().access_token().as_deref(),
        Some("a2")
    );
}

#[tokio::test]
async fn test_additional_service_shares_the_coordinator() {
    let backend = TestBackend::signed_in("a1", "r1").await;
    let billing = backend.registry.register(
        "billing",
        url::Url::parse(&format!("{}/billing", backend.server.uri())).unwrap(),
    );

    mount_protected(
        &backend.server,
        "/billing/api/v1/invoices/4",
        "a1",
        "a2",
        serde_json::json!({ "id": 4, "total": 99 }),
        1,
    )
    .await;
    mount_refresh(&backend.server, "r1", "a2", None).await;

    let invoice: serde_json::Value = billing
        .json(&opsdeck_client::ApiRequest::get("/api/v1/invoices/4"))
        .await
        .unwrap();

    assert_eq!(invoice["total"], 99);
}
