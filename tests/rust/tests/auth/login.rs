//! Registration, sign-in and profile loading

use std::time::Duration;

use opsdeck_core::{LoginRequest, RegisterRequest, UserProfile};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::backend::TestBackend;
use tests::events::wait_for_event;
use tests::fixtures::{error_body, profile_body, token_body};
use tests::{ApiError, SessionEvent, StoredTokens};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn credentials() -> LoginRequest {
    LoginRequest {
        email: "ada@example.com".to_string(),
        password: "correct horse".to_string(),
    }
}

fn ada() -> UserProfile {
    UserProfile {
        id: 7,
        email: "ada@example.com".to_string(),
        username: "ada".to_string(),
        is_active: true,
    }
}

#[tokio::test]
async fn test_login_stores_credentials_and_loads_profile() {
    let backend = TestBackend::start().await;
    let mut events = backend.subscribe();

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .and(body_json(json!({
            "email": "ada@example.com",
            "password": "correct horse",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a1", Some("r1"))))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/profile"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(7, "ada")))
        .expect(1)
        .mount(&backend.server)
        .await;

    let identity = backend
        .registry
        .auth()
        .unwrap()
        .login(&credentials())
        .await
        .unwrap();

    assert_eq!(identity, Some(ada()));
    let session = backend.registry.session();
    assert!(session.is_authenticated());
    assert_eq!(session.identity(), Some(ada()));
    assert_eq!(
        backend.storage.stored(),
        StoredTokens {
            access_token: Some("a1".to_string()),
            refresh_token: Some("r1".to_string()),
        }
    );

    let event = wait_for_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, SessionEvent::SignedIn { .. })
    })
    .await;
    assert_eq!(
        event,
        Some(SessionEvent::SignedIn {
            username: Some("ada".to_string())
        })
    );
}

#[tokio::test]
async fn test_profile_failure_keeps_session_without_identity() {
    let backend = TestBackend::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a1", Some("r1"))))
        .mount(&backend.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/profile"))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_body("profile store down")))
        .up_to_n_times(1)
        .mount(&backend.server)
        .await;

    let auth = backend.registry.auth().unwrap();
    let identity = auth.login(&credentials()).await.unwrap();

    assert_eq!(identity, None);
    assert!(backend.registry.session().is_authenticated());
    assert_eq!(backend.registry.session().identity(), None);

    // The host may retry later
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body(7, "ada")))
        .mount(&backend.server)
        .await;

    assert_eq!(auth.load_profile().await.unwrap(), ada());
    assert_eq!(backend.registry.session().identity(), Some(ada()));
}

#[tokio::test]
async fn test_rejected_login_does_not_refresh_or_redirect() {
    let backend = TestBackend::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("Invalid credentials")))
        .expect(1)
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", None)))
        .expect(0)
        .mount(&backend.server)
        .await;

    let err = backend
        .registry
        .auth()
        .unwrap()
        .login(&credentials())
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(backend.redirect.count(), 0);
    assert!(!backend.registry.session().is_authenticated());
}

#[tokio::test]
async fn test_login_without_refresh_token_is_rejected() {
    let backend = TestBackend::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a1", None)))
        .mount(&backend.server)
        .await;

    let err = backend
        .registry
        .auth()
        .unwrap()
        .login(&credentials())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::InvalidResponse(_)));
    assert!(!backend.registry.session().is_authenticated());
    assert!(backend.storage.stored().is_empty());
}

#[tokio::test]
async fn test_register_is_sent_without_credentials() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("POST"))
        .and(path("/api/v1/register"))
        .and(body_json(json!({
            "email": "grace@example.com",
            "username": "grace",
            "password": "hunter22",
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "message": "User registered successfully",
            "user": profile_body(8, "grace"),
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let response = backend
        .registry
        .auth()
        .unwrap()
        .register(&RegisterRequest {
            email: "grace@example.com".to_string(),
            username: "grace".to_string(),
            password: "hunter22".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.message, "User registered successfully");
    assert_eq!(response.user.username, "grace");

    let requests = backend.server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}
