//! SQLite-backed session persistence

use std::sync::Arc;

use opsdeck_client::{ClientRegistry, SessionStore};
use opsdeck_core::TokenRepository;
use pretty_assertions::assert_eq;
use tests::backend::config_for;
use tests::db::TestDatabase;
use tests::fixtures::{error_body, token_body, user_body};
use tests::{CredentialPair, RecordingRedirect, StoredTokens};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn test_session_survives_restart() {
    let db = TestDatabase::new();

    {
        let session = SessionStore::restore(Arc::new(db.repository()));
        assert!(!session.is_authenticated());
        session
            .set_credentials(CredentialPair::new("a1", "r1"))
            .unwrap();
    }

    let session = SessionStore::restore(Arc::new(db.repository()));

    assert!(session.is_authenticated());
    assert_eq!(session.access_token().as_deref(), Some("a1"));
    assert_eq!(session.refresh_token().as_deref(), Some("r1"));
    assert_eq!(session.identity(), None);
}

#[test]
fn test_clear_removes_both_slots() {
    let db = TestDatabase::new();
    let session = SessionStore::restore(Arc::new(db.repository()));
    session
        .set_credentials(CredentialPair::new("a1", "r1"))
        .unwrap();

    session.clear();

    assert!(db.repository().load().unwrap().is_empty());
    assert!(!SessionStore::restore(Arc::new(db.repository())).is_authenticated());
}

#[test]
fn test_single_slot_does_not_restore_session() {
    let db = TestDatabase::new();
    db.repository()
        .save(&StoredTokens {
            access_token: None,
            refresh_token: Some("r1".to_string()),
        })
        .unwrap();

    let session = SessionStore::restore(Arc::new(db.repository()));

    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_refreshed_pair_is_persisted() {
    let db = TestDatabase::new();
    db.repository()
        .save(&StoredTokens::from(&CredentialPair::new("a1", "r1")))
        .unwrap();

    let server = MockServer::start().await;
    let registry = ClientRegistry::builder(config_for(&server), Arc::new(db.repository()))
        .redirect(Arc::new(RecordingRedirect::new()))
        .build()
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/v1/users/1"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(401).set_body_json(error_body("token expired")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users/1"))
        .and(header("Authorization", "Bearer a2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body(1, "ada")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("a2", None)))
        .expect(1)
        .mount(&server)
        .await;

    registry.users().unwrap().get_by_id(1).await.unwrap();

    assert_eq!(
        db.repository().load().unwrap(),
        StoredTokens {
            access_token: Some("a2".to_string()),
            refresh_token: Some("r1".to_string()),
        }
    );
}
