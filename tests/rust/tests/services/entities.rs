//! CRUD and collection-specific endpoints

use opsdeck_core::{
    CreateTaskRequest, PresignedUrl, PresignedUrlRequest, TaskStatus, UpdateProductRequest,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use tests::backend::TestBackend;
use tests::fixtures::{media_body, product_body, task_body, user_body};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_list_users_page() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(query_param("offset", "20"))
        .and(query_param("limit", "2"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [user_body(21, "ada"), user_body(22, "grace")],
            "offset": 20,
            "limit": 2,
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let page = backend.registry.users().unwrap().list(20, 2).await.unwrap();

    assert_eq!(page.offset, 20);
    assert_eq!(page.limit, 2);
    let names: Vec<_> = page.items.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["ada", "grace"]);
}

#[tokio::test]
async fn test_empty_list_encoded_as_null() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": null,
            "offset": 0,
            "limit": 20,
        })))
        .mount(&backend.server)
        .await;

    let page = backend.registry.products().unwrap().list(0, 20).await.unwrap();

    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_search_products() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/products/search"))
        .and(query_param("q", "desk lamp"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product_body(2, "Desk Lamp", "lighting")],
            "query": "desk lamp",
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let results = backend
        .registry
        .products()
        .unwrap()
        .search("desk lamp", 5)
        .await
        .unwrap();

    assert_eq!(results.query, "desk lamp");
    assert_eq!(results.items.len(), 1);
    assert_eq!(results.items[0].category.as_deref(), Some("lighting"));
}

#[tokio::test]
async fn test_user_by_username() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/username/ada"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body(7, "ada")))
        .expect(1)
        .mount(&backend.server)
        .await;

    let user = backend
        .registry
        .users()
        .unwrap()
        .by_username("ada")
        .await
        .unwrap();

    assert_eq!(user.id, 7);
    assert_eq!(user.display_name.as_deref(), Some("ADA"));
}

#[tokio::test]
async fn test_products_by_category() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/products/category/lighting"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "products": [product_body(2, "Desk Lamp", "lighting")],
            "category": "lighting",
            "offset": 0,
            "limit": 20,
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let page = backend
        .registry
        .products()
        .unwrap()
        .by_category("lighting", 0, 20)
        .await
        .unwrap();

    assert_eq!(page.items[0].name, "Desk Lamp");
}

#[tokio::test]
async fn test_tasks_by_status() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/tasks/status/in_progress"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tasks": [task_body(3, "Ship", "in_progress")],
            "status": "in_progress",
            "offset": 0,
            "limit": 20,
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let page = backend
        .registry
        .tasks()
        .unwrap()
        .by_status(TaskStatus::InProgress, 0, 20)
        .await
        .unwrap();

    assert_eq!(page.items[0].status, TaskStatus::InProgress);
}

#[tokio::test]
async fn test_create_task() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("POST"))
        .and(path("/api/v1/tasks"))
        .and(body_json(json!({ "title": "Ship", "priority": 1 })))
        .respond_with(ResponseTemplate::new(201).set_body_json(task_body(10, "Ship", "pending")))
        .expect(1)
        .mount(&backend.server)
        .await;

    let task = backend
        .registry
        .tasks()
        .unwrap()
        .create(&CreateTaskRequest {
            title: "Ship".to_string(),
            priority: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(task.id, 10);
    assert_eq!(task.status, TaskStatus::Pending);
}

#[tokio::test]
async fn test_update_product() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/products/2"))
        .and(body_json(json!({ "stock": 0 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_body(2, "Desk Lamp", "lighting")))
        .expect(1)
        .mount(&backend.server)
        .await;

    let product = backend
        .registry
        .products()
        .unwrap()
        .update(
            2,
            &UpdateProductRequest {
                stock: Some(0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(product.id, 2);
}

#[tokio::test]
async fn test_delete_media() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("DELETE"))
        .and(path("/api/v1/media/4"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&backend.server)
        .await;

    backend.registry.media().unwrap().delete(4).await.unwrap();
}

#[tokio::test]
async fn test_get_media_and_presigned_url() {
    let backend = TestBackend::signed_in("a1", "r1").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/media/4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(media_body(4, "logo.png")))
        .mount(&backend.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/media/presigned-url"))
        .and(body_json(json!({
            "file_name": "logo.png",
            "file_type": "image/png",
            "file_size": 2048,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "url": "https://uploads.example.com/abc",
            "key": "uploads/abc",
            "expires_in": 900,
        })))
        .expect(1)
        .mount(&backend.server)
        .await;

    let media = backend.registry.media().unwrap();
    let item = media.get_by_id(4).await.unwrap();
    let upload = media
        .presigned_url(&PresignedUrlRequest {
            file_name: "logo.png".to_string(),
            file_type: "image/png".to_string(),
            file_size: 2048,
            expires_in: None,
        })
        .await
        .unwrap();

    assert_eq!(item.file_name, "logo.png");
    assert_eq!(
        upload,
        PresignedUrl {
            url: "https://uploads.example.com/abc".to_string(),
            key: "uploads/abc".to_string(),
            expires_in: 900,
        }
    );
}
