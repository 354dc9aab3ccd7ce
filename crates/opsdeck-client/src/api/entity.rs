//! CRUD client shared by the user, product, task and media services

use std::marker::PhantomData;
use std::sync::Arc;

use opsdeck_core::{
    Entity, Media, Page, PresignedUrl, PresignedUrlRequest, Product, SearchResults, Task,
    TaskStatus, User,
};
use serde_json::{Map, Value};

use crate::client::ServiceClient;
use crate::error::ApiError;
use crate::request::ApiRequest;

const API_PREFIX: &str = "api/v1";

/// Typed access to one entity collection on its backend.
pub struct EntityClient<E> {
    client: Arc<ServiceClient>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for EntityClient<E> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> EntityClient<E> {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self {
            client,
            _entity: PhantomData,
        }
    }

    pub fn service(&self) -> &Arc<ServiceClient> {
        &self.client
    }

    fn collection_path() -> String {
        format!("{}/{}", API_PREFIX, E::COLLECTION)
    }

    fn item_path(suffix: &str) -> String {
        format!(
            "{}/{}/{}",
            API_PREFIX,
            E::COLLECTION,
            urlencoding::encode(suffix)
        )
    }

    /// `GET /{collection}?offset=&limit=`
    pub async fn list(&self, offset: u32, limit: u32) -> Result<Page<E>, ApiError> {
        let request = ApiRequest::get(Self::collection_path())
            .query("offset", offset)
            .query("limit", limit);

        self.fetch_page(&request, offset, limit).await
    }

    pub async fn get_by_id(&self, id: u64) -> Result<E, ApiError> {
        self.client
            .json(&ApiRequest::get(Self::item_path(&id.to_string())))
            .await
    }

    /// `GET /{collection}/search?q=&limit=`
    pub async fn search(&self, query: &str, limit: u32) -> Result<SearchResults<E>, ApiError> {
        let request = ApiRequest::get(format!("{}/search", Self::collection_path()))
            .query("q", query)
            .query("limit", limit);

        let mut body = self.fetch_object(&request).await?;
        let items = take_items::<E>(&mut body)?;
        let query = body
            .get("query")
            .and_then(Value::as_str)
            .unwrap_or(query)
            .to_string();

        Ok(SearchResults { items, query })
    }

    pub async fn create(&self, payload: &E::Create) -> Result<E, ApiError> {
        let request = ApiRequest::post(Self::collection_path()).json(payload)?;
        self.client.json(&request).await
    }

    pub async fn update(&self, id: u64, payload: &E::Update) -> Result<E, ApiError> {
        let request = ApiRequest::put(Self::item_path(&id.to_string())).json(payload)?;
        self.client.json(&request).await
    }

    pub async fn delete(&self, id: u64) -> Result<(), ApiError> {
        self.client
            .execute(&ApiRequest::delete(Self::item_path(&id.to_string())))
            .await
    }

    async fn fetch_object(&self, request: &ApiRequest) -> Result<Map<String, Value>, ApiError> {
        match self.client.json::<Value>(request).await? {
            Value::Object(body) => Ok(body),
            other => Err(ApiError::InvalidResponse(format!(
                "expected a JSON object from {}, got {}",
                request.path(),
                json_kind(&other)
            ))),
        }
    }

    async fn fetch_page(
        &self,
        request: &ApiRequest,
        offset: u32,
        limit: u32,
    ) -> Result<Page<E>, ApiError> {
        let mut body = self.fetch_object(request).await?;
        let items = take_items::<E>(&mut body)?;

        Ok(Page {
            items,
            offset: read_u32(&body, "offset").unwrap_or(offset),
            limit: read_u32(&body, "limit").unwrap_or(limit),
        })
    }
}

/// Pull the collection's item list out of a list or search body.
///
/// The Go backends encode an empty result as `null`.
fn take_items<E: Entity>(body: &mut Map<String, Value>) -> Result<Vec<E>, ApiError> {
    match body.remove(E::LIST_FIELD) {
        Some(Value::Null) => Ok(Vec::new()),
        Some(items) => Ok(serde_json::from_value(items)?),
        None => Err(ApiError::InvalidResponse(format!(
            "missing \"{}\" field",
            E::LIST_FIELD
        ))),
    }
}

fn read_u32(body: &Map<String, Value>, field: &str) -> Option<u32> {
    body.get(field)
        .and_then(Value::as_u64)
        .and_then(|v| u32::try_from(v).ok())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl EntityClient<User> {
    pub async fn by_username(&self, username: &str) -> Result<User, ApiError> {
        let path = format!(
            "{}/username/{}",
            Self::collection_path(),
            urlencoding::encode(username)
        );
        self.client.json(&ApiRequest::get(path)).await
    }
}

impl EntityClient<Product> {
    pub async fn by_category(
        &self,
        category: &str,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Product>, ApiError> {
        let path = format!(
            "{}/category/{}",
            Self::collection_path(),
            urlencoding::encode(category)
        );
        let request = ApiRequest::get(path)
            .query("offset", offset)
            .query("limit", limit);

        self.fetch_page(&request, offset, limit).await
    }
}

impl EntityClient<Task> {
    pub async fn by_status(
        &self,
        status: TaskStatus,
        offset: u32,
        limit: u32,
    ) -> Result<Page<Task>, ApiError> {
        let path = format!("{}/status/{}", Self::collection_path(), status);
        let request = ApiRequest::get(path)
            .query("offset", offset)
            .query("limit", limit);

        self.fetch_page(&request, offset, limit).await
    }
}

impl EntityClient<Media> {
    /// Ask the media service for a presigned upload URL.
    pub async fn presigned_url(
        &self,
        request: &PresignedUrlRequest,
    ) -> Result<PresignedUrl, ApiError> {
        let request =
            ApiRequest::post(format!("{}/presigned-url", Self::collection_path())).json(request)?;
        self.client.json(&request).await
    }
}
