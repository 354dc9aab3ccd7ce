//! Entity descriptor shared by the CRUD service clients
//!
//! Each backend exposes the same REST shape under `/api/v1/{collection}`:
//! list and search responses wrap the items in a field named after the
//! collection (`{"users": [...], "offset": 0, "limit": 20}`).

use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// A resource served by one of the CRUD backends.
pub trait Entity: DeserializeOwned + Send + Sync + 'static {
    /// Payload accepted by `POST /{collection}`
    type Create: Serialize + Send + Sync;
    /// Payload accepted by `PUT /{collection}/{id}`
    type Update: Serialize + Send + Sync;

    /// Path segment under `/api/v1`
    const COLLECTION: &'static str;

    /// Field holding the items in list and search responses
    const LIST_FIELD: &'static str = Self::COLLECTION;
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub offset: u32,
    pub limit: u32,
}

/// Search response: the matching items and the query the server saw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults<T> {
    pub items: Vec<T>,
    pub query: String,
}

/// Default page size used by the dashboard lists.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
