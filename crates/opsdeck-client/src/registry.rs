//! Client Registry - one session, one coordinator, many service clients

use std::sync::Arc;

use dashmap::DashMap;
use opsdeck_core::{
    services, ClientConfig, EventBus, EventReceiver, EventSender, Media, Product, SignInRedirect,
    Task, TokenRepository, User,
};
use tracing::{debug, info};
use url::Url;

use crate::api::{AuthApi, EntityClient};
use crate::attach::CredentialAttacher;
use crate::client::ServiceClient;
use crate::error::ApiError;
use crate::refresh::{HttpTokenRefresher, RefreshCoordinator, TokenRefresher};
use crate::session::SessionStore;

pub struct ClientRegistryBuilder {
    config: ClientConfig,
    storage: Arc<dyn TokenRepository>,
    events: EventBus,
    redirect: Option<Arc<dyn SignInRedirect>>,
    refresher: Option<Arc<dyn TokenRefresher>>,
}

impl ClientRegistryBuilder {
    /// Publish session events on an existing bus instead of a private one.
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Override the sign-in redirect. Defaults to emitting
    /// `SignInRequired` on the event bus.
    pub fn redirect(mut self, redirect: Arc<dyn SignInRedirect>) -> Self {
        self.redirect = Some(redirect);
        self
    }

    /// Override how refresh tokens are exchanged.
    pub fn refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn build(self) -> Result<ClientRegistry, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(self.config.timeout)
            .user_agent(self.config.user_agent.clone())
            .build()?;

        let session = Arc::new(SessionStore::restore(self.storage));
        let sender = self.events.sender();

        let refresher = match self.refresher {
            Some(refresher) => refresher,
            None => {
                let auth_base = self
                    .config
                    .endpoint(services::AUTH)
                    .ok_or_else(|| ApiError::UnknownService(services::AUTH.to_string()))?;
                Arc::new(HttpTokenRefresher::for_auth_service(http.clone(), auth_base)?)
            }
        };
        let redirect = self
            .redirect
            .unwrap_or_else(|| Arc::new(sender.clone()) as Arc<dyn SignInRedirect>);

        let coordinator = Arc::new(
            RefreshCoordinator::new(session.clone(), refresher, redirect)
                .with_events(sender.clone()),
        );

        let registry = ClientRegistry {
            http,
            attacher: CredentialAttacher::new(session.clone()),
            session,
            coordinator,
            events: self.events,
            sender,
            clients: DashMap::new(),
        };

        for endpoint in &self.config.endpoints {
            registry.register(endpoint.name.clone(), endpoint.base_url.clone());
        }

        info!(
            "[ClientRegistry] Ready with {} services (authenticated: {})",
            registry.clients.len(),
            registry.session.is_authenticated()
        );

        Ok(registry)
    }
}

/// Owns the shared session and hands out service clients.
pub struct ClientRegistry {
    http: reqwest::Client,
    session: Arc<SessionStore>,
    attacher: CredentialAttacher,
    coordinator: Arc<RefreshCoordinator>,
    events: EventBus,
    sender: EventSender,
    clients: DashMap<String, Arc<ServiceClient>>,
}

impl ClientRegistry {
    pub fn builder(config: ClientConfig, storage: Arc<dyn TokenRepository>) -> ClientRegistryBuilder {
        ClientRegistryBuilder {
            config,
            storage,
            events: EventBus::new(),
            redirect: None,
            refresher: None,
        }
    }

    /// Registry with default redirect, refresher and a private event bus.
    pub fn new(config: ClientConfig, storage: Arc<dyn TokenRepository>) -> Result<Self, ApiError> {
        Self::builder(config, storage).build()
    }

    /// Add or replace a service. It shares the session and coordinator
    /// with every other client.
    pub fn register(&self, name: impl Into<String>, base_url: Url) -> Arc<ServiceClient> {
        let name = name.into();
        debug!("[ClientRegistry] Registering {} at {}", name, base_url);

        let client = Arc::new(ServiceClient::new(
            name.clone(),
            base_url,
            self.http.clone(),
            self.attacher.clone(),
            self.coordinator.clone(),
        ));
        self.clients.insert(name, client.clone());
        client
    }

    pub fn get(&self, name: &str) -> Option<Arc<ServiceClient>> {
        self.clients.get(name).map(|c| Arc::clone(c.value()))
    }

    pub fn client(&self, name: &str) -> Result<Arc<ServiceClient>, ApiError> {
        self.get(name)
            .ok_or_else(|| ApiError::UnknownService(name.to_string()))
    }

    /// Names of all registered services, sorted.
    pub fn service_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.clients.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.events.subscribe()
    }

    pub fn auth(&self) -> Result<AuthApi, ApiError> {
        Ok(AuthApi::new(
            self.client(services::AUTH)?,
            self.session.clone(),
            Some(self.sender.clone()),
        ))
    }

    pub fn users(&self) -> Result<EntityClient<User>, ApiError> {
        Ok(EntityClient::new(self.client(services::USER)?))
    }

    pub fn products(&self) -> Result<EntityClient<Product>, ApiError> {
        Ok(EntityClient::new(self.client(services::PRODUCT)?))
    }

    pub fn tasks(&self) -> Result<EntityClient<Task>, ApiError> {
        Ok(EntityClient::new(self.client(services::TASK)?))
    }

    pub fn media(&self) -> Result<EntityClient<Media>, ApiError> {
        Ok(EntityClient::new(self.client(services::MEDIA)?))
    }
}
