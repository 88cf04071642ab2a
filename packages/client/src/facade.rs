//! The [`Adext`] facade: configured defaults plus a sender, with one-line
//! helpers for the common calls and for walking paged edges.

use std::sync::Arc;

use adext::{
    AccessToken, AdextError, App, Direction, Edge, HttpMethod, RawResponse, SignedRequest,
    SignedRequestBuilder,
};
use tracing::{debug, info};

use crate::client::AdextClient;
use crate::config::AdextConfig;
use crate::storage::memory::MemoryStore;
use crate::storage::sqlite::SqliteStore;
use crate::storage::{PersistentStore, ACCESS_TOKEN_KEY};
use crate::transport::blocking::ReqwestTransport;
use crate::transport::HttpTransport;

/// Entry point for applications.
///
/// Requests built here carry the app, the default API version and the
/// default access token unless the caller overrides them on the builder
/// returned by [`request`](Self::request).
pub struct Adext {
    app: App,
    client: AdextClient,
    default_version: String,
    default_access_token: Option<AccessToken>,
    store: Arc<dyn PersistentStore>,
}

impl Adext {
    /// Facade over the `reqwest` transport with the store named in `config`
    /// (SQLite when `store_path` is set, memory otherwise).
    pub fn new(config: AdextConfig) -> Result<Self, AdextError> {
        let store: Arc<dyn PersistentStore> = match &config.store_path {
            Some(path) => Arc::new(SqliteStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_parts(config, ReqwestTransport::new(), store)
    }

    /// Facade over an explicit transport and store.
    ///
    /// When `config` has no default token, one cached in `store` is used.
    pub fn with_parts(
        config: AdextConfig,
        transport: impl HttpTransport + 'static,
        store: Arc<dyn PersistentStore>,
    ) -> Result<Self, AdextError> {
        let client = AdextClient::new(transport, config.base_url.clone()).with_timeout(config.timeout());
        Self::with_client(config, client, store)
    }

    /// Facade over a fully built client (custom counter, timeout, ...).
    pub fn with_client(
        config: AdextConfig,
        client: AdextClient,
        store: Arc<dyn PersistentStore>,
    ) -> Result<Self, AdextError> {
        let default_access_token = match config.default_access_token {
            Some(token) => Some(token),
            None => store.get(ACCESS_TOKEN_KEY)?.map(AccessToken::new),
        };
        info!(
            app_id = config.app.id(),
            version = %config.default_version,
            base_url = client.base_url(),
            has_default_token = default_access_token.is_some(),
            "adext client ready"
        );
        Ok(Self {
            app: config.app,
            client,
            default_version: config.default_version,
            default_access_token,
            store,
        })
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    pub fn client(&self) -> &AdextClient {
        &self.client
    }

    pub fn store(&self) -> &dyn PersistentStore {
        self.store.as_ref()
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    pub fn default_access_token(&self) -> Option<&AccessToken> {
        self.default_access_token.as_ref()
    }

    /// Replace the default token and cache it in the store.
    pub fn set_default_access_token(
        &mut self,
        token: impl Into<AccessToken>,
    ) -> Result<(), AdextError> {
        let token = token.into();
        self.store.set(ACCESS_TOKEN_KEY, token.value())?;
        self.default_access_token = Some(token);
        Ok(())
    }

    /// A builder pre-filled with app, method, endpoint, default version and
    /// default token.
    pub fn request(&self, method: HttpMethod, endpoint: &str) -> SignedRequestBuilder {
        let mut builder = SignedRequest::builder()
            .app(self.app.clone())
            .method(method)
            .endpoint(endpoint)
            .api_version(self.default_version.clone());
        if let Some(token) = &self.default_access_token {
            builder = builder.access_token(token.clone());
        }
        builder
    }

    pub fn get(&self, endpoint: &str) -> Result<RawResponse, AdextError> {
        let request = self.request(HttpMethod::Get, endpoint).build()?;
        self.send_request(&request)
    }

    pub fn post<I, K, V>(&self, endpoint: &str, params: I) -> Result<RawResponse, AdextError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = self.request(HttpMethod::Post, endpoint).params(params).build()?;
        self.send_request(&request)
    }

    pub fn delete<I, K, V>(&self, endpoint: &str, params: I) -> Result<RawResponse, AdextError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let request = self.request(HttpMethod::Delete, endpoint).params(params).build()?;
        self.send_request(&request)
    }

    pub fn send_request(&self, request: &SignedRequest) -> Result<RawResponse, AdextError> {
        self.client.send_request(request)
    }

    /// The page after `edge`, or `None` at the end of the collection.
    pub fn next(&self, edge: &Edge) -> Result<Option<Edge>, AdextError> {
        self.pagination_results(edge, Direction::Next)
    }

    /// The page before `edge`, or `None` at the start of the collection.
    pub fn previous(&self, edge: &Edge) -> Result<Option<Edge>, AdextError> {
        self.pagination_results(edge, Direction::Previous)
    }

    /// Like [`next`](Self::next), also returning the envelope the page was
    /// cast from (status, headers, raw body).
    pub fn next_with_response(
        &self,
        edge: &Edge,
    ) -> Result<Option<(Edge, RawResponse)>, AdextError> {
        self.fetch_page(edge, Direction::Next)
    }

    pub fn previous_with_response(
        &self,
        edge: &Edge,
    ) -> Result<Option<(Edge, RawResponse)>, AdextError> {
        self.fetch_page(edge, Direction::Previous)
    }

    /// Fetch the adjacent page and cast it with `edge`'s subtype hint. A page
    /// that comes back empty counts as the end.
    pub fn pagination_results(
        &self,
        edge: &Edge,
        direction: Direction,
    ) -> Result<Option<Edge>, AdextError> {
        Ok(self.fetch_page(edge, direction)?.map(|(page, _)| page))
    }

    fn fetch_page(
        &self,
        edge: &Edge,
        direction: Direction,
    ) -> Result<Option<(Edge, RawResponse)>, AdextError> {
        let Some(request) = edge.pagination_request(direction)? else {
            debug!(%direction, "no further page");
            return Ok(None);
        };
        let response = self.send_request(&request)?;
        let page = response.edge(edge.subclass_hint())?;
        debug!(%direction, items = page.len(), "fetched page");
        Ok((!page.is_empty()).then_some((page, response)))
    }
}
