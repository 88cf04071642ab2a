//! Signed requests: an immutable description of one API call.
//!
//! A [`SignedRequest`] is assembled through [`SignedRequestBuilder`] and never
//! changes afterwards; the `with_*` methods return a modified copy. This is
//! what lets an [`Edge`](crate::Edge) keep its originating request around and
//! derive next/previous page requests from it without aliasing.
//!
//! # Credential handling
//!
//! The stored endpoint and params never contain `access_token` or
//! `appsecret_proof`. A token found in either one is adopted as the request's
//! credential (or rejected with [`AdextError::CredentialMismatch`] if a
//! different token is already set), and both keys are stripped. They are put
//! back only when the URL or body is serialized.

use indexmap::IndexMap;
use url::form_urlencoded;

use crate::credentials::{AccessToken, App};
use crate::error::AdextError;
use crate::headers::Headers;

/// API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "v1.0";

/// Version string of this client, sent in the `User-Agent` header.
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Request parameters, in insertion order, keys unique.
pub type Params = IndexMap<String, String>;

const CREDENTIAL_PARAMS: [&str; 2] = ["access_token", "appsecret_proof"];

// ---------------------------------------------------------------------------
// HttpMethod
// ---------------------------------------------------------------------------

/// The verbs the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Delete => write!(f, "DELETE"),
        }
    }
}

/// Parses a method name, ignoring case.
impl std::str::FromStr for HttpMethod {
    type Err = AdextError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(AdextError::InvalidMethod(
                "Invalid HTTP method specified.".into(),
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// SignedRequest
// ---------------------------------------------------------------------------

/// One API call: method, endpoint, params, headers, entity-tag, version and
/// credential. URL, body and app-secret proof are derived on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedRequest {
    app: Option<App>,
    access_token: Option<AccessToken>,
    /// Upper-cased; validated only when the URL is materialized.
    method: Option<String>,
    endpoint: String,
    params: Params,
    headers: Headers,
    etag: Option<String>,
    api_version: String,
}

impl SignedRequest {
    pub fn builder() -> SignedRequestBuilder {
        SignedRequestBuilder::default()
    }

    // ---- accessors ----

    pub fn app(&self) -> Option<&App> {
        self.app.as_ref()
    }

    pub fn access_token(&self) -> Option<&AccessToken> {
        self.access_token.as_ref()
    }

    /// The method, if one is set and is a supported verb.
    pub fn method(&self) -> Option<HttpMethod> {
        self.method.as_deref().and_then(|m| m.parse().ok())
    }

    /// The method exactly as supplied (upper-cased), valid or not.
    pub fn raw_method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// The endpoint with any credential params removed.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Caller params; never contains `access_token` or `appsecret_proof`.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Headers as supplied by the caller, before defaults are applied.
    pub fn custom_headers(&self) -> &Headers {
        &self.headers
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    // ---- derived values ----

    /// HMAC of the credential keyed by the app secret. `None` unless both a
    /// credential and an app are present.
    pub fn app_secret_proof(&self) -> Option<String> {
        match (&self.access_token, &self.app) {
            (Some(token), Some(app)) => Some(token.app_secret_proof(app.secret())),
            _ => None,
        }
    }

    /// Params with `access_token` and `appsecret_proof` injected from the
    /// credential.
    pub fn params_with_credentials(&self) -> Params {
        let mut params = self.params.clone();
        if let Some(token) = &self.access_token {
            params.insert("access_token".into(), token.value().to_string());
            if let Some(proof) = self.app_secret_proof() {
                params.insert("appsecret_proof".into(), proof);
            }
        }
        params
    }

    /// Params that travel in the body: everything for POST, nothing otherwise.
    pub fn post_params(&self) -> Params {
        if self.method() == Some(HttpMethod::Post) {
            self.params_with_credentials()
        } else {
            Params::new()
        }
    }

    /// The POST params form-encoded; empty for other methods.
    pub fn url_encoded_body(&self) -> String {
        build_query(&self.post_params())
    }

    /// Relative URL: `/{version}/{endpoint}` plus, for non-POST methods, every
    /// param as a query string.
    ///
    /// Fails with [`AdextError::InvalidMethod`] if the method is missing or
    /// unsupported.
    pub fn url(&self) -> Result<String, AdextError> {
        let method = self.validate_method()?;
        let url = format!(
            "{}{}",
            force_slash_prefix(&self.api_version),
            force_slash_prefix(&self.endpoint)
        );
        if method == HttpMethod::Post {
            Ok(url)
        } else {
            Ok(append_params_to_url(&url, &self.params_with_credentials()))
        }
    }

    /// Caller headers overlaid by the defaults: client identifier,
    /// accept-encoding wildcard and, with an entity-tag, `If-None-Match`.
    pub fn headers(&self) -> Headers {
        let mut defaults = default_headers();
        if let Some(etag) = &self.etag {
            defaults.insert("If-None-Match", etag.clone());
        }
        let mut headers = self.headers.clone();
        headers.merge(&defaults);
        headers
    }

    pub fn validate_method(&self) -> Result<HttpMethod, AdextError> {
        match self.method.as_deref() {
            None => Err(AdextError::InvalidMethod("HTTP method not specified.".into())),
            Some(m) => m.parse(),
        }
    }

    pub fn validate_access_token(&self) -> Result<(), AdextError> {
        match &self.access_token {
            Some(_) => Ok(()),
            None => Err(AdextError::MissingAccessToken),
        }
    }

    // ---- derived requests ----

    /// A copy with only the endpoint replaced. Credential, headers, params and
    /// version carry over. A token embedded in `endpoint` is adopted or
    /// rejected exactly as at construction.
    pub fn with_endpoint(&self, endpoint: &str) -> Result<Self, AdextError> {
        let mut next = self.clone();
        next.set_endpoint(endpoint)?;
        Ok(next)
    }

    /// A copy with `headers` merged over the existing custom headers.
    pub fn with_headers(&self, headers: &Headers) -> Self {
        let mut next = self.clone();
        next.headers.merge(headers);
        next
    }

    pub fn with_etag(&self, etag: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.etag = Some(etag.into());
        next
    }

    // ---- construction helpers ----

    fn set_endpoint(&mut self, endpoint: &str) -> Result<(), AdextError> {
        let query = query_params(endpoint);
        if let Some(token) = query.get("access_token") {
            self.adopt_access_token(token)?;
        }
        self.endpoint = remove_params_from_url(endpoint, &CREDENTIAL_PARAMS);
        Ok(())
    }

    fn set_params<I>(&mut self, params: I) -> Result<(), AdextError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in params {
            if key == "access_token" {
                self.adopt_access_token(&value)?;
            }
            if !CREDENTIAL_PARAMS.contains(&key.as_str()) {
                self.params.insert(key, value);
            }
        }
        Ok(())
    }

    fn adopt_access_token(&mut self, value: &str) -> Result<(), AdextError> {
        match &self.access_token {
            None => {
                self.access_token = Some(AccessToken::new(value));
                Ok(())
            }
            Some(existing) if existing.value() == value => Ok(()),
            Some(_) => Err(AdextError::CredentialMismatch),
        }
    }
}

// ---------------------------------------------------------------------------
// SignedRequestBuilder
// ---------------------------------------------------------------------------

/// Collects the parts of a [`SignedRequest`]; [`build`](Self::build) applies
/// the credential rules and produces the immutable value.
#[derive(Debug, Clone, Default)]
pub struct SignedRequestBuilder {
    app: Option<App>,
    access_token: Option<AccessToken>,
    method: Option<String>,
    endpoint: String,
    params: Vec<(String, String)>,
    headers: Headers,
    etag: Option<String>,
    api_version: Option<String>,
}

impl SignedRequestBuilder {
    pub fn app(mut self, app: App) -> Self {
        self.app = Some(app);
        self
    }

    pub fn access_token(mut self, token: impl Into<AccessToken>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Accepts an [`HttpMethod`] or any string; strings are only checked when
    /// the URL is built.
    pub fn method(mut self, method: impl ToString) -> Self {
        self.method = Some(method.to_string().to_ascii_uppercase());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: &Headers) -> Self {
        self.headers.merge(headers);
        self
    }

    pub fn etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn build(self) -> Result<SignedRequest, AdextError> {
        let mut request = SignedRequest {
            app: self.app,
            access_token: self.access_token,
            method: self.method,
            endpoint: String::new(),
            params: Params::new(),
            headers: self.headers,
            etag: self.etag,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
        };
        request.set_endpoint(&self.endpoint)?;
        request.set_params(self.params)?;
        Ok(request)
    }
}

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

fn default_headers() -> Headers {
    let mut headers = Headers::new();
    headers.insert("User-Agent", format!("adext-rust-{CLIENT_VERSION}"));
    headers.insert("Accept-Encoding", "*");
    headers
}

/// Prefix `/` unless already present; the empty string stays empty.
pub fn force_slash_prefix(s: &str) -> String {
    if s.is_empty() || s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{s}")
    }
}

pub(crate) fn build_query(params: &Params) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter())
        .finish()
}

/// The query string of `url` as an ordered map (later duplicates win).
pub fn query_params(url: &str) -> Params {
    match url.split_once('?') {
        Some((_, query)) => form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        None => Params::new(),
    }
}

/// Append `params` as a query string. When `url` already has one, the two are
/// merged and values already in `url` win.
pub fn append_params_to_url(url: &str, params: &Params) -> String {
    if params.is_empty() {
        return url.to_string();
    }
    match url.split_once('?') {
        None => format!("{url}?{}", build_query(params)),
        Some((path, _)) => {
            let mut merged = params.clone();
            merged.extend(query_params(url));
            format!("{path}?{}", build_query(&merged))
        }
    }
}

/// Drop `keys` from the query string of `url`; the `?` goes too when nothing
/// is left.
pub fn remove_params_from_url(url: &str, keys: &[&str]) -> String {
    let Some((path, _)) = url.split_once('?') else {
        return url.to_string();
    };
    let mut params = query_params(url);
    params.retain(|k, _| !keys.contains(&k.as_str()));
    if params.is_empty() {
        path.to_string()
    } else {
        format!("{path}?{}", build_query(&params))
    }
}
