//! Client core for the Adext graph API.
//!
//! Everything here is pure: no sockets, no clocks beyond token expiry checks,
//! no global state. The `adext-client` crate adds the transport, the
//! persistence store and the high-level facade on top.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`request`] | [`SignedRequest`]: immutable call description, URL/body/proof derivation |
//! | [`response`] | [`RawResponse`]: body decoding and eager API error detection |
//! | [`factory`] | The casting engine: [`NodeFactory`], [`is_edge_shaped`] |
//! | [`node`] | [`Node`], [`Field`], [`NodeOrEdge`] |
//! | [`edge`] | [`Edge`] and cursor/offset pagination |
//! | [`kind`] | [`NodeKind`]: the closed set of subtypes and their field maps |
//! | [`credentials`] | [`App`] and [`AccessToken`] |
//! | [`api_error`] | [`ApiError`] and its [`ErrorCategory`] |
//! | [`render`] | Plain-text rendering of nodes and edges |
//!
//! # Quick start
//!
//! ```rust,ignore
//! use adext::{HttpMethod, RawResponse, SignedRequest, Headers};
//!
//! let request = SignedRequest::builder()
//!     .access_token("EAAB...")
//!     .method(HttpMethod::Get)
//!     .endpoint("/me/friends")
//!     .build()?;
//!
//! // ... send request.url()? with any HTTP client, then:
//! let response = RawResponse::new(request, 200, Headers::new(), body);
//! let friends = response.error_for_api()?.edge(None)?;
//! if let Some(next) = friends.next_page_request()? {
//!     // send `next`, then cast with friends.subclass_hint()
//! }
//! ```

pub mod api_error;
pub mod credentials;
pub mod edge;
pub mod error;
pub mod factory;
pub mod headers;
pub mod kind;
pub mod node;
pub mod render;
pub mod request;
pub mod response;

pub use api_error::{ApiError, ErrorCategory};
pub use credentials::{AccessToken, App};
pub use edge::{Direction, Edge};
pub use error::{AdextError, TransportError};
pub use factory::{classify_value, is_edge_shaped, NodeFactory};
pub use headers::Headers;
pub use kind::NodeKind;
pub use node::{Field, Node, NodeOrEdge};
pub use request::{
    HttpMethod, Params, SignedRequest, SignedRequestBuilder, CLIENT_VERSION, DEFAULT_API_VERSION,
};
pub use response::RawResponse;
