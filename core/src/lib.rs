//! Synchronous client for the Linkwarden v1 bookmarking API.
//!
//! # Overview
//! `LinkwardenClient` authenticates with a bearer token and exposes one
//! blocking method per API operation (collections, links, tags, current user,
//! search). Every call is a single request/response transaction; failures come
//! back as typed [`ApiError`] values carrying the HTTP status and raw body.
//!
//! # Design
//! - Requests and responses are plain data (`http`); the `Transport` trait is
//!   the only I/O seam, with `UreqTransport` as the production implementation.
//! - The client holds no per-call state and can be shared across threads.
//! - `tools` exposes the active operations as an explicit registry of named,
//!   schema-described tools for an agent framework.
//! - Delete, token and archive operations live behind the `extended` feature
//!   and are never registered as tools.

pub mod client;
pub mod error;
#[cfg(feature = "extended")]
pub mod extended;
pub mod http;
pub mod tools;
pub mod transport;
pub mod types;

pub use client::{interpret_response, LinkwardenClient, API_PREFIX};
pub use error::{ApiError, ErrorKind, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};
pub use tools::{Tool, ToolError, ToolRegistry};
pub use transport::{Transport, UreqTransport, DEFAULT_BODY_LIMIT, DEFAULT_TIMEOUT};
pub use types::{
    ArchiveFormat, ArchiveUploadFormat, Collection, CreateCollectionPayload, CreateLinkPayload,
    CreateTagPayload, CreateTokenPayload, CreatedToken, Link, LinkCollectionRef, Tag, TagRef,
    Token, UpdateCollectionPayload, UpdateLinkCollectionRef, UpdateLinkPayload, User, Validate,
};
