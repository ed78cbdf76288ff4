//! Authenticated client for the Linkwarden v1 API.
//!
//! # Design
//! `LinkwardenClient` owns a base URL, a header set computed once at
//! construction, and a [`Transport`]. Nothing on the client changes after
//! construction, so one instance can serve any number of callers, including
//! from several threads at once.
//!
//! Every operation is the same routine bound to a fixed method and endpoint:
//! build an `HttpRequest`, execute it, then run the response through
//! [`interpret_response`]. Typed operations finally decode the JSON, unwrapping
//! the server's `{"response": ...}` envelope.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, ResponseBody};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    Collection, CreateCollectionPayload, CreateLinkPayload, CreateTagPayload, Link, Tag,
    UpdateCollectionPayload, UpdateLinkPayload, User, Validate,
};

/// Path prefix shared by every endpoint.
pub const API_PREFIX: &str = "api/v1";

/// Synchronous client for the Linkwarden v1 API.
#[derive(Clone)]
pub struct LinkwardenClient<T = UreqTransport> {
    base_url: String,
    headers: Vec<(String, String)>,
    transport: T,
}

impl LinkwardenClient<UreqTransport> {
    /// Client with the default `ureq` transport and request timeout.
    pub fn new(base_url: &str, api_token: &str) -> Result<Self, ApiError> {
        Self::with_transport(base_url, api_token, UreqTransport::default())
    }

    pub fn with_timeout(base_url: &str, api_token: &str, timeout: Duration) -> Result<Self, ApiError> {
        Self::with_transport(base_url, api_token, UreqTransport::new(timeout))
    }
}

impl<T: Transport> LinkwardenClient<T> {
    /// Client over an arbitrary transport.
    ///
    /// Fails with [`ApiError::InvalidBaseUrl`] unless `base_url` starts with
    /// `http://` or `https://` and names a host. One trailing slash is
    /// stripped.
    pub fn with_transport(base_url: &str, api_token: &str, transport: T) -> Result<Self, ApiError> {
        let host = base_url
            .strip_prefix("https://")
            .or_else(|| base_url.strip_prefix("http://"));
        match host {
            Some(host) if !host.is_empty() && !host.starts_with('/') && !host.contains(char::is_whitespace) => {}
            _ => return Err(ApiError::InvalidBaseUrl(base_url.to_string())),
        }

        let base_url = base_url.strip_suffix('/').unwrap_or(base_url).to_string();
        let headers = vec![
            ("Authorization".to_string(), format!("Bearer {api_token}")),
            ("Accept".to_string(), "application/json".to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];

        Ok(Self {
            base_url,
            headers,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Request routine
    // -----------------------------------------------------------------------

    /// A request for `endpoint` (relative to the base URL) carrying the
    /// connection headers.
    pub fn build_request(&self, method: HttpMethod, endpoint: &str) -> HttpRequest {
        let mut request = HttpRequest::new(
            method,
            format!("{}/{}", self.base_url, endpoint.trim_start_matches('/')),
        );
        request.headers = self.headers.clone();
        request
    }

    /// `build_request` with a JSON body.
    pub fn build_json_request<P: Serialize>(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: &P,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_vec(payload).map_err(ApiError::Serialization)?;
        Ok(self
            .build_request(method, endpoint)
            .with_body("application/json", body))
    }

    /// Execute a request and interpret the response.
    pub fn execute(&self, request: &HttpRequest) -> Result<ResponseBody, ApiError> {
        let response = self.transport.execute(request)?;
        interpret_response(response)
    }

    /// Untyped access to any endpoint without a body.
    pub fn request(&self, method: HttpMethod, endpoint: &str) -> Result<ResponseBody, ApiError> {
        self.execute(&self.build_request(method, endpoint))
    }

    fn fetch<R: DeserializeOwned>(&self, request: HttpRequest) -> Result<R, ApiError> {
        decode(self.execute(&request)?)
    }

    fn send<P, R>(&self, method: HttpMethod, endpoint: &str, payload: &P) -> Result<R, ApiError>
    where
        P: Serialize + Validate,
        R: DeserializeOwned,
    {
        payload.validate()?;
        self.fetch(self.build_json_request(method, endpoint, payload)?)
    }

    // -----------------------------------------------------------------------
    // Collections
    // -----------------------------------------------------------------------

    /// `GET api/v1/collections`: every collection visible to the token.
    pub fn get_collections(&self) -> Result<Vec<Collection>, ApiError> {
        self.fetch(self.build_request(HttpMethod::Get, &endpoint("collections")))
    }

    /// `POST api/v1/collections`.
    pub fn create_collection(&self, payload: &CreateCollectionPayload) -> Result<Collection, ApiError> {
        self.send(HttpMethod::Post, &endpoint("collections"), payload)
    }

    /// `GET api/v1/collections/{id}`.
    pub fn get_collection_by_id(&self, collection_id: i64) -> Result<Collection, ApiError> {
        self.fetch(self.build_request(
            HttpMethod::Get,
            &endpoint(&format!("collections/{collection_id}")),
        ))
    }

    /// `PUT api/v1/collections/{id}`. Only fields present in `payload` change.
    pub fn update_collection(
        &self,
        collection_id: i64,
        payload: &UpdateCollectionPayload,
    ) -> Result<Collection, ApiError> {
        if payload.parent_id == Some(Some(collection_id)) {
            return Err(ApiError::InvalidPayload(format!(
                "collection {collection_id} cannot be its own parent"
            )));
        }
        self.send(
            HttpMethod::Put,
            &endpoint(&format!("collections/{collection_id}")),
            payload,
        )
    }

    // -----------------------------------------------------------------------
    // Links
    // -----------------------------------------------------------------------

    /// `GET api/v1/links`.
    pub fn get_links(&self) -> Result<Vec<Link>, ApiError> {
        self.fetch(self.build_request(HttpMethod::Get, &endpoint("links")))
    }

    /// `POST api/v1/links`. Unknown tag names are created by the server.
    pub fn create_link(&self, payload: &CreateLinkPayload) -> Result<Link, ApiError> {
        self.send(HttpMethod::Post, &endpoint("links"), payload)
    }

    /// `GET api/v1/links/{id}`.
    pub fn get_link_by_id(&self, link_id: i64) -> Result<Link, ApiError> {
        self.fetch(self.build_request(HttpMethod::Get, &endpoint(&format!("links/{link_id}"))))
    }

    /// `PUT api/v1/links/{id}`. `payload.id` must equal `link_id`.
    pub fn update_link(&self, link_id: i64, payload: &UpdateLinkPayload) -> Result<Link, ApiError> {
        if payload.id != link_id {
            return Err(ApiError::InvalidPayload(format!(
                "payload id {} does not match link id {link_id}",
                payload.id
            )));
        }
        self.send(HttpMethod::Put, &endpoint(&format!("links/{link_id}")), payload)
    }

    // -----------------------------------------------------------------------
    // Tags
    // -----------------------------------------------------------------------

    /// `GET api/v1/tags`.
    pub fn get_tags(&self) -> Result<Vec<Tag>, ApiError> {
        self.fetch(self.build_request(HttpMethod::Get, &endpoint("tags")))
    }

    /// `POST api/v1/tags`.
    pub fn create_tag(&self, payload: &CreateTagPayload) -> Result<Tag, ApiError> {
        self.send(HttpMethod::Post, &endpoint("tags"), payload)
    }

    // -----------------------------------------------------------------------
    // Users and search
    // -----------------------------------------------------------------------

    /// `GET api/v1/users/me`: the owner of the access token.
    pub fn get_current_user(&self) -> Result<User, ApiError> {
        self.fetch(self.build_request(HttpMethod::Get, &endpoint("users/me")))
    }

    /// `GET api/v1/search?searchQueryString=...`. `query` may use operators
    /// such as `tag:` or `collection:`.
    pub fn search_query(&self, query: &str) -> Result<Vec<Link>, ApiError> {
        self.fetch(
            self.build_request(HttpMethod::Get, &endpoint("search"))
                .with_query("searchQueryString", query),
        )
    }
}

impl<T> fmt::Debug for LinkwardenClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkwardenClient")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

/// `api/v1/<path>`.
pub(crate) fn endpoint(path: &str) -> String {
    format!("{API_PREFIX}/{path}")
}

/// Map a raw response to a body or an error.
///
/// Error statuses (400 and above) are classified by status alone. Any other
/// response is parsed as JSON; a body that is not JSON is returned as bytes
/// for 2xx and rejected otherwise.
pub fn interpret_response(response: HttpResponse) -> Result<ResponseBody, ApiError> {
    if response.status >= 400 {
        return Err(ApiError::from_status(response.status, response.text()));
    }
    match serde_json::from_slice::<Value>(&response.body) {
        Ok(value) => Ok(ResponseBody::Json(value)),
        Err(_) if response.is_success() => Ok(ResponseBody::Bytes(response.body)),
        Err(_) => Err(ApiError::InvalidJson {
            status: response.status,
            body: response.text(),
        }),
    }
}

/// Decode a JSON body into `R`, looking inside the `response` envelope when
/// there is one.
pub(crate) fn decode<R: DeserializeOwned>(body: ResponseBody) -> Result<R, ApiError> {
    match body {
        ResponseBody::Json(value) => {
            serde_json::from_value(unwrap_envelope(value)).map_err(ApiError::Deserialization)
        }
        ResponseBody::Bytes(bytes) => Err(ApiError::UnexpectedBinary(bytes.len())),
    }
}

fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) => match map.remove("response") {
            Some(inner) => inner,
            None => Value::Object(map),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::{ErrorKind, TransportError};
    use crate::types::TagRef;

    /// Replays canned responses and records every request it sees.
    struct ScriptedTransport {
        responses: Mutex<Vec<Result<HttpResponse, TransportError>>>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<HttpResponse, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn last_request(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }

        fn request_count(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    impl Transport for ScriptedTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn respond(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
        Ok(HttpResponse {
            status,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        })
    }

    fn client(responses: Vec<Result<HttpResponse, TransportError>>) -> LinkwardenClient<ScriptedTransport> {
        LinkwardenClient::with_transport(
            "https://links.example.com",
            "tok",
            ScriptedTransport::new(responses),
        )
        .unwrap()
    }

    const COLLECTION: &str = r#"{"id":1,"name":"Reading List","description":null,"icon":null,
        "color":null,"parentId":null,"isPublic":false,"ownerId":1,
        "createdAt":"2024-01-01T00:00:00.000Z","updatedAt":"2024-01-01T00:00:00.000Z"}"#;

    const LINK: &str = r#"{"id":12,"url":"https://rust-lang.org","name":"Rust","description":"",
        "image":null,"domain":"rust-lang.org","pinned":false,"isPublic":false,"ownerId":1,
        "collectionId":1,"createdAt":"c","updatedAt":"u",
        "tags":[{"id":3,"name":"work","ownerId":1,"createdAt":"c","updatedAt":"u"}]}"#;

    // --- construction ---

    #[test]
    fn trailing_slash_is_stripped_once() {
        let c = LinkwardenClient::with_transport("http://localhost:3000/", "t", ScriptedTransport::new(vec![]))
            .unwrap();
        assert_eq!(c.base_url(), "http://localhost:3000");

        let c = LinkwardenClient::with_transport("http://localhost:3000/app//", "t", ScriptedTransport::new(vec![]))
            .unwrap();
        assert_eq!(c.base_url(), "http://localhost:3000/app/");
    }

    #[test]
    fn base_url_without_scheme_is_rejected() {
        for url in ["", "localhost:3000", "ftp://host", "HTTPS//host", "http://", "https:///path", "http://a b"] {
            let err = LinkwardenClient::with_transport(url, "token", ScriptedTransport::new(vec![]))
                .unwrap_err();
            assert!(matches!(err, ApiError::InvalidBaseUrl(_)), "{url:?}");
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn debug_output_redacts_token() {
        let c = LinkwardenClient::with_transport("https://h", "super-secret", ScriptedTransport::new(vec![]))
            .unwrap();
        let debug = format!("{c:?}");
        assert!(debug.contains("https://h"));
        assert!(!debug.contains("super-secret"));
    }

    // --- request building ---

    #[test]
    fn requests_carry_connection_headers() {
        let c = client(vec![]);
        let req = c.build_request(HttpMethod::Get, "api/v1/tags");
        assert_eq!(req.url, "https://links.example.com/api/v1/tags");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        assert_eq!(req.header("accept"), Some("application/json"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(req.body.is_none());
    }

    #[test]
    fn create_collection_posts_json_and_unwraps_envelope() {
        let c = client(vec![respond(201, &format!(r#"{{"response":{COLLECTION}}}"#))]);
        let payload = CreateCollectionPayload {
            name: "Reading List".to_string(),
            ..Default::default()
        };
        let collection = c.create_collection(&payload).unwrap();
        assert_eq!(collection.id, 1);
        assert_eq!(collection.name, "Reading List");

        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.url, "https://links.example.com/api/v1/collections");
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Reading List"}));
    }

    #[test]
    fn bare_json_without_envelope_is_accepted() {
        let c = client(vec![respond(200, &format!("[{COLLECTION}]"))]);
        let collections = c.get_collections().unwrap();
        assert_eq!(collections.len(), 1);
    }

    #[test]
    fn get_and_update_use_id_in_path() {
        let c = client(vec![
            respond(200, &format!(r#"{{"response":{COLLECTION}}}"#)),
            respond(200, &format!(r#"{{"response":{COLLECTION}}}"#)),
        ]);
        c.get_collection_by_id(1).unwrap();
        assert_eq!(
            c.transport().last_request().url,
            "https://links.example.com/api/v1/collections/1"
        );

        let update = UpdateCollectionPayload {
            color: Some("#000000".to_string()),
            ..Default::default()
        };
        c.update_collection(1, &update).unwrap();
        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "https://links.example.com/api/v1/collections/1");
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"color": "#000000"}));
    }

    #[test]
    fn search_encodes_query_parameter() {
        let c = client(vec![respond(200, &format!(r#"{{"response":[{LINK}]}}"#))]);
        let links = c.search_query("tag:work").unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].tags[0].name, "work");

        let req = c.transport().last_request();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(
            req.full_url(),
            "https://links.example.com/api/v1/search?searchQueryString=tag%3Awork"
        );
    }

    #[test]
    fn current_user_hits_users_me() {
        let c = client(vec![respond(
            200,
            r#"{"response":{"id":1,"username":"amx","email":"amx@example.com","avatar":null,"createdAt":"c"}}"#,
        )]);
        let user = c.get_current_user().unwrap();
        assert_eq!(user.username, "amx");
        assert_eq!(c.transport().last_request().url, "https://links.example.com/api/v1/users/me");
    }

    // --- validation before I/O ---

    #[test]
    fn invalid_payload_never_reaches_transport() {
        let c = client(vec![]);
        let err = c
            .create_tag(&CreateTagPayload {
                name: String::new(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(c.transport().request_count(), 0);
    }

    #[test]
    fn update_link_rejects_mismatched_id() {
        let c = client(vec![]);
        let payload = UpdateLinkPayload {
            id: 2,
            tags: Some(vec![TagRef::named("work")]),
            ..Default::default()
        };
        let err = c.update_link(1, &payload).unwrap_err();
        assert!(matches!(err, ApiError::InvalidPayload(_)));
        assert_eq!(c.transport().request_count(), 0);
    }

    #[test]
    fn collection_cannot_parent_itself() {
        let c = client(vec![]);
        let payload = UpdateCollectionPayload {
            parent_id: Some(Some(5)),
            ..Default::default()
        };
        assert!(matches!(
            c.update_collection(5, &payload),
            Err(ApiError::InvalidPayload(_))
        ));
    }

    // --- response interpretation ---

    #[test]
    fn not_found_keeps_literal_body() {
        let c = client(vec![respond(404, r#"{"error":"not found"}"#)]);
        let err = c.get_link_by_id(999).unwrap_err();
        match err {
            ApiError::NotFound { status, ref body } => {
                assert_eq!(status, 404);
                assert_eq!(body, r#"{"error":"not found"}"#);
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert_eq!(
            c.transport().last_request().url,
            "https://links.example.com/api/v1/links/999"
        );
    }

    #[test]
    fn error_status_with_non_json_body_is_classified_by_status() {
        let c = client(vec![
            respond(502, "<html>Bad Gateway</html>"),
            respond(400, "bad request"),
            respond(403, ""),
        ]);
        assert!(matches!(c.get_tags(), Err(ApiError::Server { status: 502, .. })));
        assert!(matches!(c.get_tags(), Err(ApiError::Http { status: 400, .. })));
        assert!(matches!(c.get_tags(), Err(ApiError::Auth { status: 403, .. })));
    }

    #[test]
    fn transport_failure_surfaces_as_generic_error() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let c = client(vec![Err(TransportError::new(refused))]);
        let err = c.get_links().unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
        assert_eq!(err.kind(), ErrorKind::Api);
    }

    #[test]
    fn interpret_returns_json_unchanged() {
        let body = r#"{"response":{"nested":[1,2,3]},"extra":true}"#;
        let parsed = interpret_response(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        })
        .unwrap();
        assert_eq!(
            parsed,
            ResponseBody::Json(serde_json::from_str(body).unwrap())
        );
    }

    #[test]
    fn interpret_returns_binary_success_bytes_unchanged() {
        let bytes = vec![0x89, b'P', b'N', b'G', 0x00, 0xff];
        let parsed = interpret_response(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: bytes.clone(),
        })
        .unwrap();
        assert_eq!(parsed, ResponseBody::Bytes(bytes));
    }

    #[test]
    fn interpret_rejects_non_json_redirect_body() {
        let err = interpret_response(HttpResponse {
            status: 304,
            headers: Vec::new(),
            body: b"not modified".to_vec(),
        })
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidJson { status: 304, .. }));
    }

    #[test]
    fn typed_operation_rejects_binary_body() {
        let c = client(vec![respond(200, "plain text")]);
        assert!(matches!(c.get_tags(), Err(ApiError::UnexpectedBinary(10))));
    }

    #[test]
    fn shape_mismatch_is_deserialization_error() {
        let c = client(vec![respond(200, r#"{"response":{"unexpected":true}}"#)]);
        assert!(matches!(c.get_current_user(), Err(ApiError::Deserialization(_))));
    }
}
