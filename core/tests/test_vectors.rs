//! Verify request building and response interpretation against the JSON test
//! vectors stored in `test-vectors/`.
//!
//! Each request vector names a tool, its arguments and the request it must
//! produce; each response vector describes a raw response and the outcome the
//! request routine must give. Comparing parsed JSON (not raw strings) avoids
//! false negatives from field-ordering differences.

use std::sync::Mutex;

use linkwarden_core::{
    interpret_response, ErrorKind, HttpMethod, HttpRequest, HttpResponse, LinkwardenClient,
    ResponseBody, ToolRegistry, Transport, TransportError,
};

const BASE_URL: &str = "http://localhost:3000";

/// Records the request and answers with an empty success.
#[derive(Default)]
struct Recorder {
    last: Mutex<Option<HttpRequest>>,
}

impl Transport for Recorder {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        *self.last.lock().unwrap() = Some(request.clone());
        Ok(HttpResponse {
            status: 200,
            headers: Vec::new(),
            body: br#"{"response":[]}"#.to_vec(),
        })
    }
}

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn parse_kind(s: &str) -> ErrorKind {
    match s {
        "Auth" => ErrorKind::Auth,
        "NotFound" => ErrorKind::NotFound,
        "Server" => ErrorKind::Server,
        "Api" => ErrorKind::Api,
        other => panic!("unknown error kind: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[test]
fn request_test_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();
    let registry = ToolRegistry::new();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let operation = case["operation"].as_str().unwrap();
        let expected = &case["expected_request"];

        let client = LinkwardenClient::with_transport(BASE_URL, "vector-token", Recorder::default())
            .unwrap();
        // Only the outgoing request matters here; the canned body need not
        // fit the operation's result type.
        let _ = registry.invoke(&client, operation, case["args"].clone());
        let req = client
            .transport()
            .last
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| panic!("{name}: no request was sent"));

        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(
            req.full_url(),
            format!("{BASE_URL}{}", expected["url"].as_str().unwrap()),
            "{name}: url"
        );
        assert_eq!(req.header("Authorization"), Some("Bearer vector-token"), "{name}: auth");

        match req.body.as_deref() {
            Some(body) => {
                let body: serde_json::Value = serde_json::from_slice(body).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
            }
            None => assert!(expected["body"].is_null(), "{name}: body should be present"),
        }
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let body = case["body"].as_str().unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: body.as_bytes().to_vec(),
        };
        let expected = &case["expected"];
        let result = interpret_response(response);

        if let Some(kind) = expected.get("error") {
            let err = result.unwrap_err();
            assert_eq!(err.kind(), parse_kind(kind.as_str().unwrap()), "{name}: kind");
            if let Some(status) = err.status() {
                assert_eq!(Some(status as u64), case["status"].as_u64(), "{name}: status");
                assert_eq!(err.body(), Some(body), "{name}: body kept verbatim");
            }
        } else if let Some(json) = expected.get("json") {
            assert_eq!(result.unwrap(), ResponseBody::Json(json.clone()), "{name}: json");
        } else {
            let bytes = expected["bytes"].as_str().unwrap().as_bytes().to_vec();
            assert_eq!(result.unwrap(), ResponseBody::Bytes(bytes), "{name}: bytes");
        }
    }
}
