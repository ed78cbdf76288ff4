//! Delete, token and archive operations.
//!
//! Compiled only with the `extended` feature and never registered as tools.
//! They follow the same routing convention as the active operations.

use serde_json::Value;

use crate::client::{decode, endpoint, LinkwardenClient};
use crate::error::ApiError;
use crate::http::{HttpMethod, ResponseBody};
use crate::transport::Transport;
use crate::types::{ArchiveFormat, ArchiveUploadFormat, CreateTokenPayload, CreatedToken, Token, Validate};

impl<T: Transport> LinkwardenClient<T> {
    pub fn delete_collection(&self, collection_id: i64) -> Result<Value, ApiError> {
        decode(self.request(
            HttpMethod::Delete,
            &endpoint(&format!("collections/{collection_id}")),
        )?)
    }

    pub fn delete_link(&self, link_id: i64) -> Result<Value, ApiError> {
        decode(self.request(HttpMethod::Delete, &endpoint(&format!("links/{link_id}")))?)
    }

    pub fn get_tokens(&self) -> Result<Vec<Token>, ApiError> {
        decode(self.request(HttpMethod::Get, &endpoint("tokens"))?)
    }

    /// The returned secret cannot be retrieved again.
    pub fn create_token(&self, payload: &CreateTokenPayload) -> Result<CreatedToken, ApiError> {
        payload.validate()?;
        let request = self.build_json_request(HttpMethod::Post, &endpoint("tokens"), payload)?;
        decode(self.execute(&request)?)
    }

    pub fn revoke_token(&self, token_id: i64) -> Result<Value, ApiError> {
        decode(self.request(HttpMethod::Delete, &endpoint(&format!("tokens/{token_id}")))?)
    }

    /// Raw archive content of a link.
    pub fn get_archive(
        &self,
        link_id: i64,
        format: ArchiveFormat,
        preview: bool,
    ) -> Result<Vec<u8>, ApiError> {
        let request = self
            .build_request(HttpMethod::Get, &endpoint(&format!("archives/{link_id}")))
            .with_query("format", format.code().to_string())
            .with_query("preview", preview.to_string());
        match self.execute(&request)? {
            ResponseBody::Bytes(bytes) => Ok(bytes),
            ResponseBody::Json(value) => serde_json::to_vec(&value).map_err(ApiError::Serialization),
        }
    }

    /// Upload `contents` as the `file` field of a multipart form.
    pub fn upload_archive(
        &self,
        link_id: i64,
        format: ArchiveUploadFormat,
        file_name: &str,
        contents: &[u8],
    ) -> Result<Value, ApiError> {
        let boundary = format!("linkwarden-{}", uuid::Uuid::new_v4().simple());
        let body = multipart_file(&boundary, file_name, contents);
        let request = self
            .build_request(HttpMethod::Post, &endpoint(&format!("archives/{link_id}")))
            .with_query("format", format.code().to_string())
            .with_body(&format!("multipart/form-data; boundary={boundary}"), body);
        decode(self.execute(&request)?)
    }
}

fn multipart_file(boundary: &str, file_name: &str, contents: &[u8]) -> Vec<u8> {
    let file_name = file_name.replace(['"', '\r', '\n'], "_");
    let mut body = Vec::with_capacity(contents.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}
