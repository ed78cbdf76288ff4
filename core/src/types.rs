//! Resource and payload shapes for the Linkwarden v1 API.
//!
//! # Design
//! Resources are owned by the server; the client only transports them, so
//! every optional resource field tolerates both an absent key and `null`, and
//! unknown keys are ignored. Payloads are the opposite: absent optional fields
//! are omitted from the request body instead of being sent as `null`. The one
//! place the server needs an explicit `null` (moving a collection back to the
//! root) is modelled as a nested `Option`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

/// A user-owned named grouping of links, optionally nested under a parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub is_public: bool,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A saved URL with its metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: i64,
    pub url: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_blur: Option<String>,
    pub domain: String,
    pub pinned: bool,
    pub is_public: bool,
    pub owner_id: i64,
    #[serde(default)]
    pub collection_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// A flat label attachable to links.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// An API token as listed by the server. The secret itself is never part of
/// this shape; see [`CreatedToken`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: i64,
    pub name: String,
    pub is_session: bool,
    #[serde(default)]
    pub expires: Option<String>,
    pub created_at: String,
}

/// Response to token creation. `token` is only ever returned here; the
/// remaining fields are filled when the server echoes the stored record.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedToken {
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl fmt::Debug for CreatedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreatedToken")
            .field("token", &"<redacted>")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("expires", &self.expires)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Profile of the authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectionPayload {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// Partial update of a collection. Only present fields are sent.
///
/// `parent_id` is tri-state: `None` leaves the parent alone, `Some(None)`
/// sends `null` and moves the collection to the root, `Some(Some(id))`
/// reparents it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollectionPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "explicit_null"
    )]
    pub parent_id: Option<Option<i64>>,
}

/// Collection a new link is filed under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkCollectionRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Tag reference inside a link payload. Tags are matched by name; `id` is
/// only sent when the caller already knows it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
}

impl TagRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateLinkPayload {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<LinkCollectionRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

/// Target collection of a link update. The server wants the owner alongside
/// the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkCollectionRef {
    pub id: i64,
    pub owner_id: i64,
}

/// Update of an existing link. `id` must match the id in the request path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLinkPayload {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<UpdateLinkCollectionRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned_by: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTagPayload {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateTokenPayload {
    pub name: String,
    /// Lifetime in days. `0` means the token never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u32>,
}

/// Keeps `"parentId": null` distinguishable from a missing key.
fn explicit_null<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Checks a payload before it is serialized and sent.
pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

fn require_name(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidPayload(format!("{field} must not be blank")));
    }
    Ok(())
}

fn require_present_name(field: &str, value: &Option<String>) -> Result<(), ApiError> {
    match value {
        Some(name) => require_name(field, name),
        None => Ok(()),
    }
}

fn require_url(value: &str) -> Result<(), ApiError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.trim().is_empty() => Ok(()),
        _ => Err(ApiError::InvalidPayload(format!(
            "url must start with http:// or https://, got {value:?}"
        ))),
    }
}

impl Validate for CreateCollectionPayload {
    fn validate(&self) -> Result<(), ApiError> {
        require_name("collection name", &self.name)
    }
}

impl Validate for UpdateCollectionPayload {
    fn validate(&self) -> Result<(), ApiError> {
        require_present_name("collection name", &self.name)
    }
}

impl Validate for CreateLinkPayload {
    fn validate(&self) -> Result<(), ApiError> {
        require_url(&self.url)?;
        require_present_name("link name", &self.name)?;
        if let Some(collection) = &self.collection {
            require_present_name("collection name", &collection.name)?;
        }
        for tag in self.tags.iter().flatten() {
            require_name("tag name", &tag.name)?;
        }
        Ok(())
    }
}

impl Validate for UpdateLinkPayload {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(url) = &self.url {
            require_url(url)?;
        }
        require_present_name("link name", &self.name)?;
        for tag in self.tags.iter().flatten() {
            require_name("tag name", &tag.name)?;
        }
        Ok(())
    }
}

impl Validate for CreateTagPayload {
    fn validate(&self) -> Result<(), ApiError> {
        require_name("tag name", &self.name)
    }
}

impl Validate for CreateTokenPayload {
    fn validate(&self) -> Result<(), ApiError> {
        require_name("token name", &self.name)
    }
}

// ---------------------------------------------------------------------------
// Archive formats
// ---------------------------------------------------------------------------

/// Archive representations a link can be fetched in. Sent as integer codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ArchiveFormat {
    Png,
    Jpeg,
    Pdf,
    ReadabilityJson,
    MonolithHtml,
}

impl ArchiveFormat {
    pub fn code(self) -> u8 {
        match self {
            ArchiveFormat::Png => 0,
            ArchiveFormat::Jpeg => 1,
            ArchiveFormat::Pdf => 2,
            ArchiveFormat::ReadabilityJson => 3,
            ArchiveFormat::MonolithHtml => 4,
        }
    }
}

impl From<ArchiveFormat> for u8 {
    fn from(format: ArchiveFormat) -> Self {
        format.code()
    }
}

impl TryFrom<u8> for ArchiveFormat {
    type Error = UnknownFormatCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ArchiveFormat::Png),
            1 => Ok(ArchiveFormat::Jpeg),
            2 => Ok(ArchiveFormat::Pdf),
            3 => Ok(ArchiveFormat::ReadabilityJson),
            4 => Ok(ArchiveFormat::MonolithHtml),
            other => Err(UnknownFormatCode(other)),
        }
    }
}

/// The subset of [`ArchiveFormat`] the server accepts as uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ArchiveUploadFormat {
    Png,
    Jpeg,
    Pdf,
}

impl ArchiveUploadFormat {
    pub fn code(self) -> u8 {
        ArchiveFormat::from(self).code()
    }
}

impl From<ArchiveUploadFormat> for ArchiveFormat {
    fn from(format: ArchiveUploadFormat) -> Self {
        match format {
            ArchiveUploadFormat::Png => ArchiveFormat::Png,
            ArchiveUploadFormat::Jpeg => ArchiveFormat::Jpeg,
            ArchiveUploadFormat::Pdf => ArchiveFormat::Pdf,
        }
    }
}

impl From<ArchiveUploadFormat> for u8 {
    fn from(format: ArchiveUploadFormat) -> Self {
        format.code()
    }
}

impl TryFrom<u8> for ArchiveUploadFormat {
    type Error = UnknownFormatCode;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(ArchiveUploadFormat::Png),
            1 => Ok(ArchiveUploadFormat::Jpeg),
            2 => Ok(ArchiveUploadFormat::Pdf),
            other => Err(UnknownFormatCode(other)),
        }
    }
}

/// An integer that names no archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown archive format code {0}")]
pub struct UnknownFormatCode(pub u8);
