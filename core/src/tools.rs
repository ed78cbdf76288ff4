//! Client operations exposed as agent tools.
//!
//! # Design
//! The registry is an explicit list: each entry names one client operation,
//! describes it for the model, declares JSON schemas for its arguments and
//! result, and points at a handler that decodes the arguments, calls the
//! client and encodes the result. Argument names follow the operation
//! parameters (`collection_id`, `link_id`, `payload`, `query`).
//!
//! Only the active operation set is registered. The delete, token and archive
//! operations behind the `extended` feature are deliberately absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::client::LinkwardenClient;
use crate::error::{ApiError, ErrorKind};
use crate::transport::{Transport, UreqTransport};
use crate::types::{
    CreateCollectionPayload, CreateLinkPayload, CreateTagPayload, UpdateCollectionPayload,
    UpdateLinkPayload,
};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(#[source] serde_json::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("failed to encode tool result: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ToolError {
    /// Sentence suitable for showing to the person talking to the agent.
    pub fn user_message(&self) -> String {
        match self {
            ToolError::UnknownTool(name) => format!("There is no tool called '{name}'."),
            ToolError::InvalidArguments(err) => {
                format!("The tool arguments were not understood: {err}.")
            }
            ToolError::Encode(_) => "The result could not be encoded.".to_string(),
            ToolError::Api(err) => match (err.kind(), err) {
                (ErrorKind::Validation, _) => format!("The request was not sent: {err}."),
                (ErrorKind::Auth, _) => {
                    "The bookmarking service rejected the access token.".to_string()
                }
                (ErrorKind::NotFound, _) => {
                    "That resource was not found in the bookmarking service.".to_string()
                }
                (ErrorKind::Server, _) => {
                    "The bookmarking service reported an internal error.".to_string()
                }
                (ErrorKind::Api, ApiError::Transport(_)) => {
                    "Cannot reach the bookmarking service.".to_string()
                }
                (ErrorKind::Api, _) => format!("The bookmarking service request failed: {err}"),
            },
        }
    }
}

pub type ToolHandler<T> = fn(&LinkwardenClient<T>, Value) -> Result<Value, ToolError>;

/// One invocable operation.
pub struct Tool<T = UreqTransport> {
    pub name: &'static str,
    pub description: &'static str,
    input_schema: fn() -> Value,
    output_schema: fn() -> Value,
    handler: ToolHandler<T>,
}

impl<T> Tool<T> {
    pub fn input_schema(&self) -> Value {
        (self.input_schema)()
    }

    pub fn output_schema(&self) -> Value {
        (self.output_schema)()
    }

    pub fn definition(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.input_schema(),
            "output_schema": self.output_schema(),
        })
    }
}

#[derive(Deserialize)]
struct CollectionIdArgs {
    collection_id: i64,
}

#[derive(Deserialize)]
struct LinkIdArgs {
    link_id: i64,
}

#[derive(Deserialize)]
struct PayloadArgs<P> {
    payload: P,
}

#[derive(Deserialize)]
struct UpdateCollectionArgs {
    collection_id: i64,
    payload: UpdateCollectionPayload,
}

#[derive(Deserialize)]
struct UpdateLinkArgs {
    link_id: i64,
    payload: UpdateLinkPayload,
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
}

fn args<A: DeserializeOwned>(value: Value) -> Result<A, ToolError> {
    serde_json::from_value(value).map_err(ToolError::InvalidArguments)
}

fn encode<R: Serialize>(result: R) -> Result<Value, ToolError> {
    serde_json::to_value(result).map_err(ToolError::Encode)
}

/// The active tool set, in a fixed order.
pub struct ToolRegistry<T = UreqTransport> {
    tools: Vec<Tool<T>>,
}

impl<T: Transport> Default for ToolRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> ToolRegistry<T> {
    pub fn new() -> Self {
        let tools: Vec<Tool<T>> = vec![
            Tool {
                name: "get_collections",
                description: "Retrieve every collection of the authenticated user.",
                input_schema: no_arguments,
                output_schema: || array_of(collection_schema()),
                handler: |client: &LinkwardenClient<T>, _: Value| encode(client.get_collections()?),
            },
            Tool {
                name: "create_collection",
                description: "Create a new collection, optionally nested under a parent collection.",
                input_schema: || object(json!({"payload": create_collection_schema()}), &["payload"]),
                output_schema: collection_schema,
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let PayloadArgs { payload } = args::<PayloadArgs<CreateCollectionPayload>>(value)?;
                    encode(client.create_collection(&payload)?)
                },
            },
            Tool {
                name: "get_collection_by_id",
                description: "Retrieve a single collection by its ID.",
                input_schema: || object(json!({"collection_id": integer()}), &["collection_id"]),
                output_schema: collection_schema,
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let CollectionIdArgs { collection_id } = args(value)?;
                    encode(client.get_collection_by_id(collection_id)?)
                },
            },
            Tool {
                name: "update_collection",
                description: "Update the name, description, icon, color or parent of a collection. Only the given fields change.",
                input_schema: || {
                    object(
                        json!({
                            "collection_id": integer(),
                            "payload": update_collection_schema(),
                        }),
                        &["collection_id", "payload"],
                    )
                },
                output_schema: collection_schema,
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let UpdateCollectionArgs {
                        collection_id,
                        payload,
                    } = args(value)?;
                    encode(client.update_collection(collection_id, &payload)?)
                },
            },
            Tool {
                name: "get_links",
                description: "Retrieve every saved link of the authenticated user.",
                input_schema: no_arguments,
                output_schema: || array_of(link_schema()),
                handler: |client: &LinkwardenClient<T>, _: Value| encode(client.get_links()?),
            },
            Tool {
                name: "create_link",
                description: "Save a new link, optionally into a collection and with tags.",
                input_schema: || object(json!({"payload": create_link_schema()}), &["payload"]),
                output_schema: link_schema,
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let PayloadArgs { payload } = args::<PayloadArgs<CreateLinkPayload>>(value)?;
                    encode(client.create_link(&payload)?)
                },
            },
            Tool {
                name: "get_link_by_id",
                description: "Retrieve a single link by its ID.",
                input_schema: || object(json!({"link_id": integer()}), &["link_id"]),
                output_schema: link_schema,
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let LinkIdArgs { link_id } = args(value)?;
                    encode(client.get_link_by_id(link_id)?)
                },
            },
            Tool {
                name: "update_link",
                description: "Update an existing link. The payload id must be the link id.",
                input_schema: || {
                    object(
                        json!({
                            "link_id": integer(),
                            "payload": update_link_schema(),
                        }),
                        &["link_id", "payload"],
                    )
                },
                output_schema: link_schema,
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let UpdateLinkArgs { link_id, payload } = args(value)?;
                    encode(client.update_link(link_id, &payload)?)
                },
            },
            Tool {
                name: "get_tags",
                description: "Retrieve every tag of the authenticated user.",
                input_schema: no_arguments,
                output_schema: || array_of(tag_schema()),
                handler: |client: &LinkwardenClient<T>, _: Value| encode(client.get_tags()?),
            },
            Tool {
                name: "create_tag",
                description: "Create a new tag.",
                input_schema: || {
                    object(
                        json!({"payload": object(json!({"name": string()}), &["name"])}),
                        &["payload"],
                    )
                },
                output_schema: tag_schema,
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let PayloadArgs { payload } = args::<PayloadArgs<CreateTagPayload>>(value)?;
                    encode(client.create_tag(&payload)?)
                },
            },
            Tool {
                name: "get_current_user",
                description: "Retrieve the profile of the authenticated user.",
                input_schema: no_arguments,
                output_schema: user_schema,
                handler: |client: &LinkwardenClient<T>, _: Value| encode(client.get_current_user()?),
            },
            Tool {
                name: "search_query",
                description: "Search saved links. The query may use operators such as 'tag:', 'collection:' or 'before:'.",
                input_schema: || object(json!({"query": string()}), &["query"]),
                output_schema: || array_of(link_schema()),
                handler: |client: &LinkwardenClient<T>, value: Value| {
                    let SearchArgs { query } = args(value)?;
                    encode(client.search_query(&query)?)
                },
            },
        ];
        Self { tools }
    }

    pub fn get(&self, name: &str) -> Option<&Tool<T>> {
        self.tools.iter().find(|tool| tool.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tool<T>> {
        self.tools.iter()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|tool| tool.name).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Every tool as `{name, description, input_schema, output_schema}`.
    pub fn definitions(&self) -> Vec<Value> {
        self.tools.iter().map(Tool::definition).collect()
    }

    /// Run the named tool. `Value::Null` is accepted for tools without
    /// arguments.
    pub fn invoke(
        &self,
        client: &LinkwardenClient<T>,
        name: &str,
        arguments: Value,
    ) -> Result<Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        debug!(tool = name, "Invoking tool");
        let result = (tool.handler)(client, arguments);
        if let Err(err) = &result {
            debug!(tool = name, error = %err, "Tool failed");
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

fn object(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

fn no_arguments() -> Value {
    json!({"type": "object", "properties": {}})
}

fn array_of(items: Value) -> Value {
    json!({"type": "array", "items": items})
}

fn integer() -> Value {
    json!({"type": "integer"})
}

fn string() -> Value {
    json!({"type": "string"})
}

fn nullable(kind: &str) -> Value {
    json!({"type": [kind, "null"]})
}

fn tag_ref_schema() -> Value {
    object(json!({"id": integer(), "name": string()}), &["name"])
}

fn create_collection_schema() -> Value {
    object(
        json!({
            "name": string(),
            "description": string(),
            "icon": string(),
            "color": {"type": "string", "description": "Hex color such as #0ea5e9"},
            "parentId": integer(),
        }),
        &["name"],
    )
}

fn update_collection_schema() -> Value {
    object(
        json!({
            "name": string(),
            "description": string(),
            "icon": string(),
            "color": string(),
            "parentId": {"type": ["integer", "null"], "description": "null moves the collection to the top level"},
        }),
        &[],
    )
}

fn create_link_schema() -> Value {
    object(
        json!({
            "url": string(),
            "name": string(),
            "description": string(),
            "collection": object(json!({"id": integer(), "name": string()}), &["id"]),
            "tags": array_of(tag_ref_schema()),
        }),
        &["url"],
    )
}

fn update_link_schema() -> Value {
    object(
        json!({
            "id": integer(),
            "url": string(),
            "name": string(),
            "description": string(),
            "collection": object(json!({"id": integer(), "ownerId": integer()}), &["id", "ownerId"]),
            "tags": array_of(tag_ref_schema()),
            "pinnedBy": array_of(integer()),
        }),
        &["id"],
    )
}

fn collection_schema() -> Value {
    object(
        json!({
            "id": integer(),
            "name": string(),
            "description": nullable("string"),
            "icon": nullable("string"),
            "color": nullable("string"),
            "parentId": nullable("integer"),
            "isPublic": {"type": "boolean"},
            "ownerId": integer(),
            "createdAt": string(),
            "updatedAt": string(),
        }),
        &["id", "name", "isPublic", "ownerId", "createdAt", "updatedAt"],
    )
}

fn tag_schema() -> Value {
    object(
        json!({
            "id": integer(),
            "name": string(),
            "ownerId": integer(),
            "createdAt": string(),
            "updatedAt": string(),
        }),
        &["id", "name", "ownerId", "createdAt", "updatedAt"],
    )
}

fn link_schema() -> Value {
    object(
        json!({
            "id": integer(),
            "url": string(),
            "name": string(),
            "description": nullable("string"),
            "image": nullable("string"),
            "imageBlur": nullable("string"),
            "domain": string(),
            "pinned": {"type": "boolean"},
            "isPublic": {"type": "boolean"},
            "ownerId": integer(),
            "collectionId": nullable("integer"),
            "createdAt": string(),
            "updatedAt": string(),
            "tags": array_of(tag_schema()),
        }),
        &["id", "url", "name", "domain", "pinned", "isPublic", "ownerId", "createdAt", "updatedAt", "tags"],
    )
}

fn user_schema() -> Value {
    object(
        json!({
            "id": integer(),
            "username": string(),
            "email": string(),
            "avatar": nullable("string"),
            "createdAt": string(),
        }),
        &["id", "username", "email", "createdAt"],
    )
}
