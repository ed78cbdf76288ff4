use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const TIMESTAMP: &str = "2024-01-01T00:00:00.000Z";
pub const OWNER_ID: i64 = 1;
/// Request body cap; archive uploads are larger than axum's 2 MB default.
pub const UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<i64>,
    pub is_public: bool,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub image_blur: Option<String>,
    pub domain: String,
    pub pinned: bool,
    pub is_public: bool,
    pub owner_id: i64,
    pub collection_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<Tag>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: i64,
    pub name: String,
    pub is_session: bool,
    pub expires: Option<String>,
    pub created_at: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollection {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCollection {
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub parent_id: Option<Option<i64>>,
}

#[derive(Deserialize)]
pub struct TagInput {
    pub name: String,
}

#[derive(Deserialize)]
pub struct CollectionInput {
    pub id: i64,
}

#[derive(Deserialize)]
pub struct CreateLink {
    pub url: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub collection: Option<CollectionInput>,
    #[serde(default)]
    pub tags: Vec<TagInput>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLink {
    pub id: i64,
    pub url: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub collection: Option<CollectionInput>,
    pub tags: Option<Vec<TagInput>>,
    pub pinned_by: Option<Vec<i64>>,
}

#[derive(Deserialize)]
pub struct CreateToken {
    pub name: String,
    pub expires: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub search_query_string: String,
}

#[derive(Deserialize)]
pub struct ArchiveParams {
    pub format: u8,
    #[serde(default)]
    pub preview: Option<bool>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Option<i64>>, D::Error> {
    Option::<i64>::deserialize(deserializer).map(Some)
}

#[derive(Default)]
pub struct Store {
    next_id: i64,
    collections: BTreeMap<i64, Collection>,
    links: BTreeMap<i64, Link>,
    tags: BTreeMap<i64, Tag>,
    tokens: BTreeMap<i64, Token>,
    archives: HashMap<(i64, u8), Vec<u8>>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Existing tag with this name, or a freshly created one.
    fn tag_named(&mut self, name: &str) -> Tag {
        if let Some(tag) = self.tags.values().find(|tag| tag.name == name) {
            return tag.clone();
        }
        let tag = Tag {
            id: self.next_id(),
            name: name.to_string(),
            owner_id: OWNER_ID,
            created_at: TIMESTAMP.to_string(),
            updated_at: TIMESTAMP.to_string(),
        };
        self.tags.insert(tag.id, tag.clone());
        tag
    }
}

#[derive(Clone)]
pub struct AppState {
    token: Arc<str>,
    store: Arc<RwLock<Store>>,
}

pub fn app(token: &str) -> Router {
    let state = AppState {
        token: Arc::from(token),
        store: Arc::new(RwLock::new(Store::default())),
    };
    Router::new()
        .route("/api/v1/collections", get(list_collections).post(create_collection))
        .route(
            "/api/v1/collections/{id}",
            get(get_collection).put(update_collection).delete(delete_collection),
        )
        .route("/api/v1/links", get(list_links).post(create_link))
        .route("/api/v1/links/{id}", get(get_link).put(update_link).delete(delete_link))
        .route("/api/v1/tags", get(list_tags).post(create_tag))
        .route("/api/v1/users/me", get(current_user))
        .route("/api/v1/search", get(search))
        .route("/api/v1/tokens", get(list_tokens).post(create_token))
        .route("/api/v1/tokens/{id}", axum::routing::delete(revoke_token))
        .route("/api/v1/archives/{id}", get(get_archive).post(upload_archive))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .with_state(state)
}

pub async fn run(listener: TcpListener, token: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app(token)).await
}

async fn require_bearer(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == &*state.token);
    if !authorized {
        return message(StatusCode::UNAUTHORIZED, "You must be logged in.");
    }
    next.run(request).await
}

fn respond<T: Serialize>(status: StatusCode, value: T) -> Response {
    (status, Json(json!({ "response": value }))).into_response()
}

fn message(status: StatusCode, text: &str) -> Response {
    respond(status, text)
}

// --- collections ---

async fn list_collections(State(state): State<AppState>) -> Response {
    let store = state.store.read().await;
    respond(StatusCode::OK, store.collections.values().collect::<Vec<_>>())
}

async fn create_collection(
    State(state): State<AppState>,
    Json(input): Json<CreateCollection>,
) -> Response {
    let mut store = state.store.write().await;
    if let Some(parent) = input.parent_id {
        if !store.collections.contains_key(&parent) {
            return message(StatusCode::NOT_FOUND, "Parent collection not found.");
        }
    }
    let collection = Collection {
        id: store.next_id(),
        name: input.name,
        description: input.description,
        icon: input.icon,
        color: input.color,
        parent_id: input.parent_id,
        is_public: false,
        owner_id: OWNER_ID,
        created_at: TIMESTAMP.to_string(),
        updated_at: TIMESTAMP.to_string(),
    };
    store.collections.insert(collection.id, collection.clone());
    respond(StatusCode::OK, collection)
}

async fn get_collection(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let store = state.store.read().await;
    match store.collections.get(&id) {
        Some(collection) => respond(StatusCode::OK, collection),
        None => message(StatusCode::NOT_FOUND, "Collection not found."),
    }
}

async fn update_collection(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateCollection>,
) -> Response {
    let mut store = state.store.write().await;
    if let Some(Some(parent)) = input.parent_id {
        if parent == id || !store.collections.contains_key(&parent) {
            return message(StatusCode::BAD_REQUEST, "Invalid parent collection.");
        }
    }
    let Some(collection) = store.collections.get_mut(&id) else {
        return message(StatusCode::NOT_FOUND, "Collection not found.");
    };
    if let Some(name) = input.name {
        collection.name = name;
    }
    if input.description.is_some() {
        collection.description = input.description;
    }
    if input.icon.is_some() {
        collection.icon = input.icon;
    }
    if input.color.is_some() {
        collection.color = input.color;
    }
    if let Some(parent_id) = input.parent_id {
        collection.parent_id = parent_id;
    }
    respond(StatusCode::OK, collection.clone())
}

async fn delete_collection(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = state.store.write().await;
    match store.collections.remove(&id) {
        Some(collection) => {
            store.links.retain(|_, link| link.collection_id != Some(id));
            respond(StatusCode::OK, collection)
        }
        None => message(StatusCode::NOT_FOUND, "Collection not found."),
    }
}

// --- links ---

fn domain_of(url: &str) -> String {
    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    rest.split(['/', '?', '#']).next().unwrap_or_default().to_string()
}

async fn list_links(State(state): State<AppState>) -> Response {
    let store = state.store.read().await;
    respond(StatusCode::OK, store.links.values().collect::<Vec<_>>())
}

async fn create_link(State(state): State<AppState>, Json(input): Json<CreateLink>) -> Response {
    let mut store = state.store.write().await;
    let collection_id = match input.collection {
        Some(CollectionInput { id }) if !store.collections.contains_key(&id) => {
            return message(StatusCode::NOT_FOUND, "Collection not found.");
        }
        Some(CollectionInput { id }) => Some(id),
        None => None,
    };
    let tags = input
        .tags
        .iter()
        .map(|tag| store.tag_named(&tag.name))
        .collect();
    let domain = domain_of(&input.url);
    let link = Link {
        id: store.next_id(),
        name: input.name.unwrap_or_else(|| domain.clone()),
        url: input.url,
        description: input.description,
        image: None,
        image_blur: None,
        domain,
        pinned: false,
        is_public: false,
        owner_id: OWNER_ID,
        collection_id,
        created_at: TIMESTAMP.to_string(),
        updated_at: TIMESTAMP.to_string(),
        tags,
    };
    store.links.insert(link.id, link.clone());
    respond(StatusCode::OK, link)
}

async fn get_link(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let store = state.store.read().await;
    match store.links.get(&id) {
        Some(link) => respond(StatusCode::OK, link),
        None => message(StatusCode::NOT_FOUND, "Link not found."),
    }
}

async fn update_link(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateLink>,
) -> Response {
    if input.id != id {
        return message(StatusCode::BAD_REQUEST, "Link id mismatch.");
    }
    let mut store = state.store.write().await;
    if !store.links.contains_key(&id) {
        return message(StatusCode::NOT_FOUND, "Link not found.");
    }
    if let Some(CollectionInput { id: collection_id }) = &input.collection {
        if !store.collections.contains_key(collection_id) {
            return message(StatusCode::NOT_FOUND, "Collection not found.");
        }
    }
    let tags = input.tags.map(|tags| {
        tags.iter()
            .map(|tag| store.tag_named(&tag.name))
            .collect::<Vec<_>>()
    });
    let Some(link) = store.links.get_mut(&id) else {
        return message(StatusCode::NOT_FOUND, "Link not found.");
    };
    if let Some(url) = input.url {
        link.domain = domain_of(&url);
        link.url = url;
    }
    if let Some(name) = input.name {
        link.name = name;
    }
    if input.description.is_some() {
        link.description = input.description;
    }
    if let Some(collection) = input.collection {
        link.collection_id = Some(collection.id);
    }
    if let Some(tags) = tags {
        link.tags = tags;
    }
    if let Some(pinned_by) = input.pinned_by {
        link.pinned = !pinned_by.is_empty();
    }
    respond(StatusCode::OK, link.clone())
}

async fn delete_link(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = state.store.write().await;
    match store.links.remove(&id) {
        Some(link) => respond(StatusCode::OK, link),
        None => message(StatusCode::NOT_FOUND, "Link not found."),
    }
}

// --- tags, user, search ---

async fn list_tags(State(state): State<AppState>) -> Response {
    let store = state.store.read().await;
    respond(StatusCode::OK, store.tags.values().collect::<Vec<_>>())
}

async fn create_tag(State(state): State<AppState>, Json(input): Json<TagInput>) -> Response {
    let mut store = state.store.write().await;
    if store.tags.values().any(|tag| tag.name == input.name) {
        return message(StatusCode::CONFLICT, "Tag already exists.");
    }
    let tag = store.tag_named(&input.name);
    respond(StatusCode::OK, tag)
}

async fn current_user() -> Response {
    respond(
        StatusCode::OK,
        json!({
            "id": OWNER_ID,
            "username": "amx",
            "email": "amx@example.com",
            "avatar": null,
            "createdAt": TIMESTAMP,
        }),
    )
}

/// Whitespace-separated terms; `tag:<name>` and `collection:<id>` filter,
/// anything else must appear in the name, url or description.
fn matches_query(link: &Link, query: &str) -> bool {
    query.split_whitespace().all(|term| {
        if let Some(tag) = term.strip_prefix("tag:") {
            link.tags.iter().any(|t| t.name.eq_ignore_ascii_case(tag))
        } else if let Some(collection) = term.strip_prefix("collection:") {
            collection.parse::<i64>().ok() == link.collection_id
        } else {
            let term = term.to_lowercase();
            link.name.to_lowercase().contains(&term)
                || link.url.to_lowercase().contains(&term)
                || link
                    .description
                    .as_deref()
                    .is_some_and(|d| d.to_lowercase().contains(&term))
        }
    })
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let store = state.store.read().await;
    let found: Vec<&Link> = store
        .links
        .values()
        .filter(|link| matches_query(link, &params.search_query_string))
        .collect();
    respond(StatusCode::OK, found)
}

// --- tokens ---

async fn list_tokens(State(state): State<AppState>) -> Response {
    let store = state.store.read().await;
    respond(StatusCode::OK, store.tokens.values().collect::<Vec<_>>())
}

async fn create_token(State(state): State<AppState>, Json(input): Json<CreateToken>) -> Response {
    let mut store = state.store.write().await;
    let token = Token {
        id: store.next_id(),
        name: input.name,
        is_session: false,
        expires: input
            .expires
            .filter(|days| *days > 0)
            .map(|days| format!("+{days}d")),
        created_at: TIMESTAMP.to_string(),
    };
    let created = json!({
        "token": Uuid::new_v4().simple().to_string(),
        "id": token.id,
        "name": token.name,
        "expires": token.expires,
        "createdAt": token.created_at,
    });
    store.tokens.insert(token.id, token);
    respond(StatusCode::OK, created)
}

async fn revoke_token(State(state): State<AppState>, Path(id): Path<i64>) -> Response {
    let mut store = state.store.write().await;
    match store.tokens.remove(&id) {
        Some(token) => respond(StatusCode::OK, token),
        None => message(StatusCode::NOT_FOUND, "Token not found."),
    }
}

// --- archives ---

async fn get_archive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ArchiveParams>,
) -> Response {
    let store = state.store.read().await;
    match store.archives.get(&(id, params.format)) {
        Some(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/octet-stream")],
            bytes.clone(),
        )
            .into_response(),
        None => message(StatusCode::NOT_FOUND, "Archive not found."),
    }
}

async fn upload_archive(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(params): Query<ArchiveParams>,
    mut multipart: Multipart,
) -> Response {
    if params.format > 2 {
        return message(StatusCode::BAD_REQUEST, "Invalid format.");
    }
    let mut file = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return message(StatusCode::BAD_REQUEST, &format!("Multipart error: {err}")),
        };
        if field.name() != Some("file") {
            continue;
        }
        match field.bytes().await {
            Ok(data) => file = Some(data.to_vec()),
            Err(err) => return message(StatusCode::BAD_REQUEST, &format!("Failed to read file: {err}")),
        }
        break;
    }
    let Some(file) = file else {
        return message(StatusCode::BAD_REQUEST, "Missing file field.");
    };
    let mut store = state.store.write().await;
    if !store.links.contains_key(&id) {
        return message(StatusCode::NOT_FOUND, "Link not found.");
    }
    store.archives.insert((id, params.format), file);
    message(StatusCode::OK, "Success")
}
