use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{NaiveDateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

const DEFAULT_PER_PAGE: usize = 10;
const MAX_PER_PAGE: usize = 100;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rendered {
    pub rendered: String,
    pub raw: String,
}

impl Rendered {
    fn new(text: &str) -> Self {
        Self {
            rendered: text.to_string(),
            raw: text.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub date: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub slug: String,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub link: String,
    pub title: Rendered,
    pub content: Rendered,
    pub excerpt: Rendered,
    pub author: u64,
    pub format: String,
    pub sticky: bool,
    pub categories: Vec<u64>,
    pub tags: Vec<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub count: u64,
    pub description: String,
    pub link: String,
    pub name: String,
    pub slug: String,
    pub taxonomy: String,
    pub parent: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Taxonomy {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub types: Vec<String>,
    pub hierarchical: bool,
    pub rest_base: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub status: Option<String>,
    pub slug: Option<String>,
    pub categories: Option<Vec<u64>>,
    pub tags: Option<Vec<u64>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TermInput {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub parent: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default, deserialize_with = "flag")]
    pub force: bool,
}

/// Query-string boolean: `true`/`1` or `false`/`0`.
fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    match raw.as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => Err(de::Error::invalid_value(de::Unexpected::Str(other), &"true, false, 1 or 0")),
    }
}

/// Error body in the REST API's shape:
/// `{"code": ..., "message": ..., "data": {"status": ...}}`.
#[derive(Debug, thiserror::Error)]
#[error("{code}: {message}")]
pub struct RestError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl RestError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn invalid_post() -> Self {
        Self::new(StatusCode::NOT_FOUND, "rest_post_invalid_id", "Invalid post ID.")
    }

    fn invalid_term() -> Self {
        Self::new(StatusCode::NOT_FOUND, "rest_term_invalid", "Term does not exist.")
    }

    fn invalid_taxonomy() -> Self {
        Self::new(StatusCode::NOT_FOUND, "rest_taxonomy_invalid", "Invalid taxonomy.")
    }

    fn trash_not_supported() -> Self {
        Self::new(
            StatusCode::NOT_IMPLEMENTED,
            "rest_trash_not_supported",
            "Terms do not support trashing. Set 'force=true' to delete.",
        )
    }
}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": self.code,
            "message": self.message,
            "data": { "status": self.status.as_u16() },
        });
        (self.status, Json(body)).into_response()
    }
}

type RestResult<T> = Result<T, RestError>;

/// In-memory site content.
#[derive(Debug)]
pub struct Store {
    posts: BTreeMap<u64, Post>,
    terms: BTreeMap<u64, Term>,
    /// `(post id, term id)` pairs.
    relationships: BTreeSet<(u64, u64)>,
    next_post_id: u64,
    next_term_id: u64,
}

impl Store {
    /// One published post attached to the "Uncategorized" category.
    pub fn seeded() -> Self {
        let mut store = Self {
            posts: BTreeMap::new(),
            terms: BTreeMap::new(),
            relationships: BTreeSet::new(),
            next_post_id: 1,
            next_term_id: 1,
        };
        let category = store.insert_term(
            "category",
            TermInput {
                name: Some("Uncategorized".to_string()),
                ..TermInput::default()
            },
        );
        let post = store.insert_post(PostInput {
            title: Some("Hello world!".to_string()),
            content: Some("Welcome to WordPress.".to_string()),
            status: Some("publish".to_string()),
            ..PostInput::default()
        });
        store.attach(post.id, category.id);
        store
    }

    fn insert_post(&mut self, input: PostInput) -> Post {
        let id = self.next_post_id;
        self.next_post_id += 1;
        let now = Utc::now().naive_utc();
        let title = input.title.unwrap_or_default();
        let slug = input.slug.unwrap_or_else(|| slugify(&title, id));
        let post = Post {
            id,
            date: now,
            modified: now,
            link: format!("http://localhost/?p={id}"),
            slug,
            status: input.status.unwrap_or_else(|| "draft".to_string()),
            kind: "post".to_string(),
            title: Rendered::new(&title),
            content: Rendered::new(&input.content.unwrap_or_default()),
            excerpt: Rendered::new(&input.excerpt.unwrap_or_default()),
            author: 1,
            format: "standard".to_string(),
            sticky: false,
            categories: Vec::new(),
            tags: Vec::new(),
        };
        self.posts.insert(id, post.clone());
        for term_id in input.categories.into_iter().chain(input.tags).flatten() {
            self.attach(id, term_id);
        }
        self.post(id).unwrap_or(post)
    }

    fn insert_term(&mut self, taxonomy: &str, input: TermInput) -> Term {
        let id = self.next_term_id;
        self.next_term_id += 1;
        let name = input.name.unwrap_or_default();
        let term = Term {
            id,
            count: 0,
            description: input.description.unwrap_or_default(),
            link: format!("http://localhost/?{taxonomy}={id}"),
            slug: input.slug.unwrap_or_else(|| slugify(&name, id)),
            name,
            taxonomy: taxonomy.to_string(),
            parent: input.parent.unwrap_or(0),
        };
        self.terms.insert(id, term.clone());
        term
    }

    /// Current view of a post, with its term ids filled in.
    fn post(&self, id: u64) -> Option<Post> {
        let mut post = self.posts.get(&id)?.clone();
        let attached = self.attached_terms(id);
        post.categories = ids_in(&attached, "category");
        post.tags = ids_in(&attached, "post_tag");
        Some(post)
    }

    /// Current view of a term, with its usage count filled in.
    fn term(&self, id: u64) -> Option<Term> {
        let mut term = self.terms.get(&id)?.clone();
        term.count = self.relationships.iter().filter(|(_, t)| *t == id).count() as u64;
        Some(term)
    }

    fn attached_terms(&self, post_id: u64) -> Vec<Term> {
        self.relationships
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, t)| self.term(*t))
            .collect()
    }

    fn attach(&mut self, post_id: u64, term_id: u64) -> bool {
        if !self.terms.contains_key(&term_id) {
            return false;
        }
        self.relationships.insert((post_id, term_id));
        true
    }
}

fn slugify(text: &str, id: u64) -> String {
    let slug: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        id.to_string()
    } else {
        slug
    }
}

fn ids_in(terms: &[Term], taxonomy: &str) -> Vec<u64> {
    terms
        .iter()
        .filter(|term| term.taxonomy == taxonomy)
        .map(|term| term.id)
        .collect()
}

/// Maps a route token (`category`, `tag`) to its taxonomy slug.
fn taxonomy_slug(token: &str) -> RestResult<&'static str> {
    match token {
        "category" => Ok("category"),
        "tag" => Ok("post_tag"),
        _ => Err(RestError::invalid_taxonomy()),
    }
}

fn taxonomies() -> BTreeMap<String, Taxonomy> {
    let category = Taxonomy {
        name: "Categories".to_string(),
        slug: "category".to_string(),
        description: String::new(),
        types: vec!["post".to_string()],
        hierarchical: true,
        rest_base: "categories".to_string(),
    };
    let tag = Taxonomy {
        name: "Tags".to_string(),
        slug: "post_tag".to_string(),
        description: String::new(),
        types: vec!["post".to_string()],
        hierarchical: false,
        rest_base: "tags".to_string(),
    };
    BTreeMap::from([(category.slug.clone(), category), (tag.slug.clone(), tag)])
}

/// Slices one page out of `items` and reports the totals in headers.
fn paginate<T: Serialize>(items: Vec<T>, params: &ListParams) -> RestResult<(HeaderMap, Json<Vec<T>>)> {
    let per_page = params.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if per_page == 0 || per_page > MAX_PER_PAGE {
        return Err(RestError::new(
            StatusCode::BAD_REQUEST,
            "rest_invalid_param",
            format!("Invalid parameter(s): per_page must be between 1 ({MAX_PER_PAGE} max)"),
        ));
    }
    let page = params.page.unwrap_or(1).max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page);
    if page > 1 && page > total_pages {
        return Err(RestError::new(
            StatusCode::BAD_REQUEST,
            "rest_post_invalid_page_number",
            "The page number requested is larger than the number of pages available.",
        ));
    }

    let mut headers = HeaderMap::new();
    headers.insert("x-wp-total", HeaderValue::from(total));
    headers.insert("x-wp-totalpages", HeaderValue::from(total_pages));
    let page_items = items.into_iter().skip((page - 1) * per_page).take(per_page).collect();
    Ok((headers, Json(page_items)))
}

fn matches_search(text: &str, search: Option<&str>) -> bool {
    match search {
        Some(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Store::seeded())
}

pub fn app_with(store: Store) -> Router {
    let db: Db = Arc::new(RwLock::new(store));
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).post(update_post).put(update_post).delete(delete_post),
        )
        .route("/posts/{id}/terms", get(list_post_terms))
        .route("/posts/{id}/terms/{taxonomy}", get(list_post_taxonomy_terms))
        .route(
            "/posts/{id}/terms/{taxonomy}/{term_id}",
            get(get_post_term).post(attach_post_term).delete(detach_post_term),
        )
        .route("/terms/{taxonomy}", get(list_terms).post(create_term))
        .route(
            "/terms/{taxonomy}/{id}",
            get(get_term).post(update_term).put(update_term).delete(delete_term),
        )
        .route("/taxonomies", get(list_taxonomies))
        .route("/taxonomies/{slug}", get(get_taxonomy))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- posts ---

async fn list_posts(
    State(db): State<Db>,
    Query(params): Query<ListParams>,
) -> RestResult<(HeaderMap, Json<Vec<Post>>)> {
    let store = db.read().await;
    let posts = store
        .posts
        .keys()
        .filter_map(|id| store.post(*id))
        .filter(|post| post.status != "trash")
        .filter(|post| matches_search(&post.title.raw, params.search.as_deref()))
        .collect();
    paginate(posts, &params)
}

async fn create_post(State(db): State<Db>, Json(input): Json<PostInput>) -> (StatusCode, Json<Post>) {
    let post = db.write().await.insert_post(input);
    tracing::debug!(id = post.id, "created post");
    (StatusCode::CREATED, Json(post))
}

async fn get_post(State(db): State<Db>, Path(id): Path<u64>) -> RestResult<Json<Post>> {
    db.read().await.post(id).map(Json).ok_or_else(RestError::invalid_post)
}

async fn update_post(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<PostInput>,
) -> RestResult<Json<Post>> {
    let mut store = db.write().await;
    let post = store.posts.get_mut(&id).ok_or_else(RestError::invalid_post)?;
    if let Some(title) = input.title {
        post.title = Rendered::new(&title);
    }
    if let Some(content) = input.content {
        post.content = Rendered::new(&content);
    }
    if let Some(excerpt) = input.excerpt {
        post.excerpt = Rendered::new(&excerpt);
    }
    if let Some(status) = input.status {
        post.status = status;
    }
    if let Some(slug) = input.slug {
        post.slug = slug;
    }
    post.modified = Utc::now().naive_utc();

    if input.categories.is_some() || input.tags.is_some() {
        let replaced: Vec<u64> = input.categories.iter().chain(input.tags.iter()).flatten().copied().collect();
        let replaced_taxonomies: Vec<&str> = [
            input.categories.as_ref().map(|_| "category"),
            input.tags.as_ref().map(|_| "post_tag"),
        ]
        .into_iter()
        .flatten()
        .collect();
        let terms = store.terms.clone();
        store.relationships.retain(|(p, t)| {
            *p != id
                || !terms
                    .get(t)
                    .is_some_and(|term| replaced_taxonomies.contains(&term.taxonomy.as_str()))
        });
        for term_id in replaced {
            store.attach(id, term_id);
        }
    }
    store.post(id).map(Json).ok_or_else(RestError::invalid_post)
}

/// Without `force` the post is trashed; trashing twice is an error.
async fn delete_post(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(params): Query<DeleteParams>,
) -> RestResult<Json<Post>> {
    let mut store = db.write().await;
    let mut post = store.post(id).ok_or_else(RestError::invalid_post)?;
    if params.force {
        store.posts.remove(&id);
        store.relationships.retain(|(p, _)| *p != id);
        return Ok(Json(post));
    }
    if post.status == "trash" {
        return Err(RestError::new(
            StatusCode::GONE,
            "rest_already_trashed",
            "The post has already been deleted.",
        ));
    }
    post.status = "trash".to_string();
    if let Some(stored) = store.posts.get_mut(&id) {
        stored.status = post.status.clone();
    }
    Ok(Json(post))
}

// --- terms attached to a post ---

async fn list_post_terms(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Query(params): Query<ListParams>,
) -> RestResult<(HeaderMap, Json<Vec<Term>>)> {
    let store = db.read().await;
    if !store.posts.contains_key(&id) {
        return Err(RestError::invalid_post());
    }
    paginate(store.attached_terms(id), &params)
}

async fn list_post_taxonomy_terms(
    State(db): State<Db>,
    Path((id, taxonomy)): Path<(u64, String)>,
    Query(params): Query<ListParams>,
) -> RestResult<(HeaderMap, Json<Vec<Term>>)> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    let store = db.read().await;
    if !store.posts.contains_key(&id) {
        return Err(RestError::invalid_post());
    }
    let terms = store
        .attached_terms(id)
        .into_iter()
        .filter(|term| term.taxonomy == taxonomy)
        .collect();
    paginate(terms, &params)
}

async fn get_post_term(
    State(db): State<Db>,
    Path((id, taxonomy, term_id)): Path<(u64, String, u64)>,
) -> RestResult<Json<Term>> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    let store = db.read().await;
    if !store.posts.contains_key(&id) {
        return Err(RestError::invalid_post());
    }
    store
        .relationships
        .contains(&(id, term_id))
        .then(|| store.term(term_id))
        .flatten()
        .filter(|term| term.taxonomy == taxonomy)
        .map(Json)
        .ok_or_else(RestError::invalid_term)
}

async fn attach_post_term(
    State(db): State<Db>,
    Path((id, taxonomy, term_id)): Path<(u64, String, u64)>,
) -> RestResult<(StatusCode, Json<Term>)> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    let mut store = db.write().await;
    if !store.posts.contains_key(&id) {
        return Err(RestError::invalid_post());
    }
    match store.term(term_id) {
        Some(term) if term.taxonomy == taxonomy => {}
        _ => return Err(RestError::invalid_term()),
    }
    store.attach(id, term_id);
    let term = store.term(term_id).ok_or_else(RestError::invalid_term)?;
    tracing::debug!(post = id, term = term_id, "attached term");
    Ok((StatusCode::CREATED, Json(term)))
}

async fn detach_post_term(
    State(db): State<Db>,
    Path((id, taxonomy, term_id)): Path<(u64, String, u64)>,
    Query(params): Query<DeleteParams>,
) -> RestResult<Json<Term>> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    if !params.force {
        return Err(RestError::trash_not_supported());
    }
    let mut store = db.write().await;
    if !store.posts.contains_key(&id) {
        return Err(RestError::invalid_post());
    }
    let term = store
        .term(term_id)
        .filter(|term| term.taxonomy == taxonomy)
        .ok_or_else(RestError::invalid_term)?;
    if !store.relationships.remove(&(id, term_id)) {
        return Err(RestError::invalid_term());
    }
    tracing::debug!(post = id, term = term_id, "detached term");
    Ok(Json(term))
}

// --- terms ---

async fn list_terms(
    State(db): State<Db>,
    Path(taxonomy): Path<String>,
    Query(params): Query<ListParams>,
) -> RestResult<(HeaderMap, Json<Vec<Term>>)> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    let store = db.read().await;
    let terms = store
        .terms
        .keys()
        .filter_map(|id| store.term(*id))
        .filter(|term| term.taxonomy == taxonomy)
        .filter(|term| matches_search(&term.name, params.search.as_deref()))
        .collect();
    paginate(terms, &params)
}

async fn create_term(
    State(db): State<Db>,
    Path(taxonomy): Path<String>,
    Json(input): Json<TermInput>,
) -> RestResult<(StatusCode, Json<Term>)> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    if input.name.as_deref().map_or(true, |name| name.trim().is_empty()) {
        return Err(RestError::new(
            StatusCode::BAD_REQUEST,
            "rest_missing_callback_param",
            "Missing parameter(s): name",
        ));
    }
    let mut store = db.write().await;
    if store.terms.values().any(|term| {
        term.taxonomy == taxonomy && Some(term.name.as_str()) == input.name.as_deref()
    }) {
        return Err(RestError::new(
            StatusCode::BAD_REQUEST,
            "term_exists",
            "A term with the name provided already exists with this parent.",
        ));
    }
    let term = store.insert_term(taxonomy, input);
    Ok((StatusCode::CREATED, Json(term)))
}

async fn get_term(
    State(db): State<Db>,
    Path((taxonomy, id)): Path<(String, u64)>,
) -> RestResult<Json<Term>> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    db.read()
        .await
        .term(id)
        .filter(|term| term.taxonomy == taxonomy)
        .map(Json)
        .ok_or_else(RestError::invalid_term)
}

async fn update_term(
    State(db): State<Db>,
    Path((taxonomy, id)): Path<(String, u64)>,
    Json(input): Json<TermInput>,
) -> RestResult<Json<Term>> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    let mut store = db.write().await;
    let term = store
        .terms
        .get_mut(&id)
        .filter(|term| term.taxonomy == taxonomy)
        .ok_or_else(RestError::invalid_term)?;
    if let Some(name) = input.name {
        term.name = name;
    }
    if let Some(slug) = input.slug {
        term.slug = slug;
    }
    if let Some(description) = input.description {
        term.description = description;
    }
    if let Some(parent) = input.parent {
        term.parent = parent;
    }
    store.term(id).map(Json).ok_or_else(RestError::invalid_term)
}

/// Terms cannot be trashed; only a forced delete is accepted.
async fn delete_term(
    State(db): State<Db>,
    Path((taxonomy, id)): Path<(String, u64)>,
    Query(params): Query<DeleteParams>,
) -> RestResult<Json<Term>> {
    let taxonomy = taxonomy_slug(&taxonomy)?;
    if !params.force {
        return Err(RestError::trash_not_supported());
    }
    let mut store = db.write().await;
    let term = store
        .term(id)
        .filter(|term| term.taxonomy == taxonomy)
        .ok_or_else(RestError::invalid_term)?;
    store.terms.remove(&id);
    store.relationships.retain(|(_, t)| *t != id);
    Ok(Json(term))
}

// --- taxonomies ---

async fn list_taxonomies() -> Json<BTreeMap<String, Taxonomy>> {
    Json(taxonomies())
}

async fn get_taxonomy(Path(slug): Path<String>) -> RestResult<Json<Taxonomy>> {
    taxonomies()
        .remove(&slug)
        .map(Json)
        .ok_or_else(RestError::invalid_taxonomy)
}
