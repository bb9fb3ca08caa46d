//! Generic CRUD over one collection endpoint.
//!
//! # Design
//! A [`Service`] is a client plus a collection path, nothing more. Two
//! services with the same client and path behave identically no matter how
//! they were reached, whether through `posts().entity(1).terms().category()`
//! or `client.service("posts/1/terms/category")`.
//!
//! Expected statuses follow the REST API: 200 for list, get, update and
//! delete (delete returns the removed entity), 201 for create.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::{parse_response, Client};
use crate::context::Context;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::QueryOptions;
use crate::response::ApiResponse;

/// A value a [`Service`] can decode.
///
/// `bind` runs on every decoded value with the client and collection path it
/// came from, so that entities exposing nested services can address them.
pub trait Resource: DeserializeOwned + Send + 'static {
    fn bind(&mut self, _client: &Client, _collection: &str) {}
}

pub struct Service<T> {
    client: Client,
    path: String,
    _resource: PhantomData<fn() -> T>,
}

impl<T> Clone for Service<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            path: self.path.clone(),
            _resource: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Service<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("path", &self.path)
            .field("base_url", &self.client.base_url())
            .finish()
    }
}

/// Equal when both address the same path through the same client.
impl<T> PartialEq for Service<T> {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.client.same_as(&other.client)
    }
}

impl<T> Eq for Service<T> {}

impl<T: Resource> Service<T> {
    pub(crate) fn new(client: Client, path: &str) -> Self {
        Self {
            client,
            path: path.trim_matches('/').to_string(),
            _resource: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Path of one entity in this collection.
    pub fn entity_path(&self, id: impl fmt::Display) -> String {
        format!("{}/{id}", self.path)
    }

    /// A service over a path segment below this collection.
    pub fn nested<U: Resource>(&self, segment: impl fmt::Display) -> Service<U> {
        Service::new(self.client.clone(), &format!("{}/{segment}", self.path))
    }

    /// Fetches one page of the collection.
    pub async fn list(
        &self,
        ctx: &Context,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Vec<T>>, ApiError> {
        let mut response: ApiResponse<Vec<T>> = self
            .call(ctx, HttpMethod::Get, &self.path, &encode(query), None, 200)
            .await?;
        for item in &mut response.value {
            item.bind(&self.client, &self.path);
        }
        Ok(response)
    }

    pub async fn get(
        &self,
        ctx: &Context,
        id: impl fmt::Display,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.one(ctx, HttpMethod::Get, &self.entity_path(id), &encode(query), None, 200)
            .await
    }

    /// Creates an entity from a JSON payload.
    pub async fn create<B>(&self, ctx: &Context, body: &B) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let body = serde_json::to_string(body).map_err(ApiError::Serialization)?;
        self.one(ctx, HttpMethod::Post, &self.path, "", Some(body), 201)
            .await
    }

    /// Creates the entity addressed by `id` with an empty body; this is how
    /// existing resources are associated with a parent.
    pub async fn create_at(
        &self,
        ctx: &Context,
        id: impl fmt::Display,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.one(ctx, HttpMethod::Post, &self.entity_path(id), "", None, 201)
            .await
    }

    pub async fn update<B>(
        &self,
        ctx: &Context,
        id: impl fmt::Display,
        body: &B,
    ) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let body = serde_json::to_string(body).map_err(ApiError::Serialization)?;
        self.one(ctx, HttpMethod::Put, &self.entity_path(id), "", Some(body), 200)
            .await
    }

    /// Deletes an entity. `options` is appended verbatim as the query string
    /// (e.g. `"force=true"`); nothing is added when it is empty.
    pub async fn delete(
        &self,
        ctx: &Context,
        id: impl fmt::Display,
        options: &str,
    ) -> Result<ApiResponse<T>, ApiError> {
        self.one(ctx, HttpMethod::Delete, &self.entity_path(id), options, None, 200)
            .await
    }

    async fn one(
        &self,
        ctx: &Context,
        method: HttpMethod,
        path: &str,
        query: &str,
        body: Option<String>,
        expected: u16,
    ) -> Result<ApiResponse<T>, ApiError> {
        let mut response: ApiResponse<T> =
            self.call(ctx, method, path, query, body, expected).await?;
        response.value.bind(&self.client, &self.path);
        Ok(response)
    }

    /// Sends one request and decodes the body as `R`.
    pub(crate) async fn call<R: DeserializeOwned>(
        &self,
        ctx: &Context,
        method: HttpMethod,
        path: &str,
        query: &str,
        body: Option<String>,
        expected: u16,
    ) -> Result<ApiResponse<R>, ApiError> {
        let request = self.client.build_request(method, path, query, body);
        let response = self.client.execute(ctx, request).await?;
        parse_response(response, expected)
    }
}

fn encode(query: Option<&QueryOptions>) -> String {
    query.map(QueryOptions::to_query_string).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use tracing_test::traced_test;

    use super::*;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::transport::Transport;
    use crate::types::{Post, Term};

    /// Replies with a canned response and records what was sent.
    struct Canned {
        status: u16,
        body: String,
        sent: Mutex<Vec<HttpRequest>>,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.sent.lock().unwrap().push(request);
            Ok(HttpResponse {
                status: self.status,
                headers: vec![("X-WP-Total".to_string(), "1".to_string())],
                body: self.body.clone(),
            })
        }
    }

    /// Never answers.
    struct Hanging;

    #[async_trait]
    impl Transport for Hanging {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse, ApiError> {
            std::future::pending().await
        }
    }

    fn canned(status: u16, body: &str) -> (Arc<Canned>, Service<Term>) {
        let transport = Arc::new(Canned {
            status,
            body: body.to_string(),
            sent: Mutex::new(Vec::new()),
        });
        let client = Client::builder("http://wp.test")
            .transport(transport.clone())
            .build()
            .unwrap();
        (transport, client.service("posts/1/terms/category"))
    }

    fn hanging() -> Service<Term> {
        Client::builder("http://wp.test")
            .transport(Arc::new(Hanging))
            .build()
            .unwrap()
            .service("terms/category")
    }

    #[tokio::test]
    async fn list_decodes_page_and_meta() {
        let (transport, service) = canned(200, r#"[{"id":1,"name":"Uncategorized"}]"#);
        let query = QueryOptions::new().per_page(1);
        let response = service.list(&Context::background(), Some(&query)).await.unwrap();
        assert_eq!(response.value.len(), 1);
        assert_eq!(response.meta.total(), Some(1));

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].method, HttpMethod::Get);
        assert_eq!(sent[0].url, "http://wp.test/posts/1/terms/category?per_page=1");
    }

    #[tokio::test]
    async fn empty_list_is_not_an_error() {
        let (_, service) = canned(200, "[]");
        let response = service.list(&Context::background(), None).await.unwrap();
        assert!(response.value.is_empty());
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn create_at_posts_without_body() {
        let (transport, service) = canned(201, r#"{"id":4,"taxonomy":"category"}"#);
        let response = service.create_at(&Context::background(), 4).await.unwrap();
        assert_eq!(response.value.id, 4);
        assert!(response.meta.is_expected());

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].method, HttpMethod::Post);
        assert_eq!(sent[0].url, "http://wp.test/posts/1/terms/category/4");
        assert!(sent[0].body.is_none());
    }

    #[tokio::test]
    async fn delete_passes_options_verbatim() {
        let (transport, service) = canned(200, r#"{"id":4}"#);
        service
            .delete(&Context::background(), 4, "force=true&reassign=1")
            .await
            .unwrap();
        service.delete(&Context::background(), 4, "").await.unwrap();

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].url, "http://wp.test/posts/1/terms/category/4?force=true&reassign=1");
        assert_eq!(sent[1].url, "http://wp.test/posts/1/terms/category/4");
    }

    #[tokio::test]
    async fn wrong_success_status_is_visible_in_meta() {
        let (_, service) = canned(202, r#"{"id":4}"#);
        let response = service.create_at(&Context::background(), 4).await.unwrap();
        assert_eq!(response.status(), 202);
        assert!(!response.meta.is_expected());
    }

    #[tokio::test]
    async fn not_found_surfaces_status_and_error() {
        let (_, service) = canned(404, r#"{"code":"rest_term_invalid","message":"Term does not exist."}"#);
        let err = service.get(&Context::background(), 99, None).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
        assert_eq!(err.meta().unwrap().status_line(), "404 Not Found");
    }

    #[tokio::test]
    async fn update_sends_json_with_put() {
        let (transport, service) = canned(200, r#"{"id":4,"name":"Renamed"}"#);
        let body = serde_json::json!({"name": "Renamed"});
        let response = service.update(&Context::background(), 4, &body).await.unwrap();
        assert_eq!(response.value.name, "Renamed");

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent[0].method, HttpMethod::Put);
        assert_eq!(sent[0].header("content-type"), Some("application/json"));
        assert_eq!(sent[0].body.as_deref(), Some(r#"{"name":"Renamed"}"#));
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_call() {
        let service = hanging();
        let (ctx, handle) = Context::background().with_cancel();
        let call = tokio::spawn(async move { service.get(&ctx, 1, None).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let err = call.await.unwrap().unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
    }

    #[tokio::test]
    async fn deadline_aborts_in_flight_call() {
        let ctx = Context::background().with_timeout(Duration::from_millis(20));
        let err = hanging().list(&ctx, None).await.unwrap_err();
        assert!(matches!(err, ApiError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn ended_context_sends_nothing() {
        let (transport, service) = canned(200, "[]");
        let (ctx, handle) = Context::background().with_cancel();
        handle.cancel();
        let err = service.list(&ctx, None).await.unwrap_err();
        assert!(matches!(err, ApiError::Cancelled));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn fetched_post_keeps_its_collection() {
        let (_, service) = canned(200, r#"{"id":7,"type":"page"}"#);
        let pages = service.client().service::<Post>("pages");
        let page = pages.get(&Context::background(), 7, None).await.unwrap().value;

        let terms = page.terms().unwrap();
        assert_eq!(terms.path(), "pages/7/terms");
        assert_eq!(terms.category().path(), "pages/7/terms/category");
    }

    #[test]
    fn services_compare_by_client_and_path() {
        let (_, service) = canned(200, "[]");
        let client = service.client().clone();
        let composed: Service<Term> = client.service::<Term>("posts/1/terms").nested("category");
        assert_eq!(composed, service);
        assert_ne!(client.service::<Term>("posts/1/terms/tag"), service);

        let other = Client::new("http://wp.test").unwrap();
        assert_ne!(other.service::<Term>("posts/1/terms/category"), service);
    }

    #[tokio::test]
    #[traced_test]
    async fn requests_are_traced() {
        let (_, service) = canned(202, r#"{"id":4}"#);
        service.create_at(&Context::background(), 4).await.unwrap();
        assert!(logs_contain("wp_request"));
        assert!(logs_contain("received response"));
        assert!(logs_contain("unexpected success status"));
    }
}
