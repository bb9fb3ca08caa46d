//! Verify request shapes against JSON test vectors in `test-vectors/`.
//!
//! Each vector names a client call, the request it must produce, and a
//! simulated response the call must accept. A recording transport stands in
//! for the network. Bodies are compared as parsed JSON so field order does
//! not matter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use wordpress_core::{
    ApiError, ApiResponse, Client, Context, HttpMethod, HttpRequest, HttpResponse, PostInput,
    QueryOptions, TermInput, Transport,
};

const BASE_URL: &str = "http://wp.test/wp-json/wp/v2";

#[derive(Default)]
struct Recording {
    reply: Mutex<Option<HttpResponse>>,
    sent: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl Transport for Recording {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        self.sent.lock().unwrap().push(request);
        self.reply
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| ApiError::Config("no simulated response queued".to_string()))
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

fn query(call: &Value) -> Option<QueryOptions> {
    let query = call.get("query")?;
    let mut options = QueryOptions::new();
    if let Some(page) = query["page"].as_u64() {
        options = options.page(page as u32);
    }
    if let Some(per_page) = query["per_page"].as_u64() {
        options = options.per_page(per_page as u32);
    }
    if let Some(search) = query["search"].as_str() {
        options = options.search(search);
    }
    Some(options)
}

fn status<T>(result: Result<ApiResponse<T>, ApiError>) -> (u16, bool) {
    let response = result.unwrap();
    (response.status(), response.meta.is_expected())
}

/// Runs the call a vector describes and returns the response status and
/// whether it was the expected one.
async fn dispatch(client: &Client, call: &Value) -> (u16, bool) {
    let ctx = Context::background();
    let query = query(call);
    let query = query.as_ref();
    let id = call["id"].as_u64().unwrap_or_default();
    let post = call["post"].as_u64().unwrap_or_default();
    let options = call["options"].as_str().unwrap_or_default();

    match call["op"].as_str().unwrap() {
        "posts.list" => status(client.posts().list(&ctx, query).await),
        "posts.get" => status(client.posts().get(&ctx, id, query).await),
        "posts.create" => {
            let input: PostInput = serde_json::from_value(call["body"].clone()).unwrap();
            status(client.posts().create(&ctx, &input).await)
        }
        "posts.update" => {
            let input: PostInput = serde_json::from_value(call["body"].clone()).unwrap();
            status(client.posts().update(&ctx, id, &input).await)
        }
        "posts.delete" => status(client.posts().delete(&ctx, id, options).await),
        "post_terms.list" => status(client.posts().entity(post).terms().list(&ctx, query).await),
        "post_terms.category.list" => {
            let categories = client.posts().entity(post).terms().category();
            status(categories.list(&ctx, query).await)
        }
        "post_terms.category.get" => {
            let categories = client.posts().entity(post).terms().category();
            status(categories.get(&ctx, id, query).await)
        }
        "post_terms.category.create" => {
            let categories = client.posts().entity(post).terms().category();
            status(categories.create(&ctx, id).await)
        }
        "post_terms.category.delete" => {
            let categories = client.posts().entity(post).terms().category();
            status(categories.delete(&ctx, id, options).await)
        }
        "post_terms.tag.create" => {
            let tags = client.posts().entity(post).terms().tag();
            status(tags.create(&ctx, id).await)
        }
        "terms.category.create" => {
            let input: TermInput = serde_json::from_value(call["body"].clone()).unwrap();
            status(client.terms().category().create(&ctx, &input).await)
        }
        "terms.tag.delete" => status(client.terms().tag().delete(&ctx, id, options).await),
        "taxonomies.list" => status(client.taxonomies().list(&ctx, query).await),
        "taxonomies.get" => {
            let slug = call["slug"].as_str().unwrap();
            status(client.taxonomies().get(&ctx, slug, query).await)
        }
        other => panic!("unknown op: {other}"),
    }
}

#[tokio::test]
async fn request_vectors() {
    let raw = include_str!("../../test-vectors/requests.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let transport = Arc::new(Recording::default());
    let client = Client::builder(BASE_URL)
        .transport(transport.clone())
        .build()
        .unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["simulated_response"];
        *transport.reply.lock().unwrap() = Some(HttpResponse {
            status: sim["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: sim["body"].as_str().unwrap().to_string(),
        });

        let (status, expected) = dispatch(&client, &case["call"]).await;
        assert_eq!(status, sim["status"].as_u64().unwrap() as u16, "{name}: status");
        assert!(expected, "{name}: status should be the expected one");

        let req = transport.sent.lock().unwrap().pop().unwrap();
        let expected_req = &case["expected_request"];
        assert_eq!(req.method, parse_method(expected_req["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, format!("{BASE_URL}{}", expected_req["path"].as_str().unwrap()), "{name}: path");

        match expected_req.get("body") {
            Some(expected_body) => {
                let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
                assert_eq!(&body, expected_body, "{name}: body");
                assert_eq!(req.header("content-type"), Some("application/json"), "{name}: content-type");
            }
            None => assert!(req.body.is_none(), "{name}: body should be empty"),
        }
    }
}

#[tokio::test]
async fn delete_never_adds_force_on_its_own() {
    let transport = Arc::new(Recording::default());
    let client = Client::builder(BASE_URL)
        .transport(transport.clone())
        .build()
        .unwrap();
    *transport.reply.lock().unwrap() = Some(HttpResponse {
        status: 501,
        headers: Vec::new(),
        body: r#"{"code":"rest_trash_not_supported","message":"Terms do not support trashing.","data":{"status":501}}"#.to_string(),
    });

    let err = client
        .posts()
        .entity(1)
        .terms()
        .category()
        .delete(&Context::background(), 4, "")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(501));

    let req = transport.sent.lock().unwrap().pop().unwrap();
    assert_eq!(req.url, format!("{BASE_URL}/posts/1/terms/category/4"));
}
