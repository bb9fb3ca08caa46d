//! Resource DTOs for the REST API.
//!
//! # Design
//! These types mirror the mock-server's schema but are defined independently;
//! the integration tests catch drift between the two. Only the fields the
//! client works with are modelled. Identifiers (`id`, or `slug` for
//! taxonomies) are required so that a body of the wrong shape fails to
//! decode; every other field tolerates being absent so that `context=embed`
//! responses still decode.
//!
//! A [`Post`] additionally remembers the collection it was fetched from.
//! That binding is what lets `Post::terms` hand out a nested service; a post
//! built any other way has none.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::service::{Resource, Service};

/// A field the server returns both as stored and as rendered HTML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    #[serde(default)]
    pub date: Option<NaiveDateTime>,
    #[serde(default)]
    pub modified: Option<NaiveDateTime>,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub author: u64,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub tags: Vec<u64>,
    #[serde(skip)]
    pub(crate) origin: Option<Service<Post>>,
}

impl Post {
    /// Whether this post was returned by a client call.
    pub fn is_bound(&self) -> bool {
        self.origin.is_some()
    }
}

impl Resource for Post {
    fn bind(&mut self, client: &Client, collection: &str) {
        self.origin = Some(Service::new(client.clone(), collection));
    }
}

/// Payload for creating or updating a post. Omitted fields are left to the
/// server (on create) or unchanged (on update).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<u64>>,
}

/// A term of some taxonomy, either standalone or as attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub taxonomy: String,
    #[serde(default)]
    pub parent: u64,
}

impl Resource for Term {}

/// Payload for creating or updating a term.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub types: Vec<String>,
    #[serde(default)]
    pub hierarchical: bool,
    #[serde(default)]
    pub rest_base: Option<String>,
}

impl Resource for Taxonomy {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_decodes_rest_shape() {
        let post: Post = serde_json::from_str(
            r#"{
                "id": 7,
                "date": "2024-03-01T10:15:00",
                "slug": "hello-world",
                "status": "publish",
                "type": "post",
                "title": {"rendered": "Hello world!"},
                "categories": [1, 4]
            }"#,
        )
        .unwrap();
        assert_eq!(post.id, 7);
        assert_eq!(post.kind, "post");
        assert_eq!(post.title.rendered, "Hello world!");
        assert_eq!(post.categories, vec![1, 4]);
        assert_eq!(
            post.date.unwrap().to_string(),
            "2024-03-01 10:15:00"
        );
        assert!(post.modified.is_none());
    }

    #[test]
    fn post_input_omits_unset_fields() {
        let input = PostInput {
            title: Some("Draft".to_string()),
            ..PostInput::default()
        };
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json, serde_json::json!({"title": "Draft"}));
    }

    #[test]
    fn term_tolerates_missing_fields() {
        let term: Term = serde_json::from_str(r#"{"id": 3, "taxonomy": "category"}"#).unwrap();
        assert_eq!(term.id, 3);
        assert_eq!(term.parent, 0);
        assert!(term.name.is_empty());
    }

    #[test]
    fn identifiers_are_required() {
        assert!(serde_json::from_str::<Post>("{}").is_err());
        assert!(serde_json::from_str::<Term>(r#"{"name": "News"}"#).is_err());
        assert!(serde_json::from_str::<Taxonomy>(r#"{"name": "Tags"}"#).is_err());
    }

    #[test]
    fn post_binding_is_never_serialized() {
        let json = serde_json::to_value(Post::default()).unwrap();
        assert!(json.get("origin").is_none());
    }
}
