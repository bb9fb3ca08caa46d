//! Async client for the WordPress REST API: posts, terms and taxonomies.
//!
//! # Overview
//! A [`Client`] owns configuration and a [`Transport`]. From it, services
//! address collections, and services hand out scoped accessors:
//!
//! ```rust,ignore
//! let client = Client::new("https://example.com/wp-json/wp/v2")?;
//! let ctx = Context::background().with_timeout(Duration::from_secs(10));
//! let categories = client.posts().entity(1).terms().category();
//! let attached = categories.create(&ctx, 4).await?;
//! assert_eq!(attached.status(), 201);
//! categories.delete(&ctx, 4, "force=true").await?;
//! ```
//!
//! # Design
//! - Building requests and parsing responses never touch the network; the
//!   [`Transport`] alone does I/O, and every send is raced against the
//!   caller's [`Context`].
//! - Every call returns `Result<ApiResponse<T>, ApiError>`. Success carries
//!   the decoded value and the [`ResponseMeta`]; errors raised after a
//!   response arrived carry it too (see [`ApiError::meta`]).
//! - Posts remember the client that fetched them; only such posts can hand
//!   out their terms (see [`Post::terms`]).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod context;
pub mod error;
pub mod http;
pub mod posts;
pub mod query;
pub mod response;
pub mod service;
pub mod taxonomies;
pub mod terms;
pub mod transport;
pub mod types;

pub use client::{Client, ClientBuilder, Config};
pub use context::{CancelHandle, Context};
pub use error::{ApiError, RemoteError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use posts::{PostAccessor, PostTermsService, PostTermsTaxonomyService, PostsService};
pub use query::{Order, QueryOptions, View};
pub use response::{ApiResponse, ResponseMeta};
pub use service::{Resource, Service};
pub use taxonomies::TaxonomiesService;
pub use terms::{TermsService, TermsTaxonomyService, CATEGORY, TAG};
pub use transport::{ReqwestTransport, Transport};
pub use types::{Post, PostInput, Rendered, Taxonomy, Term, TermInput};
