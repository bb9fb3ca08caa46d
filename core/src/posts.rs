//! Posts and the terms attached to them.
//!
//! The chain `client.posts().entity(id).terms().category()` only builds
//! paths; the first request goes out when a CRUD method is awaited.
//!
//! ```text
//! posts                          PostsService
//! posts/{id}                     PostAccessor
//! posts/{id}/terms               PostTermsService
//! posts/{id}/terms/{taxonomy}    PostTermsTaxonomyService
//! ```

use std::fmt;

use crate::client::Client;
use crate::context::Context;
use crate::error::ApiError;
use crate::query::QueryOptions;
use crate::response::ApiResponse;
use crate::service::Service;
use crate::terms::{CATEGORY, TAG};
use crate::types::{Post, PostInput, Term};

const POSTS: &str = "posts";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostsService {
    service: Service<Post>,
}

impl PostsService {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            service: Service::new(client, POSTS),
        }
    }

    /// Addresses one post without fetching it.
    pub fn entity(&self, id: u64) -> PostAccessor {
        PostAccessor {
            service: self.service.clone(),
            id,
        }
    }

    pub async fn list(
        &self,
        ctx: &Context,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Vec<Post>>, ApiError> {
        self.service.list(ctx, query).await
    }

    pub async fn get(
        &self,
        ctx: &Context,
        id: u64,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Post>, ApiError> {
        self.service.get(ctx, id, query).await
    }

    pub async fn create(&self, ctx: &Context, input: &PostInput) -> Result<ApiResponse<Post>, ApiError> {
        self.service.create(ctx, input).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: u64,
        input: &PostInput,
    ) -> Result<ApiResponse<Post>, ApiError> {
        self.service.update(ctx, id, input).await
    }

    /// Without `force=true` the post is moved to the trash and still returned.
    pub async fn delete(&self, ctx: &Context, id: u64, options: &str) -> Result<ApiResponse<Post>, ApiError> {
        self.service.delete(ctx, id, options).await
    }
}

/// One post, addressed by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostAccessor {
    service: Service<Post>,
    id: u64,
}

impl PostAccessor {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn path(&self) -> String {
        self.service.entity_path(self.id)
    }

    pub fn terms(&self) -> PostTermsService {
        PostTermsService {
            service: self.service.nested(format_args!("{}/terms", self.id)),
        }
    }
}

impl Post {
    /// Terms of this post, below the collection it was fetched from.
    ///
    /// A post built by hand (`Post::default()`, or decoded outside the
    /// client) has no client to send requests through and yields `None`.
    pub fn terms(&self) -> Option<PostTermsService> {
        let origin = self.origin.as_ref()?;
        Some(PostTermsService {
            service: origin.nested(format_args!("{}/terms", self.id)),
        })
    }
}

/// All terms attached to one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTermsService {
    service: Service<Term>,
}

impl PostTermsService {
    pub fn path(&self) -> &str {
        self.service.path()
    }

    /// Terms attached to the post, across every taxonomy.
    pub async fn list(
        &self,
        ctx: &Context,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Vec<Term>>, ApiError> {
        self.service.list(ctx, query).await
    }

    pub fn taxonomy(&self, taxonomy: impl fmt::Display) -> PostTermsTaxonomyService {
        PostTermsTaxonomyService {
            service: self.service.nested(taxonomy),
        }
    }

    pub fn category(&self) -> PostTermsTaxonomyService {
        self.taxonomy(CATEGORY)
    }

    pub fn tag(&self) -> PostTermsTaxonomyService {
        self.taxonomy(TAG)
    }
}

/// The terms of one taxonomy attached to one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostTermsTaxonomyService {
    service: Service<Term>,
}

impl PostTermsTaxonomyService {
    pub fn path(&self) -> &str {
        self.service.path()
    }

    pub async fn list(
        &self,
        ctx: &Context,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Vec<Term>>, ApiError> {
        self.service.list(ctx, query).await
    }

    pub async fn get(
        &self,
        ctx: &Context,
        term_id: u64,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Term>, ApiError> {
        self.service.get(ctx, term_id, query).await
    }

    /// Attaches an existing term to the post. Succeeds with 201.
    pub async fn create(&self, ctx: &Context, term_id: u64) -> Result<ApiResponse<Term>, ApiError> {
        self.service.create_at(ctx, term_id).await
    }

    /// Detaches a term from the post.
    ///
    /// Terms cannot be trashed, so callers must pass `"force=true"`; the
    /// server rejects the call otherwise.
    pub async fn delete(
        &self,
        ctx: &Context,
        term_id: u64,
        options: &str,
    ) -> Result<ApiResponse<Term>, ApiError> {
        self.service.delete(ctx, term_id, options).await
    }
}
