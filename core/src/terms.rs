//! Standalone terms, grouped by taxonomy (`terms/{taxonomy}`).

use std::fmt;

use crate::client::Client;
use crate::context::Context;
use crate::error::ApiError;
use crate::query::QueryOptions;
use crate::response::ApiResponse;
use crate::service::Service;
use crate::types::{Term, TermInput};

/// Path token of the category taxonomy.
pub const CATEGORY: &str = "category";
/// Path token of the tag taxonomy.
pub const TAG: &str = "tag";

const TERMS: &str = "terms";

#[derive(Debug, Clone)]
pub struct TermsService {
    client: Client,
}

impl TermsService {
    pub(crate) fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn taxonomy(&self, taxonomy: impl fmt::Display) -> TermsTaxonomyService {
        TermsTaxonomyService {
            service: Service::new(self.client.clone(), &format!("{TERMS}/{taxonomy}")),
        }
    }

    pub fn category(&self) -> TermsTaxonomyService {
        self.taxonomy(CATEGORY)
    }

    pub fn tag(&self) -> TermsTaxonomyService {
        self.taxonomy(TAG)
    }
}

/// CRUD over the terms of one taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermsTaxonomyService {
    service: Service<Term>,
}

impl TermsTaxonomyService {
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
        id: u64,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Term>, ApiError> {
        self.service.get(ctx, id, query).await
    }

    pub async fn create(&self, ctx: &Context, input: &TermInput) -> Result<ApiResponse<Term>, ApiError> {
        self.service.create(ctx, input).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: u64,
        input: &TermInput,
    ) -> Result<ApiResponse<Term>, ApiError> {
        self.service.update(ctx, id, input).await
    }

    /// Terms have no trash; pass `"force=true"`.
    pub async fn delete(&self, ctx: &Context, id: u64, options: &str) -> Result<ApiResponse<Term>, ApiError> {
        self.service.delete(ctx, id, options).await
    }
}
