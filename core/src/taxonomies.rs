//! Read-only taxonomy descriptions.

use std::collections::BTreeMap;

use crate::client::Client;
use crate::context::Context;
use crate::error::ApiError;
use crate::http::HttpMethod;
use crate::query::QueryOptions;
use crate::response::ApiResponse;
use crate::service::Service;
use crate::types::Taxonomy;

const TAXONOMIES: &str = "taxonomies";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomiesService {
    service: Service<Taxonomy>,
}

impl TaxonomiesService {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            service: Service::new(client, TAXONOMIES),
        }
    }

    /// All taxonomies, keyed by slug; the collection is a JSON object rather
    /// than an array.
    pub async fn list(
        &self,
        ctx: &Context,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<BTreeMap<String, Taxonomy>>, ApiError> {
        let query = query.map(QueryOptions::to_query_string).unwrap_or_default();
        self.service
            .call(ctx, HttpMethod::Get, self.service.path(), &query, None, 200)
            .await
    }

    pub async fn get(
        &self,
        ctx: &Context,
        slug: &str,
        query: Option<&QueryOptions>,
    ) -> Result<ApiResponse<Taxonomy>, ApiError> {
        self.service.get(ctx, slug, query).await
    }
}
