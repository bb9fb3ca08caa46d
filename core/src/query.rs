//! Query-string options for `list` and `get` calls.
//!
//! Unset fields are omitted, leaving the server's defaults in place.

use url::form_urlencoded;

/// Which representation of a resource the server should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    View,
    Embed,
    Edit,
}

impl View {
    fn as_str(self) -> &'static str {
        match self {
            View::View => "view",
            View::Embed => "embed",
            View::Edit => "edit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub context: Option<View>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub offset: Option<u32>,
    pub search: Option<String>,
    pub order: Option<Order>,
    pub orderby: Option<String>,
    pub include: Vec<u64>,
    pub exclude: Vec<u64>,
    pub slug: Option<String>,
    /// Filters without a dedicated field, e.g. `("hide_empty", "true")`.
    pub extra: Vec<(String, String)>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(mut self, context: View) -> Self {
        self.context = Some(context);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = Some(order);
        self
    }

    pub fn orderby(mut self, orderby: impl Into<String>) -> Self {
        self.orderby = Some(orderby.into());
        self
    }

    pub fn include(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.include.extend(ids);
        self
    }

    pub fn exclude(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.exclude.extend(ids);
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    /// Encodes the options as `application/x-www-form-urlencoded`.
    pub fn to_query_string(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(context) = self.context {
            query.append_pair("context", context.as_str());
        }
        if let Some(page) = self.page {
            query.append_pair("page", &page.to_string());
        }
        if let Some(per_page) = self.per_page {
            query.append_pair("per_page", &per_page.to_string());
        }
        if let Some(offset) = self.offset {
            query.append_pair("offset", &offset.to_string());
        }
        if let Some(search) = &self.search {
            query.append_pair("search", search);
        }
        if let Some(order) = self.order {
            query.append_pair("order", order.as_str());
        }
        if let Some(orderby) = &self.orderby {
            query.append_pair("orderby", orderby);
        }
        if !self.include.is_empty() {
            query.append_pair("include", &join_ids(&self.include));
        }
        if !self.exclude.is_empty() {
            query.append_pair("exclude", &join_ids(&self.exclude));
        }
        if let Some(slug) = &self.slug {
            query.append_pair("slug", slug);
        }
        for (key, value) in &self.extra {
            query.append_pair(key, value);
        }
        query.finish()
    }
}

fn join_ids(ids: &[u64]) -> String {
    ids.iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
