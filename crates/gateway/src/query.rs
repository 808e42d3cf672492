#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Filter/select/order request against one backend table, rendered as
/// PostgREST query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: &'static str,
    select: String,
    filters: Vec<(String, String)>,
    order: Vec<(String, Order)>,
    limit: Option<usize>,
}

impl TableQuery {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            select: "*".to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters
            .push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Array column contains every value.
    pub fn contains(mut self, column: &str, values: &[&str]) -> Self {
        let quoted = values
            .iter()
            .map(|value| format!("\"{}\"", value.replace('"', "\\\"")))
            .collect::<Vec<_>>()
            .join(",");
        self.filters
            .push((column.to_string(), format!("cs.{{{quoted}}}")));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), self.select.clone())];
        pairs.extend(self.filters.iter().cloned());

        if !self.order.is_empty() {
            let order = self
                .order
                .iter()
                .map(|(column, order)| format!("{column}.{}", order.as_str()))
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("order".to_string(), order));
        }

        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }

        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TourFilter {
    pub country: Option<String>,
    pub collection_id: Option<String>,
    pub vibe: Option<String>,
    pub limit: Option<usize>,
}

impl TourFilter {
    pub fn to_query(&self) -> TableQuery {
        let mut query = TableQuery::from("tours").order("title", Order::Asc);
        if let Some(country) = self.country.as_deref() {
            query = query.contains("countries", &[country]);
        }
        if let Some(collection_id) = self.collection_id.as_deref() {
            query = query.eq("collection_id", collection_id);
        }
        if let Some(vibe) = self.vibe.as_deref() {
            query = query.contains("vibes", &[vibe]);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query
    }
}
