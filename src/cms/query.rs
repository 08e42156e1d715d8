//! Search query construction for the Prismic REST API v2

/// A single search predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `[at(path, "value")]`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::At {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Match every document of a custom type
    pub fn document_type(document_type: &str) -> Self {
        Self::at("document.type", document_type)
    }

    /// Match the document of `document_type` whose UID is `uid`
    pub fn uid(document_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", document_type), uid)
    }

    fn encode(&self) -> String {
        match self {
            Predicate::At { path, value } => {
                let value = value.replace('\\', "\\\\").replace('"', "\\\"");
                format!("[at({},\"{}\")]", path, value)
            }
        }
    }
}

/// A search request against `/documents/search`
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    pub predicates: Vec<Predicate>,
    pub fetch: Vec<String>,
    pub page_size: Option<u32>,
    pub page: Option<u32>,
}

impl SearchQuery {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
            ..Default::default()
        }
    }

    pub fn fetch(mut self, fields: Vec<String>) -> Self {
        self.fetch = fields;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// The `q` parameter: all predicates wrapped in one outer bracket
    pub fn q(&self) -> String {
        let inner: String = self.predicates.iter().map(Predicate::encode).collect();
        format!("[{}]", inner)
    }

    /// Query-string pairs for this search at the given ref
    pub fn params(&self, reference: &str, access_token: Option<&str>) -> Vec<(&'static str, String)> {
        let mut params = vec![("ref", reference.to_string()), ("q", self.q())];
        if !self.fetch.is_empty() {
            params.push(("fetch", self.fetch.join(",")));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(token) = access_token {
            params.push(("access_token", token.to_string()));
        }
        params
    }
}
