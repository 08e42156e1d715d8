//! In-process mock of the CMS search API

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use prismic_blog::config::SiteConfig;
use prismic_blog::Blog;

#[derive(Clone)]
pub struct MockCms {
    pub base: String,
    pub documents: Arc<Mutex<Vec<Value>>>,
}

impl MockCms {
    pub async fn start(documents: Vec<Value>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mock = Self {
            base: format!("http://{}", listener.local_addr().unwrap()),
            documents: Arc::new(Mutex::new(documents)),
        };
        let router = Router::new()
            .route("/api/v2", get(api))
            .route("/api/v2/documents/search", get(search))
            .with_state(mock.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        mock
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/v2", self.base)
    }

    /// A blog in `dir` pointed at this mock
    pub fn blog(&self, dir: &Path, page_size: u32) -> Blog {
        let mut config = SiteConfig::default();
        config.cms.endpoint = self.endpoint();
        config.cms.page_size = page_size;
        Blog::with_config(dir, config)
    }

    pub fn edit_title(&self, uid: &str, title: &str) {
        let mut documents = self.documents.lock().unwrap();
        for doc in documents.iter_mut() {
            if doc["uid"] == uid {
                doc["data"]["title"] = json!(title);
            }
        }
    }

    pub fn remove(&self, uid: &str) {
        self.documents.lock().unwrap().retain(|doc| doc["uid"] != uid);
    }
}

pub fn post(uid: &str, words: usize) -> Value {
    let text = vec!["palavra"; words].join(" ");
    json!({
        "id": format!("id-{}", uid),
        "uid": uid,
        "type": "posts",
        "first_publication_date": "2021-03-25T19:25:28+0000",
        "last_publication_date": "2021-03-25T19:25:28+0000",
        "data": {
            "title": format!("Title of {}", uid),
            "subtitle": "Pensando em sincronização",
            "author": "Joseph Oliveira",
            "banner": { "url": "https://images.prismic.io/banner.png", "alt": null },
            "content": [{
                "heading": "Intro",
                "body": [{ "type": "paragraph", "text": text, "spans": [] }]
            }]
        }
    })
}

async fn api() -> Json<Value> {
    Json(json!({
        "refs": [
            { "id": "preview", "ref": "P", "isMasterRef": false },
            { "id": "master", "ref": "M", "isMasterRef": true }
        ]
    }))
}

async fn search(
    State(mock): State<MockCms>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if params.get("ref").map(String::as_str) != Some("M") {
        return StatusCode::BAD_REQUEST.into_response();
    }

    let documents = mock.documents.lock().unwrap().clone();
    let q = params.get("q").cloned().unwrap_or_default();

    if q.contains("my.posts.uid") {
        let results: Vec<_> = documents
            .into_iter()
            .filter(|doc| {
                doc["uid"]
                    .as_str()
                    .is_some_and(|uid| q.contains(&format!("\"{}\"", uid)))
            })
            .collect();
        return Json(json!({ "page": 1, "next_page": null, "results": results })).into_response();
    }

    let size: usize = params
        .get("pageSize")
        .and_then(|s| s.parse().ok())
        .unwrap_or(20);
    let page: usize = params
        .get("page")
        .and_then(|s| s.parse().ok())
        .unwrap_or(1);

    let start = page.saturating_sub(1) * size;
    let end = (start + size).min(documents.len());
    let results = documents.get(start..end).map(<[Value]>::to_vec).unwrap_or_default();
    let next_page = (end < documents.len()).then(|| {
        format!(
            "{}/api/v2/documents/search?ref=M&pageSize={}&page={}",
            mock.base,
            size,
            page + 1
        )
    });

    Json(json!({
        "page": page,
        "total_results_size": documents.len(),
        "next_page": next_page,
        "results": results
    }))
    .into_response()
}
