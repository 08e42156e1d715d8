//! Blog server with on-demand post generation
//!
//! Serves the public directory. A request for `/post/<slug>/` whose page was
//! not generated yet gets the placeholder page while a single background
//! task fetches the post and writes it; the placeholder refreshes itself
//! until the page exists.

use anyhow::Result;
use axum::{
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cms::{CmsClient, CmsError};
use crate::commands::generate;
use crate::generator::{post_output_path, Generator};
use crate::helpers::is_safe_slug;
use crate::Blog;

/// Server state
pub struct ServerState {
    blog: Blog,
    generator: Generator,
    /// `None` serves the public directory as is
    client: Option<CmsClient>,
    /// Slugs with a generation in flight
    pending: Mutex<HashSet<String>>,
    /// Slugs the CMS reported as unknown
    missing: Mutex<HashSet<String>>,
    /// Serializes writers of the public directory and the cache
    writer: tokio::sync::Mutex<()>,
}

impl ServerState {
    pub fn new(blog: &Blog, on_demand: bool) -> Result<Self> {
        let client = if on_demand {
            Some(CmsClient::new(&blog.config.cms)?)
        } else {
            None
        };
        Ok(Self {
            blog: blog.clone(),
            generator: Generator::new(blog)?,
            client,
            pending: Mutex::new(HashSet::new()),
            missing: Mutex::new(HashSet::new()),
            writer: tokio::sync::Mutex::new(()),
        })
    }

    /// Whether a background generation for `slug` is still running
    pub fn is_pending(&self, slug: &str) -> bool {
        lock(&self.pending).contains(slug)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Routes of the blog server
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/post/:slug", get(post_handler))
        .route("/post/:slug/", get(post_handler))
        .route("/api/revalidate", post(revalidate_handler))
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the blog server
pub async fn start(blog: &Blog, ip: &str, port: u16, on_demand: bool) -> Result<()> {
    let state = Arc::new(ServerState::new(blog, on_demand)?);
    let app = router(state);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    if on_demand {
        println!("Unknown posts are generated on first request.");
    }
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Detail page: the generated file, or the placeholder while it is generated
async fn post_handler(
    State(state): State<Arc<ServerState>>,
    Path(slug): Path<String>,
) -> Response {
    if !is_safe_slug(&slug) {
        return not_found();
    }

    if state.generator.post_exists(&slug) {
        let path = state.blog.public_dir.join(post_output_path(&slug));
        return match tokio::fs::read_to_string(&path).await {
            Ok(content) => Html(content).into_response(),
            Err(e) => {
                tracing::error!("Failed to read {:?}: {}", path, e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
            }
        };
    }

    if lock(&state.missing).contains(&slug) {
        return not_found();
    }

    let Some(client) = state.client.clone() else {
        return not_found();
    };

    if lock(&state.pending).insert(slug.clone()) {
        tracing::info!("Generating post {} on demand", slug);
        let state = state.clone();
        tokio::spawn(async move {
            let result = {
                let _guard = state.writer.lock().await;
                generate::generate_post(&state.blog, &client, &slug).await
            };
            match result {
                Ok(path) => tracing::info!("Generated {}", path),
                Err(e) => {
                    let is_missing = e
                        .downcast_ref::<CmsError>()
                        .is_some_and(CmsError::is_not_found);
                    if is_missing {
                        tracing::warn!("Post {} does not exist", slug);
                        lock(&state.missing).insert(slug.clone());
                    } else {
                        tracing::error!("Failed to generate post {}: {:#}", slug, e);
                    }
                }
            }
            lock(&state.pending).remove(&slug);
        });
    }

    match state.generator.render_fallback() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!("Failed to render placeholder: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response()
        }
    }
}

/// Regenerate the whole site
async fn revalidate_handler(State(state): State<Arc<ServerState>>) -> Response {
    if state.client.is_none() {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "revalidated": false, "error": "server runs in static mode" })),
        )
            .into_response();
    }

    let _guard = state.writer.lock().await;
    tracing::info!("Revalidating site...");
    match generate::run(&state.blog).await {
        Ok(summary) => {
            lock(&state.missing).clear();
            Json(json!({
                "revalidated": true,
                "list_pages": summary.list_pages,
                "posts": summary.posts,
                "rendered": summary.rendered,
            }))
            .into_response()
        }
        Err(e) => {
            tracing::error!("Revalidation failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "revalidated": false, "error": "revalidation failed" })),
            )
                .into_response()
        }
    }
}

/// Serve everything else from the public directory
async fn fallback_handler(
    State(state): State<Arc<ServerState>>,
    request: Request<Body>,
) -> Response {
    let mut service = ServeDir::new(&state.blog.public_dir).append_index_html_on_directories(true);
    match service.try_call(request).await {
        Ok(response) => response.into_response(),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Server error").into_response(),
    }
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, "Not found").into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use std::collections::HashMap;
    use std::time::Duration;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use crate::cache::CacheDb;
    use crate::config::SiteConfig;

    async fn api() -> Json<serde_json::Value> {
        Json(json!({ "refs": [{ "id": "master", "ref": "M", "isMasterRef": true }] }))
    }

    async fn search(Query(params): Query<HashMap<String, String>>) -> Response {
        let q = params.get("q").cloned().unwrap_or_default();
        if q.contains("\"broken\"") {
            return StatusCode::BAD_GATEWAY.into_response();
        }
        let results = if q.contains("\"known\"") {
            vec![json!({
                "id": "1",
                "uid": "known",
                "type": "posts",
                "first_publication_date": "2021-03-25T19:25:28+0000",
                "data": {
                    "title": "Known post",
                    "content": [{
                        "heading": "Intro",
                        "body": [{ "type": "paragraph", "text": "hello there", "spans": [] }]
                    }]
                }
            })]
        } else {
            vec![]
        };
        Json(json!({ "next_page": null, "results": results })).into_response()
    }

    async fn spawn_cms() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let router = Router::new()
            .route("/api/v2", get(api))
            .route("/api/v2/documents/search", get(search));
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("{}/api/v2", base)
    }

    async fn state(dir: &TempDir, on_demand: bool) -> Arc<ServerState> {
        let mut config = SiteConfig::default();
        config.cms.endpoint = spawn_cms().await;
        let blog = Blog::with_config(dir.path(), config);
        Arc::new(ServerState::new(&blog, on_demand).unwrap())
    }

    async fn get_page(state: &Arc<ServerState>, uri: &str) -> (StatusCode, String) {
        let response = router(state.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn wait_idle(state: &Arc<ServerState>, slug: &str) {
        for _ in 0..100 {
            if !state.is_pending(slug) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("generation of {} did not finish", slug);
    }

    #[tokio::test]
    async fn test_unknown_post_is_generated_on_demand() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true).await;

        let (status, body) = get_page(&state, "/post/known/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));

        wait_idle(&state, "known").await;
        let (status, body) = get_page(&state, "/post/known").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Known post"));
        assert!(!body.contains("Carregando..."));

        let cache = CacheDb::load(dir.path());
        assert_eq!(cache.posts["known"].output_path, "post/known/index.html");
    }

    #[tokio::test]
    async fn test_missing_post_becomes_404() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true).await;

        let (status, _) = get_page(&state, "/post/nope/").await;
        assert_eq!(status, StatusCode::OK);
        wait_idle(&state, "nope").await;

        let (status, _) = get_page(&state, "/post/nope/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_generation_is_retried() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, true).await;

        get_page(&state, "/post/broken/").await;
        wait_idle(&state, "broken").await;

        let (status, body) = get_page(&state, "/post/broken/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Carregando..."));
        wait_idle(&state, "broken").await;
    }

    #[tokio::test]
    async fn test_static_mode_serves_files_only() {
        let dir = TempDir::new().unwrap();
        let state = state(&dir, false).await;
        std::fs::create_dir_all(dir.path().join("public")).unwrap();
        std::fs::write(dir.path().join("public/index.html"), "<h1>home</h1>").unwrap();

        let (status, body) = get_page(&state, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>home</h1>");

        let (status, _) = get_page(&state, "/post/known/").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let response = router(state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/revalidate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_revalidate_failure_does_not_echo_error() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.cms.endpoint = "http://127.0.0.1:1/api/v2".to_string();
        config.cms.access_token = Some("S3CRET-TOKEN".to_string());
        let blog = Blog::with_config(dir.path(), config);
        let state = Arc::new(ServerState::new(&blog, true).unwrap());

        let response = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/revalidate")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["revalidated"], false);
        assert!(!String::from_utf8_lossy(&bytes).contains("S3CRET-TOKEN"));
    }
}
