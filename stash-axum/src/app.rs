use std::path::Path;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::handler::Handler;
use axum::http::Request;
use axum::routing::get;
use axum::Router;
use stash_blob::UploadPipeline;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::upload::upload_router;
use crate::StashAxumState;

pub struct AxumApp {
    pub state: StashAxumState,
    pub router: Router<()>,
}

impl Clone for AxumApp {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            router: self.router.clone(),
        }
    }
}

impl AxumApp {
    pub fn new(pipeline: UploadPipeline) -> Self {
        Self {
            state: StashAxumState::new(pipeline),
            router: Router::new(),
        }
    }

    pub fn use_router(mut self, router: Router<()>) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Mount the upload handler. The body is bounded by the parser's
    /// whole-stream cap (`upload.max_total_bytes`), not by axum's extractor
    /// limit, which is switched off for this route.
    pub fn use_upload(self, path: &str) -> Self {
        let router = upload_router(path, self.state.clone()).layer(DefaultBodyLimit::disable());
        self.use_router(router)
    }

    pub fn use_get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()> + Clone + Send + 'static,
        T: 'static,
    {
        let router = Router::new().route(path, get(handler));
        self.use_router(router)
    }

    /// Serve files from `dir` under `prefix`, e.g. stored uploads at `/uploads`.
    pub fn serve_dir(mut self, prefix: &str, dir: impl AsRef<Path>) -> Self {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return self.fallback_dir(dir);
        }
        let files = ServeDir::new(dir.as_ref());
        self.router = self.router.nest_service(prefix, files);
        self
    }

    /// Serve `dir` for every path no route matched.
    pub fn fallback_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let files = ServeDir::new(dir.as_ref());
        self.router = self.router.fallback_service(files);
        self
    }

    /// Request ids, request tracing and permissive CORS. Call after all routes
    /// are mounted; layers only wrap what is already there.
    pub fn with_http_layers(mut self) -> Self {
        self.router = self
            .router
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(
                TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                    let request_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("-");
                    tracing::info_span!(
                        "http",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = %request_id,
                    )
                }),
            )
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        self
    }

    pub async fn listen<A>(self, addr: A) -> anyhow::Result<()>
    where
        A: ToSocketAddrs,
    {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, self.router).await?;
        Ok(())
    }
}

pub fn axum(pipeline: UploadPipeline) -> AxumApp {
    AxumApp::new(pipeline)
}
