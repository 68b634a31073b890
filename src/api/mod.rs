mod handlers;
pub mod routes;

use crate::config::Config;
use crate::db::Database;
use crate::error::{panic_response, ApiError};
use crate::identity::IdentityProvider;
use crate::locale::Locale;
use crate::services::Translator;
use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared handles for every request handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub identity: Arc<dyn IdentityProvider>,
    pub database: Option<Database>,
    pub translator: Arc<dyn Translator>,
}

impl AppState {
    /// The database, or `supabase_not_configured`
    pub fn database(&self, locale: Locale) -> Result<&Database, ApiError> {
        self.database.as_ref().ok_or_else(|| {
            ApiError::misconfigured(
                "supabase_not_configured",
                locale.messages().supabase_not_configured,
            )
        })
    }
}

/// Build the router with all routes
pub fn router(state: AppState) -> Router {
    let max_upload_bytes = state.config.server.max_upload_bytes;

    let cors = if state.config.server.enable_cors {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/health", get(handlers::health::health_check))
        // Auth routes
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/signup", post(handlers::auth::signup))
        // Profile routes
        .route(
            "/api/profile",
            get(handlers::profiles::get_profile).post(handlers::profiles::save_profile),
        )
        .route("/api/profile/check", get(handlers::profiles::check_profile))
        .route(
            "/api/profile/upload",
            post(handlers::upload::upload_avatar).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        // Chat routes
        .route(
            "/api/chat/interest",
            get(handlers::chat_interest::get_interest).post(handlers::chat_interest::save_interest),
        )
        .route("/api/users/username", get(handlers::users::get_username))
        .route("/api/translate", post(handlers::translate::translate))
        // Add state and middleware
        .with_state(state)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the API server and run until `shutdown` resolves
pub async fn start_api_server<F>(state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    // Get bind address
    let addr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse::<SocketAddr>()?;
    let app = router(state);

    // Start server
    info!("Starting API server on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_app {
    use super::*;
    use crate::test_support::{memory_database, test_config, EchoTranslator, MemoryStorage, MemoryTables, ScriptedIdentity};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    pub struct TestApp {
        pub router: Router,
        pub identity: Arc<ScriptedIdentity>,
        pub tables: Arc<MemoryTables>,
        pub storage: Arc<MemoryStorage>,
    }

    pub fn app() -> TestApp {
        build(true, false)
    }

    pub fn app_without_database() -> TestApp {
        build(false, false)
    }

    pub fn app_with_failing_translator() -> TestApp {
        build(true, true)
    }

    fn build(with_database: bool, failing_translator: bool) -> TestApp {
        let (db, tables, storage) = memory_database();
        let identity = ScriptedIdentity::new();
        let state = AppState {
            config: Arc::new(test_config()),
            identity: identity.clone(),
            database: with_database.then_some(db),
            translator: Arc::new(EchoTranslator {
                fail: failing_translator,
            }),
        };
        TestApp {
            router: router(state),
            identity,
            tables,
            storage,
        }
    }

    impl TestApp {
        pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }

        pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
            self.send(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }
    }
}
