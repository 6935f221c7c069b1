use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
    time::Instant,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{HeaderName, HeaderValue, Method, header, request::Parts},
    response::IntoResponse,
    routing::get,
};
use entity::users;
use platform_api::ApiError;
use platform_authz::{Capability, Role};
use platform_db::DbPool;
use products_hr::{HrError, HrResult, users as user_service};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{api, config::AppConfig, jobs::CleanupJobs};

/// Header carrying the authenticated account id.
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub config: Arc<AppConfig>,
    pub started: Instant,
}

impl AppState {
    pub fn new(pool: DbPool, config: AppConfig) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            started: Instant::now(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

/// The account behind a request, loaded from [`USER_ID_HEADER`].
#[derive(Clone, Debug)]
pub struct Caller {
    pub user: users::Model,
    pub role: Role,
}

impl Caller {
    pub fn id(&self) -> i32 {
        self.user.id
    }

    pub fn require(&self, capability: Capability) -> HrResult<()> {
        Ok(platform_authz::require(self.role, capability)?)
    }

    /// Passes for roles at or above `required`, and for SUPER_ADMIN_ACCESS holders.
    pub fn require_role(&self, required: Role) -> HrResult<()> {
        if self.role.has(Capability::SuperAdminAccess) {
            return Ok(());
        }
        platform_authz::require_role(self.role, required).map_err(HrError::from)
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".into()))?;
        let id = raw
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<i32>().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("Malformed {USER_ID_HEADER} header")))?;
        let (user, role) = user_service::resolve_caller(&state.pool, id).await?;
        Ok(Self { user, role })
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let jobs = state
        .config
        .notification_cleanup
        .then(|| CleanupJobs::spawn(state.pool.clone()));
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "hr server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    if let Some(jobs) = jobs {
        jobs.shutdown().await;
    }
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(USER_ID_HEADER)])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api::routes())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.pool.ping().await.is_ok();
    Json(HealthResponse {
        status: if db_ok { "UP" } else { "DEGRADED" },
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
    info!("shutdown signal received");
}

#[cfg(test)]
pub(crate) mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use http_body_util::BodyExt;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{ActiveModelTrait, Database, Set};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    pub(crate) struct TestApp {
        pub router: Router,
        pub pool: DbPool,
    }

    impl TestApp {
        pub(crate) async fn new() -> Self {
            let pool = Database::connect("sqlite::memory:").await.unwrap();
            Migrator::up(&pool, None).await.unwrap();
            let state = AppState::new(pool.clone(), AppConfig::default());
            Self {
                router: build_router(state),
                pool,
            }
        }

        pub(crate) async fn user(&self, username: &str, role: Role) -> i32 {
            let now = chrono::Utc::now().fixed_offset();
            users::ActiveModel {
                username: Set(username.to_string()),
                email: Set(format!("{username}@example.test")),
                password_hash: Set("unused".to_string()),
                role: Set(role.as_str().to_string()),
                enabled: Set(true),
                created_at: Set(now),
                updated_at: Set(now),
                last_login: Set(None),
                ..Default::default()
            }
            .insert(&self.pool)
            .await
            .unwrap()
            .id
        }

        pub(crate) async fn send(
            &self,
            method: Method,
            uri: &str,
            caller: Option<i32>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(id) = caller {
                request = request.header(USER_ID_HEADER, id.to_string());
            }
            let body = match body {
                Some(json) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            let response = self
                .router
                .clone()
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();
            read(response).await
        }
    }

    async fn read(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_database() {
        let app = TestApp::new().await;
        let (status, body) = app.send(Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "UP");
        assert_eq!(body["dbOk"], true);
    }

    #[tokio::test]
    async fn requests_get_a_request_id() {
        let app = TestApp::new().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn caller_header_is_required_and_checked() {
        let app = TestApp::new().await;
        let (status, body) = app.send(Method::GET, "/api/employees", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authentication required");

        let (status, _) = app.send(Method::GET, "/api/employees", Some(999), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let employee = app.user("emp", Role::Employee).await;
        let (status, body) = app.send(Method::GET, "/api/employees", Some(employee), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], 403);
    }

    #[tokio::test]
    async fn super_admin_access_passes_role_gates() {
        let app = TestApp::new().await;
        let root = app.user("root", Role::SuperAdmin).await;
        let hr = app.user("hr", Role::Hr).await;
        let notice = json!({"title": "Heads up", "message": "Maintenance tonight"});
        let (status, body) = app
            .send(Method::POST, "/api/notifications/role/HR", Some(root), Some(notice.clone()))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sent"], 1);
        let (status, _) = app
            .send(Method::POST, "/api/notifications/role/HR", Some(hr), Some(notice))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
