use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use holon_identity_api::{
    CreateIdentityRequest, CreateIdentityResponse, HolonIdentityApi, ListIdentitiesRequest,
    ListIdentitiesResponse, ShowIdentityRequest, ShowIdentityResponse, API_CONTRACT_VERSION,
};
use holon_identity_core::{default_cache_dir, IdentityError};
use serde::Serialize;

const SERVICE_CONTRACT_VERSION: &str = "service.v1";
const OPENAPI_YAML: &str = include_str!("../../../openapi/openapi.yaml");

#[derive(Debug, Clone)]
struct ServiceState {
    api: HolonIdentityApi,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceEnvelope<T>
where
    T: Serialize,
{
    service_contract_version: &'static str,
    api_contract_version: &'static str,
    data: T,
}

#[derive(Debug, Clone, Serialize)]
struct ServiceError {
    #[serde(skip_serializing)]
    status: StatusCode,
    service_contract_version: &'static str,
    code: &'static str,
    error: String,
}

#[derive(Debug, Clone, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Parser)]
#[command(name = "holon-identity-service")]
#[command(about = "Local HTTP service for holon identities")]
struct Args {
    /// Directory that relative paths and lookups are resolved against.
    #[arg(long, default_value = ".")]
    root: PathBuf,
    #[arg(long, default_value = "127.0.0.1:9090")]
    bind: SocketAddr,
    /// Global holon cache; defaults to ~/.holon/cache.
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

impl From<IdentityError> for ServiceError {
    fn from(err: IdentityError) -> Self {
        let (status, code) = match &err {
            IdentityError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
            IdentityError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            IdentityError::MalformedRecord(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "malformed_record")
            }
            IdentityError::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "io"),
        };
        ServiceError {
            status,
            service_contract_version: SERVICE_CONTRACT_VERSION,
            code,
            error: err.to_string(),
        }
    }
}

impl ServiceError {
    fn internal(message: impl Into<String>) -> Self {
        ServiceError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            service_contract_version: SERVICE_CONTRACT_VERSION,
            code: "internal",
            error: message.into(),
        }
    }
}

fn envelope<T>(data: T) -> ServiceEnvelope<T>
where
    T: Serialize,
{
    ServiceEnvelope {
        service_contract_version: SERVICE_CONTRACT_VERSION,
        api_contract_version: API_CONTRACT_VERSION,
        data,
    }
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/openapi", get(openapi))
        .route("/v1/identity/create", post(identity_create))
        .route("/v1/identity/show", post(identity_show))
        .route("/v1/identity/list", post(identity_list))
        .route("/v1/identity/:uuid", get(identity_get))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cache_dir = args.cache_dir.or_else(default_cache_dir);
    let state =
        ServiceState { api: HolonIdentityApi::new(args.root.clone()).with_cache_dir(cache_dir) };

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(
        bind = %args.bind,
        root = %args.root.display(),
        "holon identity service listening"
    );
    axum::serve(listener, app(state)).await?;
    Ok(())
}

// The facade does blocking filesystem work.
async fn run_blocking<T, F>(task: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, IdentityError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|err| ServiceError::internal(format!("worker task failed: {err}")))?
        .map_err(ServiceError::from)
}

async fn health() -> Json<ServiceEnvelope<HealthResponse>> {
    Json(envelope(HealthResponse { status: "ok" }))
}

async fn openapi() -> impl IntoResponse {
    (StatusCode::OK, [("content-type", "application/yaml; charset=utf-8")], OPENAPI_YAML)
}

async fn identity_create(
    State(state): State<ServiceState>,
    Json(request): Json<CreateIdentityRequest>,
) -> Result<Json<ServiceEnvelope<CreateIdentityResponse>>, ServiceError> {
    let created = run_blocking(move || state.api.create_identity(request)).await?;
    Ok(Json(envelope(created)))
}

async fn identity_show(
    State(state): State<ServiceState>,
    Json(request): Json<ShowIdentityRequest>,
) -> Result<Json<ServiceEnvelope<ShowIdentityResponse>>, ServiceError> {
    let shown = run_blocking(move || state.api.show_identity(&request)).await?;
    Ok(Json(envelope(shown)))
}

async fn identity_get(
    State(state): State<ServiceState>,
    Path(uuid): Path<String>,
) -> Result<Json<ServiceEnvelope<ShowIdentityResponse>>, ServiceError> {
    let request = ShowIdentityRequest { uuid };
    let shown = run_blocking(move || state.api.show_identity(&request)).await?;
    Ok(Json(envelope(shown)))
}

async fn identity_list(
    State(state): State<ServiceState>,
    Json(request): Json<ListIdentitiesRequest>,
) -> Result<Json<ServiceEnvelope<ListIdentitiesResponse>>, ServiceError> {
    let listed = run_blocking(move || state.api.list_identities(&request)).await?;
    Ok(Json(envelope(listed)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use http::Request;
    use tower::ServiceExt;

    fn temp_state() -> (tempfile::TempDir, ServiceState) {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(err) => panic!("failed to create temp dir: {err}"),
        };
        let state = ServiceState { api: HolonIdentityApi::new(dir.path().to_path_buf()) };
        (dir, state)
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let body = match String::from_utf8(bytes.to_vec()) {
            Ok(body) => body,
            Err(err) => panic!("response body is not UTF-8: {err}"),
        };
        match serde_json::from_str(&body) {
            Ok(value) => value,
            Err(err) => panic!("response body is not JSON: {err}; body={body}"),
        }
    }

    async fn send(router: Router, request: Request<axum::body::Body>) -> Response {
        match router.oneshot(request).await {
            Ok(response) => response,
            Err(err) => panic!("router request failed: {err}"),
        }
    }

    fn get_request(uri: &str) -> Request<axum::body::Body> {
        Request::builder()
            .uri(uri)
            .method("GET")
            .body(axum::body::Body::empty())
            .unwrap_or_else(|err| panic!("failed to build request: {err}"))
    }

    fn post_json(uri: &str, payload: &serde_json::Value) -> Request<axum::body::Body> {
        Request::builder()
            .uri(uri)
            .method("POST")
            .header("content-type", "application/json")
            .body(axum::body::Body::from(payload.to_string()))
            .unwrap_or_else(|err| panic!("failed to build request: {err}"))
    }

    fn sophia_payload() -> serde_json::Value {
        serde_json::json!({
            "given_name": "Sophia",
            "family_name": "Who?",
            "motto": "Know thyself.",
            "composer": "B. ALTER",
            "clade": "deterministic/io_bound",
            "reproduction": "assisted",
            "lang": "rust",
            "aliases": ["who"]
        })
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let (_dir, state) = temp_state();
        let response = send(app(state), get_request("/v1/health")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = response_json(response).await;
        assert_eq!(
            value.get("service_contract_version").and_then(serde_json::Value::as_str),
            Some(SERVICE_CONTRACT_VERSION)
        );
        assert_eq!(
            value.get("api_contract_version").and_then(serde_json::Value::as_str),
            Some(API_CONTRACT_VERSION)
        );
    }

    #[tokio::test]
    async fn openapi_endpoint_returns_versioned_artifact() {
        let (_dir, state) = temp_state();
        let response = send(app(state), get_request("/v1/openapi")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(bytes) => bytes,
            Err(err) => panic!("failed to read response body: {err}"),
        };
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("openapi: 3.1.0"));
        assert!(body.contains("version: service.v1"));
        assert!(body.contains("/v1/identity/create"));
        assert!(body.contains("/v1/identity/list"));
    }

    #[tokio::test]
    async fn create_show_and_list_round_trip() {
        let (_dir, state) = temp_state();
        let router = app(state);

        let created =
            send(router.clone(), post_json("/v1/identity/create", &sophia_payload())).await;
        assert_eq!(created.status(), StatusCode::OK);
        let created = response_json(created).await;
        let uuid = created
            .pointer("/data/identity/uuid")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_else(|| panic!("missing data.identity.uuid in response: {created}"))
            .to_string();
        assert_eq!(
            created.pointer("/data/identity/clade").and_then(serde_json::Value::as_str),
            Some("deterministic/io_bound")
        );

        let prefix = &uuid[..8];
        let shown = send(router.clone(), get_request(&format!("/v1/identity/{prefix}"))).await;
        assert_eq!(shown.status(), StatusCode::OK);
        let shown = response_json(shown).await;
        assert_eq!(
            shown.pointer("/data/identity/uuid").and_then(serde_json::Value::as_str),
            Some(uuid.as_str())
        );
        assert!(shown
            .pointer("/data/raw_content")
            .and_then(serde_json::Value::as_str)
            .is_some_and(|raw| raw.contains("# Holon Identity v1")));

        let shown_by_post = send(
            router.clone(),
            post_json("/v1/identity/show", &serde_json::json!({ "uuid": uuid })),
        )
        .await;
        assert_eq!(shown_by_post.status(), StatusCode::OK);

        let listed =
            send(router, post_json("/v1/identity/list", &serde_json::json!({}))).await;
        assert_eq!(listed.status(), StatusCode::OK);
        let listed = response_json(listed).await;
        let entries = listed
            .pointer("/data/entries")
            .and_then(serde_json::Value::as_array)
            .unwrap_or_else(|| panic!("missing data.entries in response: {listed}"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].get("origin").and_then(serde_json::Value::as_str), Some("local"));
        assert_eq!(
            entries[0].get("relative_path").and_then(serde_json::Value::as_str),
            Some(".holon/sophia-who")
        );
    }

    #[tokio::test]
    async fn blank_required_field_is_bad_request() {
        let (_dir, state) = temp_state();
        let mut payload = sophia_payload();
        payload["motto"] = serde_json::json!("   ");

        let response = send(app(state), post_json("/v1/identity/create", &payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value = response_json(response).await;
        assert_eq!(value.get("code").and_then(serde_json::Value::as_str), Some("invalid_argument"));
        assert_eq!(
            value.get("error").and_then(serde_json::Value::as_str),
            Some("invalid argument: motto is required")
        );
    }

    #[tokio::test]
    async fn unknown_uuid_is_not_found() {
        let (_dir, state) = temp_state();
        let response = send(app(state), get_request("/v1/identity/cccc")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let value = response_json(response).await;
        assert_eq!(value.get("code").and_then(serde_json::Value::as_str), Some("not_found"));
        assert_eq!(
            value.get("error").and_then(serde_json::Value::as_str),
            Some("holon not found: cccc")
        );
    }
}
