use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use common::{HealthStatus, InfoText, NewAppUser, NewProject, ProjectList, StatusChange};
use tokio::sync::Mutex;
use tracing::{error, info};

mod store;


use store::{ProjectStore, StoreError};

const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Debug, Clone)]
struct BackendConfig {
    bind_addr: SocketAddr,
    data_dir: Option<PathBuf>,
    dev_user: String,
}

impl BackendConfig {
    fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("PROJECT_ADMIN_BACKEND_BIND")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse::<SocketAddr>()
            .context("PROJECT_ADMIN_BACKEND_BIND is not a socket address")?;

        Ok(Self {
            bind_addr,
            data_dir: std::env::var_os("PROJECT_ADMIN_DATA_DIR").map(PathBuf::from),
            dev_user: std::env::var("PROJECT_ADMIN_DEV_USER")
                .unwrap_or_else(|_| "dev@localhost".to_string()),
        })
    }
}

#[derive(Clone)]
struct BackendState {
    store: Arc<Mutex<ProjectStore>>,
    dev_user: Arc<str>,
}

impl BackendState {
    fn new(store: ProjectStore, dev_user: impl Into<Arc<str>>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            dev_user: dev_user.into(),
        }
    }

    fn current_user(&self, headers: &HeaderMap) -> String {
        headers
            .get(USER_EMAIL_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(&*self.dev_user)
            .to_string()
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let config = BackendConfig::from_env()?;
    let store = match &config.data_dir {
        Some(data_dir) => ProjectStore::init(data_dir).await?,
        None => ProjectStore::in_memory(),
    };
    info!(
        projects = store.project_count(),
        data_dir = ?config.data_dir,
        "backend state loaded"
    );

    let app = app(BackendState::new(store, config.dev_user.as_str()));

    info!(bind_addr = %config.bind_addr, "dev backend listening");
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn app(state: BackendState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/{id}", get(get_project))
        .route(
            "/api/projects/{id}/metadata",
            post(upload_metadata).delete(delete_metadata),
        )
        .route("/api/projects/{id}/status", put(set_status))
        .route("/api/projects/{id}/files", post(upload_file))
        .route("/api/admin/users", get(list_users).post(create_user))
        .route("/api/admin/users/{id}", axum::routing::delete(delete_user))
        .route("/api/admin/info", post(create_info).put(update_info))
        .with_state(state)
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND.into_response(),
            Self::Invalid(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            Self::Internal(err) => {
                error!(error = %err, "backend store failure");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, StoreError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| StoreError::Invalid(rejection.body_text()))
}

/// Pulls the `file` field out of a multipart upload.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, bytes::Bytes), StoreError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| StoreError::Invalid(err.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field
            .bytes()
            .await
            .map_err(|err| StoreError::Invalid(err.body_text()))?;
        return Ok((file_name, data));
    }

    Err(StoreError::Invalid(
        "multipart field 'file' is missing".to_string(),
    ))
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        role: "dev-backend".to_string(),
        online: true,
    })
}

async fn list_projects(State(state): State<BackendState>) -> Json<ProjectList> {
    let store = state.store.lock().await;
    Json(ProjectList {
        projects: store.projects(),
    })
}

async fn create_project(
    State(state): State<BackendState>,
    headers: HeaderMap,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> Result<impl IntoResponse, StoreError> {
    let request = json_body(payload)?;
    let created_by = state.current_user(&headers);
    let project = state
        .store
        .lock()
        .await
        .create_project(request, &created_by)
        .await?;

    info!(project = %project.project_id, key = ?project.key, "created project");
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<BackendState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    let store = state.store.lock().await;
    Ok(Json(store.project(&id)?.clone()))
}

async fn upload_metadata(
    State(state): State<BackendState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<impl IntoResponse, StoreError> {
    state.store.lock().await.project(&id)?;
    let (file_name, data) = read_file_field(multipart).await?;
    let uploaded_by = state.current_user(&headers);

    let summary = state
        .store
        .lock()
        .await
        .replace_metadata(&id, &data, &uploaded_by)
        .await?;

    info!(project = %id, file = %file_name, rows = summary.rowcount, "metadata replaced");
    Ok(Json(summary))
}

async fn delete_metadata(
    State(state): State<BackendState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    state.store.lock().await.clear_metadata(&id).await?;
    info!(project = %id, "metadata removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn set_status(
    State(state): State<BackendState>,
    Path(id): Path<String>,
    payload: Result<Json<StatusChange>, JsonRejection>,
) -> Result<impl IntoResponse, StoreError> {
    let change = json_body(payload)?;
    let project = state
        .store
        .lock()
        .await
        .set_status(&id, change.project_status)
        .await?;

    info!(project = %id, status = %project.project_status, "status changed");
    Ok(Json(project))
}

async fn upload_file(
    State(state): State<BackendState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, StoreError> {
    state.store.lock().await.project(&id)?;
    let (file_name, data) = read_file_field(multipart).await?;

    let mut store = state.store.lock().await;
    let receipt = store.add_file(&id, &file_name, data).await?;
    let project_files = store.file_count(&id)?;

    info!(
        project = %id,
        file = %receipt.file_name,
        size_bytes = receipt.size_bytes,
        project_files,
        "stored file"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn list_users(State(state): State<BackendState>) -> impl IntoResponse {
    Json(state.store.lock().await.users())
}

async fn create_user(
    State(state): State<BackendState>,
    payload: Result<Json<NewAppUser>, JsonRejection>,
) -> Result<impl IntoResponse, StoreError> {
    let request = json_body(payload)?;
    let user = state.store.lock().await.create_user(request).await?;
    info!(user_id = user.user_id, email = %user.email, "created user");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn delete_user(
    State(state): State<BackendState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, StoreError> {
    let user_id = id.parse::<i64>().map_err(|_| StoreError::NotFound)?;
    state.store.lock().await.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn create_info(
    State(state): State<BackendState>,
    payload: Result<Json<InfoText>, JsonRejection>,
) -> Result<impl IntoResponse, StoreError> {
    let info = json_body(payload)?;
    Ok(Json(state.store.lock().await.create_info(info).await?))
}

async fn update_info(
    State(state): State<BackendState>,
    payload: Result<Json<InfoText>, JsonRejection>,
) -> Result<impl IntoResponse, StoreError> {
    let info = json_body(payload)?;
    Ok(Json(state.store.lock().await.update_info(info).await?))
}
