use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use client_sdk::{AdminClient, UploadFile};
use common::ProjectStatus;
use serde::Deserialize;
use tracing::warn;
use view_core::{DetailError, DetailEvent, Dialog, ProjectDetailView, ProjectListView};


#[derive(Clone)]
pub(crate) struct WebState {
    client: AdminClient,
}

impl WebState {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }
}

pub(crate) fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(list_page))
        .route("/projects", get(|| async { Redirect::to("/") }))
        .route("/projects/{id}", get(detail_page))
        .route("/projects/{id}/metadata", post(upload_metadata))
        .route("/projects/{id}/metadata/discard", post(discard_metadata))
        .route("/projects/{id}/files", post(upload_file))
        .route("/projects/{id}/status", post(change_status))
        .route(
            "/api/ping",
            get(|| async {
                Json(serde_json::json!({
                    "ok": true,
                    "service": "project-admin-web"
                }))
            }),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailQuery {
    dialog: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusForm {
    status: String,
}

fn detail_response(view: &ProjectDetailView) -> Response {
    let status = match view.error() {
        None => StatusCode::OK,
        Some(DetailError::NotFound) => StatusCode::NOT_FOUND,
        Some(DetailError::Unknown) => StatusCode::BAD_GATEWAY,
    };
    (status, Html(web_ui::project_detail_html(view))).into_response()
}

/// A settled mutation redirects back to the detail page so reloading it does
/// not resubmit the form. Failures render inline on the returned page.
fn action_response(view: &ProjectDetailView) -> Response {
    let settled = view.loaded().is_some_and(|loaded| {
        loaded.dialog == Dialog::Closed
            && loaded.metadata_error.is_none()
            && loaded.status_error.is_none()
    });
    if settled {
        Redirect::to(&format!("/projects/{}", view.route_id())).into_response()
    } else {
        detail_response(view)
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadFile, String> {
    while let Some(field) = multipart.next_field().await.map_err(|err| err.to_string())? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await.map_err(|err| err.to_string())?;
        return Ok(UploadFile::new(file_name, data));
    }

    Err("multipart field 'file' is missing".to_string())
}

async fn list_page(State(state): State<WebState>) -> Html<String> {
    let view = ProjectListView::load(&state.client).await;
    Html(web_ui::project_list_html(&view))
}

async fn detail_page(
    State(state): State<WebState>,
    Path(id): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Response {
    let mut view = ProjectDetailView::load(&state.client, id).await;

    let event = match query.dialog.as_deref() {
        Some("metadata") => Some(DetailEvent::OpenMetadataUpload),
        Some("file") => Some(DetailEvent::OpenFileUpload),
        Some("discard") => Some(DetailEvent::RequestDiscard),
        _ => None,
    };
    if let Some(event) = event {
        view.apply(event);
    }

    detail_response(&view)
}

async fn upload_metadata(
    State(state): State<WebState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let file = match read_upload(multipart).await {
        Ok(file) => file,
        Err(message) => {
            warn!(project = %id, error = %message, "rejected metadata upload form");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    let mut view = ProjectDetailView::load(&state.client, id).await;
    view.upload_metadata(&state.client, file).await;
    action_response(&view)
}

async fn discard_metadata(State(state): State<WebState>, Path(id): Path<String>) -> Response {
    let mut view = ProjectDetailView::load(&state.client, id).await;
    view.apply(DetailEvent::RequestDiscard);
    view.discard_metadata(&state.client).await;
    action_response(&view)
}

async fn upload_file(
    State(state): State<WebState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let file = match read_upload(multipart).await {
        Ok(file) => file,
        Err(message) => {
            warn!(project = %id, error = %message, "rejected file upload form");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };

    let mut view = ProjectDetailView::load(&state.client, id).await;
    view.upload_file(&state.client, file).await;
    action_response(&view)
}

async fn change_status(
    State(state): State<WebState>,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Response {
    let target = match form.status.parse::<ProjectStatus>() {
        Ok(target) => target,
        Err(message) => return (StatusCode::BAD_REQUEST, message).into_response(),
    };

    let mut view = ProjectDetailView::load(&state.client, id).await;
    view.change_status(&state.client, target).await;
    action_response(&view)
}
