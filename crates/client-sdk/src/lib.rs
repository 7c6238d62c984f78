use std::future::Future;
use std::path::Path;

use bytes::Bytes;
use common::{
    AppUser, FileReceipt, InfoText, MetadataSummary, NewAppUser, NewProject,
    Project, ProjectList, ProjectStatus, StatusChange,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;


#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("resource not found")]
    NotFound,
    #[error("server responded with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("failed to read upload source: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// A file picked in an upload dialog, sent as the multipart `file` field.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> ClientResult<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, data))
    }

    fn into_form(self) -> Form {
        let part = Part::bytes(self.data.to_vec()).file_name(self.file_name);
        Form::new().part("file", part)
    }
}

/// The project endpoints the views depend on.
pub trait ProjectsApi {
    fn list_projects(&self) -> impl Future<Output = ClientResult<Vec<Project>>> + Send;

    fn get_project(&self, id: &str) -> impl Future<Output = ClientResult<Project>> + Send;

    fn upload_metadata(
        &self,
        id: &str,
        file: UploadFile,
    ) -> impl Future<Output = ClientResult<MetadataSummary>> + Send;

    fn delete_metadata(&self, id: &str) -> impl Future<Output = ClientResult<()>> + Send;

    fn set_project_status(
        &self,
        id: &str,
        status: ProjectStatus,
    ) -> impl Future<Output = ClientResult<Project>> + Send;

    fn upload_file(
        &self,
        id: &str,
        file: UploadFile,
    ) -> impl Future<Output = ClientResult<FileReceipt>> + Send;
}

#[derive(Debug, Clone)]
pub struct AdminClient {
    http: Client,
    server_base_url: String,
}

impl AdminClient {
    pub fn new(server_base_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), server_base_url)
    }

    pub fn with_http(http: Client, server_base_url: impl Into<String>) -> Self {
        Self {
            http,
            server_base_url: server_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_base_url, path)
    }

    pub async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        let response = send(self.http.get(self.url("/api/projects"))).await?;
        let list: ProjectList = decode(response).await?;
        debug!(count = list.projects.len(), "fetched project list");
        Ok(list.projects)
    }

    pub async fn get_project(&self, id: &str) -> ClientResult<Project> {
        let response = send(self.http.get(self.url(&format!("/api/projects/{id}")))).await?;
        decode(response).await
    }

    pub async fn create_project(&self, project: &NewProject) -> ClientResult<Project> {
        let response = send(self.http.post(self.url("/api/projects")).json(project)).await?;
        decode(response).await
    }

    pub async fn upload_metadata(&self, id: &str, file: UploadFile) -> ClientResult<MetadataSummary> {
        debug!(project = %id, file = %file.file_name, "uploading metadata file");
        let request = self
            .http
            .post(self.url(&format!("/api/projects/{id}/metadata")))
            .multipart(file.into_form());
        decode(send(request).await?).await
    }

    /// Only a `204 No Content` counts as removal; any other outcome is an error.
    pub async fn delete_metadata(&self, id: &str) -> ClientResult<()> {
        let response = send(
            self.http
                .delete(self.url(&format!("/api/projects/{id}/metadata"))),
        )
        .await?;

        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            status => Err(ClientError::Status {
                status,
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    pub async fn set_project_status(&self, id: &str, status: ProjectStatus) -> ClientResult<Project> {
        let request = self
            .http
            .put(self.url(&format!("/api/projects/{id}/status")))
            .json(&StatusChange {
                project_status: status,
            });
        decode(send(request).await?).await
    }

    pub async fn upload_file(&self, id: &str, file: UploadFile) -> ClientResult<FileReceipt> {
        debug!(project = %id, file = %file.file_name, "uploading project file");
        let request = self
            .http
            .post(self.url(&format!("/api/projects/{id}/files")))
            .multipart(file.into_form());
        decode(send(request).await?).await
    }

    pub async fn list_users(&self) -> ClientResult<Vec<AppUser>> {
        let response = send(self.http.get(self.url("/api/admin/users"))).await?;
        decode(response).await
    }

    pub async fn create_user(&self, user: &NewAppUser) -> ClientResult<AppUser> {
        let response = send(self.http.post(self.url("/api/admin/users")).json(user)).await?;
        decode(response).await
    }

    pub async fn delete_user(&self, user_id: i64) -> ClientResult<()> {
        send(
            self.http
                .delete(self.url(&format!("/api/admin/users/{user_id}"))),
        )
        .await?;
        Ok(())
    }

    pub async fn create_info(&self, info: &InfoText) -> ClientResult<InfoText> {
        let response = send(self.http.post(self.url("/api/admin/info")).json(info)).await?;
        decode(response).await
    }

    pub async fn update_info(&self, info: &InfoText) -> ClientResult<InfoText> {
        let response = send(self.http.put(self.url("/api/admin/info")).json(info)).await?;
        decode(response).await
    }
}

impl ProjectsApi for AdminClient {
    async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        AdminClient::list_projects(self).await
    }

    async fn get_project(&self, id: &str) -> ClientResult<Project> {
        AdminClient::get_project(self, id).await
    }

    async fn upload_metadata(&self, id: &str, file: UploadFile) -> ClientResult<MetadataSummary> {
        AdminClient::upload_metadata(self, id, file).await
    }

    async fn delete_metadata(&self, id: &str) -> ClientResult<()> {
        AdminClient::delete_metadata(self, id).await
    }

    async fn set_project_status(&self, id: &str, status: ProjectStatus) -> ClientResult<Project> {
        AdminClient::set_project_status(self, id, status).await
    }

    async fn upload_file(&self, id: &str, file: UploadFile) -> ClientResult<FileReceipt> {
        AdminClient::upload_file(self, id, file).await
    }
}

async fn send(request: RequestBuilder) -> ClientResult<Response> {
    let response = request.send().await.map_err(ClientError::Transport)?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        return Err(ClientError::NotFound);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ClientError::Status { status, body });
    }

    Ok(response)
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    response.json::<T>().await.map_err(ClientError::Decode)
}
