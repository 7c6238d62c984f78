use std::sync::Mutex;

use client_sdk::{ClientError, ClientResult, ProjectsApi, UploadFile};
use common::{FileReceipt, MetadataSummary, Project, ProjectStatus};
use reqwest::StatusCode;

pub(crate) fn project(id: &str, created: &str) -> Project {
    Project {
        key: None,
        project_id: id.to_string(),
        project_name: format!("Project {id}"),
        project_description: "test project".to_string(),
        created: created.parse().expect("valid timestamp"),
        createdby_email: "owner@example.org".to_string(),
        project_status: ProjectStatus::New,
        sample_summary: None,
    }
}

pub(crate) fn summary(headers: &[&str]) -> MetadataSummary {
    MetadataSummary {
        rowcount: 12,
        headers: headers.iter().map(|header| header.to_string()).collect(),
        uploadedat: "2018-04-01T12:00:00Z".parse().expect("valid timestamp"),
        uploadedby: "owner@example.org".to_string(),
    }
}

pub(crate) fn server_error() -> ClientError {
    ClientError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".to_string(),
    }
}

pub(crate) enum FakeProject {
    Found(Project),
    Missing,
    Broken,
}

/// Canned backend. `None` / `false` fields answer with a 500.
pub(crate) struct FakeApi {
    pub projects: Option<Vec<Project>>,
    pub project: FakeProject,
    pub upload_summary: Option<MetadataSummary>,
    pub delete_ok: bool,
    pub status_ok: bool,
    pub file_ok: bool,
    pub(crate) calls: Mutex<Vec<String>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            projects: None,
            project: FakeProject::Missing,
            upload_summary: None,
            delete_ok: false,
            status_ok: false,
            file_ok: false,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl FakeApi {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl ProjectsApi for FakeApi {
    async fn list_projects(&self) -> ClientResult<Vec<Project>> {
        self.record("list".to_string());
        self.projects.clone().ok_or_else(server_error)
    }

    async fn get_project(&self, id: &str) -> ClientResult<Project> {
        self.record(format!("get {id}"));
        match &self.project {
            FakeProject::Found(project) => Ok(project.clone()),
            FakeProject::Missing => Err(ClientError::NotFound),
            FakeProject::Broken => Err(server_error()),
        }
    }

    async fn upload_metadata(&self, id: &str, file: UploadFile) -> ClientResult<MetadataSummary> {
        self.record(format!("upload_metadata {id} {}", file.file_name));
        self.upload_summary.clone().ok_or_else(server_error)
    }

    async fn delete_metadata(&self, id: &str) -> ClientResult<()> {
        self.record(format!("delete_metadata {id}"));
        if self.delete_ok {
            Ok(())
        } else {
            Err(server_error())
        }
    }

    async fn set_project_status(&self, id: &str, status: ProjectStatus) -> ClientResult<Project> {
        self.record(format!("set_status {id} {status}"));
        if !self.status_ok {
            return Err(server_error());
        }
        let mut updated = project(id, "2018-01-01T00:00:00Z");
        updated.project_status = status;
        Ok(updated)
    }

    async fn upload_file(&self, id: &str, file: UploadFile) -> ClientResult<FileReceipt> {
        self.record(format!("upload_file {id} {}", file.file_name));
        if !self.file_ok {
            return Err(server_error());
        }
        Ok(FileReceipt {
            size_bytes: file.data.len(),
            file_name: file.file_name,
        })
    }
}
