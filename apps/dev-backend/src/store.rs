use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use common::{
    AppUser, FileReceipt, InfoText, MetadataSummary, NewAppUser, NewProject, Project,
    ProjectStatus,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::fs;
use uuid::Uuid;

/// Users are listed by name and capped like the production admin listing.
pub const USER_LIST_LIMIT: usize = 500;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is a valid regex")
});

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error("internal store error: {0}")]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredFile {
    id: Uuid,
    project_key: i64,
    file_name: String,
    size_bytes: usize,
    uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct BackendState {
    next_project_key: i64,
    next_user_id: i64,
    projects: Vec<Project>,
    files: Vec<StoredFile>,
    users: Vec<AppUser>,
    info: Option<InfoText>,
}

/// In-memory backend state, optionally mirrored to `<data_dir>/state.json`.
pub struct ProjectStore {
    data_dir: Option<PathBuf>,
    state: BackendState,
}

impl ProjectStore {
    pub fn in_memory() -> Self {
        Self {
            data_dir: None,
            state: BackendState::default(),
        }
    }

    pub async fn init(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join("files")).await?;

        let state_path = data_dir.join("state.json");
        let state = if fs::try_exists(&state_path).await? {
            let payload = fs::read(&state_path).await?;
            serde_json::from_slice::<BackendState>(&payload)
                .with_context(|| format!("invalid backend state: {}", state_path.display()))?
        } else {
            BackendState::default()
        };

        Ok(Self {
            data_dir: Some(data_dir),
            state,
        })
    }

    pub fn project_count(&self) -> usize {
        self.state.projects.len()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.state.projects.clone()
    }

    /// Looks a project up by datastore key first, then by `project_id`.
    pub fn project(&self, route_id: &str) -> Result<&Project, StoreError> {
        let index = self.project_index(route_id)?;
        Ok(&self.state.projects[index])
    }

    fn project_index(&self, route_id: &str) -> Result<usize, StoreError> {
        let by_key = route_id
            .parse::<i64>()
            .ok()
            .and_then(|key| {
                self.state
                    .projects
                    .iter()
                    .position(|project| project.key == Some(key))
            });

        by_key
            .or_else(|| {
                self.state
                    .projects
                    .iter()
                    .position(|project| project.project_id == route_id)
            })
            .ok_or(StoreError::NotFound)
    }

    pub async fn create_project(
        &mut self,
        request: NewProject,
        created_by: &str,
    ) -> Result<Project, StoreError> {
        let name = request.project_name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("project name must not be empty".to_string()));
        }

        let key = self.state.next_project_key + 1;
        let project_id = match request
            .project_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
        {
            Some(id) => {
                validate_project_id(&id)?;
                id
            }
            None => format!("P-{key:04}"),
        };

        if self.project_index(&project_id).is_ok() {
            return Err(StoreError::Invalid(format!(
                "project id already in use: {project_id}"
            )));
        }

        let project = Project {
            key: Some(key),
            project_id,
            project_name: name.to_string(),
            project_description: request.project_description,
            created: Utc::now(),
            createdby_email: created_by.to_string(),
            project_status: ProjectStatus::New,
            sample_summary: None,
        };

        let mut next = self.state.clone();
        next.next_project_key = key;
        next.projects.push(project.clone());
        self.commit(next).await?;
        Ok(project)
    }

    pub async fn replace_metadata(
        &mut self,
        route_id: &str,
        csv_payload: &[u8],
        uploaded_by: &str,
    ) -> Result<MetadataSummary, StoreError> {
        let index = self.project_index(route_id)?;
        let summary = summarize_metadata(csv_payload, uploaded_by, Utc::now())?;

        let mut next = self.state.clone();
        next.projects[index].sample_summary = Some(summary.clone());
        self.commit(next).await?;
        Ok(summary)
    }

    /// Removing metadata that is already gone still succeeds.
    pub async fn clear_metadata(&mut self, route_id: &str) -> Result<(), StoreError> {
        let index = self.project_index(route_id)?;
        if self.state.projects[index].sample_summary.is_some() {
            let mut next = self.state.clone();
            next.projects[index].sample_summary = None;
            self.commit(next).await?;
        }
        Ok(())
    }

    pub async fn set_status(
        &mut self,
        route_id: &str,
        status: ProjectStatus,
    ) -> Result<Project, StoreError> {
        if status == ProjectStatus::Unknown {
            return Err(StoreError::Invalid("unsupported project status".to_string()));
        }

        let index = self.project_index(route_id)?;
        let mut next = self.state.clone();
        next.projects[index].project_status = status;
        let updated = next.projects[index].clone();
        self.commit(next).await?;
        Ok(updated)
    }

    pub async fn add_file(
        &mut self,
        route_id: &str,
        file_name: &str,
        payload: Bytes,
    ) -> Result<FileReceipt, StoreError> {
        let index = self.project_index(route_id)?;
        let project_key = self.state.projects[index].key.unwrap_or_default();
        let file_name = sanitize_file_name(file_name);
        let stored = StoredFile {
            id: Uuid::new_v4(),
            project_key,
            file_name: file_name.clone(),
            size_bytes: payload.len(),
            uploaded_at: Utc::now(),
        };

        if let Some(data_dir) = &self.data_dir {
            let path = data_dir
                .join("files")
                .join(project_key.to_string())
                .join(format!("{}-{}", stored.id, file_name));
            write_atomic(&path, &payload).await?;
        }

        let mut next = self.state.clone();
        next.files.push(stored);
        self.commit(next).await?;

        Ok(FileReceipt {
            file_name,
            size_bytes: payload.len(),
        })
    }

    pub fn file_count(&self, route_id: &str) -> Result<usize, StoreError> {
        let key = self.project(route_id)?.key.unwrap_or_default();
        Ok(self
            .state
            .files
            .iter()
            .filter(|file| file.project_key == key)
            .count())
    }

    pub fn users(&self) -> Vec<AppUser> {
        let mut users = self.state.users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        users.truncate(USER_LIST_LIMIT);
        users
    }

    pub async fn create_user(&mut self, request: NewAppUser) -> Result<AppUser, StoreError> {
        validate_email(&request.email)?;
        if self
            .state
            .users
            .iter()
            .any(|user| user.email.eq_ignore_ascii_case(&request.email))
        {
            return Err(StoreError::Invalid(
                "User with email already exists".to_string(),
            ));
        }
        if request.name.trim().is_empty() || request.organization.trim().is_empty() {
            return Err(StoreError::Invalid(
                "name and organization are required".to_string(),
            ));
        }

        let mut next = self.state.clone();
        next.next_user_id += 1;
        let user = AppUser {
            user_id: next.next_user_id,
            name: request.name,
            email: request.email,
            organization: request.organization,
            created_at: Utc::now(),
        };

        next.users.push(user.clone());
        self.commit(next).await?;
        Ok(user)
    }

    /// Deleting an unknown id succeeds, matching the datastore semantics.
    pub async fn delete_user(&mut self, user_id: i64) -> Result<(), StoreError> {
        if self.state.users.iter().any(|user| user.user_id == user_id) {
            let mut next = self.state.clone();
            next.users.retain(|user| user.user_id != user_id);
            self.commit(next).await?;
        }
        Ok(())
    }

    pub async fn create_info(&mut self, info: InfoText) -> Result<InfoText, StoreError> {
        if self.state.info.is_some() {
            return Err(StoreError::Invalid("Info text already exists".to_string()));
        }
        let mut next = self.state.clone();
        next.info = Some(info.clone());
        self.commit(next).await?;
        Ok(info)
    }

    pub async fn update_info(&mut self, info: InfoText) -> Result<InfoText, StoreError> {
        if self.state.info.is_none() {
            return Err(StoreError::Invalid(
                "Updating info text failed, none exist".to_string(),
            ));
        }
        let mut next = self.state.clone();
        next.info = Some(info.clone());
        self.commit(next).await?;
        Ok(info)
    }

    /// Writes `next` to disk and only then swaps it in, so a failed write
    /// leaves the served state untouched.
    async fn commit(&mut self, next: BackendState) -> Result<(), StoreError> {
        if let Some(data_dir) = &self.data_dir {
            let payload = serde_json::to_vec_pretty(&next).context("failed to encode state")?;
            write_atomic(&data_dir.join("state.json"), &payload).await?;
        }
        self.state = next;
        Ok(())
    }
}

pub fn validate_email(email: &str) -> Result<(), StoreError> {
    if EMAIL_PATTERN.is_match(email) {
        Ok(())
    } else {
        Err(StoreError::Invalid("Email address is not valid".to_string()))
    }
}

/// Client-chosen ids must stay addressable in a URL path and must not collide
/// with numeric datastore keys, which take precedence on lookup.
pub fn validate_project_id(project_id: &str) -> Result<(), StoreError> {
    if project_id.parse::<i64>().is_ok() {
        return Err(StoreError::Invalid(format!(
            "project id must not be numeric: {project_id}"
        )));
    }
    if !project_id
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
    {
        return Err(StoreError::Invalid(format!(
            "project id may only contain letters, digits, '.', '_' and '-': {project_id}"
        )));
    }
    Ok(())
}

/// Builds a summary from a CSV upload: the header row plus the record count.
pub fn summarize_metadata(
    csv_payload: &[u8],
    uploaded_by: &str,
    uploaded_at: DateTime<Utc>,
) -> Result<MetadataSummary, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(csv_payload);

    let headers = reader
        .headers()
        .map_err(|err| StoreError::Invalid(format!("unreadable metadata header: {err}")))?
        .iter()
        .map(|header| header.trim().to_string())
        .collect::<Vec<_>>();
    if headers.iter().all(String::is_empty) {
        return Err(StoreError::Invalid(
            "metadata file has no header row".to_string(),
        ));
    }

    let mut rowcount = 0u64;
    for record in reader.records() {
        record.map_err(|err| StoreError::Invalid(format!("unreadable metadata row: {err}")))?;
        rowcount += 1;
    }

    Ok(MetadataSummary {
        rowcount,
        headers,
        uploadedat: uploaded_at,
        uploadedby: uploaded_by.to_string(),
    })
}

fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        "upload".to_string()
    } else {
        base.to_string()
    }
}

async fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path has no parent: {}", path.display()))?;
    fs::create_dir_all(parent).await?;

    let tmp = path.with_extension(format!(
        "tmp-{}-{}",
        std::process::id(),
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    ));

    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path)
        .await
        .with_context(|| format!("failed to move {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
