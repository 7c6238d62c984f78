use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Leading metadata columns that are bookkeeping fields and never displayed.
pub const HIDDEN_HEADER_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    New,
    Ongoing,
    Closed,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ProjectStatus {
    /// Statuses a user may pick in the status control.
    pub const SELECTABLE: [ProjectStatus; 3] = [Self::New, Self::Ongoing, Self::Closed];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Ongoing => "ongoing",
            Self::Closed => "closed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::SELECTABLE
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unsupported project status: {value}"))
    }
}

pub fn status_label(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::New => "New",
        ProjectStatus::Ongoing => "Ongoing",
        ProjectStatus::Closed => "Closed",
        ProjectStatus::Unknown => "Unknown",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetadataSummary {
    pub rowcount: u64,
    #[serde(default)]
    pub headers: Vec<String>,
    pub uploadedat: DateTime<Utc>,
    #[serde(default)]
    pub uploadedby: String,
}

impl MetadataSummary {
    pub fn display_headers(&self) -> &[String] {
        self.headers.get(HIDDEN_HEADER_COUNT..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    /// Backend datastore key; list rows link with it when present.
    #[serde(rename = "ID", default, skip_serializing_if = "Option::is_none")]
    pub key: Option<i64>,
    pub project_id: String,
    pub project_name: String,
    #[serde(default)]
    pub project_description: String,
    #[serde(rename = "Created")]
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub createdby_email: String,
    #[serde(default)]
    pub project_status: ProjectStatus,
    #[serde(default)]
    pub sample_summary: Option<MetadataSummary>,
}

impl Project {
    pub fn route_id(&self) -> String {
        match self.key {
            Some(key) => key.to_string(),
            None => self.project_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ProjectList {
    #[serde(default)]
    pub projects: Vec<Project>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewProject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub project_name: String,
    #[serde(default)]
    pub project_description: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub project_status: ProjectStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileReceipt {
    pub file_name: String,
    pub size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppUser {
    pub user_id: i64,
    pub name: String,
    pub email: String,
    pub organization: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewAppUser {
    pub name: String,
    pub email: String,
    pub organization: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InfoText {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub role: String,
    pub online: bool,
}
