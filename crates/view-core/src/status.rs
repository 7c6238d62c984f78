use client_sdk::{ClientResult, ProjectsApi};
use common::ProjectStatus;
use tracing::info;

/// Result handed back to the detail view once a status change completes.
pub type StatusOutcome = ClientResult<ProjectStatus>;

/// Issues status changes for one project. Transitions are not validated here;
/// the backend has the final say.
#[derive(Debug, Clone, Copy)]
pub struct StatusControl<'a> {
    project_id: &'a str,
    current: ProjectStatus,
}

impl<'a> StatusControl<'a> {
    pub fn new(project_id: &'a str, current: ProjectStatus) -> Self {
        Self {
            project_id,
            current,
        }
    }

    pub fn current(&self) -> ProjectStatus {
        self.current
    }

    pub fn options(&self) -> Vec<ProjectStatus> {
        ProjectStatus::SELECTABLE
            .into_iter()
            .filter(|status| *status != self.current)
            .collect()
    }

    pub async fn submit<A: ProjectsApi>(&self, api: &A, target: ProjectStatus) -> StatusOutcome {
        let project = api.set_project_status(self.project_id, target).await?;
        info!(
            project = %self.project_id,
            from = %self.current,
            to = %project.project_status,
            "project status changed"
        );
        Ok(project.project_status)
    }
}
