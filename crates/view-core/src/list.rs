use client_sdk::{ClientResult, ProjectsApi};
use common::Project;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProjectListState {
    #[default]
    Loading,
    Loaded(Vec<Project>),
    /// The failure is logged only; nothing is surfaced to the user.
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectListView {
    state: ProjectListState,
}

impl ProjectListView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load<A: ProjectsApi>(api: &A) -> Self {
        let mut view = Self::new();
        view.resolve(api.list_projects().await);
        view
    }

    pub fn resolve(&mut self, result: ClientResult<Vec<Project>>) {
        if self.state != ProjectListState::Loading {
            debug!("project list already resolved, ignoring late result");
            return;
        }

        self.state = match result {
            Ok(mut projects) => {
                sort_newest_first(&mut projects);
                ProjectListState::Loaded(projects)
            }
            Err(err) => {
                error!(error = %err, "failed to fetch project list");
                ProjectListState::Failed
            }
        };
    }

    pub fn state(&self) -> &ProjectListState {
        &self.state
    }

    pub fn projects(&self) -> &[Project] {
        match &self.state {
            ProjectListState::Loaded(projects) => projects,
            ProjectListState::Loading | ProjectListState::Failed => &[],
        }
    }
}

/// Orders by creation time, newest first. Ties keep their response order.
pub fn sort_newest_first(projects: &mut [Project]) {
    projects.sort_by(|a, b| b.created.cmp(&a.created));
}
