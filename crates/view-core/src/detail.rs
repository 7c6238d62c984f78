use client_sdk::{ClientError, ClientResult, ProjectsApi, UploadFile};
use common::{FileReceipt, MetadataSummary, Project, ProjectStatus};
use tracing::{debug, info, warn};

use crate::status::{StatusControl, StatusOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailError {
    NotFound,
    Unknown,
}

impl DetailError {
    pub fn message(self) -> &'static str {
        match self {
            Self::NotFound => "no such project",
            Self::Unknown => "unknown error",
        }
    }
}

impl From<&ClientError> for DetailError {
    fn from(err: &ClientError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::Unknown
        }
    }
}

/// Which dialog, if any, is open over a loaded project.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Dialog {
    #[default]
    Closed,
    MetadataUpload {
        error: Option<String>,
    },
    FileUpload {
        error: Option<String>,
    },
    ConfirmDiscard,
    /// Delete request in flight; the confirmation stays up until it completes.
    Discarding,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedProject {
    /// `sample_summary` is always moved out into `metadata`.
    pub project: Project,
    pub metadata: Option<MetadataSummary>,
    pub metadata_error: Option<String>,
    pub status_error: Option<String>,
    pub dialog: Dialog,
}

impl LoadedProject {
    fn new(mut project: Project) -> Self {
        let metadata = project.sample_summary.take();
        Self {
            project,
            metadata,
            metadata_error: None,
            status_error: None,
            dialog: Dialog::Closed,
        }
    }

    pub fn status(&self) -> ProjectStatus {
        self.project.project_status
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DetailState {
    #[default]
    Loading,
    Loaded(Box<LoadedProject>),
    Failed(DetailError),
}

#[derive(Debug)]
pub enum DetailEvent {
    Fetched(ClientResult<Project>),
    OpenMetadataUpload,
    OpenFileUpload,
    RequestDiscard,
    CloseDialog,
    DiscardConfirmed,
    MetadataUploaded(ClientResult<MetadataSummary>),
    MetadataDiscarded(ClientResult<()>),
    FileUploaded(ClientResult<FileReceipt>),
    StatusChanged(StatusOutcome),
}

#[derive(Debug, Clone)]
pub struct ProjectDetailView {
    route_id: String,
    state: DetailState,
}

impl ProjectDetailView {
    pub fn new(route_id: impl Into<String>) -> Self {
        Self {
            route_id: route_id.into(),
            state: DetailState::Loading,
        }
    }

    pub async fn load<A: ProjectsApi>(api: &A, route_id: impl Into<String>) -> Self {
        let mut view = Self::new(route_id);
        let fetched = api.get_project(&view.route_id).await;
        view.apply(DetailEvent::Fetched(fetched));
        view
    }

    pub fn route_id(&self) -> &str {
        &self.route_id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn loaded(&self) -> Option<&LoadedProject> {
        match &self.state {
            DetailState::Loaded(loaded) => Some(loaded),
            DetailState::Loading | DetailState::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<DetailError> {
        match self.state {
            DetailState::Failed(err) => Some(err),
            DetailState::Loading | DetailState::Loaded(_) => None,
        }
    }

    pub fn dialog(&self) -> Option<&Dialog> {
        self.loaded().map(|loaded| &loaded.dialog)
    }

    pub fn status_control(&self) -> Option<StatusControl<'_>> {
        self.loaded()
            .map(|loaded| StatusControl::new(&self.route_id, loaded.status()))
    }

    pub fn apply(&mut self, event: DetailEvent) {
        if let DetailState::Loaded(loaded) = &mut self.state {
            apply_loaded(loaded, event);
            return;
        }

        match event {
            DetailEvent::Fetched(result) if matches!(self.state, DetailState::Loading) => {
                self.state = match result {
                    Ok(project) => DetailState::Loaded(Box::new(LoadedProject::new(project))),
                    Err(err) => {
                        warn!(project = %self.route_id, error = %err, "failed to fetch project");
                        DetailState::Failed(DetailError::from(&err))
                    }
                };
            }
            event => debug!(project = %self.route_id, ?event, "ignoring event outside loaded state"),
        }
    }

    pub async fn upload_metadata<A: ProjectsApi>(&mut self, api: &A, file: UploadFile) {
        if self.loaded().is_none() {
            return;
        }
        if !matches!(self.dialog(), Some(Dialog::MetadataUpload { .. })) {
            self.apply(DetailEvent::OpenMetadataUpload);
        }
        let uploaded = api.upload_metadata(&self.route_id, file).await;
        self.apply(DetailEvent::MetadataUploaded(uploaded));
    }

    /// Runs the confirmed delete. Does nothing unless the confirmation is open.
    pub async fn discard_metadata<A: ProjectsApi>(&mut self, api: &A) {
        self.apply(DetailEvent::DiscardConfirmed);
        if self.dialog() != Some(&Dialog::Discarding) {
            return;
        }
        let removed = api.delete_metadata(&self.route_id).await;
        self.apply(DetailEvent::MetadataDiscarded(removed));
    }

    pub async fn upload_file<A: ProjectsApi>(&mut self, api: &A, file: UploadFile) {
        if self.loaded().is_none() {
            return;
        }
        if !matches!(self.dialog(), Some(Dialog::FileUpload { .. })) {
            self.apply(DetailEvent::OpenFileUpload);
        }
        let uploaded = api.upload_file(&self.route_id, file).await;
        self.apply(DetailEvent::FileUploaded(uploaded));
    }

    pub async fn change_status<A: ProjectsApi>(&mut self, api: &A, target: ProjectStatus) {
        let Some(control) = self.status_control() else {
            return;
        };
        let outcome = control.submit(api, target).await;
        self.apply(DetailEvent::StatusChanged(outcome));
    }
}

fn apply_loaded(loaded: &mut LoadedProject, event: DetailEvent) {
    match event {
        DetailEvent::Fetched(_) => debug!("project already loaded, ignoring fetch result"),
        DetailEvent::OpenMetadataUpload => {
            loaded.dialog = Dialog::MetadataUpload { error: None };
        }
        DetailEvent::OpenFileUpload => {
            loaded.dialog = Dialog::FileUpload { error: None };
        }
        DetailEvent::RequestDiscard => {
            if loaded.metadata.is_some() {
                loaded.dialog = Dialog::ConfirmDiscard;
            }
        }
        DetailEvent::CloseDialog => {
            if loaded.dialog != Dialog::Discarding {
                loaded.dialog = Dialog::Closed;
            }
        }
        DetailEvent::DiscardConfirmed => {
            if loaded.dialog == Dialog::ConfirmDiscard {
                loaded.dialog = Dialog::Discarding;
            }
        }
        DetailEvent::MetadataUploaded(Ok(summary)) => {
            info!(
                project = %loaded.project.project_id,
                rows = summary.rowcount,
                "metadata summary replaced"
            );
            loaded.metadata = Some(summary);
            loaded.metadata_error = None;
            loaded.dialog = Dialog::Closed;
        }
        DetailEvent::MetadataUploaded(Err(err)) => {
            loaded.dialog = Dialog::MetadataUpload {
                error: Some(format!("Metadata upload failed: {err}")),
            };
        }
        DetailEvent::MetadataDiscarded(result) => {
            match result {
                Ok(()) => {
                    loaded.metadata = None;
                    loaded.metadata_error = None;
                }
                Err(err) => {
                    warn!(project = %loaded.project.project_id, error = %err, "failed to remove metadata");
                    loaded.metadata_error = Some(format!("Metadata could not be removed: {err}"));
                }
            }
            loaded.dialog = Dialog::Closed;
        }
        DetailEvent::FileUploaded(Ok(receipt)) => {
            debug!(file = %receipt.file_name, size = receipt.size_bytes, "file uploaded");
            loaded.dialog = Dialog::Closed;
        }
        DetailEvent::FileUploaded(Err(err)) => {
            loaded.dialog = Dialog::FileUpload {
                error: Some(format!("File upload failed: {err}")),
            };
        }
        DetailEvent::StatusChanged(Ok(status)) => {
            loaded.project.project_status = status;
            loaded.status_error = None;
        }
        DetailEvent::StatusChanged(Err(err)) => {
            loaded.status_error = Some(format!("Status could not be changed: {err}"));
        }
    }
}
