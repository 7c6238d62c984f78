use chrono::{DateTime, Local, Utc};
use common::{MetadataSummary, ProjectStatus, status_label};
use view_core::{
    DetailState, Dialog, LoadedProject, ProjectDetailView, ProjectListState, ProjectListView,
    StatusControl,
};

const STYLE: &str = r#"
    body { font-family: system-ui, sans-serif; margin: 1.5rem; background: #fafafa; }
    main { max-width: 960px; margin: 0 auto; }
    section { background: #fff; border: 1px solid #ddd; border-radius: 8px; padding: 1rem; margin-bottom: 1rem; }
    h1, h2 { margin-top: 0; }
    table { width: 100%; border-collapse: collapse; background: #fff; }
    th, td { text-align: left; padding: 0.5rem; border-bottom: 1px solid #eee; }
    .header { display: grid; grid-template-columns: 1fr 1fr; gap: 0.75rem; align-items: start; }
    .actions { margin-top: 0.6rem; display: flex; gap: 0.5rem; flex-wrap: wrap; }
    .button, button { padding: 0.5rem 0.8rem; border: 1px solid #888; border-radius: 6px; background: #f5f5f5; cursor: pointer; color: inherit; text-decoration: none; font: inherit; }
    .dialog { border-color: #3f51b5; }
    .error { color: #b00020; }
    .muted { color: #666; font-size: 0.92rem; }
"#;

pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn format_datetime(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>
<html lang=\"en\">
<head>
    <meta charset=\"utf-8\" />
    <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\" />
    <title>{}</title>
    <style>{STYLE}</style>
</head>
<body>
    <main>
{body}
    </main>
</body>
</html>
",
        escape_html(title)
    )
}

pub fn project_list_html(view: &ProjectListView) -> String {
    let body = match view.state() {
        ProjectListState::Loaded(projects) if !projects.is_empty() => {
            let rows = projects
                .iter()
                .map(|project| {
                    format!(
                        "            <tr>
                <td>{}</td>
                <td><a href=\"/projects/{}\">{}</a></td>
                <td>{}</td>
                <td>{}</td>
                <td>{}</td>
            </tr>\n",
                        escape_html(&project.project_id),
                        escape_html(&project.route_id()),
                        escape_html(&project.project_name),
                        format_date(project.created),
                        escape_html(&project.project_description),
                        status_label(project.project_status),
                    )
                })
                .collect::<String>();

            format!(
                "        <h1>Projects</h1>
        <table>
            <thead>
                <tr><th>Project ID</th><th>Name</th><th>Created</th><th>Description</th><th>Status</th></tr>
            </thead>
            <tbody>
{rows}            </tbody>
        </table>"
            )
        }
        ProjectListState::Loaded(_) => {
            "        <h1>Projects</h1>\n        <p class=\"muted\">No projects</p>".to_string()
        }
        // A failed fetch is only logged; the page looks the same as while loading.
        ProjectListState::Loading | ProjectListState::Failed => "        <p>Loading</p>".to_string(),
    };

    page("Projects", &body)
}

pub fn project_detail_html(view: &ProjectDetailView) -> String {
    let route_id = escape_html(view.route_id());
    let status_form = view
        .status_control()
        .zip(view.loaded())
        .map(|(control, loaded)| {
            status_form_html(&route_id, control, loaded.status_error.as_deref())
        })
        .unwrap_or_default();

    let content = match view.state() {
        DetailState::Loading => "        <p>Loading…</p>".to_string(),
        DetailState::Failed(err) => format!("        <p class=\"error\">{}</p>", err.message()),
        DetailState::Loaded(loaded) => loaded_html(&route_id, loaded),
    };

    let body = format!(
        "        <div class=\"header\">
            <h1>Project page</h1>
            <div>{status_form}</div>
        </div>
{content}"
    );

    page("Project page", &body)
}

/// Current status first and preselected, then the statuses it can move to.
fn status_form_html(route_id: &str, control: StatusControl<'_>, error: Option<&str>) -> String {
    let current = control.current();
    let mut options = String::new();
    if current != ProjectStatus::Unknown {
        options.push_str(&format!(
            "<option value=\"{}\" selected>{}</option>",
            current.as_str(),
            status_label(current)
        ));
    }
    for status in control.options() {
        options.push_str(&format!(
            "<option value=\"{}\">{}</option>",
            status.as_str(),
            status_label(status)
        ));
    }

    let error = error
        .map(|message| format!("<p class=\"error\">{}</p>", escape_html(message)))
        .unwrap_or_default();

    format!(
        "<form method=\"post\" action=\"/projects/{route_id}/status\" class=\"actions\">
                <select name=\"status\">{options}</select>
                <button type=\"submit\">Change status</button>
            </form>{error}"
    )
}

fn loaded_html(route_id: &str, loaded: &LoadedProject) -> String {
    let project = &loaded.project;

    let metadata = match &loaded.metadata {
        Some(summary) => metadata_panel_html(route_id, summary, loaded.metadata_error.as_deref()),
        None => format!(
            "        <div class=\"actions\"><a class=\"button\" href=\"/projects/{route_id}?dialog=metadata\">Add metadata file</a></div>"
        ),
    };

    format!(
        "        <section>
            <p>Name: {}</p>
            <p>Id: {}</p>
            <p>Description: {}</p>
            <p>Project started: {}</p>
            <p>Project creator: {}</p>
            <p>Project status: {}</p>
        </section>
{metadata}
        <div class=\"actions\"><a class=\"button\" href=\"/projects/{route_id}?dialog=file\">Add file</a></div>
{}",
        escape_html(&project.project_name),
        escape_html(&project.project_id),
        escape_html(&project.project_description),
        format_datetime(project.created),
        escape_html(&project.createdby_email),
        status_label(loaded.status()),
        dialog_html(route_id, &loaded.dialog),
    )
}

fn metadata_panel_html(route_id: &str, summary: &MetadataSummary, error: Option<&str>) -> String {
    let headers = summary
        .display_headers()
        .iter()
        .map(|header| format!("<li>{}</li>", escape_html(header)))
        .collect::<String>();
    let error = error
        .map(|message| format!("\n            <p class=\"error\">{}</p>", escape_html(message)))
        .unwrap_or_default();

    format!(
        "        <section id=\"metadata\">
            <h2>Metadata</h2>
            <p>Rows: {}</p>
            <p>Columns:</p>
            <ul>{headers}</ul>
            <p class=\"muted\">Uploaded {} by {}</p>{error}
            <div class=\"actions\"><a class=\"button\" href=\"/projects/{route_id}?dialog=discard\">Remove metadata</a></div>
        </section>",
        summary.rowcount,
        format_datetime(summary.uploadedat),
        escape_html(&summary.uploadedby),
    )
}

fn dialog_html(route_id: &str, dialog: &Dialog) -> String {
    match dialog {
        Dialog::Closed => String::new(),
        Dialog::MetadataUpload { error } => upload_dialog_html(
            "Metadata file upload",
            &format!("/projects/{route_id}/metadata"),
            route_id,
            error.as_deref(),
        ),
        Dialog::FileUpload { error } => upload_dialog_html(
            "Upload file",
            &format!("/projects/{route_id}/files"),
            route_id,
            error.as_deref(),
        ),
        Dialog::ConfirmDiscard => format!(
            "        <section class=\"dialog\" id=\"confirm-dialog\">
            <h2>Remove metadata</h2>
            <p>Are you sure you want to remove metadata permanently?</p>
            <form method=\"post\" action=\"/projects/{route_id}/metadata/discard\" class=\"actions\">
                <button type=\"submit\">Delete metadata</button>
                <a class=\"button\" href=\"/projects/{route_id}\">Cancel</a>
            </form>
        </section>"
        ),
        Dialog::Discarding => "        <section class=\"dialog\" id=\"confirm-dialog\">
            <h2>Remove metadata</h2>
            <p class=\"muted\">Removing metadata…</p>
        </section>"
            .to_string(),
    }
}

fn upload_dialog_html(title: &str, action: &str, route_id: &str, error: Option<&str>) -> String {
    let error = error
        .map(|message| format!("\n            <p class=\"error\">{}</p>", escape_html(message)))
        .unwrap_or_default();

    format!(
        "        <section class=\"dialog\" id=\"upload-dialog\">
            <h2>{title}</h2>{error}
            <form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\" class=\"actions\">
                <input type=\"file\" name=\"file\" required />
                <button type=\"submit\">Upload</button>
                <a class=\"button\" href=\"/projects/{route_id}\">Cancel</a>
            </form>
        </section>"
    )
}
