use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client_sdk::{AdminClient, UploadFile};
use common::{InfoText, NewAppUser, NewProject, ProjectStatus, status_label};
use tracing::info;
use tracing_subscriber::EnvFilter;
use view_core::{DetailState, ProjectDetailView, sort_newest_first};

mod web;

#[derive(Debug, Parser)]
#[command(name = "project-admin")]
#[command(about = "Admin client for managing projects, metadata files and users")]
struct Cli {
    #[arg(long, env = "PROJECT_ADMIN_SERVER_URL", default_value = "http://127.0.0.1:8080")]
    server_url: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    List,
    Show {
        id: String,
    },
    CreateProject {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        project_id: Option<String>,
    },
    UploadMetadata {
        id: String,
        path: PathBuf,
    },
    DeleteMetadata {
        id: String,
    },
    UploadFile {
        id: String,
        path: PathBuf,
    },
    SetStatus {
        id: String,
        status: ProjectStatus,
    },
    Users {
        #[command(subcommand)]
        command: UserCommands,
    },
    Info {
        #[command(subcommand)]
        command: InfoCommands,
    },
    ServeWeb {
        #[arg(long, default_value = "127.0.0.1:8081")]
        bind: String,
    },
}

#[derive(Debug, Subcommand)]
enum UserCommands {
    List,
    Create {
        name: String,
        email: String,
        organization: String,
    },
    Delete {
        user_id: i64,
    },
}

#[derive(Debug, Subcommand)]
enum InfoCommands {
    Create { title: String, content: String },
    Update { title: String, content: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(matches!(cli.command, Commands::ServeWeb { .. }));
    let client = AdminClient::new(&cli.server_url);

    match cli.command {
        Commands::List => {
            let mut projects = client
                .list_projects()
                .await
                .context("failed to list projects")?;
            sort_newest_first(&mut projects);
            for project in projects {
                println!(
                    "{}\t{}\t{}\t{}",
                    project.project_id,
                    project.project_name,
                    project.created.format("%Y-%m-%d"),
                    status_label(project.project_status)
                );
            }
        }
        Commands::Show { id } => {
            let view = ProjectDetailView::load(&client, id).await;
            match view.state() {
                DetailState::Loaded(loaded) => {
                    let project = &loaded.project;
                    println!("Name: {}", project.project_name);
                    println!("Id: {}", project.project_id);
                    println!("Description: {}", project.project_description);
                    println!("Project started: {}", project.created.to_rfc3339());
                    println!("Project creator: {}", project.createdby_email);
                    println!("Project status: {}", status_label(loaded.status()));
                    match &loaded.metadata {
                        Some(summary) => {
                            println!("Metadata rows: {}", summary.rowcount);
                            println!("Metadata columns: {}", summary.display_headers().join(", "));
                            println!(
                                "Metadata uploaded: {} by {}",
                                summary.uploadedat.to_rfc3339(),
                                summary.uploadedby
                            );
                        }
                        None => println!("Metadata: none"),
                    }
                }
                DetailState::Failed(err) => bail!("{}", err.message()),
                DetailState::Loading => bail!("project did not load"),
            }
        }
        Commands::CreateProject {
            name,
            description,
            project_id,
        } => {
            let project = client
                .create_project(&NewProject {
                    project_id,
                    project_name: name,
                    project_description: description,
                })
                .await
                .context("failed to create project")?;
            println!("created project '{}' ({})", project.project_id, project.route_id());
        }
        Commands::UploadMetadata { id, path } => {
            let file = UploadFile::from_path(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let summary = client
                .upload_metadata(&id, file)
                .await
                .with_context(|| format!("failed to upload metadata for project={id}"))?;
            println!(
                "metadata uploaded: {} rows, columns: {}",
                summary.rowcount,
                summary.display_headers().join(", ")
            );
        }
        Commands::DeleteMetadata { id } => {
            client
                .delete_metadata(&id)
                .await
                .map_err(|err| anyhow::anyhow!("Metadata could not be removed: {err}"))?;
            println!("metadata removed from project {id}");
        }
        Commands::UploadFile { id, path } => {
            let file = UploadFile::from_path(&path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            let receipt = client
                .upload_file(&id, file)
                .await
                .with_context(|| format!("failed to upload file for project={id}"))?;
            println!("uploaded '{}' ({} bytes)", receipt.file_name, receipt.size_bytes);
        }
        Commands::SetStatus { id, status } => {
            let project = client
                .set_project_status(&id, status)
                .await
                .with_context(|| format!("failed to set status for project={id}"))?;
            println!(
                "project {} is now {}",
                project.project_id,
                status_label(project.project_status)
            );
        }
        Commands::Users { command } => run_user_command(&client, command).await?,
        Commands::Info { command } => {
            let info = match command {
                InfoCommands::Create { title, content } => client
                    .create_info(&InfoText { title, content })
                    .await
                    .context("failed to create info text")?,
                InfoCommands::Update { title, content } => client
                    .update_info(&InfoText { title, content })
                    .await
                    .context("failed to update info text")?,
            };
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::ServeWeb { bind } => {
            let bind_addr: SocketAddr = bind.parse()?;
            let app = web::router(web::WebState::new(client));

            info!(%bind_addr, server_url = %cli.server_url, "web interface listening");
            println!("web interface at http://{bind_addr}");
            let listener = tokio::net::TcpListener::bind(bind_addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

async fn run_user_command(client: &AdminClient, command: UserCommands) -> Result<()> {
    match command {
        UserCommands::List => {
            for user in client.list_users().await.context("failed to list users")? {
                println!(
                    "{}\t{}\t{}\t{}",
                    user.user_id, user.name, user.email, user.organization
                );
            }
        }
        UserCommands::Create {
            name,
            email,
            organization,
        } => {
            let user = client
                .create_user(&NewAppUser {
                    name,
                    email,
                    organization,
                })
                .await
                .context("failed to create user")?;
            println!("created user {} <{}>", user.user_id, user.email);
        }
        UserCommands::Delete { user_id } => {
            client
                .delete_user(user_id)
                .await
                .with_context(|| format!("failed to delete user={user_id}"))?;
            println!("deleted user {user_id}");
        }
    }
    Ok(())
}

fn init_tracing(serving: bool) {
    let default_filter = if serving { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}
