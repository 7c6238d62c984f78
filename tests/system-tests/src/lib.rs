#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::{Output, Stdio};
    use std::sync::OnceLock;
    use std::time::{Duration, SystemTime};

    use anyhow::{Context, Result, bail};
    use client_sdk::{AdminClient, UploadFile};
    use common::{NewProject, ProjectStatus};
    use reqwest::StatusCode;
    use tokio::process::{Child, Command};
    use tokio::time::sleep;

    #[tokio::test]
    async fn sdk_metadata_lifecycle_against_live_backend() -> Result<()> {
        let bind = "127.0.0.1:19180";
        let mut backend = start_backend(bind).await?;
        let client = AdminClient::new(format!("http://{bind}"));

        let result = async {
            let project = client
                .create_project(&NewProject {
                    project_id: None,
                    project_name: "Sediment cores".to_string(),
                    project_description: "system test".to_string(),
                })
                .await?;
            let route_id = project.route_id();

            let summary = client
                .upload_metadata(
                    &route_id,
                    UploadFile::new(
                        "samples.csv",
                        "id,created,owner,source,depth,ph\n1,a,b,c,2.5,7\n2,a,b,c,3.0,6.5\n",
                    ),
                )
                .await?;
            assert_eq!(summary.rowcount, 2);
            assert_eq!(summary.display_headers(), ["depth", "ph"]);

            let fetched = client.get_project(&route_id).await?;
            assert_eq!(fetched.sample_summary, Some(summary));

            client.delete_metadata(&route_id).await?;
            let cleared = client.get_project(&route_id).await?;
            assert!(cleared.sample_summary.is_none());

            let missing = client.get_project("999").await.unwrap_err();
            assert!(missing.is_not_found());

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_process(&mut backend).await;
        result
    }

    #[tokio::test]
    async fn cli_status_change_and_show() -> Result<()> {
        let bind = "127.0.0.1:19181";
        let base_url = format!("http://{bind}");
        let mut backend = start_backend(bind).await?;

        let result = async {
            run_cli(&[
                "--server-url",
                &base_url,
                "create-project",
                "Groundwater",
                "--project-id",
                "GW-1",
            ])
            .await?;
            run_cli(&["--server-url", &base_url, "set-status", "GW-1", "ongoing"]).await?;

            let output = run_cli(&["--server-url", &base_url, "show", "GW-1"]).await?;
            assert!(output.contains("Name: Groundwater"));
            assert!(output.contains("Project status: Ongoing"));
            assert!(output.contains("Metadata: none"));

            let listing = run_cli(&["--server-url", &base_url, "list"]).await?;
            assert!(listing.contains("GW-1\tGroundwater"));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_process(&mut backend).await;
        result
    }

    #[tokio::test]
    async fn cli_show_reports_missing_project() -> Result<()> {
        let bind = "127.0.0.1:19182";
        let base_url = format!("http://{bind}");
        let mut backend = start_backend(bind).await?;

        let output = cli_output(&["--server-url", &base_url, "show", "nope"]).await;
        stop_process(&mut backend).await;

        let output = output?;
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("no such project"));
        Ok(())
    }

    #[tokio::test]
    async fn cli_admin_users_roundtrip() -> Result<()> {
        let bind = "127.0.0.1:19183";
        let base_url = format!("http://{bind}");
        let mut backend = start_backend(bind).await?;

        let result = async {
            run_cli(&[
                "--server-url",
                &base_url,
                "users",
                "create",
                "Ivy",
                "ivy@example.org",
                "Field Lab",
            ])
            .await?;

            let rejected = cli_output(&[
                "--server-url",
                &base_url,
                "users",
                "create",
                "Ivy",
                "ivy@example.org",
                "Field Lab",
            ])
            .await?;
            assert!(!rejected.status.success());

            let listing = run_cli(&["--server-url", &base_url, "users", "list"]).await?;
            assert!(listing.contains("ivy@example.org"));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_process(&mut backend).await;
        result
    }

    #[tokio::test]
    async fn cli_web_interface_ping() -> Result<()> {
        let bind = "127.0.0.1:19184";
        let mut cli_web = start_cli_web(bind, "http://127.0.0.1:9").await?;

        let body = reqwest::get(format!("http://{bind}/api/ping"))
            .await
            .context("failed to call cli web ping endpoint")?
            .error_for_status()
            .context("cli web ping endpoint returned non-success status")?
            .text()
            .await
            .context("failed to read ping response body")?;

        assert!(body.contains("\"ok\":true"));
        assert!(body.contains("project-admin-web"));

        stop_process(&mut cli_web).await;
        Ok(())
    }

    #[tokio::test]
    async fn web_detail_page_against_live_backend() -> Result<()> {
        let backend_bind = "127.0.0.1:19185";
        let web_bind = "127.0.0.1:19186";
        let mut backend = start_backend(backend_bind).await?;
        let mut cli_web = start_cli_web(web_bind, &format!("http://{backend_bind}")).await?;

        let result = async {
            let client = AdminClient::new(format!("http://{backend_bind}"));
            let project = client
                .create_project(&NewProject {
                    project_id: Some("WEB-1".to_string()),
                    project_name: "Web rendered".to_string(),
                    project_description: String::new(),
                })
                .await?;
            client
                .set_project_status(&project.route_id(), ProjectStatus::Closed)
                .await?;

            let http = reqwest::Client::new();
            let detail = http
                .get(format!("http://{web_bind}/projects/WEB-1"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(detail.contains("Name: Web rendered"));
            assert!(detail.contains("Project status: Closed"));
            assert!(detail.contains("Add metadata file"));

            let missing = http
                .get(format!("http://{web_bind}/projects/missing"))
                .send()
                .await?;
            assert_eq!(missing.status(), StatusCode::NOT_FOUND);

            let list = http
                .get(format!("http://{web_bind}/"))
                .send()
                .await?
                .error_for_status()?
                .text()
                .await?;
            assert!(list.contains(&format!("href=\"/projects/{}\"", project.route_id())));

            Ok::<(), anyhow::Error>(())
        }
        .await;

        stop_process(&mut cli_web).await;
        stop_process(&mut backend).await;
        result
    }

    #[tokio::test]
    async fn backend_state_survives_restart() -> Result<()> {
        let bind = "127.0.0.1:19187";
        let data_dir = fresh_data_dir("restart");
        let client = AdminClient::new(format!("http://{bind}"));

        let mut backend = start_backend_with_data_dir(bind, Some(&data_dir)).await?;
        let created = client
            .create_project(&NewProject {
                project_id: Some("KEEP-1".to_string()),
                project_name: "Persistent".to_string(),
                project_description: String::new(),
            })
            .await;
        stop_process(&mut backend).await;
        created?;

        let mut backend = start_backend_with_data_dir(bind, Some(&data_dir)).await?;
        let fetched = client.get_project("KEEP-1").await;
        stop_process(&mut backend).await;
        let _ = fs::remove_dir_all(&data_dir);

        assert_eq!(fetched?.project_name, "Persistent");
        Ok(())
    }

    async fn start_backend(bind: &str) -> Result<Child> {
        start_backend_with_data_dir(bind, None).await
    }

    async fn start_backend_with_data_dir(bind: &str, data_dir: Option<&Path>) -> Result<Child> {
        let backend_bin = binary_path("dev-backend")?;

        let mut command = Command::new(backend_bin);
        command
            .env("PROJECT_ADMIN_BACKEND_BIND", bind)
            .env("PROJECT_ADMIN_DEV_USER", "system-test@example.org")
            .env_remove("PROJECT_ADMIN_DATA_DIR")
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(data_dir) = data_dir {
            command.env("PROJECT_ADMIN_DATA_DIR", data_dir);
        }

        let child = command.spawn().context("failed to spawn dev-backend")?;
        wait_for_url_status(&format!("http://{bind}/health"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn cli_output(args: &[&str]) -> Result<Output> {
        let cli_bin = binary_path("project-admin")?;
        Command::new(cli_bin)
            .args(args)
            .env_remove("PROJECT_ADMIN_SERVER_URL")
            .output()
            .await
            .context("failed to execute project-admin")
    }

    async fn run_cli(args: &[&str]) -> Result<String> {
        let output = cli_output(args).await?;

        if !output.status.success() {
            bail!(
                "project-admin failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn start_cli_web(bind: &str, server_url: &str) -> Result<Child> {
        let cli_bin = binary_path("project-admin")?;

        let child = Command::new(cli_bin)
            .arg("--server-url")
            .arg(server_url)
            .arg("serve-web")
            .arg("--bind")
            .arg(bind)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("failed to spawn project-admin serve-web")?;

        wait_for_url_status(&format!("http://{bind}/api/ping"), StatusCode::OK, 40).await?;
        Ok(child)
    }

    async fn wait_for_url_status(url: &str, expected: StatusCode, retries: usize) -> Result<()> {
        let http = reqwest::Client::new();

        for _ in 0..retries {
            if let Ok(resp) = http.get(url).send().await
                && resp.status() == expected
            {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }

        bail!("service did not return {expected} at {url}");
    }

    async fn stop_process(child: &mut Child) {
        let _ = child.kill().await;
        let _ = child.wait().await;
    }

    fn binary_path(name: &str) -> Result<PathBuf> {
        let workspace_root = workspace_root()?;
        ensure_binaries_built(&workspace_root)?;
        let mut path = workspace_root.join("target").join("debug").join(name);

        if let Some(suffix) = std::env::consts::EXE_SUFFIX.strip_prefix('.') {
            let mut filename = OsString::from(name);
            filename.push(".");
            filename.push(suffix);
            path = workspace_root.join("target").join("debug").join(filename);
        }

        if !path.exists() {
            bail!("expected binary does not exist: {}", path.display());
        }

        Ok(path)
    }

    fn workspace_root() -> Result<PathBuf> {
        let crate_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        crate_dir
            .parent()
            .and_then(|p| p.parent())
            .map(PathBuf::from)
            .context("failed to resolve workspace root")
    }

    fn build_required_binaries(workspace_root: &Path) -> Result<()> {
        let status = std::process::Command::new("cargo")
            .arg("build")
            .arg("-p")
            .arg("dev-backend")
            .arg("-p")
            .arg("cli-client")
            .current_dir(workspace_root)
            .status()
            .context("failed to run cargo build for system test binaries")?;

        if !status.success() {
            bail!("cargo build for system test binaries failed");
        }

        Ok(())
    }

    fn ensure_binaries_built(workspace_root: &Path) -> Result<()> {
        static BUILD_RESULT: OnceLock<std::result::Result<(), String>> = OnceLock::new();

        let result = BUILD_RESULT.get_or_init(|| {
            build_required_binaries(workspace_root).map_err(|err| err.to_string())
        });

        if let Err(message) = result {
            bail!("failed to build required binaries: {message}");
        }

        Ok(())
    }

    fn fresh_data_dir(name: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!("project-admin-{name}-{unique}"));
        let _ = fs::remove_dir_all(&path);
        let _ = fs::create_dir_all(&path);
        path
    }
}
