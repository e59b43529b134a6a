use anyhow::{Context, Result};
use futures::TryStreamExt;
use rescale::{Job, RescaleClient, Resource, StatusRecord};
use serde_json::json;
use tracing::info;

use crate::cli::JobCommands;
use crate::output::{print_json, print_resources};

pub async fn handle(client: &RescaleClient, command: &JobCommands) -> Result<()> {
    match command {
        JobCommands::Running => print_resources(Job::list_running(client)).await,
        JobCommands::Get { id } => {
            let job = Job::fetch(client, id.as_str()).await?;
            print_json(job.raw())
        }
        JobCommands::Statuses { id, latest } => {
            let job = fetch(client, id).await?;
            if *latest {
                print_json(&job.get_latest_status().await?)
            } else {
                let statuses: Vec<StatusRecord> = job.get_statuses().try_collect().await?;
                print_json(&statuses)
            }
        }
        JobCommands::Wait {
            id,
            status,
            clusters,
        } => {
            let job = fetch(client, id).await?;
            let reached = job.wait_for_status(status).await?;
            if *clusters {
                job.wait_for_clusters_completed().await?;
            }
            print_json(&reached)
        }
        JobCommands::Files { id, name } => {
            let job = fetch(client, id).await?;
            match name {
                Some(name) => {
                    let file = job.get_file(name).await?;
                    print_json(&file.map(|f| f.raw().clone()))
                }
                None => print_resources(job.get_files()).await,
            }
        }
        JobCommands::Download { id, dir } => {
            let job = fetch(client, id).await?;
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create {}", dir.display()))?;

            let mut files = job.get_files();
            let mut downloaded = Vec::new();
            while let Some(file) = files.try_next().await? {
                let name = match file.name() {
                    Some(_) => file.local_file_name()?.to_string(),
                    None => file.id().to_string(),
                };
                let target = dir.join(&name);
                let report = file.download(Some(target.as_path())).await?;
                info!("Saved {} ({} bytes)", target.display(), report.bytes);
                downloaded.push(json!({
                    "id": file.id(),
                    "path": target.display().to_string(),
                    "bytes": report.bytes,
                }));
            }
            print_json(&downloaded)
        }
        JobCommands::Logs { id } => {
            let job = fetch(client, id).await?;
            for entry in job.userlogs().await? {
                println!("{}", entry.message);
            }
            Ok(())
        }
        JobCommands::Connection { id } => {
            let job = fetch(client, id).await?;
            let mut targets: Vec<String> = job.connection_info().await?.into_iter().collect();
            targets.sort();
            print_json(&targets)
        }
        JobCommands::Metrics { id, period } => {
            let job = fetch(client, id).await?;
            print_json(&job.get_all_metrics(*period).await?)
        }
        JobCommands::Submit { id } => {
            let job = fetch(client, id).await?;
            job.submit().await?;
            print_json(&json!({"id": job.id(), "submitted": true}))
        }
        JobCommands::Delete { id } => {
            let job = fetch(client, id).await?;
            job.delete().await?;
            print_json(&json!({"id": id, "deleted": true}))
        }
    }
}

async fn fetch(client: &RescaleClient, id: &str) -> Result<Job> {
    Job::fetch(client, id)
        .await
        .with_context(|| format!("Failed to load job {}", id))
}
