use anyhow::{Context, Result};
use rescale::{File, RescaleClient, Resource};
use serde_json::json;

use crate::cli::FileCommands;
use crate::output::{print_json, print_resources};

pub async fn handle(client: &RescaleClient, command: &FileCommands) -> Result<()> {
    match command {
        FileCommands::Search { name, newest } => {
            if *newest {
                let file = File::get_newest_by_name(client, name).await?;
                print_json(&file.map(|f| f.raw().clone()))
            } else {
                print_resources(File::search(client, name)).await
            }
        }
        FileCommands::Upload { path } => {
            let file = File::upload(client, path)
                .await
                .with_context(|| format!("Failed to upload {}", path.display()))?;
            print_json(file.raw())
        }
        FileCommands::Download { id, output } => {
            let file = File::fetch(client, id.as_str()).await?;
            let report = file.download(output.as_deref()).await?;
            print_json(&json!({
                "id": file.id(),
                "bytes": report.bytes,
                "chunks": report.chunks,
            }))
        }
    }
}
