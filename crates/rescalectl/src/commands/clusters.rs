use anyhow::Result;
use futures::TryStreamExt;
use rescale::{Cluster, RescaleClient, StatusRecord};
use serde_json::json;

use crate::cli::ClusterCommands;
use crate::output::{print_json, print_resources};

pub async fn handle(client: &RescaleClient, command: &ClusterCommands) -> Result<()> {
    match command {
        ClusterCommands::Running => print_resources(Cluster::list_running(client)).await,
        ClusterCommands::Status { id, all } => {
            let cluster = Cluster::fetch(client, id.as_str()).await?;
            if *all {
                let statuses: Vec<StatusRecord> = cluster.get_statuses().try_collect().await?;
                print_json(&statuses)
            } else {
                print_json(&json!({
                    "latest": cluster.get_latest_status().await?,
                    "completed": cluster.is_completed().await?,
                }))
            }
        }
    }
}
