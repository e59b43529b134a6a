use anyhow::{Result, bail};
use rescale::{Job, RescaleClient, Resource, StorageDevice, StorageDeviceDefinition};
use serde_json::json;

use crate::cli::StorageCommands;
use crate::output::print_json;

pub async fn handle(client: &RescaleClient, command: &StorageCommands) -> Result<()> {
    match command {
        StorageCommands::Create {
            name,
            size_mb,
            walltime,
            submit,
        } => {
            let definition = StorageDeviceDefinition::new(name.as_str())
                .with_size_mb(*size_mb)
                .with_walltime(*walltime);
            let device = StorageDevice::create(client, &definition).await?;
            if *submit {
                device.submit().await?;
            }
            print_json(device.raw())
        }
        StorageCommands::Wait { id } => {
            let mut device = StorageDevice::fetch(client, id.as_str()).await?;
            device.wait_for_started().await?;
            print_json(device.raw())
        }
        StorageCommands::Connect { id, job, paths } => {
            let device = StorageDevice::fetch(client, id.as_str()).await?;
            let job = Job::fetch(client, job.as_str()).await?;
            if paths.is_empty() {
                device.connect_to_job(&job).await?;
            } else {
                device.copy_files_to_job(&job, paths).await?;
            }
            print_json(&json!({"storage_device": device.id(), "job": job.id()}))
        }
        StorageCommands::Upload {
            id,
            dest,
            local,
            file_id,
        } => {
            let device = StorageDevice::fetch(client, id.as_str()).await?;
            let file_id = match (local, file_id) {
                (Some(local), _) => device.upload_local_file(local, dest).await?.id().clone(),
                (None, Some(file_id)) => {
                    device.upload_cloud_file(file_id, dest).await?;
                    file_id.into()
                }
                (None, None) => bail!("either --local or --file-id is required"),
            };
            print_json(&json!({"storage_device": device.id(), "file": file_id, "path": dest}))
        }
    }
}
