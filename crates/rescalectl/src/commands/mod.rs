pub mod clusters;
pub mod files;
pub mod jobs;
pub mod storage;

use anyhow::Result;
use rescale::{CoreType, RescaleClient};

use crate::output::print_json;

pub async fn core_types(client: &RescaleClient) -> Result<()> {
    print_json(&CoreType::list(client).await?)
}
