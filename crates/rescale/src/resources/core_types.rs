use futures::TryStreamExt;
use serde::{Deserialize, Serialize};

use crate::client::RescaleClient;
use crate::error::Result;

/// Hardware core type offered by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreType {
    pub name: String,
    pub code: String,
}

impl CoreType {
    /// All core types, reduced to name and code
    pub async fn list(client: &RescaleClient) -> Result<Vec<CoreType>> {
        client.list::<CoreType>("coretypes/").try_collect().await
    }
}
