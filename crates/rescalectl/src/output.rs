//! JSON output for command results

use anyhow::Result;
use futures::TryStreamExt;
use rescale::{RecordStream, Resource};
use serde::Serialize;
use serde_json::Value;

/// Pretty-print any serializable value to stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Drain a resource stream and print the raw representations as an array
pub async fn print_resources<R: Resource>(stream: RecordStream<R>) -> Result<()> {
    let raw: Vec<Value> = stream.map_ok(|r| r.raw().clone()).try_collect().await?;
    print_json(&raw)
}
