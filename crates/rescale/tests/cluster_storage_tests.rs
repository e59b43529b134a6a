//! Clusters, storage devices and core types

mod common;

use common::{MockRescale, page};
use futures::TryStreamExt;
use rescale::{Cluster, CoreType, Job, Resource, StorageDevice, StorageDeviceDefinition};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_cluster_completion() {
    let mock = MockRescale::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/clusters/running/statuses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([
            {"status": "Started"},
            {"status": "Starting"}
        ]))))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/clusters/done/statuses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([
            {"status": "Stopping"},
            {"status": "Stopped"},
            {"status": "Started"}
        ]))))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/clusters/fresh/statuses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([]))))
        .mount(&mock.server)
        .await;

    let client = mock.client();
    let running = Cluster::from_snapshot(client.clone(), json!({"id": "running"})).unwrap();
    let done = Cluster::from_snapshot(client.clone(), json!({"id": "done"})).unwrap();
    let fresh = Cluster::from_snapshot(client, json!({"id": "fresh"})).unwrap();

    assert!(!running.is_completed().await.unwrap());
    assert!(done.is_completed().await.unwrap());
    assert!(!fresh.is_completed().await.unwrap());
    assert_eq!(
        done.get_latest_status().await.unwrap().unwrap().status,
        "Stopping"
    );
}

#[tokio::test]
async fn test_cluster_fetch_and_list() {
    let mock = MockRescale::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/clusters/c7/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "c7", "name": "hpc"})))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/clusters/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{"id": "c7"}, {"id": 8}]))))
        .mount(&mock.server)
        .await;

    let client = mock.client();
    let cluster = Cluster::fetch(&client, "c7").await.unwrap();
    assert_eq!(cluster.data().name.as_deref(), Some("hpc"));

    let ids: Vec<String> = Cluster::list_running(&client)
        .map_ok(|c| c.id().to_string())
        .try_collect()
        .await
        .unwrap();
    assert_eq!(ids, vec!["c7", "8"]);
}

#[tokio::test]
async fn test_storage_device_create_and_wait() {
    let mock = MockRescale::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/storage-devices/"))
        .and(body_json(json!({"name": "scratch", "storage_size_mb": 1000, "walltime": 4})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "sd1", "name": "scratch"})))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/storage-devices/sd1/submit/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/storage-devices/sd1/statuses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([{"status": "Pending"}]))))
        .up_to_n_times(2)
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/storage-devices/sd1/statuses/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([
            {"status": "Ready"},
            {"status": "Started"},
            {"status": "Pending"}
        ]))))
        .mount(&mock.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v3/storage-devices/sd1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sd1",
            "name": "scratch",
            "sshConnection": "uprod@9.9.9.9"
        })))
        .expect(1)
        .mount(&mock.server)
        .await;

    let client = mock.client();
    let mut device = StorageDevice::create(&client, &StorageDeviceDefinition::new("scratch"))
        .await
        .unwrap();
    assert!(device.ssh_connection().is_none());

    device.submit().await.unwrap();
    device.wait_for_started().await.unwrap();

    assert_eq!(device.ssh_connection(), Some("uprod@9.9.9.9"));
    assert_eq!(
        mock.sleeper.delays(),
        vec![Duration::from_secs(30), Duration::from_secs(30)]
    );
}

#[tokio::test]
async fn test_storage_device_job_wiring() {
    let mock = MockRescale::start().await;

    Mock::given(method("POST"))
        .and(path("/api/v3/jobs/j1/storage-devices/"))
        .and(body_json(json!({"storage_device": {"id": "sd1"}})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/jobs/j1/storage-devices/"))
        .and(body_json(json!({
            "storage_device": {"id": "sd1"},
            "file_paths": ["results/a.dat", "results/b.dat"]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock.server)
        .await;

    let client = mock.client();
    let device = StorageDevice::from_snapshot(client.clone(), json!({"id": "sd1"})).unwrap();
    let job = Job::from_snapshot(client, json!({"id": "j1"})).unwrap();

    device.connect_to_job(&job).await.unwrap();
    device
        .copy_files_to_job(
            &job,
            &["results/a.dat".to_string(), "results/b.dat".to_string()],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_storage_device_uploads() {
    let mock = MockRescale::start().await;

    Mock::given(method("PUT"))
        .and(path("/api/v3/files/contents/"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "f5"})))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/storage-devices/sd1/file-downloads/"))
        .and(body_json(json!({"file": {"id": "f5"}, "path": "inputs/mesh.dat"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v3/storage-devices/sd1/file-downloads/"))
        .and(body_json(json!({"file": {"id": "existing"}, "path": "inputs/old.dat"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock.server)
        .await;

    let dir = TempDir::new().unwrap();
    let local = dir.path().join("mesh.dat");
    std::fs::write(&local, b"mesh").unwrap();

    let device = StorageDevice::from_snapshot(mock.client(), json!({"id": "sd1"})).unwrap();
    let uploaded = device
        .upload_local_file(&local, "inputs/mesh.dat")
        .await
        .unwrap();
    assert_eq!(uploaded.name(), Some("mesh.dat"));

    device
        .upload_cloud_file("existing", "inputs/old.dat")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_core_types() {
    let mock = MockRescale::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v3/coretypes/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(json!([
            {"name": "Emerald", "code": "emerald", "cores": [1, 2, 4]},
            {"name": "Onyx", "code": "onyx"}
        ]))))
        .mount(&mock.server)
        .await;

    let core_types = CoreType::list(&mock.client()).await.unwrap();
    assert_eq!(core_types.len(), 2);
    assert_eq!(core_types[0].code, "emerald");
    assert_eq!(core_types[1].name, "Onyx");
}
