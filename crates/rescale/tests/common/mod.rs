//! Shared mock-server harness for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use rescale::{ClientSettings, Credentials, RescaleClient, RetryConfig, Sleeper};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::MockServer;

pub const API_KEY: &str = "test-key";

/// Records every requested delay and returns immediately
#[derive(Default)]
pub struct CountingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl CountingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.slept.lock().unwrap().len()
    }
}

#[async_trait]
impl Sleeper for CountingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub struct MockRescale {
    pub server: MockServer,
    pub sleeper: Arc<CountingSleeper>,
}

impl MockRescale {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
            sleeper: Arc::new(CountingSleeper::default()),
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}/api/v3/", self.server.uri())
    }

    pub fn client(&self) -> RescaleClient {
        self.client_with(ClientSettings::default())
    }

    pub fn client_with_attempts(&self, max_attempts: u32) -> RescaleClient {
        self.client_with(ClientSettings {
            retry: RetryConfig {
                max_attempts,
                ..RetryConfig::default()
            },
            ..ClientSettings::default()
        })
    }

    pub fn client_with(&self, settings: ClientSettings) -> RescaleClient {
        let credentials = Credentials::new(Some(API_KEY.to_string()), &self.base_url()).unwrap();
        RescaleClient::new(credentials, settings)
            .unwrap()
            .with_sleeper(self.sleeper.clone())
    }

    /// Absolute URL of `relative` on the mock server
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.base_url(), relative)
    }
}

/// A single-page list body
pub fn page(results: Value) -> Value {
    json!({"count": results.as_array().map(|a| a.len()).unwrap_or(0), "next": null, "results": results})
}

/// A list body pointing at a further page
pub fn page_with_next(results: Value, next: &str) -> Value {
    json!({"count": null, "next": next, "results": results})
}
