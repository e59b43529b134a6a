//! Client construction from profiles and command-line overrides

use anyhow::Context;
use rescale::config::Config;
use rescale::{ClientSettings, PollEvent, RescaleClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

impl ConnectionManager {
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Build a client for `profile`, applying a poll timeout override
    pub fn create_client(
        &self,
        profile: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> anyhow::Result<RescaleClient> {
        let credentials = self
            .config
            .resolve_credentials(profile, |var| std::env::var(var).ok())
            .with_context(|| match &self.config_path {
                Some(path) => format!("Failed to resolve credentials from {}", path.display()),
                None => "Failed to resolve credentials".to_string(),
            })?;

        let mut settings: ClientSettings = self.config.settings_for(profile);
        if timeout_secs.is_some() {
            settings.poll.timeout_secs = timeout_secs;
        }
        debug!("Client settings: {:?}", settings);

        let client = RescaleClient::new(credentials, settings)
            .context("Failed to create Rescale client")?
            .with_progress(Arc::new(report_progress));
        Ok(client)
    }
}

fn report_progress(event: PollEvent) {
    match event {
        PollEvent::Started { label } => eprintln!("Waiting for {}...", label),
        PollEvent::Polling {
            label,
            attempt,
            elapsed,
        } => eprintln!(
            "  still waiting for {} (check {}, {}s elapsed)",
            label,
            attempt,
            elapsed.as_secs()
        ),
        PollEvent::Satisfied { label, .. } => eprintln!("Done waiting for {}", label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rescale::config::Profile;

    fn manager() -> ConnectionManager {
        let mut config = Config::default();
        config.set_profile(
            "default".to_string(),
            Profile {
                apikey: Some("k".to_string()),
                apiurl: Some("https://example.com/api/v3".to_string()),
                client: None,
            },
        );
        ConnectionManager::with_config_path(config, None)
    }

    #[test]
    fn timeout_override_reaches_pollers() {
        let client = manager().create_client(None, Some(90)).unwrap();
        assert_eq!(
            client.status_poller().timeout(),
            Some(std::time::Duration::from_secs(90))
        );
    }

    #[test]
    fn unknown_profile_is_reported() {
        let err = manager()
            .create_client(Some("does-not-exist-anywhere"), None)
            .unwrap_err();
        assert!(format!("{err:#}").contains("Unknown profile name"));
    }
}
