/// `load_config` module: reads the publish document and merges credentials from the environment.
///
/// The document may be YAML or JSON (JSON parses as YAML). Secrets are best kept
/// out of it: `SITE_PUBLISHER_USER` and `SITE_PUBLISHER_PASSWORD` (also read from
/// a `.env` file by the binary) replace whatever the file says, and the CLI flags
/// replace both.
///
/// # Errors
/// Everything here returns `anyhow::Error` with enough context to be shown to
/// the user as-is.
use anyhow::{bail, Context, Result};
use site_publisher_core::config::PublishConfig;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const USER_ENV: &str = "SITE_PUBLISHER_USER";
pub const PASSWORD_ENV: &str = "SITE_PUBLISHER_PASSWORD";

/// Load and validate the publish document at `path`, applying credential
/// overrides from the environment.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PublishConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: PublishConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config");
            return Err(anyhow::anyhow!("Failed to parse config YAML/JSON: {e}"));
        }
    };

    if let Ok(user) = std::env::var(USER_ENV) {
        info!(env = USER_ENV, "Site user taken from environment");
        config.user = Some(user);
    }
    if let Ok(password) = std::env::var(PASSWORD_ENV) {
        info!(env = PASSWORD_ENV, "Site password taken from environment");
        config.password = Some(password);
    }

    validate(&config).with_context(|| format!("Invalid config file {path_ref:?}"))?;
    config.trace_loaded();
    Ok(config)
}

/// Command-line credentials win over file and environment.
pub fn apply_overrides(config: &mut PublishConfig, user: Option<String>, password: Option<String>) {
    if user.is_some() {
        config.user = user;
    }
    if password.is_some() {
        config.password = password;
    }
}

fn validate(config: &PublishConfig) -> Result<()> {
    if config.site_url.trim().is_empty() {
        bail!("spSiteUrl must not be empty");
    }
    if !config.site_url.starts_with("http://") && !config.site_url.starts_with("https://") {
        bail!("spSiteUrl must be an http(s) URL, got {:?}", config.site_url);
    }
    if config.jobs.is_empty() {
        warn!("No pubPaths configured");
    }
    for (idx, job) in config.jobs.iter().enumerate() {
        if job.source.as_os_str().is_empty() {
            bail!("pubPaths[{idx}].src must not be empty");
        }
        if job.destination.trim().trim_matches('/').is_empty() {
            bail!("pubPaths[{idx}].dest must not be empty");
        }
    }
    Ok(())
}
