use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{anyhow, Context};
use serde::Deserialize;
use url::Url;

use crate::distance::FallbackDistancePolicy;

pub const DEFAULT_SETTINGS_FILE: &str = "fraud_check.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub classifier_url: String,
    pub distance_matrix_url: String,
    pub maps_api_key: Option<String>,
    pub request_timeout_secs: u64,
    pub fallback: FallbackDistancePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            classifier_url: "http://127.0.0.1:5000".into(),
            distance_matrix_url: "https://maps.googleapis.com/maps/api/distancematrix/json".into(),
            maps_api_key: None,
            request_timeout_secs: 15,
            fallback: FallbackDistancePolicy::default(),
        }
    }
}

/// Keys accepted in `fraud_check.toml`. Everything is optional and overlays
/// the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    classifier_url: Option<String>,
    distance_matrix_url: Option<String>,
    maps_api_key: Option<String>,
    request_timeout_secs: Option<u64>,
    same_city_km: Option<f64>,
    different_city_km: Option<f64>,
    last_resort_km: Option<f64>,
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn classify_endpoint(&self) -> String {
        format!("{}/api/classify", self.classifier_url.trim_end_matches('/'))
    }

    pub fn health_endpoint(&self) -> String {
        format!("{}/api/health", self.classifier_url.trim_end_matches('/'))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, raw) in [
            ("classifier_url", &self.classifier_url),
            ("distance_matrix_url", &self.distance_matrix_url),
        ] {
            let parsed = Url::parse(raw).with_context(|| format!("invalid {name} '{raw}'"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(anyhow!("{name} must use http or https, got '{raw}'"));
            }
        }
        self.fallback.validate()
    }

    fn apply_file(&mut self, file: FileSettings) {
        if let Some(v) = file.classifier_url {
            self.classifier_url = v;
        }
        if let Some(v) = file.distance_matrix_url {
            self.distance_matrix_url = v;
        }
        if let Some(v) = non_empty(file.maps_api_key) {
            self.maps_api_key = Some(v);
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file.same_city_km {
            self.fallback.same_city_km = v;
        }
        if let Some(v) = file.different_city_km {
            self.fallback.different_city_km = v;
        }
        if let Some(v) = file.last_resort_km {
            self.fallback.last_resort_km = v;
        }
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let read = |name: &str| non_empty(lookup(name));

        if let Some(v) = read("CLASSIFIER_URL") {
            self.classifier_url = v;
        }
        if let Some(v) = read("APP__CLASSIFIER_URL") {
            self.classifier_url = v;
        }

        if let Some(v) = read("APP__DISTANCE_MATRIX_URL") {
            self.distance_matrix_url = v;
        }

        if let Some(v) = read("MAPS_API_KEY") {
            self.maps_api_key = Some(v);
        }
        if let Some(v) = read("APP__MAPS_API_KEY") {
            self.maps_api_key = Some(v);
        }

        if let Some(v) = read("APP__REQUEST_TIMEOUT_SECS") {
            match v.parse::<u64>() {
                Ok(parsed) => self.request_timeout_secs = parsed,
                Err(_) => tracing::warn!(value = %v, "ignoring non-numeric APP__REQUEST_TIMEOUT_SECS"),
            }
        }

        for (name, slot) in [
            ("APP__SAME_CITY_KM", &mut self.fallback.same_city_km),
            ("APP__DIFFERENT_CITY_KM", &mut self.fallback.different_city_km),
            ("APP__LAST_RESORT_KM", &mut self.fallback.last_resort_km),
        ] {
            if let Some(v) = read(name) {
                match v.parse::<f64>() {
                    Ok(parsed) => *slot = parsed,
                    Err(_) => tracing::warn!(variable = name, value = %v, "ignoring non-numeric distance override"),
                }
            }
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Defaults, then the TOML file, then the process environment.
///
/// An explicit `path` must exist; the default `fraud_check.toml` is optional.
pub fn load_settings(path: Option<&Path>) -> anyhow::Result<Settings> {
    load_settings_with(path, |name| std::env::var(name).ok())
}

fn load_settings_with(
    path: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let (file_path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_SETTINGS_FILE), false),
    };

    match fs::read_to_string(&file_path) {
        Ok(raw) => {
            let file_cfg: FileSettings = toml::from_str(&raw)
                .with_context(|| format!("failed to parse '{}'", file_path.display()))?;
            settings.apply_file(file_cfg);
        }
        Err(err) if !required && err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to read '{}'", file_path.display()));
        }
    }

    settings.apply_env(env);
    settings.validate()?;
    Ok(settings)
}

/// Shared HTTP client for the distance and classification calls.
pub fn build_http_client(settings: &Settings) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()
        .context("failed to build HTTP client")
}
