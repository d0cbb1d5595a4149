//! Persisting dashboards to disk and pushing them to Grafana.

use reqwest::header::{CONTENT_TYPE, COOKIE};
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

use crate::config::GrafanaConfig;
use crate::constants::MAX_UID_LEN;
use crate::error::{DashgenError, Result};

const UPLOAD_MESSAGE: &str = "Updated by dashgen";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file already held an equal dashboard
    Unchanged,
    Written,
}

/// Write pretty JSON to `path`, creating parent folders. An existing file
/// holding the same JSON value is left alone.
pub async fn write_dashboard(path: &Path, dashboard: &Value) -> Result<WriteOutcome> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.exists() {
            debug!(folder = %parent.display(), "Creating parent folder");
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    if path.exists() {
        let existing = tokio::fs::read_to_string(path).await?;
        match serde_json::from_str::<Value>(&existing) {
            Ok(existing) if &existing == dashboard => {
                debug!(path = %path.display(), "Dashboard is already up to date");
                return Ok(WriteOutcome::Unchanged);
            }
            Ok(_) => {}
            Err(e) => debug!(path = %path.display(), error = %e, "Existing file is not valid JSON, overwriting"),
        }
    }

    let content = serde_json::to_string_pretty(dashboard)?;
    tokio::fs::write(path, content).await?;
    Ok(WriteOutcome::Written)
}

/// `<prefix>-<uid>` cut to Grafana's uid limit and `[<prefix>] <title>`.
pub fn apply_prefix(dashboard: &mut Value, prefix: Option<&str>) {
    if !dashboard.is_object() {
        return;
    }
    let uid = dashboard["uid"].as_str().unwrap_or_default();
    let uid = match prefix {
        Some(p) => format!("{}-{}", p, uid),
        None => uid.to_string(),
    };
    dashboard["uid"] = json!(uid.chars().take(MAX_UID_LEN).collect::<String>());

    if let Some(p) = prefix {
        let title = dashboard["title"].as_str().unwrap_or_default();
        dashboard["title"] = json!(format!("[{}] {}", p, title));
    }
}

#[derive(Debug, Clone)]
pub struct GrafanaClient {
    client: reqwest::Client,
    url: String,
    settings: GrafanaConfig,
}

impl GrafanaClient {
    /// A client for the configured instance, or `None` when no url is set.
    pub fn from_config(settings: &GrafanaConfig) -> Option<Self> {
        let url = settings.url.as_deref()?.trim_end_matches('/').to_string();
        Some(Self {
            client: reqwest::Client::new(),
            url,
            settings: settings.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body for `POST /api/dashboards/db`, prefix applied.
    pub fn payload(&self, dashboard: &Value) -> Value {
        let mut dashboard = dashboard.clone();
        apply_prefix(&mut dashboard, self.settings.prefix.as_deref());
        json!({
            "dashboard": dashboard,
            "folderUid": self.settings.folder_uid,
            "overwrite": true,
            "message": UPLOAD_MESSAGE
        })
    }

    /// The upload request. A bearer token takes precedence over basic auth;
    /// a session is sent as the `grafana_session` cookie.
    pub fn request(&self, dashboard: &Value) -> Result<reqwest::Request> {
        let mut builder = self
            .client
            .post(format!("{}/api/dashboards/db", self.url))
            .header(CONTENT_TYPE, "application/json")
            .json(&self.payload(dashboard));

        let settings = &self.settings;
        if let Some(token) = &settings.api_token {
            builder = builder.bearer_auth(token);
        } else if let (Some(user), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(session) = &settings.session {
            builder = builder.header(COOKIE, format!("grafana_session={}", session));
        }
        Ok(builder.build()?)
    }

    pub async fn post_dashboard(&self, dashboard: &Value) -> Result<Value> {
        let request = self.request(dashboard)?;
        info!(url = %self.url, uid = ?dashboard["uid"], "Uploading dashboard to Grafana");

        let response = self.client.execute(request).await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(DashgenError::Grafana {
                status: status.as_u16(),
                body,
            });
        }
        debug!(status = status.as_u16(), "Grafana accepted dashboard");
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }
}
