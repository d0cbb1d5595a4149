use serde_json::{json, Value};

/// Grafana's own "Annotations & Alerts" entry, present on every dashboard.
pub fn builtin_annotation() -> Value {
    json!({
        "builtIn": 1,
        "datasource": { "type": "grafana", "uid": "-- Grafana --" },
        "enable": true,
        "hide": true,
        "iconColor": "rgba(0, 211, 255, 1)",
        "name": "Annotations & Alerts",
        "type": "dashboard"
    })
}

/// Annotations stored in Grafana and matched by tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrafanaAnnotation {
    pub name: Option<String>,
    pub icon_color: Option<String>,
    pub tags: Vec<String>,
}

impl GrafanaAnnotation {
    pub fn new<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn icon_color(mut self, color: impl Into<String>) -> Self {
        self.icon_color = Some(color.into());
        self
    }

    pub fn to_json(&self) -> Value {
        let mut annotation = json!({
            "datasource": { "type": "datasource", "uid": "grafana" },
            "enable": true,
            "target": {
                "limit": 100,
                "matchAny": true,
                "tags": self.tags,
                "type": "tags"
            }
        });
        if let Some(name) = &self.name {
            annotation["name"] = json!(name);
        }
        if let Some(color) = &self.icon_color {
            annotation["iconColor"] = json!(color);
        }
        annotation
    }
}
