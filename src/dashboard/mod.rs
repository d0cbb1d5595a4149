//! Dashboard assembly: lays out the panel tree and wraps it in the Grafana
//! dashboard document together with variables and annotations.

pub mod annotations;
pub mod variables;

pub use annotations::{builtin_annotation, GrafanaAnnotation};
pub use variables::{DatasourceKind, Variable};

use serde_json::{json, Value};

use crate::constants::{GENERATED_NOTE, GRID_WIDTH, NOTE_HEIGHT};
use crate::layout::{auto_layout, LayoutItem, PanelGroup, PanelRow, RowOpts};
use crate::panels::{text, Panel};

/// Dashboard builder for generating Grafana dashboards
#[derive(Debug, Clone)]
pub struct DashboardBuilder {
    title: String,
    uid: Option<String>,
    description: Option<String>,
    tags: Vec<String>,
    time: (String, String),
    refresh: Option<String>,
    variables: Vec<Variable>,
    annotations: Vec<GrafanaAnnotation>,
    items: Vec<LayoutItem>,
    generated_note: bool,
}

impl DashboardBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uid: None,
            description: None,
            tags: Vec::new(),
            time: ("now-6h".to_string(), "now".to_string()),
            refresh: None,
            variables: Vec::new(),
            annotations: Vec::new(),
            items: Vec::new(),
            generated_note: true,
        }
    }

    pub fn uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = Some(uid.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn time(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.time = (from.into(), to.into());
        self
    }

    pub fn refresh(mut self, refresh: impl Into<String>) -> Self {
        self.refresh = Some(refresh.into());
        self
    }

    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    pub fn annotation(mut self, annotation: GrafanaAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn row(mut self, row: PanelRow) -> Self {
        self.items.push(row.into());
        self
    }

    pub fn group(mut self, group: PanelGroup) -> Self {
        self.items.push(group.into());
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = LayoutItem>) -> Self {
        self.items.extend(items);
        self
    }

    /// Leave out the "generated dashboard" banner
    pub fn without_generated_note(mut self) -> Self {
        self.generated_note = false;
        self
    }

    /// Uid as given, or derived from the title
    pub fn resolved_uid(&self) -> String {
        self.uid.clone().unwrap_or_else(|| slugify(&self.title))
    }

    /// Positioned panels with ids assigned in document order
    pub fn layout(&self) -> Vec<Panel> {
        let mut items = Vec::with_capacity(self.items.len() + 1);
        if self.generated_note {
            let note = text(GENERATED_NOTE, GRID_WIDTH, NOTE_HEIGHT);
            items.push(PanelRow::new(RowOpts::new(), vec![note]).into());
        }
        items.extend(self.items.iter().cloned());

        let mut panels = auto_layout(&items);
        let mut next_id = 1;
        assign_ids(&mut panels, &mut next_id);
        panels
    }

    /// Build the complete Grafana dashboard JSON
    pub fn build(&self) -> Value {
        let panels: Vec<Value> = self.layout().iter().map(Panel::to_json).collect();
        let variables: Vec<Value> = self.variables.iter().map(Variable::to_json).collect();

        let mut annotations = vec![builtin_annotation()];
        annotations.extend(self.annotations.iter().map(GrafanaAnnotation::to_json));

        let mut dashboard = json!({
            "uid": self.resolved_uid(),
            "title": self.title,
            "tags": self.tags,
            "timezone": "browser",
            "editable": true,
            "graphTooltip": 1,
            "schemaVersion": 39,
            "time": { "from": self.time.0, "to": self.time.1 },
            "templating": { "list": variables },
            "annotations": { "list": annotations },
            "panels": panels
        });
        if let Some(description) = &self.description {
            dashboard["description"] = json!(description);
        }
        if let Some(refresh) = &self.refresh {
            dashboard["refresh"] = json!(refresh);
        }
        dashboard
    }
}

fn assign_ids(panels: &mut [Panel], next_id: &mut u32) {
    for panel in panels {
        panel.id = Some(*next_id);
        *next_id += 1;
        assign_ids(&mut panel.panels, next_id);
    }
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
