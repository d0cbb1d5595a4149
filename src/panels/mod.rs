//! Panel values and the visual builders that produce them.
//!
//! A [`Panel`] stays a typed value until the dashboard is assembled so the
//! layout engine can position it and row defaults can be applied; it turns
//! into Grafana JSON through [`Panel::to_json`].

pub mod bargauge;
pub mod piechart;
pub mod stat;
pub mod table;
pub mod target;
pub mod text;
pub mod timeseries;

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::constants::{GRID_WIDTH, GROUP_HEADER_HEIGHT};
use crate::promql::Target;
use crate::units::{infer_unit, Unit};

pub use bargauge::bargauge;
pub use piechart::piechart;
pub use stat::{stat, StatOpts};
pub use table::{table, TableColumn, TableOpts, TableSort};
pub use target::render_targets;
pub use text::text;
pub use timeseries::{timeseries, TimeSeriesOpts};

/// Reference to a Grafana datasource by plugin type and uid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataSourceRef {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
}

impl DataSourceRef {
    pub fn new(kind: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            uid: uid.into(),
        }
    }

    pub fn prometheus(uid: impl Into<String>) -> Self {
        Self::new("prometheus", uid)
    }
}

/// Position on the 24-column dashboard grid. A zero `w` or `h` means "not set".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ThresholdsMode {
    Absolute,
    Percentage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdStep {
    pub color: String,
    pub value: Option<f64>,
}

impl ThresholdStep {
    pub fn new(color: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            color: color.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thresholds {
    pub mode: ThresholdsMode,
    pub steps: Vec<ThresholdStep>,
}

impl Thresholds {
    pub fn absolute(steps: Vec<ThresholdStep>) -> Self {
        Self {
            mode: ThresholdsMode::Absolute,
            steps,
        }
    }
}

/// A dashboard panel, or a row header when `kind` is `"row"`.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub id: Option<u32>,
    pub kind: String,
    pub title: String,
    pub description: Option<String>,
    pub datasource: Option<DataSourceRef>,
    pub grid_pos: GridPos,
    pub targets: Vec<Target>,
    pub field_config: Value,
    pub options: Value,
    pub transformations: Vec<Value>,
    pub interval: Option<String>,
    pub max_data_points: Option<u32>,
    pub transparent: bool,
    /// Only meaningful for row headers
    pub collapsed: Option<bool>,
    /// Children of a collapsed row header
    pub panels: Vec<Panel>,
}

impl Panel {
    pub fn new(kind: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: None,
            kind: kind.into(),
            title: title.into(),
            description: None,
            datasource: None,
            grid_pos: GridPos::default(),
            targets: Vec::new(),
            field_config: json!({ "defaults": {}, "overrides": [] }),
            options: json!({}),
            transformations: Vec::new(),
            interval: None,
            max_data_points: None,
            transparent: false,
            collapsed: None,
            panels: Vec::new(),
        }
    }

    /// Full-width header that opens a group of rows.
    pub fn row_header(title: impl Into<String>, collapsed: bool) -> Self {
        let mut header = Self::new("row", title);
        header.grid_pos.w = GRID_WIDTH;
        header.grid_pos.h = GROUP_HEADER_HEIGHT;
        header.collapsed = Some(collapsed);
        header
    }

    pub fn is_row(&self) -> bool {
        self.kind == "row"
    }

    pub fn with_width(mut self, w: u32) -> Self {
        self.grid_pos.w = w;
        self
    }

    pub fn with_height(mut self, h: u32) -> Self {
        self.grid_pos.h = h;
        self
    }

    pub fn with_datasource(mut self, datasource: DataSourceRef) -> Self {
        self.datasource = Some(datasource);
        self
    }

    /// Grafana panel JSON, nested row children included.
    pub fn to_json(&self) -> Value {
        let mut panel = Map::new();
        if let Some(id) = self.id {
            panel.insert("id".into(), json!(id));
        }
        panel.insert("type".into(), json!(self.kind));
        panel.insert("title".into(), json!(self.title));
        panel.insert("gridPos".into(), json!(self.grid_pos));

        if self.is_row() {
            panel.insert("collapsed".into(), json!(self.collapsed.unwrap_or(false)));
            let children: Vec<Value> = self.panels.iter().map(Panel::to_json).collect();
            panel.insert("panels".into(), Value::Array(children));
            return Value::Object(panel);
        }

        if let Some(description) = &self.description {
            panel.insert("description".into(), json!(description));
        }
        if let Some(datasource) = &self.datasource {
            panel.insert("datasource".into(), json!(datasource));
        }
        if !self.targets.is_empty() {
            panel.insert(
                "targets".into(),
                Value::Array(render_targets(&self.targets, self.datasource.as_ref())),
            );
        }
        panel.insert("fieldConfig".into(), self.field_config.clone());
        panel.insert("options".into(), self.options.clone());
        if !self.transformations.is_empty() {
            panel.insert("transformations".into(), json!(self.transformations));
        }
        if let Some(interval) = &self.interval {
            panel.insert("interval".into(), json!(interval));
        }
        if let Some(max) = self.max_data_points {
            panel.insert("maxDataPoints".into(), json!(max));
        }
        panel.insert("transparent".into(), json!(self.transparent));
        Value::Object(panel)
    }
}

/// Options every visual builder accepts.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PanelOpts {
    pub title: String,
    pub description: Option<String>,
    pub datasource: Option<DataSourceRef>,
    pub targets: Vec<Target>,
    pub unit: Option<Unit>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub decimals: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub interval: Option<String>,
    pub max_data_points: Option<u32>,
    pub transformations: Vec<Value>,
    pub mappings: Option<Vec<Value>>,
    pub thresholds: Option<Thresholds>,
    pub overrides: Vec<Value>,
    pub overrides_by_name: Vec<(String, Vec<(String, Value)>)>,
}

impl PanelOpts {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn datasource(mut self, datasource: DataSourceRef) -> Self {
        self.datasource = Some(datasource);
        self
    }

    pub fn target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn targets(mut self, targets: impl IntoIterator<Item = Target>) -> Self {
        self.targets.extend(targets);
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn max_data_points(mut self, max: u32) -> Self {
        self.max_data_points = Some(max);
        self
    }

    pub fn transformation(mut self, transformation: Value) -> Self {
        self.transformations.push(transformation);
        self
    }

    pub fn mappings(mut self, mappings: Vec<Value>) -> Self {
        self.mappings = Some(mappings);
        self
    }

    pub fn thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    pub fn override_by_name(mut self, name: impl Into<String>, properties: Vec<(String, Value)>) -> Self {
        self.overrides_by_name.push((name.into(), properties));
        self
    }
}

/// `byName` field overrides, one entry per column name.
pub fn overrides_match_by_name(overrides: &[(String, Vec<(String, Value)>)]) -> Vec<Value> {
    overrides
        .iter()
        .map(|(name, properties)| {
            let properties: Vec<Value> = properties
                .iter()
                .map(|(id, value)| json!({ "id": id, "value": value }))
                .collect();
            json!({
                "matcher": { "id": "byName", "options": name },
                "properties": properties
            })
        })
        .collect()
}

/// Shared assembly for every visual builder: unit fallback, field defaults,
/// overrides, size and query settings.
pub(crate) fn build_panel(kind: &str, mut opts: PanelOpts, custom: Option<Value>, options: Value) -> Panel {
    if opts.unit.is_none() && !opts.targets.is_empty() {
        opts.unit = infer_unit(&opts.targets, None, None).0;
    }

    let mut defaults = Map::new();
    if let Some(unit) = opts.unit {
        defaults.insert("unit".into(), json!(unit));
    }
    if let Some(min) = opts.min {
        defaults.insert("min".into(), json!(min));
    }
    if let Some(max) = opts.max {
        defaults.insert("max".into(), json!(max));
    }
    if let Some(decimals) = opts.decimals {
        defaults.insert("decimals".into(), json!(decimals));
    }
    if let Some(mappings) = &opts.mappings {
        defaults.insert("mappings".into(), json!(mappings));
    }
    if let Some(thresholds) = &opts.thresholds {
        defaults.insert("thresholds".into(), json!(thresholds));
    }
    if let Some(custom) = custom {
        defaults.insert("custom".into(), custom);
    }

    let mut overrides = opts.overrides.clone();
    overrides.extend(overrides_match_by_name(&opts.overrides_by_name));

    let mut panel = Panel::new(kind, opts.title);
    panel.description = opts.description;
    panel.datasource = opts.datasource;
    panel.grid_pos.w = opts.width.unwrap_or(0);
    panel.grid_pos.h = opts.height.unwrap_or(0);
    panel.targets = opts.targets;
    panel.field_config = json!({ "defaults": defaults, "overrides": overrides });
    panel.options = options;
    panel.transformations = opts.transformations;
    panel.interval = opts.interval;
    panel.max_data_points = opts.max_data_points;
    panel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_header_json() {
        let mut header = Panel::row_header("Go runtime", true);
        header.panels.push(Panel::new("stat", "Goroutines").with_width(6).with_height(4));
        let v = header.to_json();
        assert_eq!(v["type"], "row");
        assert_eq!(v["collapsed"], true);
        assert_eq!(v["gridPos"]["w"], 24);
        assert_eq!(v["gridPos"]["h"], 1);
        assert_eq!(v["panels"][0]["title"], "Goroutines");
        assert!(v.get("targets").is_none());
    }

    #[test]
    fn test_overrides_match_by_name() {
        let overrides = overrides_match_by_name(&[(
            "Value #A".to_string(),
            vec![("unit".to_string(), json!("s")), ("custom.width".to_string(), json!(120))],
        )]);
        assert_eq!(
            overrides[0],
            json!({
                "matcher": { "id": "byName", "options": "Value #A" },
                "properties": [
                    { "id": "unit", "value": "s" },
                    { "id": "custom.width", "value": 120 }
                ]
            })
        );
    }

    #[test]
    fn test_build_panel_infers_unit_from_first_target() {
        let opts = PanelOpts::new("Heap").target(Target::raw("sum(go_memstats_heap_bytes)", "heap"));
        let panel = build_panel("stat", opts, None, json!({}));
        assert_eq!(panel.field_config["defaults"]["unit"], "decbytes");
        assert_eq!(panel.grid_pos, GridPos::default());
    }

    #[test]
    fn test_explicit_unit_and_size_are_kept() {
        let opts = PanelOpts::new("Heap")
            .target(Target::raw("sum(go_memstats_heap_bytes)", "heap"))
            .unit(Unit::BytesIec)
            .width(8)
            .height(6)
            .min(0.0);
        let panel = build_panel("stat", opts, None, json!({}));
        let v = panel.to_json();
        assert_eq!(v["fieldConfig"]["defaults"]["unit"], "bytes");
        assert_eq!(v["fieldConfig"]["defaults"]["min"], 0.0);
        assert_eq!(v["gridPos"], json!({ "x": 0, "y": 0, "w": 8, "h": 6 }));
        assert_eq!(v["transparent"], false);
    }
}
