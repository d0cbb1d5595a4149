use serde_json::{json, Map, Value};

use super::{build_panel, Panel, PanelOpts};
use crate::promql::Target;
use crate::units::Unit;

/// One table column. With a target the column is the query's value
/// (`Value #<key>`); without one it refers to a label column called `key`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableColumn {
    pub key: String,
    pub target: Option<Target>,
    pub name: Option<String>,
    pub width: Option<u32>,
    pub unit: Option<Unit>,
    pub exclude: bool,
    pub overrides: Vec<(String, Value)>,
}

impl TableColumn {
    pub fn query(key: impl Into<String>, target: Target) -> Self {
        Self {
            key: key.into(),
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn label(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn exclude(mut self) -> Self {
        self.exclude = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSort {
    pub column: String,
    pub desc: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableOpts {
    pub columns: Vec<TableColumn>,
    pub exclude_columns: Vec<String>,
    pub sort_by: Vec<TableSort>,
}

impl TableOpts {
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    pub fn exclude_column(mut self, column: impl Into<String>) -> Self {
        self.exclude_columns.push(column.into());
        self
    }

    pub fn sort_by(mut self, column: impl Into<String>, desc: bool) -> Self {
        self.sort_by.push(TableSort {
            column: column.into(),
            desc,
        });
        self
    }
}

/// Table merging one query per value column, with label columns ordered,
/// renamed and hidden through an `organize` transformation.
pub fn table(mut opts: PanelOpts, table: TableOpts) -> Panel {
    if !table.columns.is_empty() {
        let mut index_by_name = Map::new();
        let mut rename_by_name = Map::new();
        let mut exclude_by_name = Map::new();
        for column in &table.exclude_columns {
            exclude_by_name.insert(column.clone(), json!(true));
        }

        for column in table.columns {
            let mut overrides = column.overrides;
            if let Some(unit) = column.unit {
                overrides.push(("unit".to_string(), json!(unit)));
            }
            if let Some(width) = column.width {
                overrides.push(("custom.width".to_string(), json!(width)));
            }

            let field = match column.target {
                Some(mut target) => {
                    let field = format!("Value #{}", column.key);
                    let display = column.name.unwrap_or_else(|| column.key.clone());
                    rename_by_name.insert(field.clone(), json!(display));
                    target.ref_id = Some(column.key.clone());
                    opts.targets.push(target);
                    field
                }
                None => {
                    if let Some(name) = column.name {
                        rename_by_name.insert(column.key.clone(), json!(name));
                    }
                    column.key.clone()
                }
            };
            let index = index_by_name.len();
            index_by_name.insert(field.clone(), json!(index));
            if column.exclude {
                exclude_by_name.insert(field.clone(), json!(true));
            }
            opts.overrides_by_name.push((field, overrides));
        }

        opts.transformations.push(json!({ "id": "merge", "options": {} }));
        opts.transformations.push(json!({
            "id": "organize",
            "options": {
                "indexByName": index_by_name,
                "excludeByName": exclude_by_name,
                "renameByName": rename_by_name
            }
        }));
    }

    let sort_by: Vec<Value> = table
        .sort_by
        .iter()
        .map(|s| json!({ "displayName": s.column, "desc": s.desc }))
        .collect();
    let options = json!({
        "cellHeight": "md",
        "showHeader": true,
        "sortBy": sort_by
    });

    build_panel("table", opts, None, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::{QueryType, TargetFormat};

    fn instant(expr: &str) -> Target {
        let mut t = Target::raw(expr, "");
        t.query_type = QueryType::Instant;
        t.format = TargetFormat::Table;
        t
    }

    #[test]
    fn test_query_columns_become_targets_and_organize() {
        let tbl = TableOpts::default()
            .column(TableColumn::label("instance").name("Instance"))
            .column(TableColumn::query("version", instant("max(go_info) by (instance)")).name("Go"))
            .column(TableColumn::query("up", instant("max(up) by (instance)")).unit(Unit::Short).width(80))
            .column(TableColumn::label("job").exclude())
            .exclude_column("Time")
            .sort_by("Instance", false);
        let v = table(PanelOpts::new("Instances"), tbl).to_json();

        assert_eq!(v["type"], "table");
        assert_eq!(v["targets"][0]["refId"], "version");
        assert_eq!(v["targets"][1]["refId"], "up");
        assert_eq!(v["transformations"][0]["id"], "merge");

        let organize = &v["transformations"][1]["options"];
        assert_eq!(organize["indexByName"]["instance"], 0);
        assert_eq!(organize["indexByName"]["Value #version"], 1);
        assert_eq!(organize["indexByName"]["Value #up"], 2);
        assert_eq!(organize["renameByName"]["Value #version"], "Go");
        assert_eq!(organize["renameByName"]["Value #up"], "up");
        assert_eq!(organize["renameByName"]["instance"], "Instance");
        assert_eq!(organize["excludeByName"]["job"], true);
        assert_eq!(organize["excludeByName"]["Time"], true);

        let overrides = v["fieldConfig"]["overrides"].as_array().cloned().unwrap_or_default();
        let up = overrides
            .iter()
            .find(|o| o["matcher"]["options"] == "Value #up")
            .cloned()
            .unwrap_or_default();
        assert_eq!(up["properties"][0], json!({ "id": "unit", "value": "short" }));
        assert_eq!(up["properties"][1], json!({ "id": "custom.width", "value": 80 }));
        assert_eq!(v["options"]["sortBy"][0], json!({ "displayName": "Instance", "desc": false }));
    }

    #[test]
    fn test_excluded_query_column_uses_value_field() {
        let tbl = TableOpts::default()
            .column(TableColumn::label("pod"))
            .column(TableColumn::query("restarts", instant("max(restarts) by (pod)")).exclude())
            .column(TableColumn::query("ready", instant("max(ready) by (pod)")));
        let v = table(PanelOpts::new("Pods"), tbl).to_json();

        let exclude = &v["transformations"][1]["options"]["excludeByName"];
        assert_eq!(exclude["Value #restarts"], true);
        assert!(exclude.get("restarts").is_none());
        assert!(exclude.get("Value #ready").is_none());
        // the query still runs, only its column is hidden
        assert_eq!(v["targets"][0]["refId"], "restarts");
    }

    #[test]
    fn test_plain_table_has_no_transformations() {
        let v = table(PanelOpts::new("Empty"), TableOpts::default()).to_json();
        assert!(v.get("transformations").is_none());
        assert_eq!(v["options"]["cellHeight"], "md");
    }
}
