//! Prometheus query JSON for panel targets.

use serde_json::{json, Map, Value};

use super::DataSourceRef;
use crate::promql::{QueryType, Target};

fn default_ref_id(index: usize) -> String {
    // A, B, C ... then continues past Z in ASCII order
    char::from_u32('A' as u32 + index as u32)
        .map(String::from)
        .unwrap_or_else(|| format!("Q{}", index))
}

/// Render targets in panel order. A target without its own datasource uses
/// the panel's, and a missing ref id defaults to its position letter.
pub fn render_targets(targets: &[Target], datasource: Option<&DataSourceRef>) -> Vec<Value> {
    targets
        .iter()
        .enumerate()
        .map(|(i, target)| {
            let mut query = Map::new();
            query.insert("expr".into(), json!(target.expr));
            query.insert(
                "refId".into(),
                json!(target.ref_id.clone().unwrap_or_else(|| default_ref_id(i))),
            );
            query.insert("format".into(), json!(target.format));
            if !target.legend_format.is_empty() {
                query.insert("legendFormat".into(), json!(target.legend_format));
            }
            let (range, instant) = match target.query_type {
                QueryType::Range => (true, false),
                QueryType::Instant => (false, true),
                QueryType::Both => (true, true),
            };
            query.insert("range".into(), json!(range));
            query.insert("instant".into(), json!(instant));
            if let Some(ds) = target.datasource.as_ref().or(datasource) {
                query.insert("datasource".into(), json!(ds));
            }
            Value::Object(query)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::TargetFormat;

    #[test]
    fn test_ref_ids_default_by_position() {
        let targets = vec![
            Target::raw("up", "a"),
            Target::raw("up", "b").with_ref_id("custom"),
            Target::raw("up", "c"),
        ];
        let rendered = render_targets(&targets, None);
        assert_eq!(rendered[0]["refId"], "A");
        assert_eq!(rendered[1]["refId"], "custom");
        assert_eq!(rendered[2]["refId"], "C");
    }

    #[test]
    fn test_query_type_flags_and_format() {
        let mut instant = Target::raw("up", "");
        instant.query_type = QueryType::Instant;
        instant.format = TargetFormat::Table;
        let mut both = Target::raw("up", "x");
        both.query_type = QueryType::Both;

        let rendered = render_targets(&[instant, both], None);
        assert_eq!(rendered[0]["range"], false);
        assert_eq!(rendered[0]["instant"], true);
        assert_eq!(rendered[0]["format"], "table");
        assert!(rendered[0].get("legendFormat").is_none());
        assert_eq!(rendered[1]["range"], true);
        assert_eq!(rendered[1]["instant"], true);
        assert_eq!(rendered[1]["format"], "time_series");
    }

    #[test]
    fn test_datasource_falls_back_to_panel() {
        let panel_ds = DataSourceRef::prometheus("prom");
        let mut own = Target::raw("up", "x");
        own.datasource = Some(DataSourceRef::prometheus("other"));
        let rendered = render_targets(&[Target::raw("up", "x"), own], Some(&panel_ds));
        assert_eq!(rendered[0]["datasource"]["uid"], "prom");
        assert_eq!(rendered[0]["datasource"]["type"], "prometheus");
        assert_eq!(rendered[1]["datasource"]["uid"], "other");
        assert!(render_targets(&[Target::raw("up", "x")], None)[0].get("datasource").is_none());
    }
}
