use serde_json::json;

use super::{build_panel, Panel, PanelOpts};
use crate::promql::QueryType;

/// Bar gauge over instant values. Targets that still carry the default
/// range type are switched to instant queries.
pub fn bargauge(mut opts: PanelOpts) -> Panel {
    for target in &mut opts.targets {
        if target.query_type == QueryType::Range {
            target.query_type = QueryType::Instant;
        }
    }
    let options = json!({
        "orientation": "auto",
        "reduceOptions": { "values": false, "calcs": ["lastNotNull"], "fields": "" },
        "displayMode": "basic",
        "valueMode": "color",
        "showUnfilled": true,
        "namePlacement": "left",
        "sizing": "auto"
    });
    build_panel("bargauge", opts, None, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::Target;

    #[test]
    fn test_targets_become_instant() {
        let mut both = Target::raw("sum(up) by (job)", "{{job}}");
        both.query_type = QueryType::Both;
        let v = bargauge(PanelOpts::new("Up").target(Target::raw("sum(up)", "up")).target(both)).to_json();
        assert_eq!(v["type"], "bargauge");
        assert_eq!(v["targets"][0]["instant"], true);
        assert_eq!(v["targets"][0]["range"], false);
        assert_eq!(v["targets"][1]["range"], true);
    }
}
