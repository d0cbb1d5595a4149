use serde_json::json;

use super::{build_panel, Panel, PanelOpts};

pub fn piechart(opts: PanelOpts) -> Panel {
    let options = json!({
        "orientation": "auto",
        "legend": {
            "showLegend": true,
            "displayMode": "table",
            "placement": "right",
            "values": ["percent", "value"],
            "calcs": []
        },
        "reduceOptions": { "values": false, "calcs": ["lastNotNull"], "fields": "" },
        "tooltip": { "mode": "multi", "sort": "desc" },
        "pieType": "pie",
        "displayLabels": []
    });
    build_panel("piechart", opts, None, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::Target;

    #[test]
    fn test_piechart_legend_on_the_right() {
        let v = piechart(PanelOpts::new("Codes").target(Target::raw("sum(up) by (code)", "{{code}}"))).to_json();
        assert_eq!(v["type"], "piechart");
        assert_eq!(v["options"]["legend"]["placement"], "right");
        assert_eq!(v["options"]["legend"]["values"], json!(["percent", "value"]));
        assert_eq!(v["targets"][0]["legendFormat"], "{{code}}");
    }
}
