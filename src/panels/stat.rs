use serde_json::json;

use super::{build_panel, Panel, PanelOpts, ThresholdStep, Thresholds};
use crate::units::Unit;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatOpts {
    /// Reducer applied to each series, `lastNotNull` by default
    pub reduce_calc: Option<String>,
    pub reduce_fields: Option<String>,
    pub graph_mode: Option<String>,
    pub orientation: Option<String>,
    pub text_title_size: Option<u32>,
    pub text_value_size: Option<u32>,
}

impl StatOpts {
    pub fn reduce_calc(mut self, calc: impl Into<String>) -> Self {
        self.reduce_calc = Some(calc.into());
        self
    }

    /// Regex or name selecting which fields are shown, e.g. `/^version$/`
    pub fn reduce_fields(mut self, fields: impl Into<String>) -> Self {
        self.reduce_fields = Some(fields.into());
        self
    }

    pub fn text_title_size(mut self, size: u32) -> Self {
        self.text_title_size = Some(size);
        self
    }

    pub fn graph_mode(mut self, mode: impl Into<String>) -> Self {
        self.graph_mode = Some(mode.into());
        self
    }

    pub fn orientation(mut self, orientation: impl Into<String>) -> Self {
        self.orientation = Some(orientation.into());
        self
    }
}

pub fn stat(mut opts: PanelOpts, stat: StatOpts) -> Panel {
    if opts.mappings.is_none() {
        // a zero timestamp shows as "-" rather than "55 years ago"
        opts.mappings = Some(if opts.unit == Some(Unit::DateTimeFromNow) {
            vec![json!({
                "type": "value",
                "options": { "0": { "text": "-", "index": 0 } }
            })]
        } else {
            Vec::new()
        });
    }
    opts.thresholds = Some(Thresholds::absolute(vec![ThresholdStep::new("transparent", None)]));

    let mut text = json!({});
    if let Some(size) = stat.text_title_size {
        text["titleSize"] = json!(size);
    }
    if let Some(size) = stat.text_value_size {
        text["valueSize"] = json!(size);
    }

    let options = json!({
        "graphMode": stat.graph_mode.as_deref().unwrap_or("area"),
        "reduceOptions": {
            "calcs": [stat.reduce_calc.as_deref().unwrap_or("lastNotNull")],
            "fields": stat.reduce_fields.as_deref().unwrap_or(""),
            "values": false
        },
        "orientation": stat.orientation.as_deref().unwrap_or("auto"),
        "text": text,
        "textMode": "auto",
        "justifyMode": "auto",
        "wideLayout": true,
        "colorMode": "background",
        "showPercentChange": false,
        "percentChangeColorMode": "standard"
    });

    build_panel("stat", opts, None, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::Target;

    #[test]
    fn test_stat_defaults() {
        let opts = PanelOpts::new("Uptime").target(Target::raw("max(process_start_time_seconds)", ""));
        let v = stat(opts, StatOpts::default()).to_json();
        assert_eq!(v["type"], "stat");
        assert_eq!(v["options"]["graphMode"], "area");
        assert_eq!(v["options"]["reduceOptions"]["calcs"], json!(["lastNotNull"]));
        assert_eq!(v["fieldConfig"]["defaults"]["mappings"], json!([]));
        assert_eq!(v["fieldConfig"]["defaults"]["thresholds"]["mode"], "absolute");
        assert_eq!(
            v["fieldConfig"]["defaults"]["thresholds"]["steps"],
            json!([{ "color": "transparent", "value": null }])
        );
        assert_eq!(v["fieldConfig"]["defaults"]["unit"], "s");
    }

    #[test]
    fn test_date_time_from_now_maps_zero_to_dash() {
        let opts = PanelOpts::new("Last restart")
            .target(Target::raw("max(process_start_time_seconds) * 1000", ""))
            .unit(Unit::DateTimeFromNow);
        let v = stat(opts, StatOpts::default().reduce_calc("max").graph_mode("none")).to_json();
        assert_eq!(v["fieldConfig"]["defaults"]["unit"], "dateTimeFromNow");
        assert_eq!(v["fieldConfig"]["defaults"]["mappings"][0]["options"]["0"]["text"], "-");
        assert_eq!(v["options"]["reduceOptions"]["calcs"], json!(["max"]));
        assert_eq!(v["options"]["graphMode"], "none");
    }
}
