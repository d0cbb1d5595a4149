use serde_json::{json, Value};

use super::{build_panel, Panel, PanelOpts};
use crate::units::{infer_unit, ChartType};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeriesOpts {
    /// Forces line or bar styling and disables unit inference
    pub chart: Option<ChartType>,
    pub legend_calcs: Option<Vec<String>>,
    pub legend_placement: Option<String>,
    pub stacking_mode: Option<String>,
    pub thresholds_style_mode: Option<String>,
}

impl TimeSeriesOpts {
    pub fn chart(mut self, chart: ChartType) -> Self {
        self.chart = Some(chart);
        self
    }

    pub fn legend_calcs<I, S>(mut self, calcs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.legend_calcs = Some(calcs.into_iter().map(Into::into).collect());
        self
    }

    pub fn legend_placement(mut self, placement: impl Into<String>) -> Self {
        self.legend_placement = Some(placement.into());
        self
    }

    pub fn stacking(mut self, mode: impl Into<String>) -> Self {
        self.stacking_mode = Some(mode.into());
        self
    }
}

fn legend_sort_name(calc: &str) -> Option<&'static str> {
    match calc {
        "mean" => Some("Mean"),
        "min" => Some("Min"),
        "max" => Some("Max"),
        "last" => Some("Last"),
        "lastNotNull" => Some("Last *"),
        "sum" => Some("Total"),
        _ => None,
    }
}

/// Time series panel. The unit and bar/line styling are inferred from the
/// first target unless given.
pub fn timeseries(mut opts: PanelOpts, ts: TimeSeriesOpts) -> Panel {
    let (unit, chart) = infer_unit(&opts.targets, ts.chart, opts.unit);
    opts.unit = unit;

    let calcs = ts.legend_calcs.unwrap_or_else(|| match chart {
        ChartType::Bar => vec!["sum".to_string()],
        ChartType::Line => ["min", "max", "mean", "lastNotNull"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    });

    let (draw_style, fill_opacity, interpolation, show_points, stacking) = match chart {
        ChartType::Bar => ("bars", 100, "stepAfter", "never", "normal"),
        ChartType::Line => ("line", 0, "linear", "auto", "none"),
    };
    let stacking = ts.stacking_mode.as_deref().unwrap_or(stacking);
    opts.max_data_points = Some(opts.max_data_points.unwrap_or(100));

    let custom = json!({
        "axisCenteredZero": false,
        "axisColorMode": "text",
        "axisGridShow": true,
        "axisLabel": "",
        "axisPlacement": "auto",
        "barAlignment": 0,
        "drawStyle": draw_style,
        "fillOpacity": fill_opacity,
        "gradientMode": "none",
        "lineInterpolation": interpolation,
        "lineWidth": 1,
        "pointSize": 5,
        "showPoints": show_points,
        "spanNulls": false,
        "stacking": { "group": "A", "mode": stacking },
        "thresholdsStyle": {
            "mode": ts.thresholds_style_mode.as_deref().unwrap_or("off")
        }
    });

    let mut legend = json!({
        "calcs": calcs,
        "displayMode": "table",
        "placement": ts.legend_placement.as_deref().unwrap_or("bottom"),
        "showLegend": true
    });
    if let Some(sort_by) = calcs.last().and_then(|c| legend_sort_name(c)) {
        legend["sortBy"] = Value::from(sort_by);
        legend["sortDesc"] = Value::from(true);
    }

    let options = json!({
        "legend": legend,
        "tooltip": { "mode": "multi", "sort": "desc" }
    });

    build_panel("timeseries", opts, Some(custom), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::Target;
    use crate::units::Unit;

    #[test]
    fn test_increase_query_renders_as_bars() {
        let opts = PanelOpts::new("Traffic")
            .target(Target::raw("sum(increase(rx_bytes_total[$__interval]))", "rx"));
        let v = timeseries(opts, TimeSeriesOpts::default()).to_json();
        assert_eq!(v["type"], "timeseries");
        assert_eq!(v["fieldConfig"]["defaults"]["unit"], "decbytes");
        assert_eq!(v["fieldConfig"]["defaults"]["custom"]["drawStyle"], "bars");
        assert_eq!(v["fieldConfig"]["defaults"]["custom"]["stacking"]["mode"], "normal");
        assert_eq!(v["options"]["legend"]["calcs"], json!(["sum"]));
        assert_eq!(v["options"]["legend"]["sortBy"], "Total");
        assert_eq!(v["maxDataPoints"], 100);
    }

    #[test]
    fn test_rate_query_renders_as_lines() {
        let opts = PanelOpts::new("Requests")
            .target(Target::raw("sum(rate(http_requests_total[$__rate_interval]))", "rps"));
        let v = timeseries(opts, TimeSeriesOpts::default()).to_json();
        assert_eq!(v["fieldConfig"]["defaults"]["unit"], "reqps");
        assert_eq!(v["fieldConfig"]["defaults"]["custom"]["drawStyle"], "line");
        assert_eq!(v["options"]["legend"]["sortBy"], "Last *");
        assert_eq!(v["options"]["legend"]["sortDesc"], true);
    }

    #[test]
    fn test_explicit_chart_and_legend() {
        let opts = PanelOpts::new("Goroutines")
            .target(Target::raw("sum(go_goroutines)", "goroutines"))
            .unit(Unit::Short)
            .max_data_points(300);
        let ts = TimeSeriesOpts::default()
            .chart(ChartType::Bar)
            .legend_calcs(["mean", "custom"]);
        let v = timeseries(opts, ts).to_json();
        assert_eq!(v["fieldConfig"]["defaults"]["unit"], "short");
        assert_eq!(v["fieldConfig"]["defaults"]["custom"]["drawStyle"], "bars");
        assert!(v["options"]["legend"].get("sortBy").is_none());
        assert_eq!(v["maxDataPoints"], 300);
    }
}
