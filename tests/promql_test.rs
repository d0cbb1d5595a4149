use dashgen::error::DashgenError;
use dashgen::promql::{
    merge_selectors, BinaryOp, CounterMetric, GaugeMetric, HistogramMetric, MetricOpts, QueryOpts,
    QueryType, RatioOpts, SummaryMetric, TargetFormat,
};

fn requests() -> CounterMetric {
    CounterMetric::new("http_requests_total", MetricOpts::new())
}

#[test]
fn test_merge_drops_empty_fragments_and_keeps_order() {
    let left = merge_selectors(["a", "", "b"]);
    assert_eq!(merge_selectors([left.as_str(), "c"]), "a, b, c");
    assert_eq!(merge_selectors(["a", "", "b", "c"]), "a, b, c");
    assert_eq!(merge_selectors(["", " "]), "");
}

#[test]
fn test_counter_rate_shape_and_legend() {
    let opts = QueryOpts::new().selector(r#"job="x""#).group_by(["code"]);
    let target = requests().rate(&opts).unwrap().target();
    assert_eq!(
        target.expr,
        r#"sum(rate(http_requests_total{job="x"}[$__rate_interval])) by (code)"#
    );
    assert_eq!(target.legend_format, "{{code}}");
    assert_eq!(target.query_type, QueryType::Range);
    assert_eq!(target.format, TargetFormat::TimeSeries);
}

#[test]
fn test_increase_defaults_to_step_interval() {
    let opts = QueryOpts::new().selector(r#"job="x""#).group_by(["code"]);
    let query = requests().increase(&opts).unwrap();
    assert_eq!(
        query.to_string(),
        r#"sum(increase(http_requests_total{job="x"}[$__interval])) by (code)"#
    );
}

#[test]
fn test_instant_queries_use_range_interval_and_table_format() {
    let opts = QueryOpts::new().instant();
    for query in [requests().rate(&opts).unwrap(), requests().increase(&opts).unwrap()] {
        assert!(query.to_string().contains("[$__range]"), "{}", query);
        let target = query.target();
        assert_eq!(target.query_type, QueryType::Instant);
        assert_eq!(target.format, TargetFormat::Table);
    }
}

#[test]
fn test_histogram_quantile_groups_by_le_first() {
    let histogram = HistogramMetric::new("req_duration_seconds", MetricOpts::new());
    let query = histogram
        .quantile(0.95, &QueryOpts::new().group_by(["method"]))
        .unwrap();
    assert_eq!(
        query.to_string(),
        "histogram_quantile(0.95, sum(rate(req_duration_seconds_bucket[$__rate_interval])) by (le, method))"
    );
}

#[test]
fn test_legend_defaults_to_grouping_columns() {
    let gauge = GaugeMetric::new("up", MetricOpts::new());
    let target = gauge
        .calc(None, &QueryOpts::new().group_by(["pod", "namespace"]))
        .unwrap()
        .target();
    assert_eq!(target.legend_format, "{{pod}} - {{namespace}}");
}

#[test]
fn test_invalid_selector_names_fragment() {
    let err = requests()
        .rate(&QueryOpts::new().selector(r#"job="x", broken"#))
        .unwrap_err();
    match err {
        DashgenError::Selector { fragment, input } => {
            assert_eq!(fragment, "broken");
            assert_eq!(input, r#"job="x", broken"#);
        }
        other => panic!("expected selector error, got {}", other),
    }
}

#[test]
fn test_identical_inputs_give_identical_queries() {
    let build = || {
        let metric = CounterMetric::new(
            "http_requests_total",
            MetricOpts::new().selector(r#"env="prod""#),
        );
        metric
            .rate(&QueryOpts::new().selector(r#"job="x""#).group_by(["code"]))
            .unwrap()
            .target()
    };
    assert_eq!(build(), build());
}

#[test]
fn test_arithmetic_on_affixed_and_wrapped_queries() {
    let errors = CounterMetric::new("errors_total", MetricOpts::new());
    let availability = errors
        .rate(&QueryOpts::new())
        .unwrap()
        .prepend("1 - ")
        .multiply(100.0);
    assert_eq!(
        availability.to_string(),
        "(1 - sum(rate(errors_total[$__rate_interval]))) * 100"
    );

    let flagged = errors
        .rate(&QueryOpts::new().wrap("$__expr + 1"))
        .unwrap()
        .compare(BinaryOp::Gt, 0.0)
        .multiply(2.0);
    assert_eq!(
        flagged.to_string(),
        "((sum(rate(errors_total[$__rate_interval])) + 1) > 0) * 2"
    );

    let clamped = errors
        .rate(&QueryOpts::new().wrap("clamp_min($__expr, 0)"))
        .unwrap()
        .multiply(60.0);
    assert_eq!(
        clamped.to_string(),
        "clamp_min(sum(rate(errors_total[$__rate_interval])), 0) * 60"
    );
}

#[test]
fn test_instant_histogram_quantile() {
    let histogram = HistogramMetric::new("req_duration_seconds", MetricOpts::new());
    let target = histogram
        .quantile(0.5, &QueryOpts::new().group_by(["method"]).instant())
        .unwrap()
        .target();
    assert_eq!(
        target.expr,
        "histogram_quantile(0.5, sum(rate(req_duration_seconds_bucket[$__range])) by (le, method))"
    );
    assert_eq!(target.format, TargetFormat::Table);
}

#[test]
fn test_error_percentage_over_explicit_window() {
    let target = requests()
        .percentage(
            &QueryOpts::new().group_by(["service"]).interval("10m"),
            &RatioOpts::default().numerator(r#"code=~"5..""#),
        )
        .unwrap()
        .target();
    assert_eq!(
        target.expr,
        r#"sum(rate(http_requests_total{code=~"5.."}[10m])) by (service) / sum(rate(http_requests_total[10m])) by (service)"#
    );
    assert_eq!(target.legend_format, "{{service}}");
}

#[test]
fn test_summary_quantile_keeps_label_text() {
    let summary = SummaryMetric::new("rpc_duration_seconds", MetricOpts::new());
    let query = summary
        .quantile("0.50")
        .calc(None, &QueryOpts::new().selector(r#"job="api""#))
        .unwrap();
    assert_eq!(
        query.to_string(),
        r#"rpc_duration_seconds{quantile="0.50", job="api"}"#
    );
}
