//! Traefik proxy dashboard (entrypoint, service and TLS metrics).

use once_cell::sync::Lazy;

use super::go_runtime::{go_runtime_panels, GoRuntimeOpts};
use crate::dashboard::{DashboardBuilder, Variable};
use crate::error::Result;
use crate::layout::{GroupOpts, PanelGroup, PanelRow, RowOpts};
use crate::panels::{stat, timeseries, DataSourceRef, Panel, PanelOpts, StatOpts, TimeSeriesOpts};
use crate::promql::{AggregationOp, CounterMetric, GaugeMetric, MetricOpts, QueryOpts, RatioFunction, SummaryMetric, Target};
use crate::units::Unit;

const SELECTORS: &str = r#"namespace=~"$namespace", instance=~"$instance""#;
const SERVICE: &str = r#"service=~"$service""#;
const ENTRYPOINT: &str = r#"entrypoint=~"$entrypoint""#;

struct TraefikMetrics {
    config_reloads: CounterMetric,
    last_reload_success: GaugeMetric,
    tls_certs_not_after: GaugeMetric,
    open_connections: GaugeMetric,
    entrypoint_requests: CounterMetric,
    entrypoint_requests_tls: CounterMetric,
    entrypoint_duration: SummaryMetric,
    entrypoint_request_bytes: CounterMetric,
    entrypoint_response_bytes: CounterMetric,
    service_requests: CounterMetric,
    service_requests_tls: CounterMetric,
    service_duration: SummaryMetric,
    service_request_bytes: CounterMetric,
    service_response_bytes: CounterMetric,
}

fn labels(labels: &[&str]) -> MetricOpts {
    MetricOpts::new().labels(labels.iter().copied())
}

static TRAEFIK: Lazy<TraefikMetrics> = Lazy::new(|| TraefikMetrics {
    config_reloads: CounterMetric::new("traefik_config_reloads_total", MetricOpts::new()),
    last_reload_success: GaugeMetric::new("traefik_config_last_reload_success", MetricOpts::new()),
    tls_certs_not_after: GaugeMetric::new(
        "traefik_tls_certs_not_after_timestamp",
        labels(&["cn", "serial", "sans"]),
    ),
    open_connections: GaugeMetric::new("traefik_open_connections", labels(&["entrypoint", "protocol"])),
    entrypoint_requests: CounterMetric::new(
        "traefik_entrypoint_requests_total",
        labels(&["entrypoint", "code", "method", "protocol"]),
    ),
    entrypoint_requests_tls: CounterMetric::new(
        "traefik_entrypoint_requests_tls_total",
        labels(&["tls_version", "tls_cipher", "entrypoint"]),
    ),
    entrypoint_duration: SummaryMetric::new(
        "traefik_entrypoint_request_duration_seconds",
        labels(&["entrypoint", "code", "method", "protocol"]),
    ),
    entrypoint_request_bytes: CounterMetric::new(
        "traefik_entrypoint_requests_bytes_total",
        labels(&["entrypoint", "code", "method", "protocol"]),
    ),
    entrypoint_response_bytes: CounterMetric::new(
        "traefik_entrypoint_responses_bytes_total",
        labels(&["entrypoint", "code", "method", "protocol"]),
    ),
    service_requests: CounterMetric::new(
        "traefik_service_requests_total",
        labels(&["service", "code", "method", "protocol"]),
    ),
    service_requests_tls: CounterMetric::new(
        "traefik_service_requests_tls_total",
        labels(&["tls_version", "tls_cipher", "service"]),
    ),
    service_duration: SummaryMetric::new(
        "traefik_service_request_duration_seconds",
        labels(&["service", "code", "method", "protocol"]),
    ),
    service_request_bytes: CounterMetric::new(
        "traefik_service_requests_bytes_total",
        labels(&["service", "code", "method", "protocol"]),
    ),
    service_response_bytes: CounterMetric::new(
        "traefik_service_responses_bytes_total",
        labels(&["service", "code", "method", "protocol"]),
    ),
});

fn datasource() -> DataSourceRef {
    DataSourceRef::prometheus("${DS_PROMETHEUS}")
}

fn rows() -> RowOpts {
    RowOpts::new().datasource(datasource()).height(8)
}

fn series(title: impl Into<String>, target: Target) -> Panel {
    timeseries(PanelOpts::new(title).target(target), TimeSeriesOpts::default())
}

fn total(title: &str, target: Target) -> Panel {
    stat(PanelOpts::new(title).target(target), StatOpts::default())
}

fn overview() -> Result<PanelGroup> {
    let t = &*TRAEFIK;
    let services = QueryOpts::new().selectors([SELECTORS, SERVICE]).interval("$__range");
    let stats = vec![
        total("Request Count", t.service_requests.increase(&services)?.target()),
        total("Request Bytes", t.service_request_bytes.increase(&services)?.target()),
        total("Response Bytes", t.service_response_bytes.increase(&services)?.target()),
        total(
            "Config reloads",
            t.config_reloads
                .increase(&QueryOpts::new().selector(SELECTORS).interval("$__range"))?
                .target(),
        ),
        stat(
            PanelOpts::new("Last successful config reload")
                .unit(Unit::DateTimeFromNow)
                .target(
                    t.last_reload_success
                        .calc(Some(AggregationOp::Max), &QueryOpts::new().selector(SELECTORS).append(" * 1000"))?
                        .target(),
                ),
            StatOpts::default(),
        ),
    ];
    let connections = t.open_connections.calc(
        Some(AggregationOp::Sum),
        &QueryOpts::new()
            .selectors([SELECTORS, ENTRYPOINT])
            .group_by(["entrypoint", "protocol"]),
    )?;
    Ok(PanelGroup::new(
        GroupOpts::new("Overview"),
        vec![
            PanelRow::new(rows().height(3), stats),
            PanelRow::new(rows(), vec![series("Open connections", connections.target())]),
        ],
    ))
}

fn entrypoints() -> Result<PanelGroup> {
    let t = &*TRAEFIK;
    let opts = QueryOpts::new()
        .selectors([SELECTORS, ENTRYPOINT])
        .group_by(["entrypoint"]);
    Ok(PanelGroup::new(
        GroupOpts::new("Entrypoint Metrics"),
        vec![PanelRow::new(
            rows(),
            vec![
                series("Request Count", t.entrypoint_requests.increase(&opts)?.target()),
                series("Request Bytes", t.entrypoint_request_bytes.increase(&opts)?.target()),
                series("Response Bytes", t.entrypoint_response_bytes.increase(&opts)?.target()),
                series(
                    "Avg request duration",
                    t.entrypoint_duration.avg(&opts, RatioFunction::Rate)?.target(),
                ),
            ],
        )],
    ))
}

struct ServiceGroup<'a> {
    title: &'a str,
    group_by: &'a [&'a str],
    extra_selectors: &'a [&'a str],
    append: Option<&'a str>,
}

impl<'a> ServiceGroup<'a> {
    fn by(group_by: &'a [&'a str]) -> Self {
        Self {
            title: "Service Metrics",
            group_by,
            extra_selectors: &[],
            append: None,
        }
    }

    fn build(&self) -> Result<PanelGroup> {
        let t = &*TRAEFIK;
        let by = self.group_by.join(", ");
        let mut opts = QueryOpts::new()
            .selectors([SELECTORS, SERVICE])
            .selectors(self.extra_selectors.iter().copied())
            .group_by(self.group_by.iter().copied());
        if let Some(append) = self.append {
            opts = opts.append(append);
        }
        Ok(PanelGroup::new(
            GroupOpts::new(format!("{} (by {})", self.title, by)),
            vec![PanelRow::new(
                rows(),
                vec![
                    series(format!("Request Count by {}", by), t.service_requests.increase(&opts)?.target()),
                    series(format!("Request Bytes by {}", by), t.service_request_bytes.increase(&opts)?.target()),
                    series(format!("Response Bytes by {}", by), t.service_response_bytes.increase(&opts)?.target()),
                    series(
                        format!("Avg request duration by {}", by),
                        t.service_duration.avg(&opts, RatioFunction::Rate)?.target(),
                    ),
                ],
            )],
        ))
    }
}

fn tls() -> Result<PanelGroup> {
    let t = &*TRAEFIK;
    let certs = t.tls_certs_not_after.calc(
        Some(AggregationOp::Max),
        &QueryOpts::new()
            .selector(SELECTORS)
            .group_by(["cn", "sans", "serial"])
            .append(" * 1000"),
    )?;
    Ok(PanelGroup::new(
        GroupOpts::new("TLS Metrics"),
        vec![PanelRow::new(
            rows(),
            vec![
                series(
                    "TLS requests by entrypoint",
                    t.entrypoint_requests_tls
                        .increase(
                            &QueryOpts::new()
                                .selectors([SELECTORS, ENTRYPOINT])
                                .group_by(["entrypoint", "tls_cipher", "tls_version"]),
                        )?
                        .target(),
                ),
                series(
                    "TLS requests by service",
                    t.service_requests_tls
                        .increase(
                            &QueryOpts::new()
                                .selectors([SELECTORS, SERVICE])
                                .group_by(["service", "tls_cipher", "tls_version"]),
                        )?
                        .target(),
                ),
                timeseries(
                    PanelOpts::new("TLS certs expiration timestamp")
                        .unit(Unit::DateTimeFromNow)
                        .target(certs.target()),
                    TimeSeriesOpts::default(),
                ),
            ],
        )],
    ))
}

fn label_values(name: &str, label: &str, query: &str) -> Variable {
    Variable::query(name, label, datasource(), query).multi()
}

pub fn traefik() -> Result<DashboardBuilder> {
    let errors = ServiceGroup {
        title: "Service Metrics (errors)",
        group_by: &["code", "protocol", "method", "service"],
        extra_selectors: &[r#"code=~"(4|5)..""#],
        append: Some(" > 0"),
    };

    Ok(DashboardBuilder::new("Traefik")
        .uid("traefik")
        .tags(["traefik", "generated"])
        .variable(Variable::prometheus_datasource("DS_PROMETHEUS", "Prometheus"))
        .variable(label_values(
            "namespace",
            "Namespace",
            "label_values(traefik_config_reloads_total, namespace)",
        ))
        .variable(label_values(
            "instance",
            "Instance",
            r#"label_values(traefik_config_reloads_total{namespace=~"$namespace"}, instance)"#,
        ))
        .variable(label_values(
            "pod",
            "Pod",
            r#"label_values(traefik_config_reloads_total{namespace=~"$namespace", instance=~"$instance"}, pod)"#,
        ))
        .variable(label_values(
            "entrypoint",
            "Entrypoint",
            r#"label_values(traefik_entrypoint_requests_total{instance=~"$instance"}, entrypoint)"#,
        ))
        .variable(label_values(
            "service",
            "Service",
            r#"label_values(traefik_service_requests_total{instance=~"$instance"}, service)"#,
        ))
        .group(overview()?)
        .group(entrypoints()?)
        .group(ServiceGroup::by(&["service"]).build()?)
        .group(ServiceGroup::by(&["protocol"]).build()?)
        .group(ServiceGroup::by(&["method"]).build()?)
        .group(ServiceGroup::by(&["code"]).build()?)
        .group(errors.build()?)
        .group(tls()?)
        .group(go_runtime_panels(&GoRuntimeOpts {
            datasource: Some(datasource()),
            selectors: vec![SELECTORS.to_string()],
            collapsed: true,
            ..GoRuntimeOpts::default()
        })?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_queries() {
        let group = overview().unwrap();
        let stats = group.rows()[0].panels();
        assert_eq!(stats.len(), 5);
        assert_eq!(
            stats[0].targets[0].expr,
            r#"sum(increase(traefik_service_requests_total{namespace=~"$namespace", instance=~"$instance", service=~"$service"}[$__range]))"#
        );
        assert_eq!(
            stats[4].targets[0].expr,
            r#"max(traefik_config_last_reload_success{namespace=~"$namespace", instance=~"$instance"}) * 1000"#
        );
        assert!(stats.iter().all(|p| p.grid_pos.h == 3));
    }

    #[test]
    fn test_dashboard_builds_with_error_group() {
        let dashboard = traefik().unwrap().build();
        let titles: Vec<&str> = dashboard["panels"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|p| p["type"] == "row")
            .filter_map(|p| p["title"].as_str())
            .collect();
        assert_eq!(
            titles,
            vec![
                "Overview",
                "Entrypoint Metrics",
                "Service Metrics (by service)",
                "Service Metrics (by protocol)",
                "Service Metrics (by method)",
                "Service Metrics (by code)",
                "Service Metrics (errors) (by code, protocol, method, service)",
                "TLS Metrics",
                "Go Runtime Metrics",
            ]
        );
    }

    #[test]
    fn test_error_group_filters_and_appends() {
        let group = ServiceGroup {
            title: "Service Metrics (errors)",
            group_by: &["code", "service"],
            extra_selectors: &[r#"code=~"(4|5)..""#],
            append: Some(" > 0"),
        }
        .build()
        .unwrap();
        assert_eq!(group.title(), "Service Metrics (errors) (by code, service)");
        let panel = &group.rows()[0].panels()[0];
        assert_eq!(panel.title, "Request Count by code, service");
        assert_eq!(
            panel.targets[0].expr,
            r#"sum(increase(traefik_service_requests_total{namespace=~"$namespace", instance=~"$instance", service=~"$service", code=~"(4|5).."}[$__interval])) by (code, service) > 0"#
        );
        assert_eq!(panel.targets[0].legend_format, "{{code}} - {{service}}");
    }
}
