//! Display units and the heuristic that guesses them from a query string.

use serde::Serialize;

use crate::promql::Target;

/// Grafana unit ids used by the generated panels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Unit {
    #[serde(rename = "short")]
    Short,
    #[serde(rename = "none")]
    None,
    #[serde(rename = "decbytes")]
    BytesSi,
    #[serde(rename = "bytes")]
    BytesIec,
    #[serde(rename = "Bps")]
    BytesPerSecondSi,
    #[serde(rename = "s")]
    Seconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[serde(rename = "percent")]
    Percent,
    #[serde(rename = "percentunit")]
    PercentUnit,
    #[serde(rename = "reqps")]
    RequestsPerSecond,
    #[serde(rename = "rps")]
    ReadsPerSecond,
    #[serde(rename = "wps")]
    WritesPerSecond,
    #[serde(rename = "pps")]
    PacketsPerSecond,
    #[serde(rename = "ops")]
    OpsPerSecond,
    #[serde(rename = "dateTimeFromNow")]
    DateTimeFromNow,
    #[serde(rename = "celsius")]
    Celsius,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Short => "short",
            Unit::None => "none",
            Unit::BytesSi => "decbytes",
            Unit::BytesIec => "bytes",
            Unit::BytesPerSecondSi => "Bps",
            Unit::Seconds => "s",
            Unit::Milliseconds => "ms",
            Unit::Percent => "percent",
            Unit::PercentUnit => "percentunit",
            Unit::RequestsPerSecond => "reqps",
            Unit::ReadsPerSecond => "rps",
            Unit::WritesPerSecond => "wps",
            Unit::PacketsPerSecond => "pps",
            Unit::OpsPerSecond => "ops",
            Unit::DateTimeFromNow => "dateTimeFromNow",
            Unit::Celsius => "celsius",
        }
    }
}

/// How a time series panel draws its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartType {
    #[default]
    Line,
    Bar,
}

/// Guess the unit and chart type for a panel from its first target.
///
/// See [`infer_from_expr`] for the rules.
pub fn infer_unit(
    targets: &[Target],
    chart: Option<ChartType>,
    unit: Option<Unit>,
) -> (Option<Unit>, ChartType) {
    let expr = targets.first().map(|t| t.expr.as_str()).unwrap_or("");
    infer_from_expr(expr, chart, unit)
}

/// Unit and chart type for a rendered expression.
///
/// An explicit chart type turns inference off; an explicit unit is never
/// replaced. Otherwise `$__interval` means an increase over buckets (bars),
/// `$__rate_interval` a per-second rate (lines) and anything else a gauge
/// (lines), and the unit comes from metric-name fragments, first match wins.
pub fn infer_from_expr(
    expr: &str,
    chart: Option<ChartType>,
    unit: Option<Unit>,
) -> (Option<Unit>, ChartType) {
    if let Some(chart) = chart {
        return (unit, chart);
    }

    if expr.contains("$__interval") {
        let inferred = if expr.contains("_bytes_total") {
            Unit::BytesSi
        } else {
            Unit::Short
        };
        return (unit.or(Some(inferred)), ChartType::Bar);
    }

    if expr.contains("$__rate_interval") {
        return (unit.or_else(|| rate_unit(expr)), ChartType::Line);
    }

    (unit.or_else(|| gauge_unit(expr)), ChartType::Line)
}

fn rate_unit(expr: &str) -> Option<Unit> {
    if expr.contains("histogram_quantile") {
        if expr.contains("_milliseconds_bucket") || expr.contains("_ms_bucket") {
            return Some(Unit::Milliseconds);
        }
        if expr.contains("_seconds_bucket") {
            return Some(Unit::Seconds);
        }
        return None;
    }
    if expr.contains("histogram_share") {
        return Some(Unit::PercentUnit);
    }

    if expr.contains("_seconds_sum")
        && expr.contains("_seconds_count")
        && expr.contains("rate")
        && expr.contains('/')
    {
        Some(Unit::Seconds)
    } else if expr.contains("_request_")
        || expr.contains("_requests_")
        || expr.contains("_response_")
    {
        Some(Unit::RequestsPerSecond)
    } else if expr.contains("_bytes_total") {
        Some(Unit::BytesPerSecondSi)
    } else if expr.contains("_reads_total") {
        Some(Unit::ReadsPerSecond)
    } else if expr.contains("_writes_total") {
        Some(Unit::WritesPerSecond)
    } else if expr.contains("_packets_total") {
        Some(Unit::PacketsPerSecond)
    } else {
        None
    }
}

fn gauge_unit(expr: &str) -> Option<Unit> {
    if expr.contains("_seconds") {
        Some(Unit::Seconds)
    } else if expr.contains("_milliseconds") || expr.contains("_ms") {
        Some(Unit::Milliseconds)
    } else if expr.contains("_bytes") {
        Some(Unit::BytesSi)
    } else if expr.contains("_percent") {
        Some(Unit::PercentUnit)
    } else {
        None
    }
}
