//! Immutable query expressions and the targets they resolve to.

use serde::Serialize;
use std::fmt;

use super::expr::{AggregationOp, BinaryOp, Expr};
use crate::constants::DEFAULT_LEGEND;
use crate::panels::DataSourceRef;

/// Whether Grafana evaluates a query over the dashboard range, at its end, or both
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    #[default]
    Range,
    Instant,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetFormat {
    TimeSeries,
    Table,
    Heatmap,
}

/// Per-call query options shared by every metric kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOpts {
    pub selectors: Vec<String>,
    pub group_by: Vec<String>,
    pub query_type: Option<QueryType>,
    /// Explicit range, overriding the `$__interval`/`$__rate_interval` defaults
    pub interval: Option<String>,
    /// Template containing `$__expr`
    pub wrap: Option<String>,
    pub append: Option<String>,
    pub prepend: Option<String>,
}

impl QueryOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }

    pub fn selectors<I, S>(mut self, selectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selectors.extend(selectors.into_iter().map(Into::into));
        self
    }

    pub fn group_by<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = Some(query_type);
        self
    }

    pub fn instant(self) -> Self {
        self.query_type(QueryType::Instant)
    }

    pub fn interval(mut self, interval: impl Into<String>) -> Self {
        self.interval = Some(interval.into());
        self
    }

    pub fn wrap(mut self, template: impl Into<String>) -> Self {
        self.wrap = Some(template.into());
        self
    }

    pub fn append(mut self, text: impl Into<String>) -> Self {
        self.append = Some(text.into());
        self
    }

    pub fn prepend(mut self, text: impl Into<String>) -> Self {
        self.prepend = Some(text.into());
        self
    }

    pub(crate) fn is_instant(&self) -> bool {
        self.query_type == Some(QueryType::Instant)
    }
}

/// Options for materializing a [`Query`] into a [`Target`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetOpts {
    pub ref_id: Option<String>,
    pub legend_format: Option<String>,
    /// Overrides the grouping columns recorded on the query
    pub group_by: Option<Vec<String>>,
    pub query_type: Option<QueryType>,
    pub format: Option<TargetFormat>,
    pub datasource: Option<DataSourceRef>,
}

impl TargetOpts {
    pub fn ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }

    pub fn legend(mut self, legend: impl Into<String>) -> Self {
        self.legend_format = Some(legend.into());
        self
    }

    pub fn format(mut self, format: TargetFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn query_type(mut self, query_type: QueryType) -> Self {
        self.query_type = Some(query_type);
        self
    }
}

/// A fully resolved query handed to a panel
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub expr: String,
    pub ref_id: Option<String>,
    pub legend_format: String,
    pub query_type: QueryType,
    pub format: TargetFormat,
    pub datasource: Option<DataSourceRef>,
}

impl Target {
    /// A target around a hand-written expression
    pub fn raw(expr: impl Into<String>, legend_format: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            ref_id: None,
            legend_format: legend_format.into(),
            query_type: QueryType::Range,
            format: TargetFormat::TimeSeries,
            datasource: None,
        }
    }

    pub fn with_ref_id(mut self, ref_id: impl Into<String>) -> Self {
        self.ref_id = Some(ref_id.into());
        self
    }
}

/// `{{a}} - {{b}}` for the given grouping columns, unless a legend is given.
pub fn format_legend_format(legend_format: Option<&str>, group_by: &[String]) -> String {
    match legend_format {
        Some(legend) if !legend.is_empty() => legend.to_string(),
        _ if group_by.is_empty() => DEFAULT_LEGEND.to_string(),
        _ => group_by
            .iter()
            .map(|label| format!("{{{{{}}}}}", label))
            .collect::<Vec<_>>()
            .join(" - "),
    }
}

/// An immutable PromQL expression plus the metadata needed to build a target.
///
/// Every transform returns a new `Query`; grouping columns and the query type
/// travel along unless the transform replaces them.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    expr: Expr,
    group_by: Vec<String>,
    query_type: Option<QueryType>,
}

impl Query {
    pub fn new(expr: Expr) -> Self {
        Self {
            expr,
            group_by: Vec::new(),
            query_type: None,
        }
    }

    /// Build a query from an expression and the call-site options, applying
    /// `wrap`, `append` and `prepend` in that order.
    pub(crate) fn from_opts(expr: Expr, opts: &QueryOpts) -> Self {
        let mut query = Self {
            expr,
            group_by: opts.group_by.clone(),
            query_type: opts.query_type,
        };
        if let Some(template) = &opts.wrap {
            query = query.wrap(template);
        }
        if let Some(text) = &opts.append {
            query = query.append(text);
        }
        if let Some(text) = &opts.prepend {
            query = query.prepend(text);
        }
        query
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn query_type(&self) -> Option<QueryType> {
        self.query_type
    }

    fn with_expr(&self, expr: Expr) -> Self {
        Self {
            expr,
            group_by: self.group_by.clone(),
            query_type: self.query_type,
        }
    }

    /// Aggregate the whole expression again, e.g. `max(<expr>) by (pod)`.
    pub fn calc<I, S>(&self, op: AggregationOp, group_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group_by: Vec<String> = group_by.into_iter().map(Into::into).collect();
        Self {
            expr: Expr::aggregate(op, self.expr.clone(), group_by.clone()),
            group_by,
            query_type: self.query_type,
        }
    }

    /// Substitute the expression into a template at `$__expr`.
    pub fn wrap(&self, template: impl Into<String>) -> Self {
        self.with_expr(Expr::Template {
            template: template.into(),
            inner: Box::new(self.expr.clone()),
        })
    }

    pub fn append(&self, text: impl Into<String>) -> Self {
        self.with_expr(Expr::Affix {
            prefix: String::new(),
            inner: Box::new(self.expr.clone()),
            suffix: text.into(),
        })
    }

    pub fn prepend(&self, text: impl Into<String>) -> Self {
        self.with_expr(Expr::Affix {
            prefix: text.into(),
            inner: Box::new(self.expr.clone()),
            suffix: String::new(),
        })
    }

    /// Apply a structured transform to the expression tree.
    pub fn map(&self, f: impl FnOnce(Expr) -> Expr) -> Self {
        self.with_expr(f(self.expr.clone()))
    }

    pub fn multiply(&self, factor: f64) -> Self {
        self.map(|e| Expr::binary(e, BinaryOp::Mul, Expr::Number(factor)))
    }

    pub fn compare(&self, op: BinaryOp, value: f64) -> Self {
        self.map(|e| Expr::binary(e, op, Expr::Number(value)))
    }

    pub fn target(&self) -> Target {
        self.target_with(TargetOpts::default())
    }

    pub fn target_with(&self, opts: TargetOpts) -> Target {
        let query_type = opts.query_type.or(self.query_type).unwrap_or_default();
        let group_by = opts.group_by.as_deref().unwrap_or(&self.group_by);
        let format = opts.format.unwrap_or(match query_type {
            QueryType::Instant => TargetFormat::Table,
            _ => TargetFormat::TimeSeries,
        });
        Target {
            expr: self.expr.to_string(),
            ref_id: opts.ref_id,
            legend_format: format_legend_format(opts.legend_format.as_deref(), group_by),
            query_type,
            format,
            datasource: opts.datasource,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promql::expr::VectorSelector;

    fn up() -> Query {
        Query::new(VectorSelector::new("up").into())
    }

    #[test]
    fn test_legend_format_defaults() {
        let cols = vec!["pod".to_string(), "namespace".to_string()];
        assert_eq!(format_legend_format(None, &cols), "{{pod}} - {{namespace}}");
        assert_eq!(format_legend_format(None, &[]), "value");
        assert_eq!(format_legend_format(Some("p99"), &cols), "p99");
        assert_eq!(format_legend_format(Some(""), &cols), "{{pod}} - {{namespace}}");
    }

    #[test]
    fn test_transforms_do_not_mutate_original() {
        let base = up();
        let wrapped = base.wrap("clamp_min($__expr, 0)");
        let appended = base.append(" > 0");
        let prepended = base.prepend("-");
        assert_eq!(base.to_string(), "up");
        assert_eq!(wrapped.to_string(), "clamp_min(up, 0)");
        assert_eq!(appended.to_string(), "up > 0");
        assert_eq!(prepended.to_string(), "-up");
    }

    #[test]
    fn test_calc_replaces_grouping_and_keeps_type() {
        let q = Query::from_opts(
            VectorSelector::new("up").into(),
            &QueryOpts::new().group_by(["pod"]).instant(),
        );
        let outer = q.calc(AggregationOp::Max, ["namespace"]);
        assert_eq!(outer.to_string(), "max(up) by (namespace)");
        assert_eq!(outer.group_by(), ["namespace".to_string()]);
        assert_eq!(outer.query_type(), Some(QueryType::Instant));
        assert_eq!(q.group_by(), ["pod".to_string()]);
    }

    #[test]
    fn test_wrap_preserves_metadata() {
        let q = Query::from_opts(VectorSelector::new("up").into(), &QueryOpts::new().group_by(["a"]));
        let w = q.wrap("abs($__expr)").multiply(2.0);
        assert_eq!(w.group_by(), ["a".to_string()]);
        assert_eq!(w.to_string(), "abs(up) * 2");
    }

    #[test]
    fn test_arithmetic_after_affix_keeps_meaning() {
        let q = up().prepend("1 - ").multiply(100.0);
        assert_eq!(q.to_string(), "(1 - up) * 100");

        let q = up().append(" > 0").multiply(2.0);
        assert_eq!(q.to_string(), "(up > 0) * 2");

        let q = up().wrap("$__expr + 1").compare(BinaryOp::Gt, 0.0).multiply(2.0);
        assert_eq!(q.to_string(), "((up + 1) > 0) * 2");
    }

    #[test]
    fn test_from_opts_applies_wrap_append_prepend_in_order() {
        let opts = QueryOpts::new().wrap("abs($__expr)").append(" * 1000").prepend("-");
        let q = Query::from_opts(VectorSelector::new("up").into(), &opts);
        assert_eq!(q.to_string(), "-abs(up) * 1000");
    }

    #[test]
    fn test_target_defaults() {
        let t = up().target();
        assert_eq!(t.query_type, QueryType::Range);
        assert_eq!(t.format, TargetFormat::TimeSeries);
        assert_eq!(t.legend_format, "value");
        assert!(t.ref_id.is_none());

        let instant = Query::from_opts(VectorSelector::new("up").into(), &QueryOpts::new().instant());
        assert_eq!(instant.target().format, TargetFormat::Table);
        assert_eq!(instant.target().query_type, QueryType::Instant);
    }

    #[test]
    fn test_target_opts_override() {
        let t = up().target_with(
            TargetOpts::default()
                .ref_id("B")
                .legend("up")
                .format(TargetFormat::Heatmap)
                .query_type(QueryType::Both),
        );
        assert_eq!(t.ref_id.as_deref(), Some("B"));
        assert_eq!(t.legend_format, "up");
        assert_eq!(t.format, TargetFormat::Heatmap);
        assert_eq!(t.query_type, QueryType::Both);
    }
}
