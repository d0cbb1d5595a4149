//! Metric descriptors and the query shapes each kind supports.
//!
//! | kind      | queries                                                   |
//! |-----------|-----------------------------------------------------------|
//! | counter   | `op(func(m{sel}[range])) by (..)`, ratios of two counters |
//! | gauge     | `m{sel}` or `op(m{sel}) by (..)`                          |
//! | histogram | quantile/share over `_bucket`, average via `_sum/_count`  |
//! | summary   | average via `_sum/_count`, pre-computed quantiles         |

use super::expr::{AggregationOp, Expr, Function, VectorSelector};
use super::query::{Query, QueryOpts};
use super::selector::{merge_selectors, parse_selectors, LabelMatcher};
use crate::constants::{RANGE_INTERVAL, RATE_INTERVAL, STEP_INTERVAL};
use crate::error::Result;

/// Options fixed on a metric descriptor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricOpts {
    pub description: Option<String>,
    pub labels: Vec<String>,
    /// Selectors applied to every query built from this metric
    pub selectors: Vec<String>,
}

impl MetricOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selectors.push(selector.into());
        self
    }
}

/// Common accessors for every metric kind
pub trait Metric {
    fn name(&self) -> &str;
    fn opts(&self) -> &MetricOpts;

    fn description(&self) -> Option<&str> {
        self.opts().description.as_deref()
    }

    fn labels(&self) -> &[String] {
        &self.opts().labels
    }
}

/// Functions allowed in ratio and average queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RatioFunction {
    #[default]
    Rate,
    Increase,
}

impl From<RatioFunction> for Function {
    fn from(f: RatioFunction) -> Self {
        match f {
            RatioFunction::Rate => Function::Rate,
            RatioFunction::Increase => Function::Increase,
        }
    }
}

/// Extra selectors for the two halves of [`CounterMetric::percentage`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatioOpts {
    pub numerator_selectors: Vec<String>,
    pub denominator_selectors: Vec<String>,
    pub func: RatioFunction,
}

impl RatioOpts {
    pub fn numerator(mut self, selector: impl Into<String>) -> Self {
        self.numerator_selectors.push(selector.into());
        self
    }

    pub fn denominator(mut self, selector: impl Into<String>) -> Self {
        self.denominator_selectors.push(selector.into());
        self
    }

    pub fn func(mut self, func: RatioFunction) -> Self {
        self.func = func;
        self
    }
}

/// Range used for a range-vector selector.
///
/// An explicit interval wins; instant queries cover the whole dashboard range;
/// rate-like functions use `$__rate_interval`; everything else `$__interval`.
fn range_for(opts: &QueryOpts, func: Option<Function>) -> String {
    if let Some(interval) = &opts.interval {
        return interval.clone();
    }
    if opts.is_instant() {
        return RANGE_INTERVAL.to_string();
    }
    match func {
        Some(f) if f.is_rate_like() => RATE_INTERVAL.to_string(),
        _ => STEP_INTERVAL.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
struct MetricBase {
    name: String,
    opts: MetricOpts,
}

impl MetricBase {
    fn new(name: impl Into<String>, opts: MetricOpts) -> Self {
        Self {
            name: name.into(),
            opts,
        }
    }

    fn sibling(&self, suffix: &str) -> CounterMetric {
        CounterMetric {
            base: MetricBase::new(format!("{}{}", self.name, suffix), self.opts.clone()),
        }
    }

    /// Vector selector with the metric's own selectors followed by `extra`.
    fn selector<'a, I>(&'a self, extra: I) -> Result<VectorSelector>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let merged = merge_selectors(self.opts.selectors.iter().chain(extra));
        let matchers = parse_selectors(&merged)?;
        Ok(VectorSelector::new(self.name.clone()).with_matchers(matchers))
    }

    /// `sum(func(m{sel}[range])) by (..)`
    fn sum_of(&self, func: Function, selector: VectorSelector, opts: &QueryOpts) -> Expr {
        let range = range_for(opts, Some(func));
        Expr::aggregate(
            AggregationOp::Sum,
            Expr::call(func, vec![selector.with_range(range).into()]),
            opts.group_by.clone(),
        )
    }
}

/// A monotonically increasing counter
#[derive(Debug, Clone, PartialEq)]
pub struct CounterMetric {
    base: MetricBase,
}

impl CounterMetric {
    pub fn new(name: impl Into<String>, opts: MetricOpts) -> Self {
        Self {
            base: MetricBase::new(name, opts),
        }
    }

    /// `op(func(metric{selectors}[range])) by (group_by)`
    pub fn calc(&self, op: AggregationOp, func: Function, opts: &QueryOpts) -> Result<Query> {
        let range = range_for(opts, Some(func));
        let selector = self.base.selector(&opts.selectors)?.with_range(range);
        let expr = Expr::aggregate(
            op,
            Expr::call(func, vec![selector.into()]),
            opts.group_by.clone(),
        );
        Ok(Query::from_opts(expr, opts))
    }

    pub fn rate(&self, opts: &QueryOpts) -> Result<Query> {
        self.calc(AggregationOp::Sum, Function::Rate, opts)
    }

    pub fn increase(&self, opts: &QueryOpts) -> Result<Query> {
        self.calc(AggregationOp::Sum, Function::Increase, opts)
    }

    /// Ratio of the same counter under two selector sets, e.g. error share.
    pub fn percentage(&self, opts: &QueryOpts, ratio: &RatioOpts) -> Result<Query> {
        let func = Function::from(ratio.func);
        let numerator = self
            .base
            .selector(opts.selectors.iter().chain(&ratio.numerator_selectors))?;
        let denominator = self
            .base
            .selector(opts.selectors.iter().chain(&ratio.denominator_selectors))?;
        let expr = Expr::div(
            self.base.sum_of(func, numerator, opts),
            self.base.sum_of(func, denominator, opts),
        );
        Ok(Query::from_opts(expr, opts))
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn opts(&self) -> &MetricOpts {
        &self.base.opts
    }
}

/// An instantaneous value
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeMetric {
    base: MetricBase,
}

impl GaugeMetric {
    pub fn new(name: impl Into<String>, opts: MetricOpts) -> Self {
        Self {
            base: MetricBase::new(name, opts),
        }
    }

    /// `op(metric{selectors}) by (group_by)`, or the bare selector when no
    /// operator is given. An explicit interval becomes a range suffix.
    pub fn calc(&self, op: Option<AggregationOp>, opts: &QueryOpts) -> Result<Query> {
        let mut selector = self.base.selector(&opts.selectors)?;
        if let Some(interval) = &opts.interval {
            selector = selector.with_range(interval.clone());
        }
        let expr = match op {
            Some(op) => Expr::aggregate(op, selector.into(), opts.group_by.clone()),
            None => selector.into(),
        };
        Ok(Query::from_opts(expr, opts))
    }

    pub fn raw(&self, opts: &QueryOpts) -> Result<Query> {
        self.calc(None, opts)
    }
}

impl Metric for GaugeMetric {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn opts(&self) -> &MetricOpts {
        &self.base.opts
    }
}

/// `sum(func(m_sum{sel}[i])) by (g) / sum(func(m_count{sel}[i])) by (g)`
fn average(base: &MetricBase, opts: &QueryOpts, func: RatioFunction) -> Result<Query> {
    let func = Function::from(func);
    let sum = base.sibling("_sum");
    let count = base.sibling("_count");
    let expr = Expr::div(
        sum.base.sum_of(func, sum.base.selector(&opts.selectors)?, opts),
        count.base.sum_of(func, count.base.selector(&opts.selectors)?, opts),
    );
    Ok(Query::from_opts(expr, opts))
}

/// A classic bucketed histogram
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramMetric {
    base: MetricBase,
}

impl HistogramMetric {
    pub fn new(name: impl Into<String>, opts: MetricOpts) -> Self {
        Self {
            base: MetricBase::new(name, opts),
        }
    }

    pub fn count(&self) -> CounterMetric {
        self.base.sibling("_count")
    }

    pub fn sum(&self) -> CounterMetric {
        self.base.sibling("_sum")
    }

    pub fn bucket(&self) -> CounterMetric {
        self.base.sibling("_bucket")
    }

    pub fn avg(&self, opts: &QueryOpts, func: RatioFunction) -> Result<Query> {
        average(&self.base, opts, func)
    }

    /// `func(value, sum(rate(m_bucket{sel}[range])) by (le, ..))`
    fn bucket_query(&self, func: Function, value: f64, opts: &QueryOpts) -> Result<Query> {
        let bucket = self.bucket();
        let range = range_for(opts, Some(func));
        let selector = bucket.base.selector(&opts.selectors)?.with_range(range);
        let mut group_by = vec!["le".to_string()];
        group_by.extend(opts.group_by.iter().cloned());
        let buckets = Expr::aggregate(
            AggregationOp::Sum,
            Expr::call(Function::Rate, vec![selector.into()]),
            group_by,
        );
        let expr = Expr::call(func, vec![Expr::Number(value), buckets]);
        Ok(Query::from_opts(expr, opts))
    }

    pub fn quantile(&self, value: f64, opts: &QueryOpts) -> Result<Query> {
        self.bucket_query(Function::HistogramQuantile, value, opts)
    }

    pub fn share(&self, value: f64, opts: &QueryOpts) -> Result<Query> {
        self.bucket_query(Function::HistogramShare, value, opts)
    }
}

impl Metric for HistogramMetric {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn opts(&self) -> &MetricOpts {
        &self.base.opts
    }
}

/// A client-side summary with pre-computed quantiles
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryMetric {
    base: MetricBase,
}

impl SummaryMetric {
    pub fn new(name: impl Into<String>, opts: MetricOpts) -> Self {
        Self {
            base: MetricBase::new(name, opts),
        }
    }

    pub fn count(&self) -> CounterMetric {
        self.base.sibling("_count")
    }

    pub fn sum(&self) -> CounterMetric {
        self.base.sibling("_sum")
    }

    pub fn avg(&self, opts: &QueryOpts, func: RatioFunction) -> Result<Query> {
        average(&self.base, opts, func)
    }

    /// Gauge view pinned to one `quantile` label value. The value is used
    /// verbatim, so `"0.50"` matches a series exported as `quantile="0.50"`.
    pub fn quantile(&self, value: impl Into<String>) -> GaugeMetric {
        let mut opts = self.base.opts.clone();
        opts.selectors
            .push(LabelMatcher::eq("quantile", value).to_string());
        GaugeMetric::new(self.base.name.clone(), opts)
    }
}

impl Metric for SummaryMetric {
    fn name(&self) -> &str {
        &self.base.name
    }

    fn opts(&self) -> &MetricOpts {
        &self.base.opts
    }
}
