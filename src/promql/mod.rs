//! PromQL expression builder.
//!
//! Metric descriptors ([`CounterMetric`], [`GaugeMetric`], [`HistogramMetric`],
//! [`SummaryMetric`]) produce immutable [`Query`] values which resolve to
//! panel [`Target`]s.

pub mod expr;
pub mod metric;
pub mod query;
pub mod selector;

pub use expr::{AggregationOp, BinaryOp, Expr, Function, VectorSelector};
pub use metric::{
    CounterMetric, GaugeMetric, HistogramMetric, Metric, MetricOpts, RatioFunction, RatioOpts,
    SummaryMetric,
};
pub use query::{format_legend_format, Query, QueryOpts, QueryType, Target, TargetFormat, TargetOpts};
pub use selector::{merge_selectors, parse_selectors, LabelMatcher, MatchOp};
