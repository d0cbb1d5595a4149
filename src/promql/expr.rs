//! A small PromQL syntax tree.
//!
//! Queries are built as trees and rendered with `Display`, which keeps the
//! punctuation (parentheses, `by` clauses, selector braces) in one place.

use std::fmt;

use super::selector::LabelMatcher;
use crate::constants::EXPR_PLACEHOLDER;

/// Aggregation operators that take no parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationOp {
    Sum,
    Avg,
    Min,
    Max,
    Count,
    Group,
    Stddev,
    Stdvar,
}

impl AggregationOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationOp::Sum => "sum",
            AggregationOp::Avg => "avg",
            AggregationOp::Min => "min",
            AggregationOp::Max => "max",
            AggregationOp::Count => "count",
            AggregationOp::Group => "group",
            AggregationOp::Stddev => "stddev",
            AggregationOp::Stdvar => "stdvar",
        }
    }
}

/// Functions the builder knows how to emit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Rate,
    Irate,
    Increase,
    Resets,
    Delta,
    Idelta,
    Changes,
    Deriv,
    HistogramQuantile,
    HistogramShare,
}

impl Function {
    pub fn as_str(&self) -> &'static str {
        match self {
            Function::Rate => "rate",
            Function::Irate => "irate",
            Function::Increase => "increase",
            Function::Resets => "resets",
            Function::Delta => "delta",
            Function::Idelta => "idelta",
            Function::Changes => "changes",
            Function::Deriv => "deriv",
            Function::HistogramQuantile => "histogram_quantile",
            Function::HistogramShare => "histogram_share",
        }
    }

    /// Whether the function reads a per-second rate and therefore wants
    /// `$__rate_interval` as its default range.
    pub fn is_rate_like(&self) -> bool {
        matches!(
            self,
            Function::Rate | Function::Irate | Function::HistogramQuantile | Function::HistogramShare
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::Ge => ">=",
            BinaryOp::Le => "<=",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Pow => 6,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 5,
            BinaryOp::Add | BinaryOp::Sub => 4,
            _ => 3,
        }
    }
}

/// `metric{matchers}[range]`
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSelector {
    pub metric: String,
    pub matchers: Vec<LabelMatcher>,
    pub range: Option<String>,
}

impl VectorSelector {
    pub fn new(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            matchers: Vec::new(),
            range: None,
        }
    }

    pub fn with_matchers(mut self, matchers: Vec<LabelMatcher>) -> Self {
        self.matchers = matchers;
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = Some(range.into());
        self
    }
}

impl fmt::Display for VectorSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.metric)?;
        if !self.matchers.is_empty() {
            let matchers: Vec<String> = self.matchers.iter().map(|m| m.to_string()).collect();
            write!(f, "{{{}}}", matchers.join(", "))?;
        }
        if let Some(range) = &self.range {
            write!(f, "[{}]", range)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Vector(VectorSelector),
    Number(f64),
    Call {
        func: Function,
        args: Vec<Expr>,
    },
    Aggregate {
        op: AggregationOp,
        expr: Box<Expr>,
        by: Vec<String>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    /// Textual template with a `$__expr` placeholder
    Template {
        template: String,
        inner: Box<Expr>,
    },
    /// Literal text glued before and after an expression
    Affix {
        prefix: String,
        inner: Box<Expr>,
        suffix: String,
    },
}

impl Expr {
    pub fn call(func: Function, args: Vec<Expr>) -> Self {
        Expr::Call { func, args }
    }

    pub fn aggregate(op: AggregationOp, expr: Expr, by: Vec<String>) -> Self {
        Expr::Aggregate {
            op,
            expr: Box::new(expr),
            by,
        }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Div, right)
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: BinaryOp, right_side: bool) -> fmt::Result {
        let needs_parens = match self {
            Expr::Binary { op, .. } => {
                op.precedence() < parent.precedence()
                    || (right_side && op.precedence() == parent.precedence())
            }
            // free-form text may carry its own operators
            Expr::Template { .. } | Expr::Affix { .. } => !is_atomic(&self.to_string()),
            _ => false,
        };
        if needs_parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Whether rendered PromQL is a single term: a bare selector, a number or
/// one function/aggregation call spanning the whole text.
fn is_atomic(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return true;
    }
    let name_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':' || c == '.'))
        .unwrap_or(text.len());
    let rest = &text[name_len..];
    if rest.is_empty() {
        return name_len > 0;
    }
    if name_len == 0 || !rest.starts_with(['(', '{', '[']) {
        return false;
    }

    // the first bracket opened after the name has to close at the very end,
    // optionally followed by a range or a `by (..)` clause
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if in_string {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let tail = rest[i + 1..].trim_start();
                    return tail.is_empty() || is_atomic_tail(tail);
                }
            }
            _ => {}
        }
    }
    false
}

fn is_atomic_tail(tail: &str) -> bool {
    let tail = tail
        .strip_prefix("by")
        .or_else(|| tail.strip_prefix("without"))
        .map(str::trim_start)
        .unwrap_or(tail);
    if tail.starts_with(['(', '{', '[']) {
        is_atomic(&format!("x{}", tail))
    } else {
        false
    }
}

impl From<VectorSelector> for Expr {
    fn from(selector: VectorSelector) -> Self {
        Expr::Vector(selector)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Vector(selector) => write!(f, "{}", selector),
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Call { func, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", func.as_str(), args.join(", "))
            }
            Expr::Aggregate { op, expr, by } => {
                write!(f, "{}({})", op.as_str(), expr)?;
                if !by.is_empty() {
                    write!(f, " by ({})", by.join(", "))?;
                }
                Ok(())
            }
            Expr::Binary { left, op, right } => {
                left.fmt_operand(f, *op, false)?;
                write!(f, " {} ", op.as_str())?;
                right.fmt_operand(f, *op, true)
            }
            Expr::Template { template, inner } => {
                f.write_str(&template.replacen(EXPR_PLACEHOLDER, &inner.to_string(), 1))
            }
            Expr::Affix {
                prefix,
                inner,
                suffix,
            } => write!(f, "{}{}{}", prefix, inner, suffix),
        }
    }
}
