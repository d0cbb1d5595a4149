//! Template variables shown in the dashboard header.

use serde_json::{json, Value};

use crate::panels::DataSourceRef;

/// `hide` values understood by Grafana
const SHOW: u8 = 0;
const HIDE_VARIABLE: u8 = 2;

/// Refresh the options whenever the time range changes
const REFRESH_ON_TIME_RANGE: u8 = 2;
/// Alphabetical, ascending
const SORT_ALPHABETICAL_ASC: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasourceKind {
    Prometheus,
    Loki,
    Mysql,
}

impl DatasourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasourceKind::Prometheus => "prometheus",
            DatasourceKind::Loki => "loki",
            DatasourceKind::Mysql => "mysql",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    /// Lets the viewer pick a datasource of one plugin type
    Datasource {
        name: String,
        label: String,
        kind: DatasourceKind,
        regex: Option<String>,
    },
    /// Options produced by a datasource query, e.g. `label_values(up, job)`
    Query {
        name: String,
        label: String,
        datasource: DataSourceRef,
        query: String,
        multi: bool,
        include_all: bool,
        regex: Option<String>,
        hide: bool,
    },
    Textbox {
        name: String,
        label: String,
        default: Option<String>,
        hide: bool,
    },
}

impl Variable {
    pub fn datasource(name: impl Into<String>, label: impl Into<String>, kind: DatasourceKind) -> Self {
        Variable::Datasource {
            name: name.into(),
            label: label.into(),
            kind,
            regex: None,
        }
    }

    pub fn prometheus_datasource(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::datasource(name, label, DatasourceKind::Prometheus)
    }

    pub fn query(
        name: impl Into<String>,
        label: impl Into<String>,
        datasource: DataSourceRef,
        query: impl Into<String>,
    ) -> Self {
        Variable::Query {
            name: name.into(),
            label: label.into(),
            datasource,
            query: query.into(),
            multi: false,
            include_all: false,
            regex: None,
            hide: false,
        }
    }

    pub fn textbox(name: impl Into<String>, label: impl Into<String>) -> Self {
        Variable::Textbox {
            name: name.into(),
            label: label.into(),
            default: None,
            hide: false,
        }
    }

    /// Allow selecting several values plus "All". Only affects query variables.
    pub fn multi(mut self) -> Self {
        if let Variable::Query {
            multi, include_all, ..
        } = &mut self
        {
            *multi = true;
            *include_all = true;
        }
        self
    }

    pub fn regex(mut self, pattern: impl Into<String>) -> Self {
        match &mut self {
            Variable::Datasource { regex, .. } | Variable::Query { regex, .. } => {
                *regex = Some(pattern.into());
            }
            Variable::Textbox { .. } => {}
        }
        self
    }

    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        if let Variable::Textbox { default, .. } = &mut self {
            *default = Some(value.into());
        }
        self
    }

    pub fn hidden(mut self) -> Self {
        match &mut self {
            Variable::Query { hide, .. } | Variable::Textbox { hide, .. } => *hide = true,
            Variable::Datasource { .. } => {}
        }
        self
    }

    pub fn name(&self) -> &str {
        match self {
            Variable::Datasource { name, .. }
            | Variable::Query { name, .. }
            | Variable::Textbox { name, .. } => name,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Variable::Datasource {
                name,
                label,
                kind,
                regex,
            } => json!({
                "type": "datasource",
                "name": name,
                "label": label,
                "query": kind.as_str(),
                "regex": regex.as_deref().unwrap_or(""),
                "hide": SHOW,
                "refresh": 1,
                "current": {},
                "options": []
            }),
            Variable::Query {
                name,
                label,
                datasource,
                query,
                multi,
                include_all,
                regex,
                hide,
            } => json!({
                "type": "query",
                "name": name,
                "label": label,
                "datasource": datasource,
                "query": query,
                "definition": query,
                "multi": multi,
                "includeAll": include_all,
                "regex": regex.as_deref().unwrap_or(""),
                "hide": if *hide { HIDE_VARIABLE } else { SHOW },
                "refresh": REFRESH_ON_TIME_RANGE,
                "sort": SORT_ALPHABETICAL_ASC,
                "current": {},
                "options": []
            }),
            Variable::Textbox {
                name,
                label,
                default,
                hide,
            } => {
                let value = default.as_deref().unwrap_or("");
                json!({
                    "type": "textbox",
                    "name": name,
                    "label": label,
                    "query": value,
                    "hide": if *hide { HIDE_VARIABLE } else { SHOW },
                    "current": { "text": value, "value": value },
                    "options": []
                })
            }
        }
    }
}
