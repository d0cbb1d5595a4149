//! Dashboards bundled with the `dashgen` binary.

pub mod go_runtime;
pub mod traefik;

pub use go_runtime::{go_runtime_panels, GoRuntimeOpts};
pub use traefik::traefik;

use crate::dashboard::{DashboardBuilder, Variable};
use crate::error::{DashgenError, Result};
use crate::panels::DataSourceRef;

/// A named dashboard constructor
#[derive(Debug, Clone, Copy)]
pub struct DashboardDef {
    pub name: &'static str,
    pub build: fn() -> Result<DashboardBuilder>,
}

pub const DASHBOARDS: &[DashboardDef] = &[
    DashboardDef {
        name: "traefik",
        build: traefik,
    },
    DashboardDef {
        name: "go-runtime",
        build: go_runtime,
    },
];

pub fn find(name: &str) -> Result<&'static DashboardDef> {
    DASHBOARDS
        .iter()
        .find(|d| d.name == name)
        .ok_or_else(|| DashgenError::UnknownDashboard(name.to_string()))
}

/// Standalone Go runtime dashboard filtered by `job`.
pub fn go_runtime() -> Result<DashboardBuilder> {
    let datasource = DataSourceRef::prometheus("${DS_PROMETHEUS}");
    let group = go_runtime_panels(&GoRuntimeOpts {
        datasource: Some(datasource.clone()),
        selectors: vec![r#"job=~"$job""#.to_string()],
        ..GoRuntimeOpts::default()
    })?;

    Ok(DashboardBuilder::new("Go Runtime")
        .uid("go-runtime")
        .tags(["go", "generated"])
        .variable(Variable::prometheus_datasource("DS_PROMETHEUS", "Prometheus"))
        .variable(Variable::query("job", "Job", datasource, "label_values(go_info, job)").multi())
        .group(group))
}
