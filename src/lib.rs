pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Query and panel building blocks
pub mod panels;
pub mod promql;
pub mod units;

// Grid placement and dashboard documents
pub mod dashboard;
pub mod layout;

pub mod dashboards;
pub mod grafana;
