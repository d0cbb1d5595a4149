/// Grid and query constants shared by the layout engine and the expression builder.

// Grafana dashboards are laid out on a fixed 24-column grid
pub const GRID_WIDTH: u32 = 24;

// Height of a group header row
pub const GROUP_HEADER_HEIGHT: u32 = 1;

// Height given to panels when neither the panel nor its row sets one
pub const DEFAULT_PANEL_HEIGHT: u32 = 8;

// Height of the generated-dashboard note
pub const NOTE_HEIGHT: u32 = 3;

// Grafana built-in interval variables
pub const RANGE_INTERVAL: &str = "$__range";
pub const RATE_INTERVAL: &str = "$__rate_interval";
pub const STEP_INTERVAL: &str = "$__interval";

/// Placeholder substituted by `Query::wrap` templates
pub const EXPR_PLACEHOLDER: &str = "$__expr";

/// Legend used when a target has neither an explicit legend nor grouping columns
pub const DEFAULT_LEGEND: &str = "value";

/// Grafana truncates dashboard uids past this length
pub const MAX_UID_LEN: usize = 40;

pub const GENERATED_NOTE: &str =
    "This is a generated dashboard. Any changes made here will be lost on the next generation.";
