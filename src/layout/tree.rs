//! Rows and collapsible groups of panels, the input to [`super::auto_layout`].

use crate::constants::DEFAULT_PANEL_HEIGHT;
use crate::panels::{DataSourceRef, Panel};

/// Defaults applied to every panel of a row that does not set its own
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowOpts {
    pub datasource: Option<DataSourceRef>,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

impl RowOpts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn datasource(mut self, datasource: DataSourceRef) -> Self {
        self.datasource = Some(datasource);
        self
    }

    pub fn height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self
    }

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }
}

/// Panels laid out left to right, wrapping at the grid edge.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    panels: Vec<Panel>,
}

impl PanelRow {
    /// Build a row, skipping `None` entries so call sites can include panels
    /// conditionally. Row defaults never replace a value the panel already has.
    pub fn new<I, P>(opts: RowOpts, panels: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Option<Panel>>,
    {
        let panels = panels
            .into_iter()
            .filter_map(Into::into)
            .map(|mut panel| {
                if panel.datasource.is_none() {
                    panel.datasource = opts.datasource.clone();
                }
                if panel.grid_pos.w == 0 {
                    panel.grid_pos.w = opts.width.unwrap_or(0);
                }
                if panel.grid_pos.h == 0 {
                    panel.grid_pos.h = opts.height.unwrap_or(DEFAULT_PANEL_HEIGHT);
                }
                panel
            })
            .collect();
        Self { panels }
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupOpts {
    pub title: String,
    pub collapsed: bool,
}

impl GroupOpts {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            collapsed: false,
        }
    }

    pub fn collapsed(mut self, collapsed: bool) -> Self {
        self.collapsed = collapsed;
        self
    }
}

/// A titled section of rows, rendered behind a row header
#[derive(Debug, Clone, PartialEq)]
pub struct PanelGroup {
    title: String,
    collapsed: bool,
    rows: Vec<PanelRow>,
}

impl PanelGroup {
    pub fn new<I, R>(opts: GroupOpts, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<Option<PanelRow>>,
    {
        Self {
            title: opts.title,
            collapsed: opts.collapsed,
            rows: rows.into_iter().filter_map(Into::into).collect(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn rows(&self) -> &[PanelRow] {
        &self.rows
    }
}

/// One entry of a dashboard's panel tree
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Row(PanelRow),
    Group(PanelGroup),
}

impl From<PanelRow> for LayoutItem {
    fn from(row: PanelRow) -> Self {
        LayoutItem::Row(row)
    }
}

impl From<PanelGroup> for LayoutItem {
    fn from(group: PanelGroup) -> Self {
        LayoutItem::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel(title: &str) -> Panel {
        Panel::new("timeseries", title)
    }

    #[test]
    fn test_row_skips_missing_panels() {
        let include_extra = false;
        let row = PanelRow::new(
            RowOpts::new(),
            vec![Some(panel("a")), include_extra.then(|| panel("b")), Some(panel("c"))],
        );
        let titles: Vec<&str> = row.panels().iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, ["a", "c"]);
    }

    #[test]
    fn test_row_defaults_never_overwrite() {
        let own = DataSourceRef::prometheus("own");
        let row_ds = DataSourceRef::prometheus("row");
        let row = PanelRow::new(
            RowOpts::new().datasource(row_ds.clone()).height(5).width(6),
            vec![
                panel("plain"),
                panel("sized").with_width(12).with_height(9).with_datasource(own.clone()),
            ],
        );
        let plain = &row.panels()[0];
        assert_eq!(plain.datasource.as_ref(), Some(&row_ds));
        assert_eq!((plain.grid_pos.w, plain.grid_pos.h), (6, 5));
        let sized = &row.panels()[1];
        assert_eq!(sized.datasource.as_ref(), Some(&own));
        assert_eq!((sized.grid_pos.w, sized.grid_pos.h), (12, 9));
    }

    #[test]
    fn test_height_falls_back_to_default() {
        let row = PanelRow::new(RowOpts::new(), vec![panel("a")]);
        assert_eq!(row.panels()[0].grid_pos.h, DEFAULT_PANEL_HEIGHT);
        assert_eq!(row.panels()[0].grid_pos.w, 0);
    }

    #[test]
    fn test_group_filters_rows() {
        let group = PanelGroup::new(
            GroupOpts::new("Runtime"),
            vec![Some(PanelRow::new(RowOpts::new(), vec![panel("a")])), None],
        );
        assert_eq!(group.title(), "Runtime");
        assert!(!group.collapsed());
        assert_eq!(group.rows().len(), 1);
    }
}
