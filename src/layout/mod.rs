//! Grid placement for rows and groups of panels.
//!
//! [`auto_layout`] walks the tree depth first with a running vertical cursor.
//! Within a row, panels without a width share what the explicit widths leave
//! over (floor division), and a panel that would cross column 24 starts a new
//! line below the tallest panel of the previous one. Groups become row
//! headers; children of an open group follow the header in the flat output,
//! children of a collapsed group are nested inside it.

pub mod tree;

pub use tree::{GroupOpts, LayoutItem, PanelGroup, PanelRow, RowOpts};

use tracing::debug;

use crate::constants::GRID_WIDTH;
use crate::panels::Panel;

/// Position every panel of the tree. The input is left untouched.
pub fn auto_layout(items: &[LayoutItem]) -> Vec<Panel> {
    layout_from(items, 0).0
}

/// Lay the items out starting at `y`, returning the panels and the cursor
/// below the last one.
fn layout_from(items: &[LayoutItem], mut y: u32) -> (Vec<Panel>, u32) {
    let mut out = Vec::new();
    for item in items {
        match item {
            LayoutItem::Row(row) => {
                let (placed, next_y) = place_row(row.panels().to_vec(), y);
                out.extend(placed);
                y = next_y;
            }
            LayoutItem::Group(group) => {
                // the header is a one-panel row of its own
                let header = Panel::row_header(group.title(), group.collapsed());
                let (placed, next_y) = place_row(vec![header], y);
                y = next_y;

                let mut children = Vec::new();
                for row in group.rows() {
                    let (row_panels, next_y) = place_row(row.panels().to_vec(), y);
                    children.extend(row_panels);
                    y = next_y;
                }

                if group.collapsed() {
                    out.extend(placed.into_iter().map(|mut header| {
                        header.panels = children.clone();
                        header
                    }));
                } else {
                    // header panels stay empty, children render inline
                    out.extend(placed);
                    out.extend(children);
                }
            }
        }
    }
    (out, y)
}

fn place_row(mut panels: Vec<Panel>, mut y: u32) -> (Vec<Panel>, u32) {
    let explicit: u32 = panels.iter().map(|p| p.grid_pos.w).sum();
    let unsized_count = panels.iter().filter(|p| p.grid_pos.w == 0).count() as u32;
    if unsized_count > 0 {
        let share = GRID_WIDTH.saturating_sub(explicit) / unsized_count;
        for panel in panels.iter_mut().filter(|p| p.grid_pos.w == 0) {
            panel.grid_pos.w = share;
        }
    }

    let mut x = 0;
    let mut max_h = 0;
    for panel in &mut panels {
        if x > 0 && x + panel.grid_pos.w > GRID_WIDTH {
            x = 0;
            y += max_h;
            max_h = 0;
        }
        panel.grid_pos.x = x;
        panel.grid_pos.y = y;
        x += panel.grid_pos.w;
        max_h = max_h.max(panel.grid_pos.h);
    }
    if x > GRID_WIDTH {
        debug!(width = x, "row overflows the grid");
    }
    (panels, y + max_h)
}
