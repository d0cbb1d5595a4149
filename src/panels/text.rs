use serde_json::json;

use super::Panel;

/// Transparent markdown panel.
pub fn text(content: impl Into<String>, width: u32, height: u32) -> Panel {
    let mut panel = Panel::new("text", "")
        .with_width(width)
        .with_height(height);
    panel.transparent = true;
    panel.options = json!({ "mode": "markdown", "content": content.into() });
    panel
}
