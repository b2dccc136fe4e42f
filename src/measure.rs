use unicode_width::UnicodeWidthStr;

pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    /// Vertical gap between a node and its label.
    pub label_gap: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 7.0,
            line_height: 14.0,
            label_gap: 4.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        display_width(text) as f64 * self.char_width
    }

    /// Extent of a node label drawn centered below a node of `radius`.
    pub fn label_box(&self, label: &str, radius: f64) -> (f64, f64) {
        let width = self.text_width(label).max(radius * 2.0);
        let height = radius * 2.0 + self.label_gap + self.line_height;
        (width, height)
    }
}

/// Terminal columns occupied by `text`; wide CJK characters count twice.
pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

pub fn pad_to_width(text: &str, width: usize) -> String {
    let pad = width.saturating_sub(display_width(text));
    format!("{text}{}", " ".repeat(pad))
}

/// Aligned `name  type  description` rows for plain-text tooltips. At most
/// `max_rows` rows are listed, followed by a count of the remainder.
pub fn column_listing(rows: &[(&str, &str, &str)], max_rows: usize) -> String {
    let shown = &rows[..rows.len().min(max_rows)];
    let name_w = shown.iter().map(|r| display_width(r.0)).max().unwrap_or(0);
    let type_w = shown.iter().map(|r| display_width(r.1)).max().unwrap_or(0);

    let mut lines: Vec<String> = shown
        .iter()
        .map(|(name, typ, desc)| {
            let line = if desc.is_empty() {
                format!("{}  {}", pad_to_width(name, name_w), typ)
            } else {
                format!(
                    "{}  {}  {}",
                    pad_to_width(name, name_w),
                    pad_to_width(typ, type_w),
                    desc
                )
            };
            line.trim_end().to_string()
        })
        .collect();

    if rows.len() > shown.len() {
        lines.push(format!("… {} more", rows.len() - shown.len()));
    }
    lines.join("\n")
}
