//! Plain-text table rendering.

use super::types::StatusRow;
use crate::config::ArtifactKind;

/// Renders the status table with one column per artifact kind.
pub fn render_table(columns: &[ArtifactKind], rows: &[StatusRow]) -> String {
    let mut header = vec!["Topic Key".to_string(), "Notebook".to_string(), "Research".to_string()];
    header.extend(columns.iter().map(ArtifactKind::label));
    header.push("Last Action".to_string());

    let body: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            let mut line = vec![
                row.key.clone(),
                row.notebook.symbol.glyph().to_string(),
                row.research.symbol.glyph().to_string(),
            ];
            line.extend(columns.iter().map(|kind| {
                row.artifact(*kind)
                    .map(|cell| cell.symbol.glyph().to_string())
                    .unwrap_or_default()
            }));
            line.push(row.message.clone());
            line
        })
        .collect();

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            std::iter::once(&header)
                .chain(body.iter())
                .map(|line| line[i].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_line = |line: &[String]| -> String {
        line.iter()
            .zip(&widths)
            .map(|(text, width)| {
                let pad = width.saturating_sub(text.chars().count());
                format!("{}{}", text, " ".repeat(pad))
            })
            .collect::<Vec<_>>()
            .join(" │ ")
            .trim_end()
            .to_string()
    };

    let separator = widths
        .iter()
        .map(|w| "─".repeat(*w))
        .collect::<Vec<_>>()
        .join("─┼─");

    let mut out = String::new();
    out.push_str(&format_line(&header));
    out.push('\n');
    out.push_str(&separator);
    out.push('\n');
    for line in &body {
        out.push_str(&format_line(line));
        out.push('\n');
    }
    out
}
