use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pdf_writer::{Content, Name, Pdf, Rect, Ref, Str, TextStr};
use tracing::info;

use super::ReportFigure;
use crate::util::ensure_directory;
use crate::visualize::{Anchor, Chart, Color, Shape, text_width, wedge_points};

const PAGE_WIDTH: f32 = 595.28;
const PAGE_HEIGHT: f32 = 841.89;
const MARGIN: f32 = 42.5;
const CONTENT_WIDTH: f32 = 510.0;
const REGULAR: Name<'static> = Name(b"F1");
const BOLD: Name<'static> = Name(b"F2");

/// Write the report: a title page, then one page per figure with its chart and insight.
///
/// Returns the number of pages written.
pub fn export_report_pdf(
    figures: &[ReportFigure],
    title_lines: &[String],
    output_path: &Path,
) -> Result<usize> {
    let mut layout = Layout::new();

    layout.cursor -= 60.0;
    layout.centered_line("KCS Report", 18.0, true);
    layout.cursor -= 10.0;
    for line in title_lines {
        layout.centered_line(line, 12.0, false);
    }

    for figure in figures {
        layout.new_page();
        layout.line(&figure.title, 14.0, true);
        layout.cursor -= 4.0;
        if let Some(chart) = &figure.chart {
            layout.chart(chart);
            layout.cursor -= 16.0;
        }
        if let Some(text) = figure.insight.render() {
            layout.paragraph(&text, 12.0);
        }
    }

    let pages = layout.finish();
    let bytes = assemble(&pages);

    if let Some(parent) = output_path.parent() {
        ensure_directory(parent)?;
    }
    fs::write(output_path, &bytes)
        .with_context(|| format!("failed to write report {}", output_path.display()))?;
    info!(path = %output_path.display(), pages = pages.len(), bytes = bytes.len(), "PDF report saved");
    Ok(pages.len())
}

fn assemble(pages: &[Vec<u8>]) -> Vec<u8> {
    let catalog_id = Ref::new(1);
    let page_tree_id = Ref::new(2);
    let regular_id = Ref::new(3);
    let bold_id = Ref::new(4);
    let info_id = Ref::new(5);
    let first_page = 6;

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.document_info(info_id).title(TextStr("KCS Report"));

    let page_ids: Vec<Ref> = (0..pages.len())
        .map(|index| Ref::new(first_page + 2 * index as i32))
        .collect();
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().copied())
        .count(page_ids.len() as i32);

    for (page_id, stream) in page_ids.iter().zip(pages) {
        let content_id = Ref::new(page_id.get() + 1);
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(page_tree_id);
        page.contents(content_id);
        page.resources()
            .fonts()
            .pair(REGULAR, regular_id)
            .pair(BOLD, bold_id);
        drop(page);
        pdf.stream(content_id, stream);
    }

    pdf.type1_font(regular_id).base_font(Name(b"Helvetica"));
    pdf.type1_font(bold_id).base_font(Name(b"Helvetica-Bold"));
    pdf.finish()
}

/// Top-down page flow with automatic page breaks.
struct Layout {
    pages: Vec<Vec<u8>>,
    content: Content,
    cursor: f32,
}

impl Layout {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            content: Content::new(),
            cursor: PAGE_HEIGHT - MARGIN,
        }
    }

    fn new_page(&mut self) {
        let finished = std::mem::replace(&mut self.content, Content::new());
        self.pages.push(finished.finish());
        self.cursor = PAGE_HEIGHT - MARGIN;
    }

    fn ensure_space(&mut self, height: f32) {
        if self.cursor - height < MARGIN {
            self.new_page();
        }
    }

    fn finish(mut self) -> Vec<Vec<u8>> {
        self.new_page();
        self.pages
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_space(size * 1.4);
        self.cursor -= size;
        write_text(&mut self.content, MARGIN, self.cursor, text, size, bold, Color::hex(0x000000));
        self.cursor -= size * 0.4;
    }

    fn centered_line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_space(size * 1.4);
        self.cursor -= size;
        let width = text_width(text, f64::from(size)) as f32;
        let x = (PAGE_WIDTH - width) / 2.0;
        write_text(&mut self.content, x, self.cursor, text, size, bold, Color::hex(0x000000));
        self.cursor -= size * 0.4;
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        for line in wrap_text(text, f64::from(size), f64::from(CONTENT_WIDTH)) {
            self.line(&line, size, false);
        }
    }

    fn chart(&mut self, chart: &Chart) {
        let scale = CONTENT_WIDTH / chart.width as f32;
        let height = chart.height as f32 * scale;
        self.ensure_space(height);
        draw_chart(&mut self.content, chart, MARGIN, self.cursor, scale);
        self.cursor -= height;
    }
}

fn write_text(content: &mut Content, x: f32, y: f32, text: &str, size: f32, bold: bool, color: Color) {
    let (r, g, b) = color.unit();
    let encoded = pdf_text(text);
    content.set_fill_rgb(r, g, b);
    content.begin_text();
    content.set_font(if bold { BOLD } else { REGULAR }, size);
    content.next_line(x, y);
    content.show(Str(&encoded));
    content.end_text();
}

fn draw_chart(content: &mut Content, chart: &Chart, left: f32, top: f32, scale: f32) {
    let map = |x: f64, y: f64| (left + x as f32 * scale, top - y as f32 * scale);

    content.save_state();
    for shape in &chart.shapes {
        match shape {
            Shape::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                let (r, g, b) = fill.unit();
                let (px, py) = map(*x, *y + *height);
                content.set_fill_rgb(r, g, b);
                content.rect(px, py, *width as f32 * scale, *height as f32 * scale);
                content.fill_nonzero();
            }
            Shape::Polygon { points, fill } => {
                fill_path(content, points.iter().map(|(x, y)| map(*x, *y)), *fill);
            }
            Shape::Circle { cx, cy, r, fill } => {
                let points = wedge_points((*cx, *cy), *r, 0.0, 0.0, 2.0 * PI);
                fill_path(content, points.iter().map(|(x, y)| map(*x, *y)), *fill);
            }
            Shape::Polyline {
                points,
                stroke,
                width,
            } => {
                let mut mapped = points.iter().map(|(x, y)| map(*x, *y));
                let Some((x0, y0)) = mapped.next() else {
                    continue;
                };
                let (r, g, b) = stroke.unit();
                content.set_stroke_rgb(r, g, b);
                content.set_line_width(*width as f32 * scale);
                content.move_to(x0, y0);
                for (x, y) in mapped {
                    content.line_to(x, y);
                }
                content.stroke();
            }
            Shape::Text {
                x,
                y,
                content: text,
                size,
                anchor,
                color,
                bold,
            } => {
                let (px, py) = map(*x, *y);
                let width = (text_width(text, *size) as f32) * scale;
                let px = match anchor {
                    Anchor::Start => px,
                    Anchor::Middle => px - width / 2.0,
                    Anchor::End => px - width,
                };
                write_text(content, px, py, text, *size as f32 * scale, *bold, *color);
            }
        }
    }
    content.restore_state();
}

fn fill_path(content: &mut Content, mut points: impl Iterator<Item = (f32, f32)>, fill: Color) {
    let Some((x0, y0)) = points.next() else {
        return;
    };
    let (r, g, b) = fill.unit();
    content.set_fill_rgb(r, g, b);
    content.move_to(x0, y0);
    for (x, y) in points {
        content.line_to(x, y);
    }
    content.close_path();
    content.fill_nonzero();
}

/// Transliterate to the ASCII subset the built-in Helvetica encoding shares with Unicode.
fn pdf_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{2013}' | '\u{2014}' | '\u{2212}' => b'-',
            '\u{2018}' | '\u{2019}' => b'\'',
            '\u{201C}' | '\u{201D}' => b'"',
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap; explicit newlines start new lines and blank lines are kept.
fn wrap_text(text: &str, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && text_width(&candidate, size) > max_width {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Insight;

    #[test]
    fn wrap_text_respects_width_and_blank_lines() {
        let lines = wrap_text("alpha beta gamma delta\n\nomega", 10.0, 60.0);
        assert!(lines.len() >= 4);
        assert!(lines.iter().any(String::is_empty));
        assert_eq!(lines.last().map(String::as_str), Some("omega"));
        for line in lines.iter().filter(|line| line.contains(' ')) {
            assert!(text_width(line, 10.0) <= 60.0);
        }
    }

    #[test]
    fn pdf_text_transliterates_typographic_dashes() {
        assert_eq!(pdf_text("Closed – Purged"), b"Closed - Purged".to_vec());
        assert_eq!(pdf_text("Zürich"), b"Z?rich".to_vec());
    }

    #[test]
    fn export_report_pdf_writes_one_page_per_figure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("report.pdf");
        let figures = vec![
            ReportFigure {
                title: "KCS Engagement".to_string(),
                chart: Some(Chart::no_data("KCS Engagement")),
                insight: Insight::Engagement("80.0".to_string()),
            },
            ReportFigure {
                title: "Summary".to_string(),
                chart: None,
                insight: Insight::Text("Articles created: 2".to_string()),
            },
        ];

        let pages = export_report_pdf(&figures, &["2026-09-01 to 2026-09-30".to_string()], &path)
            .expect("export");
        assert_eq!(pages, 3);

        let bytes = std::fs::read(&path).expect("read pdf");
        assert!(bytes.starts_with(b"%PDF-"));
        let body = String::from_utf8_lossy(&bytes);
        assert!(body.contains("Helvetica-Bold"));
        assert!(body.contains("/Count 3"));
    }
}
