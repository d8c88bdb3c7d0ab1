use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use super::chart::{Anchor, Chart, Shape};
use crate::util::ensure_directory;

pub fn render_svg(chart: &Chart) -> String {
    let mut lines = vec![
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="Helvetica, Arial, sans-serif">"#,
            w = chart.width,
            h = chart.height
        ),
        format!("  <title>{}</title>", escape(&chart.title)),
    ];
    lines.extend(chart.shapes.iter().map(shape_element));
    lines.push("</svg>".to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn shape_element(shape: &Shape) -> String {
    match shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
            fill,
        } => format!(
            r#"  <rect x="{x:.2}" y="{y:.2}" width="{width:.2}" height="{height:.2}" fill="{}"/>"#,
            fill.css()
        ),
        Shape::Polygon { points, fill } => format!(
            r#"  <polygon points="{}" fill="{}" stroke="white" stroke-width="1"/>"#,
            point_list(points),
            fill.css()
        ),
        Shape::Polyline {
            points,
            stroke,
            width,
        } => format!(
            r#"  <polyline points="{}" fill="none" stroke="{}" stroke-width="{width:.2}"/>"#,
            point_list(points),
            stroke.css()
        ),
        Shape::Circle { cx, cy, r, fill } => format!(
            r#"  <circle cx="{cx:.2}" cy="{cy:.2}" r="{r:.2}" fill="{}"/>"#,
            fill.css()
        ),
        Shape::Text {
            x,
            y,
            content,
            size,
            anchor,
            color,
            bold,
        } => {
            let anchor = match anchor {
                Anchor::Start => "start",
                Anchor::Middle => "middle",
                Anchor::End => "end",
            };
            let weight = if *bold { "bold" } else { "normal" };
            format!(
                r#"  <text x="{x:.2}" y="{y:.2}" font-size="{size:.1}" font-weight="{weight}" text-anchor="{anchor}" fill="{}">{}</text>"#,
                color.css(),
                escape(content)
            )
        }
    }
}

pub fn write_svg(chart: &Chart, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }
    fs::write(path, render_svg(chart))
        .with_context(|| format!("failed to write chart {}", path.display()))
}

fn point_list(points: &[(f64, f64)]) -> String {
    points
        .iter()
        .map(|(x, y)| format!("{x:.2},{y:.2}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visualize::chart::{Color, Shape};

    #[test]
    fn render_svg_escapes_text_and_emits_every_shape() {
        let mut chart = Chart::new("Cases <by> region & month");
        chart.push(Shape::Circle {
            cx: 10.0,
            cy: 20.0,
            r: 4.0,
            fill: Color::hex(0x2E86AB),
        });
        let svg = render_svg(&chart);

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("Cases &lt;by&gt; region &amp; month"));
        assert!(svg.contains(r##"fill="#2E86AB""##));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.lines().count(), chart.shapes.len() + 3);
    }

    #[test]
    fn write_svg_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("charts").join("chart_1.svg");
        write_svg(&Chart::no_data("Empty"), &path).expect("write svg");

        let written = std::fs::read_to_string(&path).expect("read svg");
        assert!(written.contains("No data available"));
    }
}
