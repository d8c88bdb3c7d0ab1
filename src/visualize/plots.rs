use std::f64::consts::PI;

use super::chart::{
    AXIS, Anchor, BLACK, CANVAS_HEIGHT, CANVAS_WIDTH, Chart, Color, GRID, Shape, WHITE, nice_axis,
    palette, wedge_points,
};

#[derive(Debug, Clone)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub color: Color,
}

#[derive(Debug, Clone)]
pub struct DonutStyle {
    pub hole: f64,
    pub pull_largest: bool,
    pub legend: bool,
    pub unit: &'static str,
}

#[derive(Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub value: f64,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub name: String,
    pub color: Color,
    pub values: Vec<f64>,
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub name: String,
    pub points: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueAxis {
    Count,
    Percent,
}

struct PlotArea {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
}

impl PlotArea {
    fn standard() -> Self {
        Self {
            left: 100.0,
            top: 90.0,
            right: CANVAS_WIDTH - 170.0,
            bottom: CANVAS_HEIGHT - 90.0,
        }
    }

    fn y_for(&self, value: f64, max: f64) -> f64 {
        self.bottom - (value / max).clamp(0.0, 1.0) * (self.bottom - self.top)
    }

    fn slot(&self, index: usize, count: usize) -> (f64, f64) {
        let width = (self.right - self.left) / count.max(1) as f64;
        (self.left + width * (index as f64 + 0.5), width)
    }
}

fn draw_value_axis(chart: &mut Chart, area: &PlotArea, axis: ValueAxis, max: f64, y_title: &str) -> f64 {
    let (limit, step) = match axis {
        ValueAxis::Percent => (1.0, 0.2),
        ValueAxis::Count => nice_axis(max),
    };

    let ticks = (limit / step).round() as usize;
    for tick in 0..=ticks {
        let value = step * tick as f64;
        let y = area.y_for(value, limit);
        chart.push(Shape::Polyline {
            points: vec![(area.left, y), (area.right, y)],
            stroke: if tick == 0 { AXIS } else { GRID },
            width: 1.0,
        });
        let label = match axis {
            ValueAxis::Percent => format!("{:.0}%", value * 100.0),
            ValueAxis::Count if step.fract() == 0.0 => format!("{value:.0}"),
            ValueAxis::Count => format!("{value:.2}"),
        };
        chart.text(area.left - 10.0, y + 4.0, &label, 12.0, Anchor::End, false);
    }

    chart.text(area.left - 60.0, area.top - 20.0, y_title, 13.0, Anchor::Start, true);
    limit
}

fn draw_legend(chart: &mut Chart, entries: &[(String, Color)]) {
    let x = CANVAS_WIDTH - 155.0;
    let mut y = 100.0;
    for (name, color) in entries {
        chart.push(Shape::Rect {
            x,
            y: y - 10.0,
            width: 12.0,
            height: 12.0,
            fill: *color,
        });
        chart.text(x + 18.0, y, name, 12.0, Anchor::Start, false);
        y += 22.0;
    }
}

fn draw_category_labels(chart: &mut Chart, area: &PlotArea, labels: &[String]) {
    for (index, label) in labels.iter().enumerate() {
        let (x, _) = area.slot(index, labels.len());
        chart.text(x, area.bottom + 22.0, label, 12.0, Anchor::Middle, false);
    }
}

pub fn donut_chart(title: &str, slices: &[Slice], style: &DonutStyle) -> Chart {
    let total: f64 = slices.iter().map(|slice| slice.value.max(0.0)).sum();
    if total <= 0.0 {
        return Chart::no_data(title);
    }

    let mut chart = Chart::new(title);
    let center = if style.legend {
        (CANVAS_WIDTH / 2.0 - 90.0, CANVAS_HEIGHT / 2.0 + 25.0)
    } else {
        (CANVAS_WIDTH / 2.0, CANVAS_HEIGHT / 2.0 + 25.0)
    };
    let outer = 220.0;
    let inner = outer * style.hole.clamp(0.0, 0.9);
    let largest = slices
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.value.total_cmp(&b.1.value))
        .map(|(index, _)| index);

    let mut angle = 0.0;
    let mut labels = Vec::new();
    for (index, slice) in slices.iter().enumerate() {
        let value = slice.value.max(0.0);
        if value == 0.0 {
            continue;
        }
        let sweep = value / total * 2.0 * PI;
        let middle = angle + sweep / 2.0;
        let offset = if style.pull_largest && largest == Some(index) {
            outer * 0.05
        } else {
            0.0
        };
        let slice_center = (
            center.0 + offset * middle.sin(),
            center.1 - offset * middle.cos(),
        );
        chart.push(Shape::Polygon {
            points: wedge_points(slice_center, outer, inner, angle, angle + sweep),
            fill: slice.color,
        });

        let label_radius = (outer + inner) / 2.0;
        let x = slice_center.0 + label_radius * middle.sin();
        let y = slice_center.1 - label_radius * middle.cos();
        labels.push((x, y, slice, value / total * 100.0));
        angle += sweep;
    }

    for (x, y, slice, percent) in labels {
        chart.text(x, y - 14.0, &slice.label, 12.0, Anchor::Middle, true);
        chart.text(x, y + 2.0, &format!("{percent:.1}%"), 12.0, Anchor::Middle, false);
        chart.text(
            x,
            y + 18.0,
            &format!("{} {}", slice.value, style.unit),
            12.0,
            Anchor::Middle,
            false,
        );
    }

    if style.legend {
        let entries: Vec<(String, Color)> = slices
            .iter()
            .map(|slice| (slice.label.clone(), slice.color))
            .collect();
        draw_legend(&mut chart, &entries);
    }
    chart
}

pub fn bar_chart(title: &str, y_title: &str, bars: &[Bar], color: Color) -> Chart {
    if bars.is_empty() {
        return Chart::no_data(title);
    }

    let mut chart = Chart::new(title);
    let area = PlotArea::standard();
    let max = bars.iter().map(|bar| bar.value).fold(0.0, f64::max);
    let limit = draw_value_axis(&mut chart, &area, ValueAxis::Count, max, y_title);

    for (index, bar) in bars.iter().enumerate() {
        let (x, slot) = area.slot(index, bars.len());
        let width = slot * 0.6;
        let top = area.y_for(bar.value, limit);
        chart.push(Shape::Rect {
            x: x - width / 2.0,
            y: top,
            width,
            height: area.bottom - top,
            fill: color,
        });
        chart.text(x, top - 8.0, &bar.text, 13.0, Anchor::Middle, false);
    }

    let labels: Vec<String> = bars.iter().map(|bar| bar.label.clone()).collect();
    draw_category_labels(&mut chart, &area, &labels);
    chart
}

pub fn stacked_bar_chart(
    title: &str,
    y_title: &str,
    categories: &[String],
    segments: &[Segment],
) -> Chart {
    if categories.is_empty() || segments.is_empty() {
        return Chart::no_data(title);
    }

    let mut chart = Chart::new(title);
    let area = PlotArea::standard();
    let totals: Vec<f64> = (0..categories.len())
        .map(|index| {
            segments
                .iter()
                .map(|segment| segment.values.get(index).copied().unwrap_or(0.0).max(0.0))
                .sum()
        })
        .collect();
    let max = totals.iter().copied().fold(0.0, f64::max);
    let limit = draw_value_axis(&mut chart, &area, ValueAxis::Count, max, y_title);

    for index in 0..categories.len() {
        let (x, slot) = area.slot(index, categories.len());
        let width = slot * 0.6;
        let mut base = 0.0;
        for segment in segments {
            let value = segment.values.get(index).copied().unwrap_or(0.0).max(0.0);
            let bottom = area.y_for(base, limit);
            let top = area.y_for(base + value, limit);
            chart.push(Shape::Rect {
                x: x - width / 2.0,
                y: top,
                width,
                height: bottom - top,
                fill: segment.color,
            });
            if let Some(label) = segment.labels.get(index) {
                let (label_y, color) = if bottom - top >= 18.0 {
                    ((top + bottom) / 2.0 + 4.0, WHITE)
                } else {
                    (top - 6.0, BLACK)
                };
                chart.push(Shape::Text {
                    x,
                    y: label_y,
                    content: label.clone(),
                    size: 12.0,
                    anchor: Anchor::Middle,
                    color,
                    bold: false,
                });
            }
            base += value;
        }
    }

    draw_category_labels(&mut chart, &area, categories);
    let entries: Vec<(String, Color)> = segments
        .iter()
        .map(|segment| (segment.name.clone(), segment.color))
        .collect();
    draw_legend(&mut chart, &entries);
    chart
}

pub fn line_chart(
    title: &str,
    y_title: &str,
    x_labels: &[String],
    series: &[Series],
    axis: ValueAxis,
    point_labels: bool,
) -> Chart {
    let has_points = series
        .iter()
        .any(|line| line.points.iter().any(Option::is_some));
    if x_labels.is_empty() || !has_points {
        return Chart::no_data(title);
    }

    let mut chart = Chart::new(title);
    let area = PlotArea::standard();
    let max = series
        .iter()
        .flat_map(|line| line.points.iter().flatten())
        .copied()
        .fold(0.0, f64::max);
    let limit = draw_value_axis(&mut chart, &area, axis, max, y_title);

    for (series_index, line) in series.iter().enumerate() {
        let color = palette(series_index);
        let mut run: Vec<(f64, f64)> = Vec::new();
        for (index, point) in line.points.iter().enumerate().take(x_labels.len()) {
            let Some(value) = point else {
                flush_run(&mut chart, &mut run, color);
                continue;
            };
            let (x, _) = area.slot(index, x_labels.len());
            let y = area.y_for(*value, limit);
            run.push((x, y));
            chart.push(Shape::Circle {
                cx: x,
                cy: y,
                r: 4.5,
                fill: color,
            });
            if point_labels {
                let label = match axis {
                    ValueAxis::Percent => format!("{:.0}%", value * 100.0),
                    ValueAxis::Count => format!("{value}"),
                };
                chart.text(x, y - 10.0, &label, 11.0, Anchor::Middle, false);
            }
        }
        flush_run(&mut chart, &mut run, color);
    }

    draw_category_labels(&mut chart, &area, x_labels);
    let entries: Vec<(String, Color)> = series
        .iter()
        .enumerate()
        .map(|(index, line)| (line.name.clone(), palette(index)))
        .collect();
    draw_legend(&mut chart, &entries);
    chart
}

fn flush_run(chart: &mut Chart, run: &mut Vec<(f64, f64)>, color: Color) {
    if run.len() > 1 {
        chart.push(Shape::Polyline {
            points: std::mem::take(run),
            stroke: color,
            width: 3.0,
        });
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count_shapes(chart: &Chart, predicate: impl Fn(&Shape) -> bool) -> usize {
        chart.shapes.iter().filter(|shape| predicate(shape)).count()
    }

    #[test]
    fn donut_chart_labels_each_slice_with_share() {
        let slices = vec![
            Slice {
                label: "KCS ACTION TAKEN".to_string(),
                value: 3.0,
                color: Color::hex(0x2E86AB),
            },
            Slice {
                label: "NON-ACTIONABLE".to_string(),
                value: 1.0,
                color: Color::hex(0xB0B7BC),
            },
        ];
        let style = DonutStyle {
            hole: 0.4,
            pull_largest: false,
            legend: false,
            unit: "cases",
        };
        let chart = donut_chart("Overall", &slices, &style);

        assert_eq!(count_shapes(&chart, |shape| matches!(shape, Shape::Polygon { .. })), 2);
        let texts: Vec<&str> = chart.texts().collect();
        assert!(texts.contains(&"75.0%"));
        assert!(texts.contains(&"1 cases"));
    }

    #[test]
    fn empty_inputs_render_placeholder() {
        let style = DonutStyle {
            hole: 0.5,
            pull_largest: true,
            legend: true,
            unit: "cases",
        };
        for chart in [
            donut_chart("Pie", &[], &style),
            bar_chart("Bars", "Count", &[], Color::hex(0x000000)),
            stacked_bar_chart("Stacked", "Count", &[], &[]),
            line_chart("Lines", "Count", &["2026-09".to_string()], &[], ValueAxis::Count, true),
        ] {
            assert!(chart.texts().any(|text| text == "No data available"));
        }
    }

    #[test]
    fn line_chart_breaks_lines_at_missing_points() {
        let labels: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let series = vec![Series {
            name: "EMEA".to_string(),
            points: vec![Some(0.5), Some(0.75), None, Some(1.0)],
        }];
        let chart = line_chart("Ratio", "Ratio", &labels, &series, ValueAxis::Percent, true);

        let lines = chart
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Polyline { width, .. } if *width == 3.0))
            .count();
        assert_eq!(lines, 1);
        assert_eq!(count_shapes(&chart, |shape| matches!(shape, Shape::Circle { .. })), 3);
        assert!(chart.texts().any(|text| text == "75%"));
        assert!(chart.texts().any(|text| text == "100%"));
    }

    #[test]
    fn stacked_bar_chart_places_small_labels_above_segment() {
        let categories = vec!["AMERICAS".to_string()];
        let segments = vec![
            Segment {
                name: "Close-Reason".to_string(),
                color: Color::hex(0xFFA500),
                values: vec![100.0],
                labels: vec!["100 (50.0%)".to_string()],
            },
            Segment {
                name: "Missing".to_string(),
                color: Color::hex(0x0000FF),
                values: vec![1.0],
                labels: vec!["1".to_string()],
            },
        ];
        let chart = stacked_bar_chart("Valid", "Cases", &categories, &segments);
        let inside = chart.shapes.iter().any(|shape| {
            matches!(shape, Shape::Text { content, color, .. } if content == "100 (50.0%)" && *color == WHITE)
        });
        let above = chart.shapes.iter().any(|shape| {
            matches!(shape, Shape::Text { content, color, .. } if content == "1" && *color == BLACK)
        });
        assert!(inside);
        assert!(above);
    }
}
