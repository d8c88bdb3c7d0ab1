use std::f64::consts::PI;

pub const CANVAS_WIDTH: f64 = 900.0;
pub const CANVAS_HEIGHT: f64 = 600.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn hex(rgb: u32) -> Self {
        Self {
            r: ((rgb >> 16) & 0xff) as u8,
            g: ((rgb >> 8) & 0xff) as u8,
            b: (rgb & 0xff) as u8,
        }
    }

    pub fn css(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    pub fn unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }
}

pub const BLACK: Color = Color::hex(0x222222);
pub const GRID: Color = Color::hex(0xE5ECF6);
pub const AXIS: Color = Color::hex(0xB0B0B0);
pub const WHITE: Color = Color::hex(0xFFFFFF);
pub const BACKGROUND: Color = Color::hex(0xFAFAFA);

/// Qualitative palette for categorical series.
pub const PALETTE: [Color; 8] = [
    Color::hex(0x88CCEE),
    Color::hex(0xCC6677),
    Color::hex(0xDDCC77),
    Color::hex(0x117733),
    Color::hex(0x332288),
    Color::hex(0xAA4499),
    Color::hex(0x44AA99),
    Color::hex(0x999933),
];

pub fn palette(index: usize) -> Color {
    PALETTE[index % PALETTE.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Start,
    Middle,
    End,
}

/// Drawing primitives in canvas coordinates (origin top-left, y grows downward).
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Color,
    },
    Polygon {
        points: Vec<(f64, f64)>,
        fill: Color,
    },
    Polyline {
        points: Vec<(f64, f64)>,
        stroke: Color,
        width: f64,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
        fill: Color,
    },
    Text {
        x: f64,
        y: f64,
        content: String,
        size: f64,
        anchor: Anchor,
        color: Color,
        bold: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub width: f64,
    pub height: f64,
    pub shapes: Vec<Shape>,
    placeholder: bool,
}

impl Chart {
    pub fn new(title: &str) -> Self {
        let mut chart = Self {
            title: title.to_string(),
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            shapes: Vec::new(),
            placeholder: false,
        };
        chart.push(Shape::Rect {
            x: 0.0,
            y: 0.0,
            width: CANVAS_WIDTH,
            height: CANVAS_HEIGHT,
            fill: BACKGROUND,
        });
        chart.text(CANVAS_WIDTH / 2.0, 40.0, title, 22.0, Anchor::Middle, true);
        chart
    }

    pub fn no_data(title: &str) -> Self {
        let mut chart = Self::new(title);
        chart.text(
            CANVAS_WIDTH / 2.0,
            CANVAS_HEIGHT / 2.0,
            "No data available",
            20.0,
            Anchor::Middle,
            false,
        );
        chart.placeholder = true;
        chart
    }

    /// True for the "No data available" stand-in built by [`Chart::no_data`].
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn push(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn text(&mut self, x: f64, y: f64, content: &str, size: f64, anchor: Anchor, bold: bool) {
        self.push(Shape::Text {
            x,
            y,
            content: content.to_string(),
            size,
            anchor,
            color: BLACK,
            bold,
        });
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.shapes.iter().filter_map(|shape| match shape {
            Shape::Text { content, .. } => Some(content.as_str()),
            _ => None,
        })
    }
}

/// Approximate advance width of Helvetica text; good enough for centering labels.
pub fn text_width(content: &str, size: f64) -> f64 {
    content
        .chars()
        .map(|c| match c {
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '|' | '!' => 0.28,
            'f' | 't' | 'r' | ' ' | '(' | ')' | '-' => 0.33,
            'm' | 'w' | 'M' | 'W' | '%' => 0.83,
            c if c.is_ascii_uppercase() || c.is_ascii_digit() => 0.62,
            _ => 0.52,
        })
        .sum::<f64>()
        * size
}

/// Ring segment between `start` and `end` (radians, clockwise from 12 o'clock) as a polygon.
pub fn wedge_points(
    center: (f64, f64),
    outer: f64,
    inner: f64,
    start: f64,
    end: f64,
) -> Vec<(f64, f64)> {
    let sweep = (end - start).max(0.0);
    let steps = ((sweep / (2.0 * PI)) * 120.0).ceil().max(2.0) as usize;
    let at = |radius: f64, angle: f64| {
        (
            center.0 + radius * angle.sin(),
            center.1 - radius * angle.cos(),
        )
    };

    let mut points = Vec::with_capacity(steps * 2 + 2);
    for step in 0..=steps {
        points.push(at(outer, start + sweep * step as f64 / steps as f64));
    }
    if inner > 0.0 {
        for step in (0..=steps).rev() {
            points.push(at(inner, start + sweep * step as f64 / steps as f64));
        }
    } else {
        points.push(center);
    }
    points
}

/// Round `max` up to a readable axis limit and return `(limit, tick step)`.
pub fn nice_axis(max: f64) -> (f64, f64) {
    if !max.is_finite() || max <= 0.0 {
        return (1.0, 0.2);
    }
    let raw_step = max / 5.0;
    let magnitude = 10_f64.powf(raw_step.log10().floor());
    let step = [1.0, 2.0, 2.5, 5.0, 10.0]
        .into_iter()
        .map(|factor| factor * magnitude)
        .find(|step| *step >= raw_step)
        .unwrap_or(10.0 * magnitude);
    ((max / step).ceil() * step, step)
}
