//! SVG rendering of an instance and its tour.
//!
//! Coordinates are mapped into a fixed square canvas with a margin,
//! preserving the aspect ratio. The depot is drawn larger and in a different
//! colour; visited customers are filled, unvisited ones hollow.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::models::{Instance, Point, Tour};

const CANVAS_SIZE: f64 = 800.0;
const MARGIN: f64 = 40.0;
const NODE_RADIUS: f64 = 5.0;
const DEPOT_RADIUS: f64 = 8.0;
const LABEL_OFFSET: f64 = 7.0;

/// Maps instance coordinates into canvas coordinates (y axis up).
struct Viewport {
    min_x: f64,
    min_y: f64,
    scale: f64,
}

impl Viewport {
    fn fit(points: &[Point]) -> Self {
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        let extent = (max_x - min_x).max(max_y - min_y);
        let scale = if extent > 0.0 && extent.is_finite() {
            (CANVAS_SIZE - 2.0 * MARGIN) / extent
        } else {
            1.0
        };
        Self {
            min_x: if min_x.is_finite() { min_x } else { 0.0 },
            min_y: if min_y.is_finite() { min_y } else { 0.0 },
            scale,
        }
    }

    fn map(&self, p: Point) -> (f64, f64) {
        let x = MARGIN + (p.x - self.min_x) * self.scale;
        let y = CANVAS_SIZE - MARGIN - (p.y - self.min_y) * self.scale;
        (x, y)
    }
}

/// Renders `tour` over the vertices of `instance` as an SVG document.
///
/// # Examples
///
/// ```
/// use u_cptp::models::{Instance, Point, Tour};
/// use u_cptp::render::render_tour_svg;
///
/// let pts = vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(0.0, 4.0)];
/// let inst = Instance::new(2.0, pts, vec![0.0, 1.0, 1.0], vec![0.0, 10.0, 10.0]).unwrap();
/// let tour = Tour::from_sequence(3, &[0, 1, 2]).unwrap();
/// let svg = render_tour_svg(&inst, &tour);
/// assert!(svg.starts_with("<svg"));
/// assert_eq!(svg.matches("<line").count(), 3);
/// ```
pub fn render_tour_svg(instance: &Instance, tour: &Tour) -> String {
    let view = Viewport::fit(instance.positions());
    let mut svg = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{CANVAS_SIZE}" height="{CANVAS_SIZE}" viewBox="0 0 {CANVAS_SIZE} {CANVAS_SIZE}">"#
    );
    let _ = writeln!(svg, r#"  <rect width="100%" height="100%" fill="white"/>"#);
    let _ = writeln!(
        svg,
        r#"  <text x="{MARGIN}" y="{:.1}" font-family="monospace" font-size="14">{}</text>"#,
        MARGIN / 2.0,
        escape(instance.name())
    );

    let order = tour.visit_order();
    if order.len() > 1 {
        for (k, &from) in order.iter().enumerate() {
            let to = order[(k + 1) % order.len()];
            let (x1, y1) = view.map(instance.position(from));
            let (x2, y2) = view.map(instance.position(to));
            let _ = writeln!(
                svg,
                r##"  <line x1="{x1:.2}" y1="{y1:.2}" x2="{x2:.2}" y2="{y2:.2}" stroke="#1f77b4" stroke-width="1.5"/>"##
            );
        }
    }

    for i in 0..instance.num_nodes() {
        let (cx, cy) = view.map(instance.position(i));
        let (r, fill) = if i == 0 {
            (DEPOT_RADIUS, "#d62728")
        } else if tour.is_visited(i) {
            (NODE_RADIUS, "#333333")
        } else {
            (NODE_RADIUS, "white")
        };
        let _ = writeln!(
            svg,
            r##"  <circle cx="{cx:.2}" cy="{cy:.2}" r="{r}" fill="{fill}" stroke="#333333"/>"##
        );
        let _ = writeln!(
            svg,
            r#"  <text x="{:.2}" y="{:.2}" font-family="monospace" font-size="10">{i}</text>"#,
            cx + LABEL_OFFSET,
            cy - LABEL_OFFSET
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// Writes [`render_tour_svg`] output to `path`.
pub fn write_tour_svg(path: impl AsRef<Path>, instance: &Instance, tour: &Tour) -> Result<()> {
    fs::write(path, render_tour_svg(instance, tour))?;
    Ok(())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
