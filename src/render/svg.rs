//! Immediate-mode SVG renderer.
//!
//! Every frame is drawn from scratch. Elements entirely outside the visible
//! region are skipped, and below the detail threshold nodes become plain
//! dots with no label or stroke.

use super::{FrameStats, RenderSurface, Scene, SceneNode, ViewTransform};
use crate::layout::Size;
use crate::types::LinkKind;
use std::fmt::Write;

/// Approximate label glyph width in world units.
pub const CHAR_WIDTH: f64 = 7.0;
/// Gap between a node circle and its label.
pub const LABEL_GAP: f64 = 4.0;

const STYLE: &str = "\
.link{stroke:#999;stroke-opacity:.6;fill:none}\
.link.dependency{stroke:#d9534f;stroke-dasharray:4 3}\
.node circle{fill:#4a90d9;stroke:#fff;stroke-width:1.5}\
.node.root circle{fill:#2c5d8f}\
.node.completed circle{fill:#8bc34a}\
.node.blocked circle{fill:#f0ad4e}\
.node.pinned circle{stroke:#222}\
.node text{font:12px sans-serif;fill:#333}\
.dot{fill:#4a90d9}";

pub struct SvgSurface {
    lod_threshold: f64,
    out: String,
}

impl SvgSurface {
    pub fn new(lod_threshold: f64) -> Self {
        Self {
            lod_threshold,
            out: String::new(),
        }
    }

    /// The last drawn frame as a standalone SVG document.
    pub fn svg(&self) -> &str {
        &self.out
    }

    pub fn into_svg(self) -> String {
        self.out
    }

    fn node_classes(node: &SceneNode) -> String {
        let mut classes = String::from("node");
        if node.depth == 0 {
            classes.push_str(" root");
        }
        if node.completed {
            classes.push_str(" completed");
        }
        if node.blocked {
            classes.push_str(" blocked");
        }
        if node.pinned {
            classes.push_str(" pinned");
        }
        classes
    }
}

impl RenderSurface for SvgSurface {
    fn draw(&mut self, scene: &Scene, transform: &ViewTransform, size: Size) -> FrameStats {
        let visible = transform.visible_world(size);
        let simplified = transform.k < self.lod_threshold;
        let mut stats = FrameStats {
            simplified,
            ..FrameStats::default()
        };

        let mut out = String::with_capacity(256 + scene.nodes.len() * 160);
        // Writing into a String cannot fail.
        let _ = write!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><style>{STYLE}</style><g transform="translate({tx:.2},{ty:.2}) scale({k:.4})">"#,
            w = size.width,
            h = size.height,
            tx = transform.tx,
            ty = transform.ty,
            k = transform.k,
        );

        for edge in &scene.edges {
            if !edge.bounds().intersects(&visible) {
                stats.culled += 1;
                continue;
            }
            let class = match edge.kind {
                LinkKind::Hierarchy => "link hierarchy",
                LinkKind::Dependency => "link dependency",
            };
            let _ = write!(
                out,
                r#"<line class="{class}" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}"/>"#,
                edge.from.x, edge.from.y, edge.to.x, edge.to.y
            );
            stats.edges_drawn += 1;
        }

        for node in &scene.nodes {
            if !node.bounds().intersects(&visible) {
                stats.culled += 1;
                continue;
            }
            if simplified {
                let _ = write!(
                    out,
                    r#"<circle class="dot" cx="{:.2}" cy="{:.2}" r="{:.2}"/>"#,
                    node.pos.x, node.pos.y, node.radius
                );
            } else {
                let _ = write!(
                    out,
                    r#"<g class="{}" data-id="{}"><circle cx="{:.2}" cy="{:.2}" r="{:.2}"/><text x="{:.2}" y="{:.2}">{}</text></g>"#,
                    Self::node_classes(node),
                    escape(&node.id),
                    node.pos.x,
                    node.pos.y,
                    node.radius,
                    node.pos.x + node.radius + LABEL_GAP,
                    node.pos.y + 4.0,
                    escape(&node.label),
                );
            }
            stats.nodes_drawn += 1;
        }

        out.push_str("</g></svg>");
        self.out = out;
        stats
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
