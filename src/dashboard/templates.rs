//! HTML templates for the graph view, embedded at compile time.

/// The graph view page: toolbar, tag filter and an SVG canvas.
pub const GRAPH_TEMPLATE: &str = include_str!("templates/graph.html");
