//! Drawing the laid-out graph.
//!
//! A [`Scene`] is a per-frame snapshot of node and edge geometry in world
//! coordinates. Surfaces implementing [`RenderSurface`] turn a scene plus the
//! current [`ViewTransform`] into output: [`SvgSurface`] redraws everything
//! each frame, [`RetainedScene`] keeps one element per node and edge and
//! updates them in place.

pub mod retained;
pub mod svg;
pub mod transform;

pub use retained::{Reconcile, RetainedScene};
pub use svg::SvgSurface;
pub use transform::{Transition, ViewTransform, fit_transform, wheel_factor};

use crate::graph::TaskGraph;
use crate::layout::{Point, Rect, Simulation, Size};
use crate::types::LinkKind;
use serde::Serialize;
use std::collections::HashMap;

/// Extra pick distance around a node circle, in screen pixels.
const HIT_SLOP_PX: f64 = 3.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneNode {
    pub id: String,
    pub label: String,
    pub pos: Point,
    pub radius: f64,
    pub depth: usize,
    pub completed: bool,
    pub blocked: bool,
    pub pinned: bool,
}

impl SceneNode {
    /// Rough world-space extent of the circle and its label.
    pub fn bounds(&self) -> Rect {
        let label_width = self.label.chars().count() as f64 * svg::CHAR_WIDTH;
        let mut r = Rect::around(self.pos, self.radius);
        r.max.x += svg::LABEL_GAP + label_width;
        r
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneEdge {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub from: Point,
    pub to: Point,
}

impl SceneEdge {
    pub fn bounds(&self) -> Rect {
        Rect::new(
            Point::new(self.from.x.min(self.to.x), self.from.y.min(self.to.y)),
            Point::new(self.from.x.max(self.to.x), self.from.y.max(self.to.y)),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub nodes: Vec<SceneNode>,
    pub edges: Vec<SceneEdge>,
}

impl Scene {
    /// Join the graph with the simulation's current positions. Nodes the
    /// simulation does not know about, or with non-finite positions, are
    /// left out along with their edges.
    pub fn build(graph: &TaskGraph, sim: &Simulation) -> Self {
        let nodes: Vec<SceneNode> = graph
            .nodes
            .iter()
            .filter_map(|n| {
                let state = sim.node(&n.id)?;
                state.pos.is_finite().then(|| SceneNode {
                    id: n.id.clone(),
                    label: n.text.clone(),
                    pos: state.pos,
                    radius: state.radius,
                    depth: n.depth,
                    completed: n.completed,
                    blocked: n.blocked,
                    pinned: state.is_pinned(),
                })
            })
            .collect();

        let positions: HashMap<&str, Point> =
            nodes.iter().map(|n| (n.id.as_str(), n.pos)).collect();
        let at = |id: &str| positions.get(id).copied();
        let edges = graph
            .links
            .iter()
            .filter_map(|l| {
                Some(SceneEdge {
                    source: l.source.clone(),
                    target: l.target.clone(),
                    kind: l.kind,
                    from: at(&l.source)?,
                    to: at(&l.target)?,
                })
            })
            .collect();

        Self { nodes, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topmost node under a screen point.
    pub fn hit_test(&self, transform: &ViewTransform, screen: Point) -> Option<&SceneNode> {
        let world = transform.invert(screen);
        let slop = HIT_SLOP_PX / transform.k;
        // Later nodes are drawn on top.
        self.nodes
            .iter()
            .rev()
            .find(|n| n.pos.distance(world) <= n.radius + slop)
    }
}

/// Counters describing one drawn frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub nodes_drawn: usize,
    pub edges_drawn: usize,
    pub culled: usize,
    /// Nodes were drawn as bare dots.
    pub simplified: bool,
}

/// Something the graph can be drawn onto.
pub trait RenderSurface {
    /// Draw `scene` as seen through `transform` in a viewport of `size`.
    fn draw(&mut self, scene: &Scene, transform: &ViewTransform, size: Size) -> FrameStats;

    /// Id of the node under a screen point.
    fn hit_test(&self, scene: &Scene, transform: &ViewTransform, screen: Point) -> Option<String> {
        scene.hit_test(transform, screen).map(|n| n.id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, x: f64, y: f64) -> SceneNode {
        SceneNode {
            id: id.to_string(),
            label: id.to_string(),
            pos: Point::new(x, y),
            radius: 10.0,
            depth: 0,
            completed: false,
            blocked: false,
            pinned: false,
        }
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let scene = Scene {
            nodes: vec![node("under", 0.0, 0.0), node("over", 5.0, 0.0)],
            edges: vec![],
        };
        let t = ViewTransform::new(2.0, 100.0, 100.0);
        let hit = scene.hit_test(&t, t.apply(Point::new(2.0, 0.0)));
        assert_eq!(hit.map(|n| n.id.as_str()), Some("over"));
        let hit = scene.hit_test(&t, t.apply(Point::new(-9.0, 0.0)));
        assert_eq!(hit.map(|n| n.id.as_str()), Some("under"));
        assert!(scene.hit_test(&t, Point::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_scene_skips_unknown_nodes_and_their_edges() {
        use crate::config::LayoutSettings;
        use crate::types::{SourceLocation, TaskLink, TaskNode};

        let task_node = |id: &str| TaskNode {
            id: id.to_string(),
            text: id.to_string(),
            completed: false,
            blocked: false,
            depth: 0,
            parent: None,
            tags: Default::default(),
            anchor_date: None,
            location: SourceLocation::new("a.md", 1),
        };
        let known = TaskGraph {
            nodes: vec![task_node("a")],
            links: vec![],
        };
        let mut sim = Simulation::new(LayoutSettings::default(), Size::new(400.0, 400.0));
        sim.set_graph(&known, false);

        let wider = TaskGraph {
            nodes: vec![task_node("a"), task_node("b")],
            links: vec![TaskLink::hierarchy("a", "b")],
        };
        let scene = Scene::build(&wider, &sim);
        assert_eq!(scene.nodes.len(), 1);
        assert!(scene.edges.is_empty());
    }

    #[test]
    fn test_scene_edges_follow_node_positions_in_large_graph() {
        use crate::config::LayoutSettings;
        use crate::types::{SourceLocation, TaskLink, TaskNode};

        let ids: Vec<String> = (0..500).map(|i| format!("t{}", i)).collect();
        let graph = TaskGraph {
            nodes: ids
                .iter()
                .map(|id| TaskNode {
                    id: id.clone(),
                    text: id.clone(),
                    completed: false,
                    blocked: false,
                    depth: 0,
                    parent: None,
                    tags: Default::default(),
                    anchor_date: None,
                    location: SourceLocation::new("a.md", 1),
                })
                .collect(),
            links: ids
                .windows(2)
                .map(|w| TaskLink::hierarchy(&w[0], &w[1]))
                .collect(),
        };
        let mut sim = Simulation::new(LayoutSettings::default(), Size::new(800.0, 600.0));
        sim.set_graph(&graph, false);

        let scene = Scene::build(&graph, &sim);
        assert_eq!(scene.nodes.len(), 500);
        assert_eq!(scene.edges.len(), 499);
        for edge in &scene.edges {
            assert_eq!(Some(edge.from), sim.position(&edge.source));
            assert_eq!(Some(edge.to), sim.position(&edge.target));
        }
    }
}
