//! Retained-mode renderer: one long-lived element per node and edge.
//!
//! Each draw reconciles the element set with the scene. Existing elements are
//! updated in place, new ones are created, and elements whose node or edge
//! disappeared are removed. Hosts that keep a scene graph (a DOM, a GPU
//! buffer) mirror these elements and the per-frame change counts.

use super::{FrameStats, RenderSurface, Scene, ViewTransform};
use crate::layout::{Point, Size};
use crate::types::LinkKind;
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeElement {
    pub label: String,
    /// Screen position.
    pub at: Point,
    /// Screen radius.
    pub radius: f64,
    pub show_label: bool,
    pub completed: bool,
    pub blocked: bool,
    pub pinned: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeElement {
    pub kind: LinkKind,
    pub from: Point,
    pub to: Point,
}

/// Element churn from the last draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reconcile {
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
}

#[derive(Debug, Default)]
pub struct RetainedScene {
    lod_threshold: f64,
    nodes: IndexMap<String, NodeElement>,
    edges: IndexMap<(String, String, LinkKind), EdgeElement>,
    last: Reconcile,
}

impl RetainedScene {
    pub fn new(lod_threshold: f64) -> Self {
        Self {
            lod_threshold,
            ..Self::default()
        }
    }

    pub fn node(&self, id: &str) -> Option<&NodeElement> {
        self.nodes.get(id)
    }

    /// Node elements in scene order.
    pub fn nodes(&self) -> impl Iterator<Item = (&str, &NodeElement)> {
        self.nodes.iter().map(|(id, el)| (id.as_str(), el))
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeElement> {
        self.edges.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn last_reconcile(&self) -> Reconcile {
        self.last
    }
}

impl RenderSurface for RetainedScene {
    fn draw(&mut self, scene: &Scene, transform: &ViewTransform, _size: Size) -> FrameStats {
        let show_label = transform.k >= self.lod_threshold;
        let mut churn = Reconcile::default();

        let live_nodes: HashSet<&str> = scene.nodes.iter().map(|n| n.id.as_str()).collect();
        let before = self.nodes.len();
        self.nodes.retain(|id, _| live_nodes.contains(id.as_str()));
        churn.removed += before - self.nodes.len();

        for n in &scene.nodes {
            let element = NodeElement {
                label: n.label.clone(),
                at: transform.apply(n.pos),
                radius: n.radius * transform.k,
                show_label,
                completed: n.completed,
                blocked: n.blocked,
                pinned: n.pinned,
            };
            match self.nodes.get_mut(&n.id) {
                Some(existing) => {
                    if *existing != element {
                        *existing = element;
                        churn.updated += 1;
                    }
                }
                None => {
                    self.nodes.insert(n.id.clone(), element);
                    churn.created += 1;
                }
            }
        }

        let live_edges: HashSet<(&str, &str, LinkKind)> = scene
            .edges
            .iter()
            .map(|e| (e.source.as_str(), e.target.as_str(), e.kind))
            .collect();
        let before = self.edges.len();
        self.edges
            .retain(|(s, t, k), _| live_edges.contains(&(s.as_str(), t.as_str(), *k)));
        churn.removed += before - self.edges.len();

        for e in &scene.edges {
            let element = EdgeElement {
                kind: e.kind,
                from: transform.apply(e.from),
                to: transform.apply(e.to),
            };
            let key = (e.source.clone(), e.target.clone(), e.kind);
            match self.edges.get_mut(&key) {
                Some(existing) => {
                    if *existing != element {
                        *existing = element;
                        churn.updated += 1;
                    }
                }
                None => {
                    self.edges.insert(key, element);
                    churn.created += 1;
                }
            }
        }

        self.last = churn;
        FrameStats {
            nodes_drawn: self.nodes.len(),
            edges_drawn: self.edges.len(),
            culled: 0,
            simplified: !show_label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{SceneEdge, SceneNode};

    fn node(id: &str, x: f64) -> SceneNode {
        SceneNode {
            id: id.to_string(),
            label: id.to_string(),
            pos: Point::new(x, 0.0),
            radius: 8.0,
            depth: 0,
            completed: false,
            blocked: false,
            pinned: false,
        }
    }

    fn edge(s: &str, t: &str) -> SceneEdge {
        SceneEdge {
            source: s.to_string(),
            target: t.to_string(),
            kind: LinkKind::Hierarchy,
            from: Point::ORIGIN,
            to: Point::new(10.0, 0.0),
        }
    }

    #[test]
    fn test_elements_are_reused_across_frames() {
        let mut surface = RetainedScene::new(0.6);
        let size = Size::new(100.0, 100.0);
        let t = ViewTransform::IDENTITY;

        let first = Scene {
            nodes: vec![node("a", 0.0), node("b", 10.0)],
            edges: vec![edge("a", "b")],
        };
        surface.draw(&first, &t, size);
        assert_eq!(
            surface.last_reconcile(),
            Reconcile {
                created: 3,
                updated: 0,
                removed: 0
            }
        );

        // Same scene, nothing to do.
        surface.draw(&first, &t, size);
        assert_eq!(surface.last_reconcile(), Reconcile::default());

        let moved = Scene {
            nodes: vec![node("a", 5.0)],
            edges: vec![],
        };
        let stats = surface.draw(&moved, &t, size);
        assert_eq!(
            surface.last_reconcile(),
            Reconcile {
                created: 0,
                updated: 1,
                removed: 2
            }
        );
        assert_eq!(stats.nodes_drawn, 1);
        assert_eq!(surface.node("a").unwrap().at, Point::new(5.0, 0.0));
    }

    #[test]
    fn test_reconcile_drops_only_vanished_elements() {
        let mut surface = RetainedScene::new(0.6);
        let size = Size::new(100.0, 100.0);
        let t = ViewTransform::IDENTITY;

        let ids: Vec<String> = (0..200).map(|i| format!("n{}", i)).collect();
        let full = Scene {
            nodes: ids.iter().map(|id| node(id, 0.0)).collect(),
            edges: ids.windows(2).map(|w| edge(&w[0], &w[1])).collect(),
        };
        surface.draw(&full, &t, size);
        assert_eq!(surface.node_count(), 200);
        assert_eq!(surface.edge_count(), 199);

        let mut dependency = edge("n0", "n1");
        dependency.kind = LinkKind::Dependency;
        let half = Scene {
            nodes: ids[..100].iter().map(|id| node(id, 0.0)).collect(),
            edges: ids[..100]
                .windows(2)
                .map(|w| edge(&w[0], &w[1]))
                .chain(std::iter::once(dependency))
                .collect(),
        };
        surface.draw(&half, &t, size);
        assert_eq!(
            surface.last_reconcile(),
            Reconcile {
                created: 1,
                updated: 0,
                removed: 200
            }
        );
        assert_eq!(surface.node_count(), 100);
        assert_eq!(surface.edge_count(), 100);
        assert!(surface.node("n150").is_none());
    }

    #[test]
    fn test_labels_hidden_when_zoomed_out() {
        let mut surface = RetainedScene::new(0.6);
        let scene = Scene {
            nodes: vec![node("a", 0.0)],
            edges: vec![],
        };
        let stats = surface.draw(&scene, &ViewTransform::new(0.5, 0.0, 0.0), Size::new(10.0, 10.0));
        assert!(stats.simplified);
        assert!(!surface.node("a").unwrap().show_label);
        assert_eq!(surface.node("a").unwrap().radius, 4.0);
    }
}
