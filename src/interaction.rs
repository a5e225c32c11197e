//! Pointer gestures: drag, pan, zoom and node activation.
//!
//! The primary button only ever drags nodes; panning uses the middle or
//! secondary button, so the two can never conflict. A non-primary press that
//! is released without moving past the click tolerance counts as an
//! activation of the node under it instead of a pan.

use crate::graph::TaskGraph;
use crate::layout::{Point, Simulation};
use crate::render::{Scene, ViewTransform, wheel_factor};
use crate::types::SourceLocation;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Movement below this many screen pixels is still a click.
pub const CLICK_TOLERANCE_PX: f64 = 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Pointer input in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    Down { pos: Point, button: PointerButton },
    Move { pos: Point },
    Up { pos: Point, button: PointerButton },
    DoubleClick { pos: Point, button: PointerButton },
    Wheel { pos: Point, delta_y: f64 },
}

/// Where an opened document should appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenContext {
    /// Replace the current editing context.
    Current,
    /// A new split or tab.
    Split,
}

/// Request to show a task's source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub file: String,
    /// 1-based line of the task.
    pub line: usize,
    pub context: OpenContext,
    /// First line of the window to reveal.
    pub reveal_from: usize,
    /// Last line of the window to reveal.
    pub reveal_to: usize,
}

impl OpenRequest {
    pub fn at(location: &SourceLocation, context: OpenContext, reveal_lines: usize) -> Self {
        Self {
            file: location.file.clone(),
            line: location.line,
            context,
            reveal_from: location.line.saturating_sub(reveal_lines).max(1),
            reveal_to: location.line + reveal_lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    /// Primary drag of a pinned node; `grab` is the world offset from the
    /// node center to the pointer.
    Dragging { id: String, grab: Point },
    /// Non-primary press that may still become a click.
    Pending {
        start: Point,
        node: Option<String>,
    },
    Panning { last: Point },
}

/// Everything a gesture may read or change.
pub struct GestureTarget<'a> {
    pub scene: &'a Scene,
    pub graph: &'a TaskGraph,
    pub simulation: &'a mut Simulation,
    pub transform: &'a mut ViewTransform,
}

#[derive(Debug)]
pub struct GestureController {
    gesture: Gesture,
    reveal_lines: usize,
}

impl GestureController {
    pub fn new(reveal_lines: usize) -> Self {
        Self {
            gesture: Gesture::Idle,
            reveal_lines,
        }
    }

    /// Id of the node being dragged, if any.
    pub fn dragging(&self) -> Option<&str> {
        match &self.gesture {
            Gesture::Dragging { id, .. } => Some(id),
            _ => None,
        }
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    /// Drop any gesture in progress, releasing a dragged node.
    pub fn cancel(&mut self, simulation: &mut Simulation) {
        if let Gesture::Dragging { id, .. } = &self.gesture {
            simulation.unpin(id);
            simulation.set_alpha_target(0.0);
        }
        self.gesture = Gesture::Idle;
    }

    /// Apply one pointer event. Returns an activation when the event opens a
    /// node's source location.
    pub fn handle(&mut self, event: PointerEvent, target: GestureTarget<'_>) -> Option<OpenRequest> {
        let GestureTarget {
            scene,
            graph,
            simulation,
            transform,
        } = target;

        match event {
            PointerEvent::Down {
                pos,
                button: PointerButton::Primary,
            } => {
                self.cancel(simulation);
                if let Some(node) = scene.hit_test(transform, pos) {
                    let world = transform.invert(pos);
                    let grab = Point::new(world.x - node.pos.x, world.y - node.pos.y);
                    simulation.pin(&node.id, node.pos);
                    let reheat = simulation.settings().drag_alpha_target;
                    simulation.set_alpha_target(reheat);
                    debug!(id = %node.id, "Drag start");
                    self.gesture = Gesture::Dragging {
                        id: node.id.clone(),
                        grab,
                    };
                }
                None
            }
            PointerEvent::Down { pos, .. } => {
                self.cancel(simulation);
                self.gesture = Gesture::Pending {
                    start: pos,
                    node: scene.hit_test(transform, pos).map(|n| n.id.clone()),
                };
                None
            }
            PointerEvent::Move { pos } => {
                match &mut self.gesture {
                    Gesture::Dragging { id, grab } => {
                        let world = transform.invert(pos);
                        simulation.pin(id, Point::new(world.x - grab.x, world.y - grab.y));
                    }
                    Gesture::Pending { start, .. } => {
                        let start = *start;
                        if start.distance(pos) > CLICK_TOLERANCE_PX {
                            *transform = transform.translated(pos.x - start.x, pos.y - start.y);
                            self.gesture = Gesture::Panning { last: pos };
                        }
                    }
                    Gesture::Panning { last } => {
                        *transform = transform.translated(pos.x - last.x, pos.y - last.y);
                        *last = pos;
                    }
                    Gesture::Idle => {}
                }
                None
            }
            PointerEvent::Up { button, .. } => {
                let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
                match (gesture, button) {
                    (Gesture::Dragging { id, .. }, PointerButton::Primary) => {
                        simulation.unpin(&id);
                        simulation.set_alpha_target(0.0);
                        debug!(id = %id, "Drag end");
                        None
                    }
                    (Gesture::Pending { node: Some(id), .. }, b) if b != PointerButton::Primary => {
                        self.activate(graph, &id, OpenContext::Split)
                    }
                    (other @ Gesture::Dragging { .. }, _) => {
                        // A non-primary release does not end a drag.
                        self.gesture = other;
                        None
                    }
                    _ => None,
                }
            }
            PointerEvent::DoubleClick {
                pos,
                button: PointerButton::Primary,
            } => {
                let id = scene.hit_test(transform, pos)?.id.clone();
                self.activate(graph, &id, OpenContext::Current)
            }
            PointerEvent::DoubleClick { .. } => None,
            PointerEvent::Wheel { pos, delta_y } => {
                let s = simulation.settings();
                *transform = transform.zoomed_at(pos, wheel_factor(delta_y), s.zoom_min, s.zoom_max);
                None
            }
        }
    }

    fn activate(&self, graph: &TaskGraph, id: &str, context: OpenContext) -> Option<OpenRequest> {
        let node = graph.node(id)?;
        debug!(id = %id, ?context, "Activate node");
        Some(OpenRequest::at(&node.location, context, self.reveal_lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutSettings;
    use crate::graph::{ViewConfig, assemble};
    use crate::layout::Size;
    use crate::scan::TaskCollection;

    struct Rig {
        graph: TaskGraph,
        sim: Simulation,
        transform: ViewTransform,
        gestures: GestureController,
    }

    impl Rig {
        fn new() -> Self {
            let collection = TaskCollection::from_document(
                "notes/plan.md",
                "- [ ] Root 🆔 r\n  - [ ] Child 🆔 c\n- [ ] Other 🆔 o",
            );
            let graph = assemble(&collection, &ViewConfig::default());
            let mut sim = Simulation::new(LayoutSettings::default(), Size::new(800.0, 600.0));
            sim.set_graph(&graph, false);
            sim.run_to_convergence(1_000);
            Self {
                graph,
                sim,
                transform: ViewTransform::IDENTITY,
                gestures: GestureController::new(5),
            }
        }

        fn send(&mut self, event: PointerEvent) -> Option<OpenRequest> {
            let scene = Scene::build(&self.graph, &self.sim);
            self.gestures.handle(
                event,
                GestureTarget {
                    scene: &scene,
                    graph: &self.graph,
                    simulation: &mut self.sim,
                    transform: &mut self.transform,
                },
            )
        }

        fn screen_of(&self, id: &str) -> Point {
            self.transform.apply(self.sim.position(id).unwrap())
        }

        fn empty_spot(&self) -> Point {
            Point::new(-10_000.0, -10_000.0)
        }
    }

    #[test]
    fn test_primary_drag_pins_and_release_unpins() {
        let mut rig = Rig::new();
        let at = rig.screen_of("r");
        rig.send(PointerEvent::Down {
            pos: at,
            button: PointerButton::Primary,
        });
        assert!(rig.sim.is_pinned("r"));
        assert_eq!(rig.gestures.dragging(), Some("r"));
        assert_eq!(rig.sim.alpha_target(), 0.3);

        let to = Point::new(at.x + 40.0, at.y - 25.0);
        rig.send(PointerEvent::Move { pos: to });
        rig.sim.tick();
        assert_eq!(rig.screen_of("r"), to);

        rig.send(PointerEvent::Up {
            pos: to,
            button: PointerButton::Primary,
        });
        assert!(!rig.sim.is_pinned("r"));
        assert_eq!(rig.sim.alpha_target(), 0.0);
        assert_eq!(rig.gestures.dragging(), None);
    }

    #[test]
    fn test_primary_never_pans() {
        let mut rig = Rig::new();
        let spot = rig.empty_spot();
        rig.send(PointerEvent::Down {
            pos: spot,
            button: PointerButton::Primary,
        });
        rig.send(PointerEvent::Move {
            pos: Point::new(spot.x + 100.0, spot.y),
        });
        assert_eq!(rig.transform, ViewTransform::IDENTITY);
    }

    #[test]
    fn test_middle_drag_pans() {
        let mut rig = Rig::new();
        let start = rig.empty_spot();
        rig.send(PointerEvent::Down {
            pos: start,
            button: PointerButton::Middle,
        });
        rig.send(PointerEvent::Move {
            pos: Point::new(start.x + 2.0, start.y),
        });
        assert_eq!(rig.transform, ViewTransform::IDENTITY);
        rig.send(PointerEvent::Move {
            pos: Point::new(start.x + 30.0, start.y + 10.0),
        });
        rig.send(PointerEvent::Move {
            pos: Point::new(start.x + 50.0, start.y + 10.0),
        });
        assert!(rig.gestures.is_panning());
        assert_eq!(rig.transform, ViewTransform::new(1.0, 50.0, 10.0));
        let open = rig.send(PointerEvent::Up {
            pos: start,
            button: PointerButton::Middle,
        });
        assert!(open.is_none());
    }

    #[test]
    fn test_secondary_click_opens_in_split() {
        let mut rig = Rig::new();
        let at = rig.screen_of("c");
        rig.send(PointerEvent::Down {
            pos: at,
            button: PointerButton::Secondary,
        });
        let open = rig
            .send(PointerEvent::Up {
                pos: at,
                button: PointerButton::Secondary,
            })
            .unwrap();
        assert_eq!(open.file, "notes/plan.md");
        assert_eq!(open.line, 2);
        assert_eq!(open.context, OpenContext::Split);
        assert_eq!((open.reveal_from, open.reveal_to), (1, 7));
    }

    #[test]
    fn test_double_click_opens_in_current() {
        let mut rig = Rig::new();
        let at = rig.screen_of("o");
        let open = rig
            .send(PointerEvent::DoubleClick {
                pos: at,
                button: PointerButton::Primary,
            })
            .unwrap();
        assert_eq!(open.line, 3);
        assert_eq!(open.context, OpenContext::Current);

        let spot = rig.empty_spot();
        assert!(
            rig.send(PointerEvent::DoubleClick {
                pos: spot,
                button: PointerButton::Primary,
            })
            .is_none()
        );
    }

    #[test]
    fn test_wheel_zoom_is_clamped() {
        let mut rig = Rig::new();
        for _ in 0..50 {
            rig.send(PointerEvent::Wheel {
                pos: Point::new(400.0, 300.0),
                delta_y: -500.0,
            });
        }
        assert_eq!(rig.transform.k, 5.0);
        for _ in 0..100 {
            rig.send(PointerEvent::Wheel {
                pos: Point::new(400.0, 300.0),
                delta_y: 500.0,
            });
        }
        assert_eq!(rig.transform.k, 0.1);
    }

    #[test]
    fn test_reveal_window_far_from_top() {
        let req = OpenRequest::at(&SourceLocation::new("a.md", 40), OpenContext::Current, 5);
        assert_eq!((req.reveal_from, req.reveal_to), (35, 45));
    }

    #[test]
    fn test_pointer_event_json_shape() {
        let event: PointerEvent = serde_json::from_str(
            r#"{"type":"down","pos":{"x":1.0,"y":2.0},"button":"secondary"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            PointerEvent::Down {
                pos: Point::new(1.0, 2.0),
                button: PointerButton::Secondary
            }
        );
    }
}
