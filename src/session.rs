//! One open graph view and everything it owns.
//!
//! The session is a plain state machine driven from outside: the host starts
//! scans and hands their results back, swaps in new view configurations,
//! forwards pointer input and calls [`GraphSession::advance`] from whatever
//! timer it has. Nothing in here schedules itself.

use crate::config::LayoutSettings;
use crate::graph::{TaskGraph, ViewConfig, assemble};
use crate::interaction::{GestureController, GestureTarget, OpenRequest, PointerEvent};
use crate::layout::{Point, Simulation, Size};
use crate::render::{FrameStats, RenderSurface, Scene, Transition, ViewTransform, fit_transform};
use crate::scan::{ScanGeneration, ScanTicket, TaskCollection};
use crate::types::{TaskLink, TaskNode};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Serializable view of the session for hosts that draw on their own.
#[derive(Debug, Clone, Serialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<PlacedNode>,
    pub links: Vec<TaskLink>,
    pub transform: ViewTransform,
    pub viewport: Size,
    pub alpha: f64,
    pub converged: bool,
    pub truncated: bool,
    pub total_tasks: usize,
    pub tags: BTreeSet<String>,
    pub config: ViewConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedNode {
    #[serde(flatten)]
    pub node: TaskNode,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub pinned: bool,
}

pub struct GraphSession {
    settings: LayoutSettings,
    collection: TaskCollection,
    config: Arc<ViewConfig>,
    graph: TaskGraph,
    simulation: Simulation,
    transform: ViewTransform,
    transition: Option<Transition>,
    gestures: GestureController,
    generation: ScanGeneration,
    /// Time since the graph last changed.
    settling: Duration,
    /// Whether the current layout run has been auto-fitted.
    fitted: bool,
}

impl GraphSession {
    pub fn new(
        config: ViewConfig,
        settings: LayoutSettings,
        viewport: Size,
        reveal_lines: usize,
    ) -> Self {
        Self {
            simulation: Simulation::new(settings.clone(), viewport),
            settings,
            collection: TaskCollection::new(),
            config: Arc::new(config),
            graph: TaskGraph::default(),
            transform: ViewTransform::IDENTITY,
            transition: None,
            gestures: GestureController::new(reveal_lines),
            generation: ScanGeneration::new(),
            settling: Duration::ZERO,
            fitted: false,
        }
    }

    /// Fix the reference day used for date bands.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.simulation.set_today(today);
        self
    }

    pub fn config(&self) -> Arc<ViewConfig> {
        Arc::clone(&self.config)
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn collection(&self) -> &TaskCollection {
        &self.collection
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }

    pub fn viewport(&self) -> Size {
        self.simulation.viewport()
    }

    /// Tags discovered by the latest applied scan.
    pub fn tags(&self) -> &BTreeSet<String> {
        self.collection.tags()
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.gestures.dragging().is_some()
    }

    /// Start a scan. Its results must come back through [`Self::apply_scan`].
    pub fn begin_scan(&mut self) -> ScanTicket {
        self.generation.begin()
    }

    /// Install scan results unless a newer scan has started since `ticket`
    /// was issued. Returns whether the results were applied.
    pub fn apply_scan(&mut self, ticket: ScanTicket, collection: TaskCollection) -> bool {
        if !self.generation.accept(ticket) {
            return false;
        }
        info!(
            tasks = collection.len(),
            truncated = collection.truncated(),
            generation = ticket.generation(),
            "Applying scan"
        );
        self.collection = collection;
        self.rebuild();
        true
    }

    /// Swap in a new view configuration. Returns true when the change needs
    /// a fresh scan (the task cap changed) to take full effect.
    pub fn set_config(&mut self, config: ViewConfig) -> bool {
        if *self.config == config {
            return false;
        }
        let rescan = self.config.needs_rescan(&config);
        self.config = Arc::new(config);
        self.rebuild();
        rescan
    }

    fn rebuild(&mut self) {
        let graph = assemble(&self.collection, &self.config);
        let changed = graph != self.graph;
        self.simulation.set_graph(&graph, self.config.use_dates);
        self.graph = graph;
        if changed {
            self.settling = Duration::ZERO;
            self.fitted = false;
        }
        debug!(
            nodes = self.graph.nodes.len(),
            links = self.graph.links.len(),
            changed,
            "Graph assembled"
        );
    }

    /// Move time forward by `dt`: simulation ticks, the view transition, and
    /// the one-time auto-fit once the layout settles.
    pub fn advance(&mut self, dt: Duration) {
        self.simulation.advance(dt);

        if let Some(transition) = self.transition.as_mut() {
            self.transform = transition.step(dt);
            if transition.is_done() {
                self.transition = None;
            }
        }

        self.settling += dt;
        let settled =
            self.simulation.is_converged() || self.settling >= self.settings.settle_delay();
        if !self.fitted && settled && self.gestures.dragging().is_none() {
            self.fitted = true;
            self.fit_to_view();
        }
    }

    /// Run the layout to rest and jump straight to the fitted view.
    pub fn settle(&mut self, max_ticks: usize) {
        self.simulation.run_to_convergence(max_ticks);
        if self.fit_to_view() {
            if let Some(t) = self.transition.take() {
                self.transform = t.target();
            }
        }
        self.fitted = true;
    }

    pub fn resize(&mut self, viewport: Size) {
        self.simulation.set_viewport(viewport);
    }

    /// Animate the view onto the bounding box of all nodes. Returns false,
    /// doing nothing, when there is nothing sensible to fit.
    pub fn fit_to_view(&mut self) -> bool {
        let points: Vec<Point> = self.simulation.positions().map(|(_, p)| p).collect();
        let Some(target) = fit_transform(points, self.viewport(), self.settings.fit_margin)
        else {
            debug!("Fit skipped");
            return false;
        };
        self.transition = Some(Transition::new(
            self.transform,
            target,
            self.settings.transition_duration(),
        ));
        true
    }

    pub fn scene(&self) -> Scene {
        Scene::build(&self.graph, &self.simulation)
    }

    /// Feed one pointer event through the gesture controller.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<OpenRequest> {
        // Direct manipulation wins over an animated fit.
        if matches!(event, PointerEvent::Down { .. } | PointerEvent::Wheel { .. }) {
            self.transition = None;
        }
        let scene = self.scene();
        self.gestures.handle(
            event,
            GestureTarget {
                scene: &scene,
                graph: &self.graph,
                simulation: &mut self.simulation,
                transform: &mut self.transform,
            },
        )
    }

    pub fn render(&self, surface: &mut dyn RenderSurface) -> FrameStats {
        surface.draw(&self.scene(), &self.transform, self.viewport())
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .graph
            .nodes
            .iter()
            .filter_map(|n| {
                let state = self.simulation.node(&n.id)?;
                Some(PlacedNode {
                    node: n.clone(),
                    x: state.pos.x,
                    y: state.pos.y,
                    radius: state.radius,
                    pinned: state.is_pinned(),
                })
            })
            .collect();
        GraphSnapshot {
            nodes,
            links: self.graph.links.clone(),
            transform: self.transform,
            viewport: self.viewport(),
            alpha: self.simulation.alpha(),
            converged: self.simulation.is_converged(),
            truncated: self.collection.truncated(),
            total_tasks: self.collection.len(),
            tags: self.collection.tags().clone(),
            config: (*self.config).clone(),
        }
    }
}
