//! The stepping force simulation.
//!
//! Temperature (`alpha`) decays toward `alpha_target` each tick and scales
//! most forces, so the layout cools and settles. Dragging raises the target
//! to keep things moving until the node is released. Positions survive graph
//! updates by node id; a wholly new node set starts over.

use super::forces::{
    DateBand, Lcg, Spring, apply_axial, apply_centering, apply_charge, apply_collision,
    apply_links,
};
use super::geometry::{Point, Size};
use crate::config::LayoutSettings;
use crate::graph::TaskGraph;
use crate::types::LinkKind;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::time::Duration;
use tracing::debug;

/// Upper bound on ticks run by one `advance` call, so a long stall does not
/// freeze the caller catching up.
const MAX_TICKS_PER_ADVANCE: usize = 8;

/// Radius step of the phyllotaxis spiral used to place new non-root nodes.
const SPIRAL_STEP: f64 = 10.0;

/// Position and motion of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeState {
    pub id: String,
    pub pos: Point,
    pub vx: f64,
    pub vy: f64,
    /// Held position while dragged; forces do not move a pinned node.
    pub pin: Option<Point>,
    pub radius: f64,
    pub charge: f64,
    pub band: DateBand,
    pub depth: usize,
}

impl NodeState {
    pub fn at(id: impl Into<String>, pos: Point) -> Self {
        Self {
            id: id.into(),
            pos,
            vx: 0.0,
            vy: 0.0,
            pin: None,
            radius: 0.0,
            charge: 0.0,
            band: DateBand::Today,
            depth: 0,
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pin.is_some()
    }
}

pub struct Simulation {
    settings: LayoutSettings,
    viewport: Size,
    nodes: Vec<NodeState>,
    index: HashMap<String, usize>,
    springs: Vec<Spring>,
    alpha: f64,
    alpha_target: f64,
    use_dates: bool,
    today: NaiveDate,
    rng: Lcg,
    /// Simulated time not yet consumed by a whole tick.
    carry: f64,
}

impl Simulation {
    pub fn new(settings: LayoutSettings, viewport: Size) -> Self {
        Self {
            settings,
            viewport,
            nodes: Vec::new(),
            index: HashMap::new(),
            springs: Vec::new(),
            alpha: 1.0,
            alpha_target: 0.0,
            use_dates: false,
            today: chrono::Local::now().date_naive(),
            rng: Lcg::default(),
            carry: 0.0,
        }
    }

    /// Fix the reference day used for date bands.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn set_today(&mut self, today: NaiveDate) {
        self.today = today;
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    /// Replace the simulated graph.
    ///
    /// Nodes already present keep their position, velocity and pin. When the
    /// old and new id sets share nothing the simulation is reinitialized; a
    /// graph with the same nodes and edges leaves the simulation untouched.
    pub fn set_graph(&mut self, graph: &TaskGraph, use_dates: bool) {
        let shared = graph
            .nodes
            .iter()
            .filter(|n| self.index.contains_key(&n.id))
            .count();
        let restart = shared == 0;
        let unchanged = !restart
            && shared == self.nodes.len()
            && shared == graph.nodes.len()
            && use_dates == self.use_dates;

        let previous: HashMap<String, NodeState> = if restart {
            HashMap::new()
        } else {
            self.nodes.drain(..).map(|n| (n.id.clone(), n)).collect()
        };

        let center = self.viewport.center();
        let root_count = graph.nodes.iter().filter(|n| n.is_root()).count().max(1);
        let circle = self.settings.root_circle_fraction * self.viewport.width.min(self.viewport.height);

        let mut nodes: Vec<NodeState> = Vec::with_capacity(graph.nodes.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(graph.nodes.len());
        let mut root_slot = 0usize;
        let mut spawned = 0usize;

        for node in &graph.nodes {
            let kept = previous.get(&node.id);
            let pos = match kept {
                Some(prev) => prev.pos,
                None if node.is_root() => {
                    let angle = 2.0 * PI * root_slot as f64 / root_count as f64;
                    Point::new(center.x + circle * angle.cos(), center.y + circle * angle.sin())
                }
                None => {
                    let anchor = node
                        .parent
                        .as_ref()
                        .and_then(|p| index.get(p))
                        .map(|&i| nodes[i].pos)
                        .unwrap_or(center);
                    spawned += 1;
                    spiral_offset(anchor, spawned)
                }
            };
            if node.is_root() {
                root_slot += 1;
            }

            let mut state = NodeState {
                radius: self.settings.radius_for_depth(node.depth),
                charge: if node.is_root() {
                    self.settings.root_charge
                } else {
                    self.settings.charge
                },
                band: DateBand::classify(node.anchor_date, self.today),
                depth: node.depth,
                ..NodeState::at(node.id.clone(), pos)
            };
            if let Some(prev) = kept {
                state.vx = prev.vx;
                state.vy = prev.vy;
                state.pin = prev.pin;
            }
            index.insert(node.id.clone(), nodes.len());
            nodes.push(state);
        }

        let springs = build_springs(graph, &index, &self.settings);
        let unchanged = unchanged && springs == self.springs;
        self.springs = springs;
        self.nodes = nodes;
        self.index = index;
        self.use_dates = use_dates;

        if restart {
            self.alpha = 1.0;
            self.alpha_target = 0.0;
            self.carry = 0.0;
            debug!(nodes = self.nodes.len(), "Layout reinitialized");
        } else if !unchanged {
            self.reheat(0.5);
            debug!(nodes = self.nodes.len(), kept = shared, "Layout updated");
        }
    }

    /// One simulation step.
    pub fn tick(&mut self) {
        let s = &self.settings;
        self.alpha += (self.alpha_target - self.alpha) * s.alpha_decay;
        let alpha = self.alpha;
        let center = self.viewport.center();

        apply_links(&mut self.nodes, &self.springs, alpha, &mut self.rng);
        apply_charge(&mut self.nodes, alpha, &mut self.rng);
        if self.use_dates {
            let offset = s.band_fraction * self.viewport.width;
            apply_axial(&mut self.nodes, center, offset, s.axial_strength, alpha);
        } else {
            apply_centering(&mut self.nodes, center);
        }
        apply_collision(
            &mut self.nodes,
            s.collision_padding,
            s.collision_strength,
            &mut self.rng,
        );

        let keep = 1.0 - s.velocity_decay;
        for node in &mut self.nodes {
            match node.pin {
                Some(p) => {
                    node.pos = p;
                    node.vx = 0.0;
                    node.vy = 0.0;
                }
                None => {
                    node.vx *= keep;
                    node.vy *= keep;
                    node.pos.x += node.vx;
                    node.pos.y += node.vy;
                }
            }
        }
    }

    /// Advance simulated time by `dt`, running as many fixed-length ticks as
    /// fit. Does nothing once converged.
    pub fn advance(&mut self, dt: Duration) -> &[NodeState] {
        if self.is_converged() {
            self.carry = 0.0;
            return &self.nodes;
        }
        let step = 1.0 / self.settings.tick_rate;
        self.carry += dt.as_secs_f64();
        let mut ran = 0;
        while self.carry >= step && ran < MAX_TICKS_PER_ADVANCE {
            self.tick();
            self.carry -= step;
            ran += 1;
        }
        if ran == MAX_TICKS_PER_ADVANCE {
            self.carry = 0.0;
        }
        &self.nodes
    }

    /// Tick until converged or `max_ticks` is reached. Returns ticks run.
    pub fn run_to_convergence(&mut self, max_ticks: usize) -> usize {
        let mut ran = 0;
        while !self.is_converged() && ran < max_ticks {
            self.tick();
            ran += 1;
        }
        ran
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn alpha_target(&self) -> f64 {
        self.alpha_target
    }

    pub fn set_alpha_target(&mut self, target: f64) {
        self.alpha_target = target;
    }

    /// Raise the temperature to at least `alpha`.
    pub fn reheat(&mut self, alpha: f64) {
        self.alpha = self.alpha.max(alpha);
    }

    pub fn is_converged(&self) -> bool {
        self.alpha < self.settings.alpha_min && self.alpha_target < self.settings.alpha_min
    }

    /// Hold `id` at `at`. Returns false for unknown ids.
    pub fn pin(&mut self, id: &str, at: Point) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let node = &mut self.nodes[i];
        node.pin = Some(at);
        node.pos = at;
        node.vx = 0.0;
        node.vy = 0.0;
        true
    }

    /// Release a pinned node back to the forces.
    pub fn unpin(&mut self, id: &str) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        self.nodes[i].pin.take().is_some()
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.node(id).is_some_and(NodeState::is_pinned)
    }

    pub fn node(&self, id: &str) -> Option<&NodeState> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.node(id).map(|n| n.pos)
    }

    pub fn nodes(&self) -> &[NodeState] {
        &self.nodes
    }

    pub fn positions(&self) -> impl Iterator<Item = (&str, Point)> {
        self.nodes.iter().map(|n| (n.id.as_str(), n.pos))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Golden-angle spiral around `anchor`; the i-th point sits at radius
/// proportional to sqrt(i).
fn spiral_offset(anchor: Point, i: usize) -> Point {
    let golden = PI * (3.0 - 5.0_f64.sqrt());
    let r = SPIRAL_STEP * (0.5 + i as f64).sqrt();
    let a = i as f64 * golden;
    Point::new(anchor.x + r * a.cos(), anchor.y + r * a.sin())
}

fn build_springs(
    graph: &TaskGraph,
    index: &HashMap<String, usize>,
    settings: &LayoutSettings,
) -> Vec<Spring> {
    let resolved: Vec<(usize, usize, LinkKind)> = graph
        .links
        .iter()
        .filter_map(|l| Some((*index.get(&l.source)?, *index.get(&l.target)?, l.kind)))
        .collect();

    let mut degree = vec![0usize; index.len()];
    for &(s, t, _) in &resolved {
        degree[s] += 1;
        degree[t] += 1;
    }

    resolved
        .into_iter()
        .map(|(source, target, kind)| {
            let (ds, dt) = (degree[source] as f64, degree[target] as f64);
            Spring {
                source,
                target,
                distance: match kind {
                    LinkKind::Hierarchy => settings.hierarchy_distance,
                    LinkKind::Dependency => settings.dependency_distance,
                },
                strength: settings.link_strength / ds.min(dt).max(1.0),
                bias: ds / (ds + dt),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ViewConfig, assemble};
    use crate::scan::TaskCollection;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    fn sim() -> Simulation {
        Simulation::new(LayoutSettings::default(), Size::new(1000.0, 800.0)).with_today(today())
    }

    fn graph(doc: &str) -> TaskGraph {
        assemble(
            &TaskCollection::from_document("doc.md", doc),
            &ViewConfig::default(),
        )
    }

    const TREE: &str = "\
- [ ] Alpha 🆔 a
  - [ ] Alpha one
  - [ ] Alpha two
- [ ] Beta 🆔 b ⛔ a
- [ ] Gamma 🆔 c
";

    #[test]
    fn test_roots_seeded_on_circle() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        let center = Point::new(500.0, 400.0);
        let expected = 0.35 * 800.0;
        for id in ["a", "b", "c"] {
            let d = s.position(id).unwrap().distance(center);
            assert!((d - expected).abs() < 1e-6, "{} at {}", id, d);
        }
        // Children start close to their parent.
        let child = s.position("doc.md:2").unwrap();
        assert!(child.distance(s.position("a").unwrap()) < 30.0);
    }

    #[test]
    fn test_converges_and_stays_finite() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        let ran = s.run_to_convergence(1_000);
        assert!(s.is_converged());
        assert!(ran > 100 && ran < 1_000);
        assert!(s.nodes().iter().all(|n| n.pos.is_finite()));
    }

    #[test]
    fn test_no_overlap_after_settling() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        s.run_to_convergence(1_000);
        let nodes = s.nodes();
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let d = nodes[i].pos.distance(nodes[j].pos);
                assert!(d > 0.5 * (nodes[i].radius + nodes[j].radius));
            }
        }
    }

    #[test]
    fn test_pinned_node_does_not_move() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        let held = Point::new(100.0, 100.0);
        assert!(s.pin("a", held));
        s.set_alpha_target(0.3);
        for _ in 0..50 {
            s.tick();
        }
        assert_eq!(s.position("a"), Some(held));
        assert!(s.is_pinned("a"));
    }

    #[test]
    fn test_released_node_rejoins_simulation() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        let far = Point::new(-2_000.0, -2_000.0);
        s.pin("a", far);
        s.set_alpha_target(0.3);
        s.tick();
        assert!(s.unpin("a"));
        assert!(!s.is_pinned("a"));
        s.set_alpha_target(0.0);
        for _ in 0..20 {
            s.tick();
        }
        assert_ne!(s.position("a"), Some(far));
        assert!(!s.unpin("a"));
    }

    #[test]
    fn test_update_keeps_positions_by_id() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        s.run_to_convergence(1_000);
        let before = s.position("b").unwrap();

        let grown = format!("{}- [ ] Delta 🆔 d\n", TREE);
        s.set_graph(&graph(&grown), false);
        assert_eq!(s.position("b"), Some(before));
        assert!(s.position("d").is_some());
        assert!(!s.is_converged());
    }

    #[test]
    fn test_unchanged_graph_does_not_reheat() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        s.run_to_convergence(1_000);
        s.set_graph(&graph(TREE), false);
        assert!(s.is_converged());
    }

    #[test]
    fn test_disjoint_graph_reinitializes() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        s.run_to_convergence(1_000);
        s.set_graph(&TaskGraph::default(), false);
        assert!(s.is_empty());
        s.set_graph(&graph("- [ ] Fresh 🆔 f"), false);
        assert_eq!(s.alpha(), 1.0);
        let d = s.position("f").unwrap().distance(Point::new(500.0, 400.0));
        assert!((d - 280.0).abs() < 1e-6);
    }

    #[test]
    fn test_date_mode_separates_bands() {
        let doc = "\
- [ ] Overdue 🆔 past ⏳ 2024-05-01
- [ ] Due today 🆔 now ⏳ 2024-05-10
- [ ] Later 🆔 later 🛫 2024-06-01
";
        let mut s = sim();
        s.set_graph(&graph(doc), true);
        s.run_to_convergence(2_000);
        let x = |id| s.position(id).unwrap().x;
        assert!(x("past") < 500.0);
        assert!(x("later") > 500.0);
        assert!(x("past") < x("now") && x("now") < x("later"));
    }

    #[test]
    fn test_advance_runs_fixed_steps() {
        let mut s = sim();
        s.set_graph(&graph(TREE), false);
        let alpha = s.alpha();
        s.advance(Duration::from_millis(5));
        assert_eq!(s.alpha(), alpha);
        s.advance(Duration::from_millis(20));
        assert!(s.alpha() < alpha);
    }
}
