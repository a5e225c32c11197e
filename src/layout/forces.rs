//! Individual forces applied once per tick.
//!
//! Each force only adds to node velocities; integration and pinning happen
//! in the simulation. Forces that scale with temperature take `alpha`.

use super::geometry::Point;
use super::simulation::NodeState;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Deterministic generator for breaking exact overlaps.
///
/// Same constants as the classic numerical-recipes LCG so runs are
/// reproducible across platforms.
#[derive(Debug, Clone)]
pub struct Lcg(u32);

impl Lcg {
    pub fn new(seed: u32) -> Self {
        Self(seed)
    }

    /// Uniform in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 as f64 / 4_294_967_296.0
    }

    /// A tiny nonzero nudge.
    pub fn jiggle(&mut self) -> f64 {
        let j = (self.next_f64() - 0.5) * 1e-6;
        if j == 0.0 { 1e-7 } else { j }
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(1)
    }
}

/// Horizontal band a node is drawn toward in date mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateBand {
    Past,
    #[default]
    Today,
    Future,
}

impl DateBand {
    /// Band for `anchor` relative to `today`. Undated tasks sit in the center.
    pub fn classify(anchor: Option<NaiveDate>, today: NaiveDate) -> Self {
        match anchor {
            Some(d) if d < today => DateBand::Past,
            Some(d) if d > today => DateBand::Future,
            _ => DateBand::Today,
        }
    }

    /// -1, 0 or 1 for left, center and right.
    pub fn direction(&self) -> f64 {
        match self {
            DateBand::Past => -1.0,
            DateBand::Today => 0.0,
            DateBand::Future => 1.0,
        }
    }
}

/// A resolved edge between two node indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Spring {
    pub source: usize,
    pub target: usize,
    pub distance: f64,
    pub strength: f64,
    /// Share of the correction applied to the target.
    pub bias: f64,
}

/// Pull linked nodes toward their rest distance.
pub fn apply_links(nodes: &mut [NodeState], springs: &[Spring], alpha: f64, rng: &mut Lcg) {
    for s in springs {
        if s.source == s.target {
            continue;
        }
        let (src, tgt) = (&nodes[s.source], &nodes[s.target]);
        let mut dx = tgt.pos.x + tgt.vx - src.pos.x - src.vx;
        let mut dy = tgt.pos.y + tgt.vy - src.pos.y - src.vy;
        if dx == 0.0 {
            dx = rng.jiggle();
        }
        if dy == 0.0 {
            dy = rng.jiggle();
        }
        let len = dx.hypot(dy);
        let k = (len - s.distance) / len * alpha * s.strength;
        let (dx, dy) = (dx * k, dy * k);

        let tgt = &mut nodes[s.target];
        tgt.vx -= dx * s.bias;
        tgt.vy -= dy * s.bias;
        let src = &mut nodes[s.source];
        src.vx += dx * (1.0 - s.bias);
        src.vy += dy * (1.0 - s.bias);
    }
}

/// Pairwise inverse-distance repulsion.
pub fn apply_charge(nodes: &mut [NodeState], alpha: f64, rng: &mut Lcg) {
    const DISTANCE_MIN2: f64 = 1.0;
    let n = nodes.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let mut dx = nodes[j].pos.x - nodes[i].pos.x;
            let mut dy = nodes[j].pos.y - nodes[i].pos.y;
            if dx == 0.0 {
                dx = rng.jiggle();
            }
            if dy == 0.0 {
                dy = rng.jiggle();
            }
            let mut d2 = dx * dx + dy * dy;
            if d2 < DISTANCE_MIN2 {
                d2 = (DISTANCE_MIN2 * d2).sqrt();
            }
            let (ci, cj) = (nodes[i].charge, nodes[j].charge);
            nodes[i].vx += dx * cj * alpha / d2;
            nodes[i].vy += dy * cj * alpha / d2;
            nodes[j].vx -= dx * ci * alpha / d2;
            nodes[j].vy -= dy * ci * alpha / d2;
        }
    }
}

/// Pull every node toward its band's x and the vertical center.
pub fn apply_axial(
    nodes: &mut [NodeState],
    center: Point,
    band_offset: f64,
    strength: f64,
    alpha: f64,
) {
    for node in nodes {
        let tx = center.x + node.band.direction() * band_offset;
        node.vx += (tx - node.pos.x) * strength * alpha;
        node.vy += (center.y - node.pos.y) * strength * alpha;
    }
}

/// Translate free nodes so the mean position sits on `center`.
pub fn apply_centering(nodes: &mut [NodeState], center: Point) {
    let free: Vec<usize> = (0..nodes.len()).filter(|&i| !nodes[i].is_pinned()).collect();
    if free.is_empty() {
        return;
    }
    let n = free.len() as f64;
    let (sx, sy) = free
        .iter()
        .fold((0.0, 0.0), |(sx, sy), &i| (sx + nodes[i].pos.x, sy + nodes[i].pos.y));
    let (shift_x, shift_y) = (sx / n - center.x, sy / n - center.y);
    for i in free {
        nodes[i].pos.x -= shift_x;
        nodes[i].pos.y -= shift_y;
    }
}

/// Push overlapping circles apart in proportion to the overlap.
pub fn apply_collision(nodes: &mut [NodeState], padding: f64, strength: f64, rng: &mut Lcg) {
    let n = nodes.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let ri = nodes[i].radius + padding;
            let rj = nodes[j].radius + padding;
            let r = ri + rj;
            let mut dx = (nodes[i].pos.x + nodes[i].vx) - (nodes[j].pos.x + nodes[j].vx);
            let mut dy = (nodes[i].pos.y + nodes[i].vy) - (nodes[j].pos.y + nodes[j].vy);
            let mut d2 = dx * dx + dy * dy;
            if d2 >= r * r {
                continue;
            }
            if dx == 0.0 {
                dx = rng.jiggle();
                d2 += dx * dx;
            }
            if dy == 0.0 {
                dy = rng.jiggle();
                d2 += dy * dy;
            }
            let len = d2.sqrt();
            let k = (r - len) / len * strength;
            let (dx, dy) = (dx * k, dy * k);
            // Smaller circles give way more.
            let (ri2, rj2) = (ri * ri, rj * rj);
            let share = rj2 / (ri2 + rj2);
            nodes[i].vx += dx * share;
            nodes[i].vy += dy * share;
            nodes[j].vx -= dx * (1.0 - share);
            nodes[j].vy -= dy * (1.0 - share);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f64, y: f64) -> NodeState {
        NodeState {
            charge: -100.0,
            radius: 10.0,
            ..NodeState::at("n", Point::new(x, y))
        }
    }

    #[test]
    fn test_lcg_is_deterministic_and_bounded() {
        let mut a = Lcg::new(7);
        let mut b = Lcg::new(7);
        for _ in 0..100 {
            let (x, y) = (a.next_f64(), b.next_f64());
            assert_eq!(x, y);
            assert!((0.0..1.0).contains(&x));
        }
        assert_ne!(Lcg::default().jiggle(), 0.0);
    }

    #[test]
    fn test_date_band_classification() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d);
        assert_eq!(DateBand::classify(day(9), today), DateBand::Past);
        assert_eq!(DateBand::classify(day(10), today), DateBand::Today);
        assert_eq!(DateBand::classify(day(11), today), DateBand::Future);
        assert_eq!(DateBand::classify(None, today), DateBand::Today);
    }

    #[test]
    fn test_link_pulls_stretched_pair_together() {
        let mut nodes = vec![node(0.0, 0.0), node(200.0, 0.0)];
        let springs = vec![Spring {
            source: 0,
            target: 1,
            distance: 50.0,
            strength: 1.0,
            bias: 0.5,
        }];
        apply_links(&mut nodes, &springs, 1.0, &mut Lcg::default());
        assert!(nodes[0].vx > 0.0);
        assert!(nodes[1].vx < 0.0);
    }

    #[test]
    fn test_charge_pushes_apart() {
        let mut nodes = vec![node(0.0, 0.0), node(10.0, 0.0)];
        apply_charge(&mut nodes, 1.0, &mut Lcg::default());
        assert!(nodes[0].vx < 0.0);
        assert!(nodes[1].vx > 0.0);
    }

    #[test]
    fn test_collision_separates_coincident_nodes() {
        let mut nodes = vec![node(5.0, 5.0), node(5.0, 5.0)];
        apply_collision(&mut nodes, 0.0, 1.0, &mut Lcg::default());
        let moved = (nodes[0].vx - nodes[1].vx).abs() + (nodes[0].vy - nodes[1].vy).abs();
        assert!(moved > 0.0);
    }

    #[test]
    fn test_axial_pulls_toward_band() {
        let mut past = node(0.0, 0.0);
        past.band = DateBand::Past;
        let mut nodes = vec![past];
        apply_axial(&mut nodes, Point::new(500.0, 300.0), 300.0, 0.1, 1.0);
        // Target x is 200, target y is 300.
        assert!((nodes[0].vx - 20.0).abs() < 1e-9);
        assert!((nodes[0].vy - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_centering_ignores_pinned() {
        let mut pinned = node(1000.0, 1000.0);
        pinned.pin = Some(Point::new(1000.0, 1000.0));
        let mut nodes = vec![node(0.0, 0.0), node(20.0, 0.0), pinned];
        apply_centering(&mut nodes, Point::new(100.0, 100.0));
        assert_eq!(nodes[0].pos, Point::new(90.0, 100.0));
        assert_eq!(nodes[2].pos, Point::new(1000.0, 1000.0));
    }
}
