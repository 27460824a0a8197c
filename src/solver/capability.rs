//! Visiting-order search capability.
//!
//! The combinatorial search is pluggable: a metaheuristic tier
//! ([`LocalSearchOrder`]) and a deterministic fallback tier
//! ([`InputOrderFallback`]). Callers declare which tier they require;
//! the integrated optimizer refuses to run on the fallback.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::debug;

use crate::distance::{DistanceMatrix, UNREACHABLE_COST};

/// Capability tier of an [`OrderSearch`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTier {
    /// Time-budgeted combinatorial search. Required by the integrated
    /// optimizer.
    Metaheuristic,
    /// Deterministic input-order heuristic.
    Fallback,
}

/// An ordering constraint over the checkpoint sequence: every other
/// checkpoint must be visited strictly before the barrier.
///
/// The rule is checked as a visit-position predicate so the barrier can
/// sit anywhere the search puts it, as long as nothing follows it.
#[derive(Debug, Clone, PartialEq)]
pub struct Precedence {
    /// Checkpoint id that must come after all others.
    pub barrier: String,
}

impl Precedence {
    /// All checkpoints before `barrier`.
    pub fn before(barrier: impl Into<String>) -> Self {
        Self {
            barrier: barrier.into(),
        }
    }

    /// Whether a checkpoint sequence satisfies the rule.
    pub fn satisfied_by(&self, checkpoints: &[String]) -> bool {
        match checkpoints.iter().position(|c| *c == self.barrier) {
            Some(pos) => pos == checkpoints.len() - 1,
            None => false,
        }
    }
}

/// One order-search problem: find a low-distance visiting order of the
/// checkpoints between a fixed start and a fixed end.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    /// First point of the route.
    pub start: String,
    /// Last point of the route.
    pub end: String,
    /// Points to order between start and end.
    pub checkpoints: Vec<String>,
    /// Optional barrier constraint over the checkpoints.
    pub precedence: Option<Precedence>,
    /// Wall-clock budget for the search.
    pub time_limit: Duration,
}

/// Searches for a feasible low-distance visiting order.
///
/// Implementations return the full route `[start, checkpoints..., end]`
/// or `None` when no order with every leg reachable was found within the
/// budget.
pub trait OrderSearch {
    /// Implementation name, for logs.
    fn name(&self) -> &'static str;

    /// Capability tier.
    fn tier(&self) -> SearchTier;

    /// Runs the search.
    fn search(&self, matrix: &DistanceMatrix, request: &OrderRequest) -> Option<Vec<String>>;
}

/// Solver configuration shared by the routing entry points.
pub struct SolverConfig {
    /// The order-search capability to use.
    pub search: Box<dyn OrderSearch>,
    /// Time budget per single-route search.
    pub time_limit: Duration,
}

impl SolverConfig {
    /// Default single-route search budget.
    pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(5);

    /// Metaheuristic search with the given seed and the default budget.
    pub fn metaheuristic(seed: u64) -> Self {
        Self {
            search: Box::new(LocalSearchOrder::seeded(seed)),
            time_limit: Self::DEFAULT_TIME_LIMIT,
        }
    }

    /// Deterministic input-order fallback.
    pub fn fallback() -> Self {
        Self {
            search: Box::new(InputOrderFallback),
            time_limit: Self::DEFAULT_TIME_LIMIT,
        }
    }

    /// Overrides the search budget.
    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::metaheuristic(0x5eed)
    }
}

/// Local-search order improvement with seeded perturbation restarts.
///
/// Starts from a nearest-neighbor construction, improves with 2-opt and
/// relocate first-improvement moves, then restarts from shuffled orders
/// until the time budget runs out. The barrier is an ordinary checkpoint
/// in the permutation: constructed and shuffled sequences are repaired to
/// precedence feasibility, and every improvement move is re-checked
/// against [`Precedence::satisfied_by`] before it is accepted.
/// Deterministic for a fixed seed and input.
#[derive(Debug, Clone)]
pub struct LocalSearchOrder {
    seed: u64,
}

impl LocalSearchOrder {
    /// Creates a search with an explicit seed.
    pub fn seeded(seed: u64) -> Self {
        Self { seed }
    }
}

impl OrderSearch for LocalSearchOrder {
    fn name(&self) -> &'static str {
        "local-search"
    }

    fn tier(&self) -> SearchTier {
        SearchTier::Metaheuristic
    }

    fn search(&self, matrix: &DistanceMatrix, request: &OrderRequest) -> Option<Vec<String>> {
        let deadline = Instant::now() + request.time_limit;
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut best_order = nearest_neighbor_order(matrix, &request.start, &request.checkpoints);
        if !repair(request, &mut best_order) {
            debug!(search = self.name(), "no precedence-feasible sequence exists");
            return None;
        }
        improve(matrix, request, &mut best_order, deadline);
        let mut best_d = assembled_distance(matrix, request, &best_order);

        // Restart until the budget runs out or the restarts stop paying.
        let mut stall = 0usize;
        let max_stall = 8 * request.checkpoints.len().max(1);
        while Instant::now() < deadline {
            let mut candidate = request.checkpoints.clone();
            candidate.shuffle(&mut rng);
            if !repair(request, &mut candidate) {
                break;
            }
            improve(matrix, request, &mut candidate, deadline);
            let d = assembled_distance(matrix, request, &candidate);
            if d < best_d {
                best_d = d;
                best_order = candidate;
                stall = 0;
            } else {
                stall += 1;
                if stall >= max_stall {
                    break;
                }
            }
        }

        if best_d >= UNREACHABLE_COST {
            debug!(search = self.name(), "no reachable visiting order");
            return None;
        }
        Some(assemble(request, &best_order))
    }
}

/// Visits checkpoints in the order they were supplied, repaired to
/// precedence feasibility. No search at all; exists so environments
/// without the metaheuristic tier still produce a route when one is
/// reachable as given.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputOrderFallback;

impl OrderSearch for InputOrderFallback {
    fn name(&self) -> &'static str {
        "input-order"
    }

    fn tier(&self) -> SearchTier {
        SearchTier::Fallback
    }

    fn search(&self, matrix: &DistanceMatrix, request: &OrderRequest) -> Option<Vec<String>> {
        let mut order = request.checkpoints.clone();
        if !repair(request, &mut order) {
            return None;
        }
        let d = assembled_distance(matrix, request, &order);
        if d >= UNREACHABLE_COST {
            return None;
        }
        Some(assemble(request, &order))
    }
}

/// Full route for a checkpoint sequence: start, checkpoints, end.
fn assemble(request: &OrderRequest, checkpoints: &[String]) -> Vec<String> {
    let mut order = Vec::with_capacity(checkpoints.len() + 2);
    order.push(request.start.clone());
    order.extend(checkpoints.iter().cloned());
    order.push(request.end.clone());
    order
}

fn assembled_distance(
    matrix: &DistanceMatrix,
    request: &OrderRequest,
    checkpoints: &[String],
) -> f64 {
    matrix.route_distance(&assemble(request, checkpoints))
}

/// Whether a checkpoint sequence satisfies the request's precedence.
fn feasible(request: &OrderRequest, checkpoints: &[String]) -> bool {
    request
        .precedence
        .as_ref()
        .map_or(true, |p| p.satisfied_by(checkpoints))
}

/// Repairs an infeasible sequence by relocating the barrier to the first
/// position the predicate accepts, leaving the other checkpoints in
/// place. Returns `false` when no position satisfies the rule, e.g. when
/// the barrier is not among the checkpoints at all.
fn repair(request: &OrderRequest, checkpoints: &mut Vec<String>) -> bool {
    if feasible(request, checkpoints) {
        return true;
    }
    let Some(p) = &request.precedence else {
        return true;
    };
    let Some(pos) = checkpoints.iter().position(|c| *c == p.barrier) else {
        return false;
    };
    let barrier = checkpoints.remove(pos);
    for insert_at in 0..=checkpoints.len() {
        checkpoints.insert(insert_at, barrier.clone());
        if p.satisfied_by(checkpoints) {
            return true;
        }
        checkpoints.remove(insert_at);
    }
    false
}

/// Greedy construction: repeatedly take the closest unvisited checkpoint.
fn nearest_neighbor_order(matrix: &DistanceMatrix, start: &str, checkpoints: &[String]) -> Vec<String> {
    let mut remaining: Vec<String> = checkpoints.to_vec();
    let mut order = Vec::with_capacity(remaining.len());
    let mut current = start.to_string();
    while !remaining.is_empty() {
        let mut best = 0usize;
        let mut best_d = f64::INFINITY;
        for (i, c) in remaining.iter().enumerate() {
            let d = matrix.distance(&current, c);
            if d < best_d {
                best_d = d;
                best = i;
            }
        }
        current = remaining.remove(best);
        order.push(current.clone());
    }
    order
}

/// First-improvement 2-opt and relocate over the checkpoint sequence.
/// A move is accepted only when the result stays precedence-feasible and
/// shortens the route; infeasible moves are reverted.
fn improve(
    matrix: &DistanceMatrix,
    request: &OrderRequest,
    order: &mut Vec<String>,
    deadline: Instant,
) {
    let n = order.len();
    if n < 2 {
        return;
    }
    let mut improved = true;
    while improved && Instant::now() < deadline {
        improved = false;
        let current = assembled_distance(matrix, request, order);
        'outer: for i in 0..n {
            for j in i + 1..n {
                // 2-opt: reverse the segment [i, j].
                order[i..=j].reverse();
                if feasible(request, order) && assembled_distance(matrix, request, order) < current
                {
                    improved = true;
                    break 'outer;
                }
                order[i..=j].reverse();

                // relocate: move element i to position j.
                let item = order.remove(i);
                order.insert(j, item);
                if feasible(request, order) && assembled_distance(matrix, request, order) < current
                {
                    improved = true;
                    break 'outer;
                }
                let item = order.remove(j);
                order.insert(i, item);
            }
        }
    }
}
