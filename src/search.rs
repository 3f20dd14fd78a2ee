//! Uniform-cost search over a four-connected grid.
//!
//! The search runs to completion up front and records what happened as an
//! ordered list of events. Whoever displays the result decides how fast to
//! replay them.

use crate::grid::{CellPos, CellRole, Grid};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// One animation frame of a search run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchEvent {
    /// A cell's shortest distance from start became final
    Settled { pos: CellPos, distance: u32 },
    /// A cell on the shortest route, `step` moves away from start
    PathRevealed { pos: CellPos, step: usize },
}

impl SearchEvent {
    pub fn pos(&self) -> CellPos {
        match self {
            SearchEvent::Settled { pos, .. } | SearchEvent::PathRevealed { pos, .. } => *pos,
        }
    }
}

/// How a search run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// End was reached; `length` is the number of moves from start to end
    Found { length: usize },
    /// Every reachable cell was settled without reaching end
    Exhausted,
}

/// Full record of a search run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPlan {
    /// Settlements in order, followed by path reveals from start to end
    pub events: Vec<SearchEvent>,
    /// Shortest route including both endpoints (empty when exhausted)
    pub path: Vec<CellPos>,
    pub outcome: SearchOutcome,
}

impl SearchPlan {
    /// Number of cells settled, endpoints included
    pub fn settled_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SearchEvent::Settled { .. }))
            .count()
    }

    pub fn path_length(&self) -> Option<usize> {
        match self.outcome {
            SearchOutcome::Found { length } => Some(length),
            SearchOutcome::Exhausted => None,
        }
    }
}

/// Run Dijkstra with unit edge weights from the grid's start cell.
///
/// Writes tentative distances and predecessor links into the grid's scratch
/// fields but never changes cell roles. Among candidates at equal distance the
/// one earlier in row-major order settles first.
pub fn plan(grid: &mut Grid) -> SearchPlan {
    grid.clear_scratch();

    let start = grid.index(grid.start());
    let end = grid.index(grid.end());
    let mut settled = vec![false; grid.len()];
    let mut events = Vec::new();

    // (distance, linear index) so ties pop in scan order
    let mut frontier = BinaryHeap::new();
    grid.cell_at_mut(start).distance = Some(0);
    frontier.push(Reverse((0u32, start)));

    let mut reached_end = false;
    while let Some(Reverse((distance, idx))) = frontier.pop() {
        if settled[idx] || grid.cell_at(idx).distance != Some(distance) {
            continue;
        }
        if grid.cell_at(idx).role == CellRole::Wall {
            continue;
        }
        settled[idx] = true;
        events.push(SearchEvent::Settled {
            pos: grid.pos(idx),
            distance,
        });

        if idx == end {
            reached_end = true;
            break;
        }

        let next_distance = distance + 1;
        let neighbors: Vec<usize> = grid.neighbors(idx).collect();
        for n in neighbors {
            if settled[n] || grid.cell_at(n).role == CellRole::Wall {
                continue;
            }
            let cell = grid.cell_at_mut(n);
            if cell.distance.map_or(true, |d| next_distance < d) {
                cell.distance = Some(next_distance);
                cell.predecessor = Some(idx);
                frontier.push(Reverse((next_distance, n)));
            }
        }
    }

    if !reached_end {
        return SearchPlan {
            events,
            path: Vec::new(),
            outcome: SearchOutcome::Exhausted,
        };
    }

    let path = reconstruct(grid, end);
    let length = path.len().saturating_sub(1);
    for (step, &pos) in path.iter().enumerate() {
        if step == 0 || step == length {
            continue;
        }
        events.push(SearchEvent::PathRevealed { pos, step });
    }

    SearchPlan {
        events,
        path,
        outcome: SearchOutcome::Found { length },
    }
}

/// Walk predecessor links back from `end`, returning the route start-first
fn reconstruct(grid: &Grid, end: usize) -> Vec<CellPos> {
    let mut path = Vec::new();
    let mut current = Some(end);
    while let Some(idx) = current {
        path.push(grid.pos(idx));
        if path.len() > grid.len() {
            break;
        }
        current = grid.cell_at(idx).predecessor;
    }
    path.reverse();
    path
}
