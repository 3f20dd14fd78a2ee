use crate::grid::{CellPos, CellRole, Grid};
use crate::search::{self, SearchEvent, SearchOutcome};
use crate::settings::{GridSettings, Tool};
use rand::Rng;
use std::collections::VecDeque;
use tracing::{debug, info};

/// Interactive grid plus an animated shortest-path search
#[derive(Clone)]
pub struct GridSearchEngine {
    grid: Grid,
    tool: Tool,
    pointer_held: bool,
    running: bool,
    pending: VecDeque<SearchEvent>,
    outcome: Option<SearchOutcome>,
    visited_count: usize,
    path_length: usize,
}

impl GridSearchEngine {
    /// Settings must already be validated
    pub fn new(settings: &GridSettings) -> Self {
        Self {
            grid: Grid::new(settings.rows, settings.cols, settings.start, settings.end),
            tool: Tool::default(),
            pointer_held: false,
            running: false,
            pending: VecDeque::new(),
            outcome: None,
            visited_count: 0,
            path_length: 0,
        }
    }

    /// Rebuild the grid with only the current endpoints. Safe mid-animation.
    pub fn reset_grid(&mut self) {
        self.grid.rebuild();
        self.abandon_run();
        self.pointer_held = false;
    }

    /// Select the pointer tool
    pub fn set_tool(&mut self, tool: Tool) {
        self.tool = tool;
    }

    /// Apply the active tool to a cell. Ignored while a search animates.
    pub fn apply_pointer_down(&mut self, pos: CellPos) {
        if self.running || !self.grid.contains(pos) {
            return;
        }
        match self.tool {
            Tool::Wall => {
                // Pressing an endpoint starts no drag
                if self.grid.role(pos).is_some_and(|r| r.is_endpoint()) {
                    return;
                }
                self.grid.toggle_wall(pos);
                self.pointer_held = true;
            }
            Tool::MoveStart => {
                if self.grid.move_start(pos) {
                    self.clear_previous_run();
                }
            }
            Tool::MoveEnd => {
                if self.grid.move_end(pos) {
                    self.clear_previous_run();
                }
            }
        }
    }

    /// Drag-paint walls while the pointer is held
    pub fn apply_pointer_enter(&mut self, pos: CellPos) {
        if !self.pointer_held || self.running || self.tool != Tool::Wall {
            return;
        }
        self.grid.toggle_wall(pos);
    }

    pub fn release_pointer(&mut self) {
        self.pointer_held = false;
    }

    /// Plan a search and queue its animation. Returns false if one is already running.
    pub fn run_search(&mut self) -> bool {
        if self.running {
            debug!("search already running, ignoring request");
            return false;
        }
        self.clear_previous_run();

        let plan = search::plan(&mut self.grid);
        info!(
            settled = plan.settled_count(),
            path_length = ?plan.path_length(),
            "search planned from ({}, {}) to ({}, {})",
            self.grid.start().row,
            self.grid.start().col,
            self.grid.end().row,
            self.grid.end().col,
        );

        self.pending = plan.events.into();
        self.outcome = Some(plan.outcome);
        self.running = true;
        self.pointer_held = false;
        if self.pending.is_empty() {
            self.running = false;
        }
        true
    }

    /// Play the next animation frame onto the grid
    pub fn advance(&mut self) -> Option<SearchEvent> {
        if !self.running {
            return None;
        }
        let event = self.pending.pop_front();
        if let Some(event) = event {
            self.apply(event);
        }
        if self.pending.is_empty() {
            self.complete();
        }
        event
    }

    /// Play every remaining frame at once
    pub fn finish(&mut self) {
        while self.advance().is_some() {}
    }

    fn apply(&mut self, event: SearchEvent) {
        let idx = self.grid.index(event.pos());
        let cell = self.grid.cell_at_mut(idx);
        match event {
            SearchEvent::Settled { .. } => {
                if cell.role == CellRole::Empty {
                    cell.role = CellRole::Visited;
                    self.visited_count += 1;
                }
            }
            SearchEvent::PathRevealed { step, .. } => {
                if !cell.role.is_endpoint() && cell.role != CellRole::Wall {
                    cell.role = CellRole::Path;
                }
                self.path_length = step;
            }
        }
    }

    fn complete(&mut self) {
        self.running = false;
        if let Some(SearchOutcome::Found { length }) = self.outcome {
            self.path_length = length;
        }
        info!(
            visited = self.visited_count,
            path_length = self.path_length,
            "search animation complete"
        );
    }

    /// Drop markings, scratch fields and counters from an earlier run
    fn clear_previous_run(&mut self) {
        self.grid.clear_search_marks();
        self.grid.clear_scratch();
        self.outcome = None;
        self.visited_count = 0;
        self.path_length = 0;
    }

    fn abandon_run(&mut self) {
        if self.running {
            debug!(remaining = self.pending.len(), "search animation abandoned");
        }
        self.pending.clear();
        self.running = false;
        self.outcome = None;
        self.visited_count = 0;
        self.path_length = 0;
    }

    /// Replace all walls with a random scatter. Ignored while running.
    pub fn scatter_walls<R: Rng>(&mut self, rng: &mut R, density: f64) -> usize {
        if self.running {
            return 0;
        }
        self.clear_previous_run();
        let placed = self.grid.scatter_walls(rng, density);
        debug!(placed, density, "scattered walls");
        placed
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_pointer_held(&self) -> bool {
        self.pointer_held
    }

    pub fn visited_count(&self) -> usize {
        self.visited_count
    }

    pub fn path_length(&self) -> usize {
        self.path_length
    }

    /// Outcome of the last run, known as soon as it is planned
    pub fn outcome(&self) -> Option<SearchOutcome> {
        self.outcome
    }

    /// Frames left to play
    pub fn pending_frames(&self) -> usize {
        self.pending.len()
    }

    /// Next frame without playing it
    pub fn peek(&self) -> Option<&SearchEvent> {
        self.pending.front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> GridSearchEngine {
        GridSearchEngine::new(&GridSettings::default())
    }

    fn assert_grid_invariant(engine: &GridSearchEngine) {
        let grid = engine.grid();
        assert_eq!(grid.count(CellRole::Start), 1);
        assert_eq!(grid.count(CellRole::End), 1);
        assert_eq!(grid.role(grid.start()), Some(CellRole::Start));
        assert_eq!(grid.role(grid.end()), Some(CellRole::End));
    }

    #[test]
    fn test_run_search_animates_then_stops() {
        let mut e = engine();
        assert!(e.run_search());
        assert!(e.is_running());
        assert!(!e.run_search());

        let first = e.advance();
        assert_eq!(
            first,
            Some(SearchEvent::Settled {
                pos: CellPos::new(7, 4),
                distance: 0
            })
        );
        // Start keeps its role and is not counted
        assert_eq!(e.visited_count(), 0);

        e.finish();
        assert!(!e.is_running());
        assert_eq!(e.path_length(), 16);
        assert_eq!(e.grid().count(CellRole::Path), 15);
        assert_eq!(e.visited_count(), e.grid().count(CellRole::Visited) + 15);
        assert_grid_invariant(&e);
    }

    #[test]
    fn test_counters_track_animation() {
        let mut e = engine();
        e.run_search();
        let mut last_visited = 0;
        while let Some(event) = e.advance() {
            assert!(e.visited_count() >= last_visited);
            last_visited = e.visited_count();
            if let SearchEvent::PathRevealed { step, pos } = event {
                assert_eq!(e.path_length(), step);
                assert_eq!(e.grid().role(pos), Some(CellRole::Path));
            }
        }
        assert_eq!(e.pending_frames(), 0);
    }

    #[test]
    fn test_walled_end_leaves_no_path() {
        let mut e = engine();
        for pos in [
            CellPos::new(6, 20),
            CellPos::new(8, 20),
            CellPos::new(7, 19),
            CellPos::new(7, 21),
        ] {
            e.apply_pointer_down(pos);
            e.release_pointer();
        }
        e.run_search();
        e.finish();

        assert_eq!(e.outcome(), Some(SearchOutcome::Exhausted));
        assert_eq!(e.grid().count(CellRole::Path), 0);
        assert_eq!(e.path_length(), 0);
        // All reachable cells apart from start are visited
        assert_eq!(e.grid().count(CellRole::Visited), 15 * 25 - 4 - 2);
        assert_eq!(e.grid().count(CellRole::Wall), 4);
    }

    #[test]
    fn test_walls_are_never_marked() {
        let mut e = engine();
        let mut rng = StdRng::seed_from_u64(42);
        e.scatter_walls(&mut rng, 0.3);
        let walls: Vec<_> = (0..e.grid().len())
            .filter(|&i| e.grid().cell_at(i).role == CellRole::Wall)
            .collect();

        e.run_search();
        e.finish();

        for i in walls {
            assert_eq!(e.grid().cell_at(i).role, CellRole::Wall);
        }
        assert_grid_invariant(&e);
    }

    #[test]
    fn test_rerun_clears_previous_markings() {
        let mut e = engine();
        e.run_search();
        e.finish();
        let first_visited = e.visited_count();

        e.run_search();
        assert_eq!(e.grid().count(CellRole::Path), 0);
        assert_eq!(e.grid().count(CellRole::Visited), 0);
        assert_eq!(e.visited_count(), 0);
        e.finish();
        assert_eq!(e.visited_count(), first_visited);
    }

    #[test]
    fn test_reset_mid_animation() {
        let mut e = engine();
        e.apply_pointer_down(CellPos::new(0, 0));
        e.release_pointer();
        e.run_search();
        for _ in 0..20 {
            e.advance();
        }
        e.reset_grid();

        assert!(!e.is_running());
        assert_eq!(e.advance(), None);
        assert_eq!(e.visited_count(), 0);
        assert_eq!(e.grid().count(CellRole::Visited), 0);
        assert_eq!(e.grid().count(CellRole::Wall), 0);
        assert!(e.grid().cells().iter().all(|c| c.distance.is_none()));
        assert_grid_invariant(&e);
    }

    #[test]
    fn test_reset_twice_matches_once() {
        let mut e = engine();
        e.apply_pointer_down(CellPos::new(3, 3));
        e.run_search();
        e.finish();

        e.reset_grid();
        let once = e.grid().clone();
        e.reset_grid();
        assert_eq!(e.grid(), &once);
    }

    #[test]
    fn test_drag_paints_only_while_held() {
        let mut e = engine();
        e.apply_pointer_enter(CellPos::new(1, 1));
        assert_eq!(e.grid().role(CellPos::new(1, 1)), Some(CellRole::Empty));

        e.apply_pointer_down(CellPos::new(1, 0));
        e.apply_pointer_enter(CellPos::new(1, 1));
        e.apply_pointer_enter(CellPos::new(1, 2));
        e.release_pointer();
        e.apply_pointer_enter(CellPos::new(1, 3));

        assert_eq!(e.grid().count(CellRole::Wall), 3);
        assert_eq!(e.grid().role(CellPos::new(1, 3)), Some(CellRole::Empty));
    }

    #[test]
    fn test_drag_over_endpoint_is_ignored() {
        let mut e = engine();
        e.apply_pointer_down(CellPos::new(7, 3));
        e.apply_pointer_enter(CellPos::new(7, 4));
        e.release_pointer();
        assert_grid_invariant(&e);
        assert_eq!(e.grid().count(CellRole::Wall), 1);
    }

    #[test]
    fn test_press_on_endpoint_does_not_paint() {
        let mut e = engine();
        e.apply_pointer_down(CellPos::new(7, 4));
        assert!(!e.is_pointer_held());
        e.apply_pointer_enter(CellPos::new(7, 5));
        e.apply_pointer_enter(CellPos::new(7, 6));
        e.release_pointer();
        assert_grid_invariant(&e);
        assert_eq!(e.grid().count(CellRole::Wall), 0);
    }

    #[test]
    fn test_pointer_ignored_while_running() {
        let mut e = engine();
        e.run_search();
        e.apply_pointer_down(CellPos::new(0, 0));
        assert_eq!(e.grid().role(CellPos::new(0, 0)), Some(CellRole::Empty));
        assert!(!e.is_pointer_held());
    }

    #[test]
    fn test_move_endpoints() {
        let mut e = engine();
        e.apply_pointer_down(CellPos::new(2, 2));
        e.release_pointer();

        e.set_tool(Tool::MoveStart);
        e.apply_pointer_down(CellPos::new(7, 20));
        assert_eq!(e.grid().start(), CellPos::new(7, 4));
        e.apply_pointer_down(CellPos::new(2, 2));
        assert_eq!(e.grid().start(), CellPos::new(7, 4));
        e.apply_pointer_down(CellPos::new(0, 0));
        assert_eq!(e.grid().start(), CellPos::new(0, 0));

        e.set_tool(Tool::MoveEnd);
        e.apply_pointer_down(CellPos::new(0, 0));
        assert_eq!(e.grid().end(), CellPos::new(7, 20));
        e.apply_pointer_down(CellPos::new(14, 24));
        assert_eq!(e.grid().end(), CellPos::new(14, 24));
        assert_grid_invariant(&e);

        e.run_search();
        e.finish();
        assert_eq!(e.path_length(), 14 + 24);
    }

    #[test]
    fn test_moving_endpoint_clears_old_run() {
        let mut e = engine();
        e.run_search();
        e.finish();
        assert!(e.grid().count(CellRole::Path) > 0);

        e.set_tool(Tool::MoveEnd);
        e.apply_pointer_down(CellPos::new(0, 24));
        assert_eq!(e.grid().count(CellRole::Path), 0);
        assert_eq!(e.grid().count(CellRole::Visited), 0);
        assert_eq!(e.path_length(), 0);
        assert_eq!(e.outcome(), None);
    }

    #[test]
    fn test_set_tool_does_not_touch_grid() {
        let mut e = engine();
        let before = e.grid().clone();
        e.set_tool(Tool::MoveEnd);
        assert_eq!(e.tool(), Tool::MoveEnd);
        assert_eq!(e.grid(), &before);
    }
}
