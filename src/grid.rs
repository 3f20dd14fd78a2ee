use rand::Rng;
use serde::{Deserialize, Serialize};

/// Row/column address of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance to another cell
    pub fn manhattan(&self, other: CellPos) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }

    /// True if the two cells share an edge
    pub fn is_adjacent(&self, other: CellPos) -> bool {
        self.manhattan(other) == 1
    }
}

/// What a cell currently represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellRole {
    #[default]
    Empty,
    Wall,
    Start,
    End,
    Visited,
    Path,
}

impl CellRole {
    pub fn name(&self) -> &'static str {
        match self {
            CellRole::Empty => "Empty",
            CellRole::Wall => "Wall",
            CellRole::Start => "Start",
            CellRole::End => "End",
            CellRole::Visited => "Visited",
            CellRole::Path => "Path",
        }
    }

    /// Start or end marker
    pub fn is_endpoint(&self) -> bool {
        matches!(self, CellRole::Start | CellRole::End)
    }

    /// Markings left behind by a search run
    pub fn is_search_mark(&self) -> bool {
        matches!(self, CellRole::Visited | CellRole::Path)
    }
}

/// A single grid cell with its search scratch fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub role: CellRole,
    /// Tentative distance from start (None = infinite)
    pub distance: Option<u32>,
    /// Linear index of the predecessor on the best known route
    pub predecessor: Option<usize>,
}

impl Cell {
    fn with_role(role: CellRole) -> Self {
        Self {
            role,
            ..Default::default()
        }
    }
}

/// Four-connected neighbor offsets in relaxation order: up, down, left, right
const NEIGHBOR_OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Rectangular grid stored row-major; owns every cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
    start: CellPos,
    end: CellPos,
}

impl Grid {
    /// Build an empty grid with the given endpoints.
    ///
    /// Callers validate dimensions and endpoints through `GridSettings::validate`.
    pub fn new(rows: usize, cols: usize, start: CellPos, end: CellPos) -> Self {
        let mut grid = Self {
            rows,
            cols,
            cells: vec![Cell::default(); rows * cols],
            start,
            end,
        };
        grid.rebuild();
        grid
    }

    /// Wipe every cell back to empty, keeping the current endpoints
    pub fn rebuild(&mut self) {
        self.cells.fill(Cell::default());
        let start = self.index(self.start);
        let end = self.index(self.end);
        self.cells[start] = Cell::with_role(CellRole::Start);
        self.cells[end] = Cell::with_role(CellRole::End);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn start(&self) -> CellPos {
        self.start
    }

    pub fn end(&self) -> CellPos {
        self.end
    }

    pub fn contains(&self, pos: CellPos) -> bool {
        pos.row < self.rows && pos.col < self.cols
    }

    /// Linear (row-major) index of a position
    pub fn index(&self, pos: CellPos) -> usize {
        pos.row * self.cols + pos.col
    }

    /// Position of a linear index
    pub fn pos(&self, index: usize) -> CellPos {
        CellPos::new(index / self.cols, index % self.cols)
    }

    pub fn cell(&self, pos: CellPos) -> Option<&Cell> {
        if self.contains(pos) {
            self.cells.get(self.index(pos))
        } else {
            None
        }
    }

    pub fn cell_at(&self, index: usize) -> &Cell {
        &self.cells[index]
    }

    pub(crate) fn cell_at_mut(&mut self, index: usize) -> &mut Cell {
        &mut self.cells[index]
    }

    pub fn role(&self, pos: CellPos) -> Option<CellRole> {
        self.cell(pos).map(|c| c.role)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Count cells with the given role
    pub fn count(&self, role: CellRole) -> usize {
        self.cells.iter().filter(|c| c.role == role).count()
    }

    /// In-bounds four-connected neighbors of a linear index
    pub fn neighbors(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        let pos = self.pos(index);
        NEIGHBOR_OFFSETS.iter().filter_map(move |&(dr, dc)| {
            let row = pos.row.checked_add_signed(dr)?;
            let col = pos.col.checked_add_signed(dc)?;
            let next = CellPos::new(row, col);
            self.contains(next).then(|| self.index(next))
        })
    }

    /// Toggle wall/empty. Endpoints are never touched. Returns true if changed.
    pub fn toggle_wall(&mut self, pos: CellPos) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let idx = self.index(pos);
        let cell = &mut self.cells[idx];
        match cell.role {
            CellRole::Start | CellRole::End => false,
            CellRole::Wall => {
                cell.role = CellRole::Empty;
                true
            }
            CellRole::Empty | CellRole::Visited | CellRole::Path => {
                cell.role = CellRole::Wall;
                true
            }
        }
    }

    /// Move the start marker. Refuses walls, the end cell and out-of-bounds targets.
    pub fn move_start(&mut self, to: CellPos) -> bool {
        if !self.can_host_endpoint(to) || to == self.end {
            return false;
        }
        let old = self.index(self.start);
        self.cells[old].role = CellRole::Empty;
        let new = self.index(to);
        self.cells[new].role = CellRole::Start;
        self.start = to;
        true
    }

    /// Move the end marker. Refuses walls, the start cell and out-of-bounds targets.
    pub fn move_end(&mut self, to: CellPos) -> bool {
        if !self.can_host_endpoint(to) || to == self.start {
            return false;
        }
        let old = self.index(self.end);
        self.cells[old].role = CellRole::Empty;
        let new = self.index(to);
        self.cells[new].role = CellRole::End;
        self.end = to;
        true
    }

    fn can_host_endpoint(&self, pos: CellPos) -> bool {
        self.role(pos).is_some_and(|role| role != CellRole::Wall)
    }

    /// Turn visited/path markings back into empty cells
    pub fn clear_search_marks(&mut self) {
        for cell in &mut self.cells {
            if cell.role.is_search_mark() {
                cell.role = CellRole::Empty;
            }
        }
    }

    /// Reset tentative distances to infinite and drop predecessor links
    pub fn clear_scratch(&mut self) {
        for cell in &mut self.cells {
            cell.distance = None;
            cell.predecessor = None;
        }
    }

    /// Randomly wall off non-endpoint cells with probability `density`.
    /// Existing walls and search markings are cleared first.
    pub fn scatter_walls<R: Rng>(&mut self, rng: &mut R, density: f64) -> usize {
        let density = density.clamp(0.0, 1.0);
        let mut placed = 0;
        for cell in &mut self.cells {
            if cell.role.is_endpoint() {
                continue;
            }
            cell.role = if rng.gen_bool(density) {
                placed += 1;
                CellRole::Wall
            } else {
                CellRole::Empty
            };
        }
        self.clear_scratch();
        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn grid() -> Grid {
        Grid::new(15, 25, CellPos::new(7, 4), CellPos::new(7, 20))
    }

    #[test]
    fn test_new_grid_has_single_endpoints() {
        let g = grid();
        assert_eq!(g.len(), 15 * 25);
        assert_eq!(g.count(CellRole::Start), 1);
        assert_eq!(g.count(CellRole::End), 1);
        assert_eq!(g.role(CellPos::new(7, 4)), Some(CellRole::Start));
        assert_eq!(g.role(CellPos::new(7, 20)), Some(CellRole::End));
        assert!(g.cells().iter().all(|c| c.distance.is_none() && c.predecessor.is_none()));
    }

    #[test]
    fn test_index_roundtrip_is_row_major() {
        let g = grid();
        assert_eq!(g.index(CellPos::new(0, 0)), 0);
        assert_eq!(g.index(CellPos::new(1, 0)), 25);
        assert_eq!(g.pos(26), CellPos::new(1, 1));
    }

    #[test]
    fn test_neighbors_at_corner_and_center() {
        let g = grid();
        let corner: Vec<_> = g.neighbors(0).collect();
        assert_eq!(corner, vec![g.index(CellPos::new(1, 0)), 1]);

        let center = g.index(CellPos::new(5, 5));
        let around: Vec<_> = g.neighbors(center).map(|i| g.pos(i)).collect();
        assert_eq!(
            around,
            vec![
                CellPos::new(4, 5),
                CellPos::new(6, 5),
                CellPos::new(5, 4),
                CellPos::new(5, 6),
            ]
        );
    }

    #[test]
    fn test_toggle_wall_skips_endpoints() {
        let mut g = grid();
        assert!(!g.toggle_wall(CellPos::new(7, 4)));
        assert!(!g.toggle_wall(CellPos::new(7, 20)));
        assert!(g.toggle_wall(CellPos::new(0, 0)));
        assert_eq!(g.role(CellPos::new(0, 0)), Some(CellRole::Wall));
        assert!(g.toggle_wall(CellPos::new(0, 0)));
        assert_eq!(g.role(CellPos::new(0, 0)), Some(CellRole::Empty));
        assert!(!g.toggle_wall(CellPos::new(99, 0)));
    }

    #[test]
    fn test_move_endpoints_rejects_conflicts() {
        let mut g = grid();
        g.toggle_wall(CellPos::new(3, 3));

        assert!(!g.move_start(CellPos::new(7, 20)));
        assert!(!g.move_start(CellPos::new(3, 3)));
        assert!(!g.move_end(CellPos::new(7, 4)));
        assert!(!g.move_end(CellPos::new(15, 0)));

        assert!(g.move_start(CellPos::new(0, 0)));
        assert_eq!(g.start(), CellPos::new(0, 0));
        assert_eq!(g.role(CellPos::new(7, 4)), Some(CellRole::Empty));
        assert_eq!(g.count(CellRole::Start), 1);
    }

    #[test]
    fn test_scatter_walls_keeps_endpoints() {
        let mut g = grid();
        let mut rng = StdRng::seed_from_u64(7);
        let placed = g.scatter_walls(&mut rng, 1.0);
        assert_eq!(placed, 15 * 25 - 2);
        assert_eq!(g.count(CellRole::Start), 1);
        assert_eq!(g.count(CellRole::End), 1);

        let placed = g.scatter_walls(&mut rng, 0.0);
        assert_eq!(placed, 0);
        assert_eq!(g.count(CellRole::Wall), 0);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let mut g = grid();
        g.toggle_wall(CellPos::new(1, 1));
        g.rebuild();
        let once = g.clone();
        g.rebuild();
        assert_eq!(g, once);
        assert_eq!(g.count(CellRole::Wall), 0);
    }
}
