// Bounded grid of cells; only cells inside a neighborhood rectangle exist

use crate::types::{AgentId, HoodId};

/// One grid location.
///
/// `resident` holds the most recent agent placed here; several agents can
/// share coordinates but only one is reachable as a victim per tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub hood: HoodId,
    pub resident: Option<AgentId>,
    /// Agent flagged as a potential victim this tick
    pub potential_victim: Option<AgentId>,
    pub confirmed_victim: bool,
}

impl Cell {
    pub fn new(hood: HoodId) -> Self {
        Self {
            hood,
            resident: None,
            potential_victim: None,
            confirmed_victim: false,
        }
    }

    pub fn is_open_target(&self) -> bool {
        self.potential_victim.is_some() && !self.confirmed_victim
    }
}

#[derive(Debug, Clone)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<Option<Cell>>,
}

impl Grid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y as usize * self.width as usize + x as usize)
    }

    /// Create a cell owned by `hood`. An existing cell keeps its first owner.
    /// Returns whether a cell was created.
    pub fn create_cell(&mut self, x: u32, y: u32, hood: HoodId) -> bool {
        let Some(i) = self.index(x, y) else {
            return false;
        };
        if self.cells[i].is_some() {
            return false;
        }
        self.cells[i] = Some(Cell::new(hood));
        true
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&Cell> {
        self.index(x, y).and_then(|i| self.cells[i].as_ref())
    }

    pub fn get_mut(&mut self, x: u32, y: u32) -> Option<&mut Cell> {
        self.index(x, y).and_then(|i| self.cells[i].as_mut())
    }

    pub fn num_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Clear victim flags on every cell.
    pub fn reset_flags(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.potential_victim = None;
            cell.confirmed_victim = false;
        }
    }

    /// Set `agent` as the resident of (x, y).
    pub fn place(&mut self, x: u32, y: u32, agent: AgentId) {
        if let Some(cell) = self.get_mut(x, y) {
            cell.resident = Some(agent);
        }
    }

    /// Clear the resident of (x, y) if it is still `agent`.
    pub fn vacate(&mut self, x: u32, y: u32, agent: AgentId) {
        if let Some(cell) = self.get_mut(x, y) {
            if cell.resident == Some(agent) {
                cell.resident = None;
            }
        }
    }

    /// Coordinates of the Moore neighborhood of radius `r` around (x, y),
    /// clipped to the grid, origin excluded. Rows are scanned top to bottom,
    /// columns left to right.
    pub fn moore(&self, x: u32, y: u32, r: u32) -> impl Iterator<Item = (u32, u32)> + use<> {
        let x_lo = x.saturating_sub(r);
        let y_lo = y.saturating_sub(r);
        let x_hi = x.saturating_add(r).min(self.width.saturating_sub(1));
        let y_hi = y.saturating_add(r).min(self.height.saturating_sub(1));
        (y_lo..=y_hi)
            .flat_map(move |ny| (x_lo..=x_hi).map(move |nx| (nx, ny)))
            .filter(move |&(nx, ny)| (nx, ny) != (x, y))
    }
}
