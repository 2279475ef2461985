use crate::agent::AgentId;
use crate::hex::Axial;
use rand::Rng;

/// One hex of the world.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldCell {
    pub food: bool,
    /// Back reference to the agent standing here. The grid never owns agents.
    pub occupant: Option<AgentId>,
}

/// Fixed-size hex grid spanning axial `[0, width) x [0, height)`.
#[derive(Debug, Clone)]
pub struct World {
    pub width: i32,
    pub height: i32,
    cells: Vec<WorldCell>,
}

impl World {
    /// Create an empty world with the given dimensions
    pub fn new(width: i32, height: i32) -> Self {
        let size = (width.max(0) as usize) * (height.max(0) as usize);
        World {
            width,
            height,
            cells: vec![WorldCell::default(); size],
        }
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }

    fn index(&self, pos: Axial) -> Option<usize> {
        if pos.q < 0 || pos.q >= self.width || pos.r < 0 || pos.r >= self.height {
            return None;
        }
        Some((pos.q + pos.r * self.width) as usize)
    }

    fn position_of(&self, index: usize) -> Axial {
        let index = index as i32;
        Axial::new(index % self.width, index / self.width)
    }

    /// Check if position is inside the grid
    pub fn contains(&self, pos: Axial) -> bool {
        self.index(pos).is_some()
    }

    /// Get cell at position (returns None if out of bounds)
    pub fn cell(&self, pos: Axial) -> Option<&WorldCell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    fn cell_mut(&mut self, pos: Axial) -> Option<&mut WorldCell> {
        let index = self.index(pos)?;
        Some(&mut self.cells[index])
    }

    /// Iterate over every cell with its coordinate, row by row.
    pub fn cells(&self) -> impl Iterator<Item = (Axial, &WorldCell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(|(i, cell)| (self.position_of(i), cell))
    }

    pub fn has_food(&self, pos: Axial) -> bool {
        self.cell(pos).is_some_and(|c| c.food)
    }

    pub fn occupant(&self, pos: Axial) -> Option<AgentId> {
        self.cell(pos).and_then(|c| c.occupant)
    }

    /// In bounds and unoccupied.
    pub fn is_free(&self, pos: Axial) -> bool {
        self.cell(pos).is_some_and(|c| c.occupant.is_none())
    }

    /// Put food on a cell. Returns false when out of bounds.
    pub fn place_food(&mut self, pos: Axial) -> bool {
        match self.cell_mut(pos) {
            Some(cell) => {
                cell.food = true;
                true
            }
            None => false,
        }
    }

    /// Remove food from a cell, returning whether there was any.
    pub fn take_food(&mut self, pos: Axial) -> bool {
        match self.cell_mut(pos) {
            Some(cell) if cell.food => {
                cell.food = false;
                true
            }
            _ => false,
        }
    }

    /// With probability `probability`, put food on one uniformly chosen cell.
    pub fn spawn_food<R: Rng + ?Sized>(&mut self, rng: &mut R, probability: f32) -> Option<Axial> {
        if self.cells.is_empty() || rng.gen::<f32>() >= probability {
            return None;
        }
        let index = rng.gen_range(0..self.cells.len());
        self.cells[index].food = true;
        Some(self.position_of(index))
    }

    /// Remove all food from the world
    pub fn clear_food(&mut self) {
        for cell in &mut self.cells {
            cell.food = false;
        }
    }

    pub fn food_count(&self) -> usize {
        self.cells.iter().filter(|c| c.food).count()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.occupant.is_some()).count()
    }

    /// Mark `pos` as occupied by `id`.
    ///
    /// Panics if the cell is out of bounds or already taken: two agents on
    /// one cell means the caller skipped its free check.
    pub fn occupy(&mut self, pos: Axial, id: AgentId) {
        let cell = self
            .cell_mut(pos)
            .unwrap_or_else(|| panic!("occupy out of bounds at {pos:?}"));
        assert!(
            cell.occupant.is_none(),
            "cell {pos:?} already occupied by {:?}",
            cell.occupant
        );
        cell.occupant = Some(id);
    }

    /// Clear the back reference at `pos` if it names `id`.
    pub fn vacate(&mut self, pos: Axial, id: AgentId) {
        if let Some(cell) = self.cell_mut(pos) {
            debug_assert_eq!(cell.occupant, Some(id), "vacating a cell owned by someone else");
            if cell.occupant == Some(id) {
                cell.occupant = None;
            }
        }
    }

    /// Move `id` from `from` to `to` if the destination is free.
    pub fn relocate(&mut self, from: Axial, to: Axial, id: AgentId) -> bool {
        if !self.is_free(to) {
            return false;
        }
        self.vacate(from, id);
        self.occupy(to, id);
        true
    }

    /// Pick a random unoccupied cell.
    ///
    /// Rejection-samples first and falls back to a scan from a random start,
    /// so a crowded grid still finds the last free cells. `None` when full.
    pub fn random_free_cell<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Axial> {
        if self.cells.is_empty() {
            return None;
        }
        for _ in 0..64 {
            let index = rng.gen_range(0..self.cells.len());
            if self.cells[index].occupant.is_none() {
                return Some(self.position_of(index));
            }
        }
        let start = rng.gen_range(0..self.cells.len());
        (0..self.cells.len())
            .map(|offset| (start + offset) % self.cells.len())
            .find(|&i| self.cells[i].occupant.is_none())
            .map(|i| self.position_of(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn id(index: usize) -> AgentId {
        AgentId::new(index, 0)
    }

    #[test]
    fn test_world_creation() {
        let world = World::new(100, 80);
        assert_eq!(world.width, 100);
        assert_eq!(world.height, 80);
        assert_eq!(world.size(), 8000);
        assert_eq!(world.food_count(), 0);
    }

    #[test]
    fn test_out_of_bounds_has_no_cell() {
        let world = World::new(10, 10);
        assert!(world.cell(Axial::new(-1, 0)).is_none());
        assert!(world.cell(Axial::new(0, 10)).is_none());
        assert!(world.cell(Axial::new(10, 0)).is_none());
        assert!(world.cell(Axial::new(9, 9)).is_some());
        assert!(!world.is_free(Axial::new(10, 10)));
    }

    #[test]
    fn test_cells_iterate_with_coordinates() {
        let mut world = World::new(4, 3);
        world.place_food(Axial::new(3, 2));
        let food: Vec<_> = world.cells().filter(|(_, c)| c.food).map(|(p, _)| p).collect();
        assert_eq!(food, vec![Axial::new(3, 2)]);
        assert_eq!(world.cells().count(), 12);
    }

    #[test]
    fn test_take_food() {
        let mut world = World::new(10, 10);
        let pos = Axial::new(5, 5);
        assert!(!world.take_food(pos));
        world.place_food(pos);
        assert!(world.take_food(pos));
        assert!(!world.has_food(pos));
    }

    #[test]
    fn test_spawn_food_probability_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut world = World::new(20, 20);
        for _ in 0..100 {
            assert!(world.spawn_food(&mut rng, 0.0).is_none());
        }
        for _ in 0..100 {
            let pos = world.spawn_food(&mut rng, 1.0).unwrap();
            assert!(world.has_food(pos));
        }
        assert!(world.food_count() > 0);

        world.clear_food();
        assert_eq!(world.food_count(), 0);
    }

    #[test]
    fn test_relocate_moves_occupancy() {
        let mut world = World::new(10, 10);
        let a = Axial::new(1, 1);
        let b = Axial::new(2, 1);
        world.occupy(a, id(0));
        world.occupy(Axial::new(3, 3), id(1));

        assert!(world.relocate(a, b, id(0)));
        assert_eq!(world.occupant(a), None);
        assert_eq!(world.occupant(b), Some(id(0)));
        assert_eq!(world.occupied_count(), 2);

        assert!(!world.relocate(b, Axial::new(3, 3), id(0)));
        assert!(!world.relocate(b, Axial::new(-1, 3), id(0)));
        assert_eq!(world.occupant(b), Some(id(0)));
    }

    #[test]
    #[should_panic(expected = "already occupied")]
    fn test_double_occupancy_panics() {
        let mut world = World::new(5, 5);
        world.occupy(Axial::new(1, 1), id(0));
        world.occupy(Axial::new(1, 1), id(1));
    }

    #[test]
    fn test_random_free_cell_finds_last_hole() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut world = World::new(3, 3);
        for (i, pos) in world.cells().map(|(p, _)| p).collect::<Vec<_>>().into_iter().enumerate() {
            if pos != Axial::new(2, 1) {
                world.occupy(pos, id(i));
            }
        }
        assert_eq!(world.random_free_cell(&mut rng), Some(Axial::new(2, 1)));

        world.occupy(Axial::new(2, 1), id(99));
        assert_eq!(world.random_free_cell(&mut rng), None);
    }
}
