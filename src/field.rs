//! Rectangular grid holding at most one occupant per cell.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::census::Census;
use crate::entity::Organism;
use crate::species::Species;
use crate::world::{EntityId, Registry};

pub const DEFAULT_DEPTH: usize = 80;
pub const DEFAULT_WIDTH: usize = 120;

/// Cell coordinate, row first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    pub row: usize,
    pub col: usize,
}

impl Location {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One snapshot of the grid. Occupants are referenced by id; their state
/// lives in the [`Registry`].
#[derive(Debug, Clone)]
pub struct Field {
    depth: usize,
    width: usize,
    cells: HashMap<Location, EntityId>,
    members: BTreeSet<EntityId>,
}

impl Field {
    /// Zero-sized dimensions fall back to [`DEFAULT_DEPTH`] x [`DEFAULT_WIDTH`].
    pub fn new(depth: usize, width: usize) -> Self {
        let (depth, width) = if depth == 0 || width == 0 {
            warn!(
                depth,
                width,
                fallback_depth = DEFAULT_DEPTH,
                fallback_width = DEFAULT_WIDTH,
                "Field dimensions must be positive; using defaults"
            );
            (DEFAULT_DEPTH, DEFAULT_WIDTH)
        } else {
            (depth, width)
        };
        Self {
            depth,
            width,
            cells: HashMap::new(),
            members: BTreeSet::new(),
        }
    }

    /// An empty field with the same dimensions.
    pub fn empty_like(&self) -> Self {
        Self::new(self.depth, self.width)
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn contains_location(&self, location: Location) -> bool {
        location.row < self.depth && location.col < self.width
    }

    /// Puts `id` at `location`. Whatever was there before stops being a
    /// member of this field. Out-of-bounds placements are ignored.
    pub fn place(&mut self, id: EntityId, location: Location) -> bool {
        if !self.contains_location(location) {
            warn!(%location, id = id.raw(), "Ignoring placement outside the field");
            return false;
        }
        if let Some(previous) = self.cells.insert(location, id) {
            if previous != id {
                self.members.remove(&previous);
            }
        }
        self.members.insert(id);
        true
    }

    pub fn id_at(&self, location: Location) -> Option<EntityId> {
        self.cells.get(&location).copied()
    }

    pub fn occupant_at<'r>(&self, location: Location, registry: &'r Registry) -> Option<&'r Organism> {
        self.id_at(location).and_then(|id| registry.get(id))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    /// Members in a stable order.
    pub fn members(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.members.clear();
    }

    /// In-bounds 8-neighborhood of `location`, shuffled.
    pub fn adjacent(&self, location: Location, rng: &mut dyn RngCore) -> Vec<Location> {
        let mut locations = Vec::with_capacity(8);
        for row in location.row.saturating_sub(1)..=(location.row + 1).min(self.depth - 1) {
            for col in location.col.saturating_sub(1)..=(location.col + 1).min(self.width - 1) {
                if row != location.row || col != location.col {
                    locations.push(Location::new(row, col));
                }
            }
        }
        locations.shuffle(rng);
        locations
    }

    /// Shuffled neighbors that are empty or hold a dead occupant.
    pub fn free_adjacent(
        &self,
        location: Location,
        registry: &Registry,
        rng: &mut dyn RngCore,
    ) -> Vec<Location> {
        let mut free = self.adjacent(location, rng);
        free.retain(|candidate| {
            self.occupant_at(*candidate, registry)
                .map_or(true, |occupant| !occupant.is_alive())
        });
        free
    }

    /// Living members matching `predicate`, by species and sex. Members
    /// missing from the registry (an entity mid-action) are skipped.
    pub fn count<F>(&self, registry: &Registry, predicate: F) -> Census
    where
        F: Fn(&Organism) -> bool,
    {
        let mut census = Census::default();
        for organism in self.members.iter().filter_map(|id| registry.get(*id)) {
            if predicate(organism) {
                census.record(organism);
            }
        }
        census
    }

    pub fn census(&self, registry: &Registry) -> Census {
        self.count(registry, |_| true)
    }

    /// True while every species in `tracked` has a living member.
    pub fn is_viable(&self, registry: &Registry, tracked: &[Species]) -> bool {
        let mut missing: BTreeSet<Species> = tracked.iter().copied().collect();
        for organism in self.members.iter().filter_map(|id| registry.get(*id)) {
            if missing.is_empty() {
                break;
            }
            if let (true, Some(animal)) = (organism.is_alive(), organism.as_animal()) {
                missing.remove(&animal.species());
            }
        }
        missing.is_empty()
    }
}
