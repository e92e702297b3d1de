//! Per-voxel transition rules.
//!
//! A rule computes the next state of one voxel from the current grid. It may
//! read any voxel of the current grid but writes only its own coordinate in the
//! next grid, so every voxel can be evaluated independently and in parallel.

use serde::{Deserialize, Serialize};

use crate::error::{MarchlifeError, Result};
use crate::grid::{Cell, CellGrid, GridExtent};

/// How neighbor lookups outside the grid are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Out-of-range coordinates are clamped to the nearest edge voxel.
    #[default]
    Clamp,
    /// Coordinates wrap around (toroidal grid).
    Wrap,
}

impl BoundaryPolicy {
    /// Policy code shared with the device step kernel.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Clamp => 0,
            Self::Wrap => 1,
        }
    }

    /// Resolves coordinate `base + offset` on an axis of length `len`.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn resolve(self, base: u32, offset: i32, len: u32) -> u32 {
        let p = i64::from(base) + i64::from(offset);
        let len = i64::from(len);
        match self {
            Self::Clamp => p.clamp(0, len - 1) as u32,
            Self::Wrap => p.rem_euclid(len) as u32,
        }
    }
}

/// Set of neighbors counted by a totalistic rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Neighborhood {
    /// The 26 voxels sharing a face, edge or corner.
    #[default]
    Moore,
    /// The 6 voxels sharing a face.
    VonNeumann,
}

impl Neighborhood {
    /// Neighborhood code shared with the device step kernel.
    #[must_use]
    pub fn code(self) -> u32 {
        match self {
            Self::Moore => 0,
            Self::VonNeumann => 1,
        }
    }

    /// Largest possible neighbor count.
    #[must_use]
    pub fn max_neighbors(self) -> u8 {
        match self {
            Self::Moore => 26,
            Self::VonNeumann => 6,
        }
    }
}

/// Read-only view of the current grid with a boundary policy applied.
#[derive(Debug, Clone, Copy)]
pub struct GridView<'a> {
    grid: &'a CellGrid,
    boundary: BoundaryPolicy,
}

impl<'a> GridView<'a> {
    /// Creates a view over `grid`.
    #[must_use]
    pub fn new(grid: &'a CellGrid, boundary: BoundaryPolicy) -> Self {
        Self { grid, boundary }
    }

    /// Grid dimensions.
    #[must_use]
    pub fn extent(&self) -> GridExtent {
        self.grid.extent()
    }

    /// Boundary policy used for neighbor lookups.
    #[must_use]
    pub fn boundary(&self) -> BoundaryPolicy {
        self.boundary
    }

    /// Cell at an in-range coordinate.
    #[inline]
    #[must_use]
    pub fn get(&self, x: u32, y: u32, z: u32) -> Cell {
        self.grid.get(x, y, z)
    }

    /// Cell at `(x, y, z) + (dx, dy, dz)` with the boundary policy applied.
    #[inline]
    #[must_use]
    pub fn neighbor(&self, x: u32, y: u32, z: u32, dx: i32, dy: i32, dz: i32) -> Cell {
        let e = self.grid.extent();
        self.grid.get(
            self.boundary.resolve(x, dx, e.width()),
            self.boundary.resolve(y, dy, e.height()),
            self.boundary.resolve(z, dz, e.depth()),
        )
    }
}

/// A transition function applied uniformly to every voxel.
pub trait TransitionRule: Send + Sync {
    /// Computes the next state of the voxel at `(x, y, z)`.
    fn apply(&self, view: &GridView<'_>, x: u32, y: u32, z: u32) -> Cell;
}

#[derive(Serialize, Deserialize)]
struct LifeRuleRepr {
    survive: Vec<u8>,
    birth: Vec<u8>,
    states: u32,
    #[serde(default)]
    neighborhood: Neighborhood,
}

impl TryFrom<LifeRuleRepr> for LifeRule {
    type Error = MarchlifeError;

    fn try_from(repr: LifeRuleRepr) -> Result<Self> {
        Self::new(&repr.survive, &repr.birth, repr.states, repr.neighborhood)
    }
}

impl From<LifeRule> for LifeRuleRepr {
    fn from(rule: LifeRule) -> Self {
        Self {
            survive: mask_to_counts(rule.survive),
            birth: mask_to_counts(rule.birth),
            states: rule.states,
            neighborhood: rule.neighborhood,
        }
    }
}

/// Outer-totalistic rule with decaying states.
///
/// An empty voxel is born when its live-neighbor count is in `birth`; a live
/// voxel stays alive when the count is in `survive` and otherwise starts to
/// decay through states `2..states` before becoming empty. Only live voxels
/// (state 1) count as neighbors. The `aux` channel holds the age of a live
/// voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LifeRuleRepr", into = "LifeRuleRepr")]
pub struct LifeRule {
    survive: u32,
    birth: u32,
    states: u32,
    neighborhood: Neighborhood,
}

impl LifeRule {
    /// Creates a rule from neighbor-count lists.
    pub fn new(
        survive: &[u8],
        birth: &[u8],
        states: u32,
        neighborhood: Neighborhood,
    ) -> Result<Self> {
        if states < 2 {
            return Err(MarchlifeError::InvalidConfig(format!(
                "rule needs at least 2 states, got {states}"
            )));
        }
        Ok(Self {
            survive: counts_to_mask(survive, neighborhood)?,
            birth: counts_to_mask(birth, neighborhood)?,
            states,
            neighborhood,
        })
    }

    /// Slow-growing blobby clouds: survive 13-26, birth 13,14,17,18,19.
    #[must_use]
    pub fn clouds() -> Self {
        Self {
            survive: range_mask(13, 26),
            birth: (1 << 13) | (1 << 14) | range_mask(17, 19),
            states: 2,
            neighborhood: Neighborhood::Moore,
        }
    }

    /// Amoeba-like growth with a short decay trail: survive 9-26, birth 5-7,12,13,15, 5 states.
    #[must_use]
    pub fn amoeba() -> Self {
        Self {
            survive: range_mask(9, 26),
            birth: range_mask(5, 7) | (1 << 12) | (1 << 13) | (1 << 15),
            states: 5,
            neighborhood: Neighborhood::Moore,
        }
    }

    /// Survival bitmask (bit `n` set = survive with `n` live neighbors).
    #[must_use]
    pub fn survive_mask(&self) -> u32 {
        self.survive
    }

    /// Birth bitmask (bit `n` set = born with `n` live neighbors).
    #[must_use]
    pub fn birth_mask(&self) -> u32 {
        self.birth
    }

    /// Number of states including empty and alive.
    #[must_use]
    pub fn states(&self) -> u32 {
        self.states
    }

    /// Counted neighborhood.
    #[must_use]
    pub fn neighborhood(&self) -> Neighborhood {
        self.neighborhood
    }

    /// Number of live neighbors of `(x, y, z)`.
    #[must_use]
    pub fn live_neighbors(&self, view: &GridView<'_>, x: u32, y: u32, z: u32) -> u32 {
        let mut count = 0;
        for dz in -1_i32..=1 {
            for dy in -1_i32..=1 {
                for dx in -1_i32..=1 {
                    let manhattan = dx.abs() + dy.abs() + dz.abs();
                    let counted = match self.neighborhood {
                        Neighborhood::Moore => manhattan > 0,
                        Neighborhood::VonNeumann => manhattan == 1,
                    };
                    if counted && view.neighbor(x, y, z, dx, dy, dz).is_alive() {
                        count += 1;
                    }
                }
            }
        }
        count
    }
}

impl Default for LifeRule {
    fn default() -> Self {
        Self::clouds()
    }
}

impl TransitionRule for LifeRule {
    fn apply(&self, view: &GridView<'_>, x: u32, y: u32, z: u32) -> Cell {
        let cell = view.get(x, y, z);
        match cell.state {
            Cell::EMPTY_STATE => {
                let n = self.live_neighbors(view, x, y, z);
                if self.birth & (1 << n) != 0 {
                    Cell::ALIVE
                } else {
                    Cell::EMPTY
                }
            }
            Cell::ALIVE_STATE => {
                let n = self.live_neighbors(view, x, y, z);
                if self.survive & (1 << n) != 0 {
                    Cell::new(Cell::ALIVE_STATE, cell.aux.saturating_add(1))
                } else if self.states > 2 {
                    Cell::new(2, cell.aux)
                } else {
                    Cell::EMPTY
                }
            }
            s if s.saturating_add(1) < self.states => Cell::new(s + 1, cell.aux),
            _ => Cell::EMPTY,
        }
    }
}

/// Applies `rule` to every voxel of `current`, writing into `next`.
///
/// Sequential reference for the parallel device kernels.
pub fn apply_rule<R: TransitionRule + ?Sized>(
    rule: &R,
    boundary: BoundaryPolicy,
    current: &CellGrid,
    next: &mut CellGrid,
) -> Result<()> {
    if current.extent() != next.extent() {
        return Err(MarchlifeError::SizeMismatch {
            expected: current.extent().voxel_count(),
            actual: next.extent().voxel_count(),
        });
    }
    let view = GridView::new(current, boundary);
    let extent = current.extent();
    for (i, out) in next.cells_mut().iter_mut().enumerate() {
        let c = extent.coords(i);
        *out = rule.apply(&view, c.x, c.y, c.z);
    }
    Ok(())
}

fn counts_to_mask(counts: &[u8], neighborhood: Neighborhood) -> Result<u32> {
    let max = neighborhood.max_neighbors();
    counts.iter().try_fold(0_u32, |mask, &n| {
        if n > max {
            Err(MarchlifeError::InvalidConfig(format!(
                "neighbor count {n} exceeds the {max} neighbors of a {neighborhood:?} neighborhood"
            )))
        } else {
            Ok(mask | (1 << n))
        }
    })
}

fn mask_to_counts(mask: u32) -> Vec<u8> {
    (0_u8..32).filter(|n| mask & (1 << n) != 0).collect()
}

fn range_mask(lo: u32, hi: u32) -> u32 {
    (lo..=hi).fold(0, |mask, n| mask | (1 << n))
}
