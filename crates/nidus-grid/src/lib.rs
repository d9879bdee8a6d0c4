//! Cell-list spatial partition of the simulation box.
//!
//! The box is divided once, at construction, into a grid of sub-cells
//! whose edge is at least the largest reaction cutoff `r_max`. Any
//! reactive pair therefore lies in the same or an adjacent cell, and
//! scanning a cell's members plus its *forward* neighbors' members finds
//! every potential partner exactly once.
//!
//! The domain is centered on the origin with hard-reflecting walls; there
//! is no periodic wrap, so boundary cells simply have fewer neighbors.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

use glam::DVec3;
use nidus_core::{GridError, MolId};
use nidus_model::{ComplexArena, MolArena};

// Tolerance (relative to the box extent) for positions that sit exactly
// on a wall after reflection.
const WALL_SLACK: f64 = 1e-9;

/// Uniform sub-cell grid over the reflecting simulation box.
#[derive(Clone, Debug)]
pub struct CellGrid {
    box_dims: DVec3,
    n: [usize; 3],
    cell_size: DVec3,
    // Half-stencil: adjacent cells with a greater linear index. Scanning
    // own cell (higher member index) plus these visits each unordered
    // pair from exactly one direction.
    forward: Vec<Vec<u32>>,
    members: Vec<Vec<MolId>>,
}

impl CellGrid {
    /// Build the grid for a box of the given full extents.
    ///
    /// Cell edges are `>= r_max` on every axis; each axis gets at least
    /// one cell. Neighbor lists are precomputed here and never change.
    pub fn new(box_dims: DVec3, r_max: f64) -> Result<Self, GridError> {
        if !(box_dims.x > 0.0 && box_dims.y > 0.0 && box_dims.z > 0.0)
            || !box_dims.is_finite()
        {
            return Err(GridError::BadDimensions {
                dims: box_dims.to_array(),
            });
        }
        if !(r_max > 0.0) || !r_max.is_finite() {
            return Err(GridError::BadCutoff { r_max });
        }

        let n = [
            ((box_dims.x / r_max).floor() as usize).max(1),
            ((box_dims.y / r_max).floor() as usize).max(1),
            ((box_dims.z / r_max).floor() as usize).max(1),
        ];
        let cell_size = DVec3::new(
            box_dims.x / n[0] as f64,
            box_dims.y / n[1] as f64,
            box_dims.z / n[2] as f64,
        );
        let total = n[0] * n[1] * n[2];

        let mut forward = vec![Vec::new(); total];
        for iz in 0..n[2] {
            for iy in 0..n[1] {
                for ix in 0..n[0] {
                    let here = Self::linear(n, ix, iy, iz);
                    for dz in -1i64..=1 {
                        for dy in -1i64..=1 {
                            for dx in -1i64..=1 {
                                if dz < 0
                                    || (dz == 0 && dy < 0)
                                    || (dz == 0 && dy == 0 && dx <= 0)
                                {
                                    continue; // backward half of the stencil
                                }
                                let (jx, jy, jz) =
                                    (ix as i64 + dx, iy as i64 + dy, iz as i64 + dz);
                                if jx < 0
                                    || jy < 0
                                    || jz < 0
                                    || jx >= n[0] as i64
                                    || jy >= n[1] as i64
                                    || jz >= n[2] as i64
                                {
                                    continue; // reflecting wall, no wraparound
                                }
                                forward[here].push(Self::linear(
                                    n,
                                    jx as usize,
                                    jy as usize,
                                    jz as usize,
                                ) as u32);
                            }
                        }
                    }
                }
            }
        }

        Ok(Self {
            box_dims,
            n,
            cell_size,
            forward,
            members: vec![Vec::new(); total],
        })
    }

    fn linear(n: [usize; 3], ix: usize, iy: usize, iz: usize) -> usize {
        ix + n[0] * (iy + n[1] * iz)
    }

    /// Total number of sub-cells.
    pub fn cell_count(&self) -> usize {
        self.forward.len()
    }

    /// Grid resolution per axis.
    pub fn resolution(&self) -> [usize; 3] {
        self.n
    }

    /// The cell containing a position.
    ///
    /// Positions must lie inside the (reflected) domain; a tiny slack
    /// absorbs coordinates sitting exactly on a wall.
    pub fn cell_of(&self, pos: DVec3) -> Result<usize, GridError> {
        let half = self.box_dims * 0.5;
        let slack = self.box_dims.max_element() * WALL_SLACK;
        if pos.x.abs() > half.x + slack
            || pos.y.abs() > half.y + slack
            || pos.z.abs() > half.z + slack
        {
            return Err(GridError::OutOfDomain {
                mol: MolId(u32::MAX),
                pos: pos.to_array(),
            });
        }
        let idx = |p: f64, half: f64, size: f64, n: usize| -> usize {
            (((p + half) / size) as usize).min(n - 1)
        };
        let ix = idx(pos.x, half.x, self.cell_size.x, self.n[0]);
        let iy = idx(pos.y, half.y, self.cell_size.y, self.n[1]);
        let iz = idx(pos.z, half.z, self.cell_size.z, self.n[2]);
        Ok(Self::linear(self.n, ix, iy, iz))
    }

    /// Reassign every non-empty, non-implicit molecule to the cell
    /// containing its complex's reference point. O(N).
    ///
    /// Member lists are rebuilt in molecule-handle order, which is the
    /// scan order the candidate collector (and thus the acceptance
    /// tie-break) depends on.
    pub fn update(&mut self, mols: &MolArena, comps: &ComplexArena) -> Result<(), GridError> {
        for cell in &mut self.members {
            cell.clear();
        }
        for mol in mols.iter_live() {
            if mol.is_implicit_lipid {
                continue;
            }
            let cell = self
                .cell_of(comps[mol.complex].com)
                .map_err(|e| match e {
                    GridError::OutOfDomain { pos, .. } => GridError::OutOfDomain { mol: mol.id, pos },
                    other => other,
                })?;
            self.members[cell].push(mol.id);
        }
        Ok(())
    }

    /// Member molecules of a cell, in scan order.
    pub fn members(&self, cell: usize) -> &[MolId] {
        &self.members[cell]
    }

    /// Forward (greater-linear-index) neighbor cells.
    pub fn forward_neighbors(&self, cell: usize) -> &[u32] {
        &self.forward[cell]
    }
}
