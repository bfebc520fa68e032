//! Mesh geometry produced by the RWX loader.
//!
//! A [`Mesh`] is an immutable bundle of vertex positions, uvs, smoothed
//! normals and triangle indices, partitioned into [`MaterialGroup`] ranges
//! that point into the mesh's own material list.

use std::sync::Arc;

use rwx_math::{Aabb, Vec2, Vec3};

use crate::material::MaterialResource;

/// A contiguous run of triangle indices drawn with one material slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaterialGroup {
    /// First index (into `Mesh::indices`) of the run
    pub start: usize,

    /// Number of indices in the run (three per triangle)
    pub count: usize,

    /// Slot in `Mesh::materials`
    pub material_index: usize,
}

impl MaterialGroup {
    /// Index range covered by the run.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.count
    }
}

/// Leaf geometry of one clump or prototype body.
#[derive(Clone, Debug)]
pub struct Mesh {
    pub positions: Vec<Vec3>,

    /// Smoothed per-vertex normals, filled by [`Mesh::compute_normals`]
    pub normals: Option<Vec<Vec3>>,

    /// One uv per vertex; `v` is already flipped to bottom-up
    pub uvs: Vec<Vec2>,

    /// Counter-clockwise triangles, three indices each
    pub indices: Vec<u32>,

    /// Material runs over `indices`, in index order
    pub groups: Vec<MaterialGroup>,

    /// Materials referenced by `groups`
    pub materials: Vec<Arc<MaterialResource>>,

    pub bounds: Aabb,
}

impl Mesh {
    /// Build a mesh without normals or materials.
    ///
    /// `uvs` is padded with zeros (or cut) to one entry per position.
    pub fn new(positions: Vec<Vec3>, mut uvs: Vec<Vec2>, indices: Vec<u32>) -> Self {
        uvs.resize(positions.len(), Vec2::ZERO);
        let bounds = Aabb::from_positions(&positions);

        Self {
            positions,
            normals: None,
            uvs,
            indices,
            groups: Vec::new(),
            materials: Vec::new(),
            bounds,
        }
    }

    /// Build a mesh whose vertices all sit at uv (0, 0).
    pub fn untextured(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self::new(positions, Vec::new(), indices)
    }

    /// Attach material runs and the material list they index.
    pub fn with_materials(
        mut self,
        groups: Vec<MaterialGroup>,
        materials: Vec<Arc<MaterialResource>>,
    ) -> Self {
        self.groups = groups;
        self.materials = materials;
        self
    }

    /// Smooth normals: every vertex takes the area weighted sum of the
    /// faces touching it. Faces referencing a missing vertex contribute
    /// nothing.
    pub fn compute_normals(&mut self) {
        let mut sums = vec![Vec3::ZERO; self.positions.len()];

        for triangle in self.indices.chunks_exact(3) {
            let corners = [
                self.positions.get(triangle[0] as usize),
                self.positions.get(triangle[1] as usize),
                self.positions.get(triangle[2] as usize),
            ];
            let [Some(a), Some(b), Some(c)] = corners else {
                continue;
            };

            let weighted = (*b - *a).cross(*c - *a);
            for &index in triangle {
                sums[index as usize] += weighted;
            }
        }

        self.normals = Some(sums.into_iter().map(Vec3::normalize_or_zero).collect());
    }

    pub fn has_normals(&self) -> bool {
        self.normals.is_some()
    }

    /// Material used by the group at `group_index`.
    pub fn group_material(&self, group_index: usize) -> Option<&Arc<MaterialResource>> {
        let group = self.groups.get(group_index)?;
        self.materials.get(group.material_index)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Corner positions of every triangle, for collision or picking.
    ///
    /// Triangles naming a missing vertex are left out.
    pub fn extract_triangle_vertices(&self) -> Vec<[Vec3; 3]> {
        self.indices
            .chunks_exact(3)
            .filter_map(|t| {
                Some([
                    *self.positions.get(t[0] as usize)?,
                    *self.positions.get(t[1] as usize)?,
                    *self.positions.get(t[2] as usize)?,
                ])
            })
            .collect()
    }
}

/// Line primitives with a flat colour, used for wireframe quads.
#[derive(Clone, Debug, PartialEq)]
pub struct LineSegments {
    /// Segment endpoints, two per segment
    pub positions: Vec<Vec3>,

    /// Flat RGB colour (0-1)
    pub color: Vec3,
}

impl LineSegments {
    pub fn segment_count(&self) -> usize {
        self.positions.len() / 2
    }
}
