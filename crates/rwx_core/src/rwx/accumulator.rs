//! Per-leaf vertex and face buffers.
//!
//! Faces are grouped into batches of consecutive triangles that share a
//! material slot. A batch closes whenever the slot changes, so alternating
//! materials produce alternating batches even when a slot repeats.

use std::sync::Arc;

use rwx_math::{Mat4, Vec2, Vec3};

use super::triangulate::triangulate_loop;
use crate::material::MaterialResource;
use crate::mesh::{LineSegments, MaterialGroup, Mesh};

#[derive(Debug, Default)]
pub struct GeometryAccumulator {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    groups: Vec<MaterialGroup>,

    /// First index of the open batch
    batch_start: usize,

    /// Triangles in the open batch
    open_count: usize,

    last_slot: Option<usize>,
}

impl GeometryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a vertex moved by `transform`. Texture coordinates are flipped
    /// vertically; a vertex without them gets (0, 0).
    pub fn add_vertex(&mut self, position: Vec3, uv: Option<Vec2>, transform: &Mat4) {
        self.positions.push(transform.transform_point3(position));
        self.uvs
            .push(uv.map_or(Vec2::ZERO, |uv| Vec2::new(uv.x, 1.0 - uv.y)));
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Batches closed so far; the open batch is not included.
    pub fn groups(&self) -> &[MaterialGroup] {
        &self.groups
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// True if every index refers to a stored vertex. Logs the first bad one.
    pub fn check_face(&self, face: &[u32]) -> bool {
        match face.iter().find(|&&i| i as usize >= self.positions.len()) {
            Some(bad) => {
                log::warn!(
                    "Face index {} out of range, vertex count: {}",
                    bad + 1,
                    self.positions.len()
                );
                false
            }
            None => true,
        }
    }

    /// Switch to `slot`, closing the open batch if the slot changed.
    fn track_slot(&mut self, slot: usize) {
        if self.last_slot != Some(slot) {
            self.flush_batch();
            self.last_slot = Some(slot);
        }
    }

    fn flush_batch(&mut self) {
        if self.open_count == 0 {
            return;
        }

        if let Some(slot) = self.last_slot {
            self.groups.push(MaterialGroup {
                start: self.batch_start,
                count: self.open_count * 3,
                material_index: slot,
            });
        }

        self.batch_start += self.open_count * 3;
        self.open_count = 0;
    }

    fn push_triangle(&mut self, a: u32, b: u32, c: u32) {
        self.indices.extend_from_slice(&[a, b, c]);
        self.open_count += 1;
    }

    pub fn add_triangle(&mut self, [a, b, c]: [u32; 3], slot: usize) {
        self.track_slot(slot);
        self.push_triangle(a, b, c);
    }

    /// Two triangles sharing the a-c diagonal.
    pub fn add_quad(&mut self, [a, b, c, d]: [u32; 4], slot: usize) {
        self.track_slot(slot);
        self.push_triangle(a, b, c);
        self.push_triangle(a, c, d);
    }

    /// The four boundary edges of a quad, for wireframe sampling.
    pub fn quad_outline(&self, [a, b, c, d]: [u32; 4], color: Vec3) -> LineSegments {
        let p = |i: u32| self.positions[i as usize];
        LineSegments {
            positions: vec![p(a), p(b), p(b), p(c), p(c), p(d), p(d), p(a)],
            color,
        }
    }

    /// Triangulate a polygon loop. Returns the number of triangles added.
    ///
    /// `slot` is only called when the loop yields at least one triangle.
    pub fn add_polygon<S>(&mut self, indices: &[u32], slot: S) -> usize
    where
        S: FnOnce() -> usize,
    {
        let triangulation = triangulate_loop(&self.positions, &self.uvs, indices);
        if triangulation.is_empty() {
            return 0;
        }

        self.track_slot(slot());
        self.positions.extend(triangulation.positions);
        self.uvs.extend(triangulation.uvs);
        for face in triangulation.indices.chunks_exact(3) {
            self.push_triangle(face[0], face[1], face[2]);
        }

        triangulation.indices.len() / 3
    }

    /// Package the buffers into a mesh and start over.
    ///
    /// Returns `None` if no face was added since the last reset.
    pub fn finish(&mut self, materials: &[Arc<MaterialResource>]) -> Option<Mesh> {
        self.flush_batch();

        if self.indices.is_empty() {
            self.reset();
            return None;
        }

        let current = std::mem::take(self);
        let mut mesh = Mesh::new(current.positions, current.uvs, current.indices)
            .with_materials(current.groups, materials.to_vec());
        mesh.compute_normals();

        Some(mesh)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
