//! Mesh topology consumed by the solver
//!
//! The solver only reads the mesh through [`MeshTopology`]: node counts,
//! per-node geometry, the edge list with face normals, and the boundary
//! markers. [`DualMesh`] is an in-memory implementation with structured
//! generators for tests and small cases.
//!
//! Point indexing convention: domain points come first (`0..n_points_domain`),
//! halo points owned by other partitions follow.

mod generators;
mod linelet;
mod types;

pub use generators::{rectangular_grid, strip};
pub use linelet::build_linelets;
pub use types::{BoundaryKind, BoundaryMarker, DualMesh, Edge, Vertex};

/// Read-only view of a partitioned dual mesh
pub trait MeshTopology {
    /// Spatial dimension (2 or 3)
    fn n_dim(&self) -> usize;

    /// Number of points, halo included
    fn n_points(&self) -> usize;

    /// Number of points owned by this partition
    fn n_points_domain(&self) -> usize;

    /// Edges of the dual mesh
    fn edges(&self) -> &[Edge];

    /// Control volume of a point
    fn volume(&self, point: usize) -> f64;

    /// Distance from a point to the nearest wall
    fn wall_distance(&self, point: usize) -> f64;

    /// Global index of a point across all partitions
    fn global_index(&self, point: usize) -> usize;

    /// Coordinates of a point
    fn coord(&self, point: usize) -> &[f64];

    /// Boundary markers
    fn markers(&self) -> &[BoundaryMarker];

    /// Whether a point is owned by this partition
    fn is_domain(&self, point: usize) -> bool {
        point < self.n_points_domain()
    }

    /// Look up a marker by tag
    fn marker(&self, tag: &str) -> Option<&BoundaryMarker> {
        self.markers().iter().find(|m| m.tag == tag)
    }
}
