//! In-memory dual mesh

use super::MeshTopology;
use serde::{Deserialize, Serialize};

/// Dual-mesh edge between two points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// End points; the normal points from `nodes[0]` towards `nodes[1]`
    pub nodes: [usize; 2],
    /// Area-weighted normal of the shared dual face
    pub normal: Vec<f64>,
}

impl Edge {
    /// Area of the shared dual face
    pub fn area(&self) -> f64 {
        self.normal.iter().map(|n| n * n).sum::<f64>().sqrt()
    }
}

/// Boundary vertex: a point on a marker with its dual boundary face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    /// Point index
    pub node: usize,
    /// Area-weighted normal of the boundary face, pointing out of the domain
    pub normal: Vec<f64>,
    /// Nearest interior neighbour along the normal
    pub normal_neighbor: usize,
}

/// Boundary condition family of a marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BoundaryKind {
    FarField,
    Inlet,
    Outlet,
    HeatFluxWall,
    SymmetryPlane,
    /// Pin the state to explicit values
    Dirichlet { values: Vec<f64> },
}

/// Tagged set of boundary vertices sharing one condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryMarker {
    pub tag: String,
    pub kind: BoundaryKind,
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct PointGeometry {
    coord: Vec<f64>,
    volume: f64,
    wall_distance: f64,
    global_index: usize,
}

/// Partitioned dual mesh held in memory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DualMesh {
    n_dim: usize,
    points: Vec<PointGeometry>,
    n_points_domain: usize,
    edges: Vec<Edge>,
    markers: Vec<BoundaryMarker>,
}

impl DualMesh {
    /// Create an empty mesh
    pub fn new(n_dim: usize) -> Self {
        assert!(n_dim == 2 || n_dim == 3, "Dimension must be 2 or 3");
        Self {
            n_dim,
            points: Vec::new(),
            n_points_domain: 0,
            edges: Vec::new(),
            markers: Vec::new(),
        }
    }

    fn push_point(&mut self, coord: Vec<f64>, volume: f64) -> usize {
        assert_eq!(coord.len(), self.n_dim, "Coordinate dimension mismatch");
        let idx = self.points.len();
        self.points.push(PointGeometry {
            coord,
            volume,
            wall_distance: 0.0,
            global_index: idx,
        });
        idx
    }

    /// Add a domain point and return its index
    ///
    /// # Panics
    ///
    /// Panics if a halo point has already been added.
    pub fn add_point(&mut self, coord: Vec<f64>, volume: f64) -> usize {
        assert_eq!(
            self.n_points_domain,
            self.points.len(),
            "Domain points must be added before halo points"
        );
        let idx = self.push_point(coord, volume);
        self.n_points_domain += 1;
        idx
    }

    /// Add a halo point owned by another partition and return its local index
    pub fn add_halo_point(&mut self, coord: Vec<f64>, volume: f64, global_index: usize) -> usize {
        let idx = self.push_point(coord, volume);
        self.points[idx].global_index = global_index;
        idx
    }

    /// Override the global index of a point
    pub fn set_global_index(&mut self, point: usize, global_index: usize) {
        self.points[point].global_index = global_index;
    }

    /// Set the wall distance of a point
    pub fn set_wall_distance(&mut self, point: usize, distance: f64) {
        self.points[point].wall_distance = distance;
    }

    /// Add an edge and return its index
    pub fn add_edge(&mut self, i: usize, j: usize, normal: Vec<f64>) -> usize {
        assert!(
            i < self.points.len() && j < self.points.len(),
            "Edge ({}, {}) references an unknown point",
            i,
            j
        );
        assert_ne!(i, j, "Edge connects point {} to itself", i);
        assert_eq!(normal.len(), self.n_dim, "Normal dimension mismatch");
        let idx = self.edges.len();
        self.edges.push(Edge { nodes: [i, j], normal });
        idx
    }

    /// Add an empty boundary marker and return its index
    pub fn add_marker(&mut self, tag: impl Into<String>, kind: BoundaryKind) -> usize {
        let idx = self.markers.len();
        self.markers.push(BoundaryMarker {
            tag: tag.into(),
            kind,
            vertices: Vec::new(),
        });
        idx
    }

    /// Attach a boundary vertex to a marker
    pub fn add_vertex(&mut self, marker: usize, node: usize, normal: Vec<f64>, normal_neighbor: usize) {
        assert!(node < self.points.len(), "Vertex references unknown point {}", node);
        assert_eq!(normal.len(), self.n_dim, "Normal dimension mismatch");
        self.markers[marker].vertices.push(Vertex {
            node,
            normal,
            normal_neighbor,
        });
    }
}

impl MeshTopology for DualMesh {
    fn n_dim(&self) -> usize {
        self.n_dim
    }

    fn n_points(&self) -> usize {
        self.points.len()
    }

    fn n_points_domain(&self) -> usize {
        self.n_points_domain
    }

    fn edges(&self) -> &[Edge] {
        &self.edges
    }

    fn volume(&self, point: usize) -> f64 {
        self.points[point].volume
    }

    fn wall_distance(&self, point: usize) -> f64 {
        self.points[point].wall_distance
    }

    fn global_index(&self, point: usize) -> usize {
        self.points[point].global_index
    }

    fn coord(&self, point: usize) -> &[f64] {
        &self.points[point].coord
    }

    fn markers(&self) -> &[BoundaryMarker] {
        &self.markers
    }
}
