//! Mesh generators for structured test domains
//!
//! Both generators build the median-dual of a structured grid: every grid
//! node is a control volume, every grid line segment an edge whose normal is
//! the dual face between its end points.

use super::types::{BoundaryKind, DualMesh};
use super::MeshTopology;

/// Generate a one-dimensional chain of `n_points` control volumes along x
///
/// Every dual face has area `area`. Markers: `inlet` at the first point,
/// `outlet` at the last.
pub fn strip(n_points: usize, length: f64, area: f64) -> DualMesh {
    assert!(n_points >= 2, "A strip needs at least two points");
    let mut mesh = DualMesh::new(2);
    let dx = length / (n_points - 1) as f64;

    for i in 0..n_points {
        let width = if i == 0 || i == n_points - 1 { 0.5 * dx } else { dx };
        mesh.add_point(vec![i as f64 * dx, 0.0], width * area);
    }
    for i in 0..n_points - 1 {
        mesh.add_edge(i, i + 1, vec![area, 0.0]);
    }

    let inlet = mesh.add_marker("inlet", BoundaryKind::Inlet);
    mesh.add_vertex(inlet, 0, vec![-area, 0.0], 1);
    let outlet = mesh.add_marker("outlet", BoundaryKind::Outlet);
    mesh.add_vertex(outlet, n_points - 1, vec![area, 0.0], n_points - 2);

    mesh
}

/// Generate a rectangular `[0, lx] × [0, ly]` grid with `nx × ny` cells
///
/// Point `(i, j)` has index `j * (nx + 1) + i` and wall distance `y`.
/// Markers: `wall` (y = 0, heat-flux wall), `farfield` (y = ly),
/// `inlet` (x = 0) and `outlet` (x = lx).
pub fn rectangular_grid(nx: usize, ny: usize, lx: f64, ly: f64) -> DualMesh {
    assert!(nx >= 1 && ny >= 1, "Grid needs at least one cell per direction");
    let mut mesh = DualMesh::new(2);

    let dx = lx / nx as f64;
    let dy = ly / ny as f64;
    let half_if = |k: usize, n: usize, h: f64| if k == 0 || k == n { 0.5 * h } else { h };
    let index = |i: usize, j: usize| j * (nx + 1) + i;

    // Create nodes
    for j in 0..=ny {
        for i in 0..=nx {
            let idx = mesh.add_point(
                vec![i as f64 * dx, j as f64 * dy],
                half_if(i, nx, dx) * half_if(j, ny, dy),
            );
            mesh.set_wall_distance(idx, j as f64 * dy);
        }
    }

    // Horizontal segments cross a vertical dual face, vertical ones a horizontal face
    for j in 0..=ny {
        for i in 0..nx {
            mesh.add_edge(index(i, j), index(i + 1, j), vec![half_if(j, ny, dy), 0.0]);
        }
    }
    for j in 0..ny {
        for i in 0..=nx {
            mesh.add_edge(index(i, j), index(i, j + 1), vec![0.0, half_if(i, nx, dx)]);
        }
    }

    let wall = mesh.add_marker("wall", BoundaryKind::HeatFluxWall);
    let farfield = mesh.add_marker("farfield", BoundaryKind::FarField);
    for i in 0..=nx {
        let width = half_if(i, nx, dx);
        mesh.add_vertex(wall, index(i, 0), vec![0.0, -width], index(i, 1));
        mesh.add_vertex(farfield, index(i, ny), vec![0.0, width], index(i, ny - 1));
    }

    let inlet = mesh.add_marker("inlet", BoundaryKind::Inlet);
    let outlet = mesh.add_marker("outlet", BoundaryKind::Outlet);
    for j in 0..=ny {
        let height = half_if(j, ny, dy);
        mesh.add_vertex(inlet, index(0, j), vec![-height, 0.0], index(1, j));
        mesh.add_vertex(outlet, index(nx, j), vec![height, 0.0], index(nx - 1, j));
    }

    log::debug!(
        "Generated {}x{} grid: {} points, {} edges",
        nx,
        ny,
        mesh.n_points(),
        mesh.edges().len()
    );

    mesh
}
