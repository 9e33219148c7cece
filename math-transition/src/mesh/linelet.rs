//! Line construction for the linelet preconditioner
//!
//! A line starts at a domain point of a wall marker and marches away from the
//! wall through strongly coupled neighbours: from the current point it moves
//! to the unclaimed domain neighbour sharing the largest dual face, as long as
//! that face is more than `alpha` times larger than every other face of the
//! current point (the face back to the previous point excluded). A line stops
//! after entering a point that lies on any boundary marker. Lines of a single
//! point are discarded.

use super::MeshTopology;

/// Build the wall-normal lines seeded on `wall_markers`
pub fn build_linelets<M: MeshTopology>(mesh: &M, wall_markers: &[String], alpha: f64) -> Vec<Vec<usize>> {
    let n_points = mesh.n_points();

    let mut neighbors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n_points];
    for edge in mesh.edges() {
        let [i, j] = edge.nodes;
        let area = edge.area();
        neighbors[i].push((j, area));
        neighbors[j].push((i, area));
    }

    let mut on_boundary = vec![false; n_points];
    for marker in mesh.markers() {
        for vertex in &marker.vertices {
            on_boundary[vertex.node] = true;
        }
    }

    let mut claimed = vec![false; n_points];
    let mut lines = Vec::new();

    for tag in wall_markers {
        let Some(marker) = mesh.marker(tag) else {
            log::warn!("Linelet wall marker {:?} not found in mesh", tag);
            continue;
        };

        for vertex in &marker.vertices {
            let start = vertex.node;
            if !mesh.is_domain(start) || claimed[start] {
                continue;
            }
            claimed[start] = true;
            let mut line = vec![start];
            let mut current = start;
            let mut previous: Option<usize> = None;

            loop {
                let best = neighbors[current]
                    .iter()
                    .filter(|(n, _)| mesh.is_domain(*n) && !claimed[*n])
                    .max_by(|a, b| a.1.total_cmp(&b.1))
                    .copied();
                let Some((next, best_area)) = best else {
                    break;
                };

                let second = neighbors[current]
                    .iter()
                    .filter(|(n, _)| *n != next && Some(*n) != previous)
                    .map(|(_, area)| *area)
                    .fold(0.0_f64, f64::max);
                if best_area <= alpha * second {
                    break;
                }

                claimed[next] = true;
                line.push(next);
                previous = Some(current);
                current = next;

                if on_boundary[next] {
                    break;
                }
            }

            if line.len() > 1 {
                lines.push(line);
            } else {
                claimed[start] = false;
            }
        }
    }

    log::debug!(
        "Built {} linelets covering {} points",
        lines.len(),
        lines.iter().map(Vec::len).sum::<usize>()
    );

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::rectangular_grid;

    #[test]
    fn test_lines_follow_stretched_direction() {
        // dx = 1, dy = 0.1: faces normal to y are ten times larger
        let (nx, ny) = (4, 5);
        let mesh = rectangular_grid(nx, ny, 4.0, 0.5);
        let lines = build_linelets(&mesh, &["wall".to_string()], 2.0);

        for i in 1..nx {
            let expected: Vec<usize> = (0..=ny).map(|j| j * (nx + 1) + i).collect();
            assert!(lines.contains(&expected), "missing line for column {}", i);
        }

        // No point is on two lines
        let mut seen = vec![false; (nx + 1) * (ny + 1)];
        for &p in lines.iter().flatten() {
            assert!(!seen[p]);
            seen[p] = true;
        }
    }

    #[test]
    fn test_isotropic_grid_has_no_lines() {
        let mesh = rectangular_grid(4, 4, 1.0, 1.0);
        let lines = build_linelets(&mesh, &["wall".to_string()], 2.0);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_unknown_marker_is_skipped() {
        let mesh = rectangular_grid(2, 2, 1.0, 0.1);
        assert!(build_linelets(&mesh, &["airfoil".to_string()], 2.0).is_empty());
    }
}
