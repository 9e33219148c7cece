//! Nonlinear iteration driver: halo synchronization, convergence towards the
//! freestream, linelet runs and configuration failures.

use approx::assert_relative_eq;
use transition::config::TransitionConfig;
use transition::error::CollaboratorError;
use transition::flow::FrozenFlow;
use transition::mesh::{BoundaryKind, DualMesh, MeshTopology, rectangular_grid};
use transition::numerics::{AverageGradientDiffusion, NoSource, ScalarUpwind};
use transition::solver::{Numerics, SerialExchange, StateExchange, TransitionSolver};
use transition::variables::{InMemoryRestart, PrecomputedGradients};
use transition::{NodeStates, TransitionError};

fn numerics() -> Numerics<ScalarUpwind, AverageGradientDiffusion, NoSource> {
    Numerics {
        convective: ScalarUpwind,
        viscous: AverageGradientDiffusion::transition(),
        source: NoSource,
    }
}

/// Three domain points in a chain followed by one halo point
fn partition() -> DualMesh {
    let mut mesh = DualMesh::new(2);
    for i in 0..3 {
        mesh.add_point(vec![i as f64, 0.0], 1.0);
    }
    mesh.add_halo_point(vec![3.0, 0.0], 1.0, 42);
    for i in 0..3 {
        mesh.add_edge(i, i + 1, vec![1.0, 0.0]);
    }
    let inlet = mesh.add_marker("inlet", BoundaryKind::Inlet);
    mesh.add_vertex(inlet, 0, vec![-1.0, 0.0], 1);
    mesh
}

/// Records every call and writes the "remote" state into the halo point
struct RecordingExchange {
    calls: usize,
    seen: Vec<f64>,
    remote: [f64; 2],
    halo: usize,
}

impl StateExchange for RecordingExchange {
    fn synchronize(&mut self, states: &mut NodeStates) -> Result<(), CollaboratorError> {
        self.calls += 1;
        self.seen = states.solution_slice().to_vec();
        states.set_solution(self.halo, &self.remote);
        Ok(())
    }
}

struct FailingExchange;

impl StateExchange for FailingExchange {
    fn synchronize(&mut self, _states: &mut NodeStates) -> Result<(), CollaboratorError> {
        Err("neighbour partition unreachable".into())
    }
}

#[test]
fn test_synchronize_once_after_local_update() {
    let mesh = partition();
    let flow = FrozenFlow::uniform(4, &[1.0, 0.0], 1e-3, 0.0, 1.0);
    let config = TransitionConfig::default().resolve().expect("config");
    let freestream = config.freestream.values();

    let mut solver = TransitionSolver::new(&mesh, &config).expect("solver");
    solver.states_mut().set_solution(1, &[0.3, 300.0]);
    solver.states_mut().set_solution(2, &[0.6, 600.0]);

    let mut exchange = RecordingExchange {
        calls: 0,
        seen: Vec::new(),
        remote: [0.9, 900.0],
        halo: 3,
    };
    let gradients = PrecomputedGradients::zeros(4, 2, 2);
    solver
        .iterate(&mesh, &flow, &gradients, &numerics(), &mut exchange)
        .expect("iteration");

    assert_eq!(exchange.calls, 1);

    // The exchange saw the updated domain states and an untouched halo
    let after = solver.states().solution_slice();
    assert_eq!(&exchange.seen[..6], &after[..6]);
    assert_eq!(&exchange.seen[6..], &freestream);
    assert_ne!(after[2..6], [0.3, 300.0, 0.6, 600.0]);
    assert_eq!(solver.states().solution(3), &[0.9, 900.0]);

    // Inlet point pinned
    assert_eq!(solver.states().solution(0), &freestream);

    solver
        .iterate(&mesh, &flow, &gradients, &numerics(), &mut exchange)
        .expect("iteration");
    assert_eq!(exchange.calls, 2);
}

#[test]
fn test_synchronization_failure_is_fatal() {
    let mesh = partition();
    let flow = FrozenFlow::uniform(4, &[1.0, 0.0], 1e-3, 0.0, 1.0);
    let config = TransitionConfig::default().resolve().expect("config");
    let mut solver = TransitionSolver::new(&mesh, &config).expect("solver");

    let err = solver
        .iterate(
            &mesh,
            &flow,
            &PrecomputedGradients::zeros(4, 2, 2),
            &numerics(),
            &mut FailingExchange,
        )
        .unwrap_err();
    assert!(matches!(err, TransitionError::Synchronization(_)));
    assert!(err.is_fatal());
    assert!(err.to_string().contains("unreachable"));
}

#[test]
fn test_iterations_converge_to_freestream() {
    let (nx, ny) = (6, 4);
    let mesh = rectangular_grid(nx, ny, 1.0, 1.0);
    let n = mesh.n_points();
    let flow = FrozenFlow::uniform(n, &[1.0, 0.0], 1e-2, 0.0, 100.0);
    let gradients = PrecomputedGradients::zeros(n, 2, 2);

    let mut config = TransitionConfig::default();
    config.linear_solver.kind = "gmres".to_string();
    config.linear_solver.preconditioner = "jacobi".to_string();
    config.linear_solver.tolerance = 1e-10;
    config.linear_solver.max_iterations = 200;
    let config = config.resolve().expect("config");
    let freestream = config.freestream.values();

    let mut solver = TransitionSolver::new(&mesh, &config).expect("solver");
    for p in 0..n {
        let bump = (p % 5) as f64;
        solver
            .states_mut()
            .set_solution(p, &[freestream[0] - 0.05 * bump, freestream[1] + 20.0 * bump]);
    }

    let numerics = numerics();
    let first = solver
        .iterate(&mesh, &flow, &gradients, &numerics, &mut SerialExchange)
        .expect("iteration");
    let mut last = first.clone();
    for _ in 0..15 {
        last = solver
            .iterate(&mesh, &flow, &gradients, &numerics, &mut SerialExchange)
            .expect("iteration");
    }

    assert!(first.rms[1] > 0.0);
    assert!(last.rms[1] < 1e-2 * first.rms[1]);
    for p in 0..n {
        assert_relative_eq!(solver.states().solution(p)[0], freestream[0], epsilon = 1e-3);
        assert_relative_eq!(solver.states().gamma_eff(p), solver.states().solution(p)[0]);
    }
}

#[test]
fn test_linelet_run() {
    let (nx, ny) = (4, 6);
    let mesh = rectangular_grid(nx, ny, 4.0, 0.3);
    let n = mesh.n_points();
    let flow = FrozenFlow::uniform(n, &[1.0, 0.02], 1e-3, 1e-3, 0.5);

    let config = TransitionConfig::from_json_str(
        r#"{
            "linear_solver": { "kind": "gmres", "preconditioner": "linelet", "tolerance": 1e-8, "max_iterations": 100 },
            "linelet": { "wall_markers": ["wall"], "alpha": 2.0 }
        }"#,
    )
    .expect("json")
    .resolve()
    .expect("config");

    let mut solver = TransitionSolver::new(&mesh, &config).expect("solver");
    assert!(!solver.lines().is_empty());
    let wall = mesh.marker("wall").expect("wall marker");
    for line in solver.lines() {
        assert!(line.len() >= 2);
        assert!(wall.vertices.iter().any(|v| v.node == line[0]));
    }

    for p in 0..n {
        solver
            .states_mut()
            .set_solution(p, &[1.0, 100.0 + (p % 3) as f64 * 10.0]);
    }
    let report = solver
        .iterate(
            &mesh,
            &flow,
            &PrecomputedGradients::zeros(n, 2, 2),
            &numerics(),
            &mut SerialExchange,
        )
        .expect("iteration");
    assert!(report.linear.converged);
    assert!(report.linear.iterations > 0);
}

#[test]
fn test_restart_initializes_states() {
    let mesh = partition();
    let mut config = TransitionConfig::default();
    config.restart = true;
    let config = config.resolve().expect("config");

    let records: Vec<Vec<f64>> = (0..4).map(|p| vec![0.1 * p as f64, 50.0 * p as f64]).collect();
    let solver =
        TransitionSolver::with_restart(&mesh, &config, &InMemoryRestart::new(records)).expect("restart");
    assert_eq!(solver.states().solution(2), &[0.2, 100.0]);
    assert_eq!(solver.states().solution_old(3), &[0.30000000000000004, 150.0]);

    let err = TransitionSolver::new(&mesh, &config).unwrap_err();
    assert!(err.is_fatal());
}

#[test]
fn test_unsupported_selections_fail_at_resolution() {
    let mut config = TransitionConfig::default();
    config.linear_solver.kind = "cg".to_string();
    let err = config.resolve().unwrap_err();
    assert!(matches!(err, TransitionError::UnsupportedSolver(ref name) if name == "cg"));
    assert!(err.is_config_error());

    let mut config = TransitionConfig::default();
    config.linear_solver.preconditioner = "ilu".to_string();
    assert!(matches!(
        config.resolve(),
        Err(TransitionError::UnsupportedPreconditioner(_))
    ));

    let mut config = TransitionConfig::default();
    config.linear_solver.relaxation = 0.0;
    assert!(matches!(
        config.resolve(),
        Err(TransitionError::InvalidRelaxation(_))
    ));

    assert!(matches!(
        TransitionConfig::from_json_str("{ \"linear_solver\": 3 }"),
        Err(TransitionError::ConfigParse(_))
    ));
}

#[test]
fn test_farfield_node_shared_with_later_wall_stays_pinned() {
    let mut mesh = DualMesh::new(2);
    mesh.add_point(vec![0.0, 0.0], 1.0);
    mesh.add_point(vec![0.0, 1.0], 1.0);
    mesh.add_edge(0, 1, vec![0.0, 1.0]);
    let farfield = mesh.add_marker("farfield", BoundaryKind::FarField);
    mesh.add_vertex(farfield, 0, vec![-1.0, 0.0], 1);
    let wall = mesh.add_marker("wall", BoundaryKind::HeatFluxWall);
    mesh.add_vertex(wall, 0, vec![0.0, -1.0], 1);

    let flow = FrozenFlow::uniform(2, &[0.0, 1.0], 1e-3, 0.0, 1.0);
    let mut config = TransitionConfig::default();
    config.linear_solver.kind = "sym_gauss_seidel".to_string();
    let config = config.resolve().expect("config");
    let freestream = config.freestream.values();

    let mut solver = TransitionSolver::new(&mesh, &config).expect("solver");
    solver.states_mut().set_solution(0, &[0.6, 700.0]);
    solver.states_mut().set_solution(1, &[0.4, 500.0]);
    solver
        .iterate(
            &mesh,
            &flow,
            &PrecomputedGradients::zeros(2, 2, 2),
            &numerics(),
            &mut SerialExchange,
        )
        .expect("iteration");

    assert_eq!(solver.states().solution(0), &freestream);
}
