//! Property-based tests for refinement.
//!
//! These tests use proptest to generate jittered grid triangulations and
//! check that refinement keeps the topology consistent.
//!
//! Run with: cargo test -p lepp-refine -- proptest

use lepp_refine::{
    DataParallelEngine, ImproveStatus, RefineParams, RefinementEngine, SequentialEngine, Topology,
    Vertex, check_topology, detect_terminal_edges, insert_centroid, validate_topology,
};
use proptest::prelude::*;

// =============================================================================
// Strategies for generating triangulations
// =============================================================================

/// A grid description: cell counts, cell aspect, per-vertex jitter and diagonal choices.
#[derive(Debug, Clone)]
struct GridLayout {
    nx: u32,
    ny: u32,
    stretch: f64,
    jitter: Vec<(f64, f64)>,
    flips: Vec<bool>,
}

impl GridLayout {
    fn build(&self) -> Topology {
        let mut vertices = Vec::new();
        for j in 0..=self.ny {
            for i in 0..=self.nx {
                let k = (j * (self.nx + 1) + i) as usize;
                let (dx, dy) = self.jitter[k];
                vertices.push(Vertex::from_coords(
                    (i as f64 + dx) * self.stretch,
                    j as f64 + dy,
                    0.0,
                ));
            }
        }

        let idx = |i: u32, j: u32| j * (self.nx + 1) + i;
        let mut faces = Vec::new();
        for j in 0..self.ny {
            for i in 0..self.nx {
                let (a, b, c, d) = (idx(i, j), idx(i + 1, j), idx(i + 1, j + 1), idx(i, j + 1));
                if self.flips[(j * self.nx + i) as usize] {
                    faces.push([a, b, d]);
                    faces.push([b, c, d]);
                } else {
                    faces.push([a, b, c]);
                    faces.push([a, c, d]);
                }
            }
        }
        Topology::from_indexed(vertices, &faces).unwrap()
    }
}

/// Jitter stays below a quarter cell so every cell remains convex.
fn arb_grid(max_cells: u32) -> impl Strategy<Value = GridLayout> {
    (1..=max_cells, 1..=max_cells, 1.0..8.0f64).prop_flat_map(|(nx, ny, stretch)| {
        let vertex_count = ((nx + 1) * (ny + 1)) as usize;
        let cell_count = (nx * ny) as usize;
        (
            prop::collection::vec((-0.2..0.2f64, -0.2..0.2f64), vertex_count),
            prop::collection::vec(any::<bool>(), cell_count),
        )
            .prop_map(move |(jitter, flips)| GridLayout {
                nx,
                ny,
                stretch,
                jitter,
                flips,
            })
    })
}

fn arb_angle() -> impl Strategy<Value = f64> {
    5.0..45.0f64
}

fn terminal_flags(topo: &Topology) -> Vec<(bool, bool)> {
    topo.edges().iter().map(|e| (e.terminal, e.border)).collect()
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Generated grids are consistent before anything runs.
    #[test]
    fn proptest_generated_grid_is_valid(layout in arb_grid(6)) {
        let topo = layout.build();
        prop_assert!(check_topology(&topo, 8).is_empty());
    }

    /// Detection is idempotent: running it twice gives the same flags.
    #[test]
    fn proptest_detection_idempotent(layout in arb_grid(6), angle in arb_angle()) {
        let mut topo = layout.build();
        let mut engine = SequentialEngine::new();

        let first_bad = engine.detect_bad(angle, &mut topo).unwrap();
        let first_scan = engine.detect_terminal(&mut topo).unwrap();
        let first_flags = terminal_flags(&topo);

        let second_bad = engine.detect_bad(angle, &mut topo).unwrap();
        let second_scan = engine.detect_terminal(&mut topo).unwrap();

        prop_assert_eq!(first_bad, second_bad);
        prop_assert_eq!(first_scan, second_scan);
        prop_assert_eq!(first_flags, terminal_flags(&topo));
    }

    /// Every terminal edge is the longest edge of each triangle incident to it.
    #[test]
    fn proptest_terminal_edges_are_longest(layout in arb_grid(6), angle in arb_angle()) {
        let mut topo = layout.build();
        SequentialEngine::new().detect_bad(angle, &mut topo).unwrap();
        detect_terminal_edges(&mut topo).unwrap();

        for (handle, edge) in topo.edges().iter().enumerate() {
            if !edge.terminal {
                continue;
            }
            prop_assert_eq!(edge.border, edge.tb.is_none());
            let mut incident = vec![edge.ta];
            incident.extend(edge.tb);
            for t in incident {
                let longest = lepp_refine::longest_edge(&topo, t).unwrap();
                let len = |e: u32| {
                    let edge = &topo.edges()[e as usize];
                    let a = topo.vertices()[edge.v[0] as usize].position;
                    let b = topo.vertices()[edge.v[1] as usize].position;
                    (b - a).norm_squared()
                };
                prop_assert!(len(handle as u32) >= len(longest));
            }
        }
    }

    /// A single insertion adds one vertex, two triangles and three edges and keeps the topology consistent.
    #[test]
    fn proptest_single_insertion_delta(layout in arb_grid(5), pick in any::<prop::sample::Index>()) {
        let mut topo = layout.build();
        let interior: Vec<u32> = topo
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.is_boundary())
            .map(|(i, _)| i as u32)
            .collect();
        prop_assume!(!interior.is_empty());
        let edge = interior[pick.index(interior.len())];

        let (nv, nt, ne) = (topo.vertex_count(), topo.triangle_count(), topo.edge_count());
        let insertion = insert_centroid(&mut topo, edge).unwrap();

        prop_assert_eq!(topo.vertex_count(), nv + 1);
        prop_assert_eq!(topo.triangle_count(), nt + 2);
        prop_assert_eq!(topo.edge_count(), ne + 3);
        prop_assert_eq!(insertion.vertex as usize, nv);
        prop_assert!(check_topology(&topo, 8).is_empty());
    }

    /// Refinement terminates within the cap and preserves consistency.
    #[test]
    fn proptest_refinement_consistent(layout in arb_grid(5), angle in arb_angle()) {
        let mut topo = layout.build();
        let original_vertices = topo.vertices().to_vec();
        let mut engine = SequentialEngine::new();
        let params = RefineParams::with_angle(angle).with_max_iterations(8);

        engine.detect_bad(angle, &mut topo).unwrap();
        let report = engine.improve(&mut topo, &params).unwrap();

        prop_assert!(report.iterations <= params.max_iterations);
        prop_assert_eq!(report.vertices_added, report.insertions);
        prop_assert_eq!(report.triangles_added, 2 * report.insertions);
        prop_assert_eq!(report.edges_added, 3 * report.insertions);
        if report.status != ImproveStatus::IterationLimit {
            prop_assert_eq!(topo.edges().iter().filter(|e| e.terminal && !e.border).count(), 0);
        }
        prop_assert!(validate_topology(&topo).is_ok());
        prop_assert_eq!(&topo.vertices()[..original_vertices.len()], &original_vertices[..]);
    }

    /// Sequential and data-parallel engines produce identical topologies.
    #[test]
    fn proptest_engines_agree(layout in arb_grid(5), angle in arb_angle()) {
        let params = RefineParams::with_angle(angle).with_max_iterations(6);

        let mut seq_topo = layout.build();
        let mut sequential = SequentialEngine::new();
        sequential.detect_bad(angle, &mut seq_topo).unwrap();
        let seq_report = sequential.improve(&mut seq_topo, &params).unwrap();

        let mut par_topo = layout.build();
        let mut parallel = DataParallelEngine::rayon();
        parallel.detect_bad(angle, &mut par_topo).unwrap();
        let par_report = parallel.improve(&mut par_topo, &params).unwrap();

        prop_assert_eq!(seq_report, par_report);
        prop_assert_eq!(seq_topo, par_topo);
    }
}
