mod common;

use std::sync::OnceLock;

use catchment_core::loading::VertexSnapper;
use catchment_core::model::RoadGraph;
use catchment_core::routing::{find_reachability, find_route};
use catchment_core::{DEFAULT_PACE_MIN_PER_KM, FINE_SNAP_TOLERANCE};
use geo::Point;
use proptest::prelude::*;

fn graph() -> &'static RoadGraph {
    static GRAPH: OnceLock<RoadGraph> = OnceLock::new();
    GRAPH.get_or_init(|| common::grid_graph(6))
}

proptest! {
    #[test]
    fn reachability_grows_with_budget(
        i in 0usize..6,
        j in 0usize..6,
        small in 0.0f64..60.0,
        extra in 0.0f64..60.0,
    ) {
        let origin = common::grid_point(i, j);
        let narrow = find_reachability(graph(), origin, small).unwrap().unwrap();
        let wide = find_reachability(graph(), origin, small + extra).unwrap().unwrap();

        let wide_ids = wide.edge_ids();
        for id in narrow.edge_ids() {
            prop_assert!(wide_ids.contains(&id));
        }
    }

    #[test]
    fn route_cost_is_symmetric(
        a in (0usize..6, 0usize..6),
        b in (0usize..6, 0usize..6),
    ) {
        let from = common::grid_point(a.0, a.1);
        let to = common::grid_point(b.0, b.1);
        let there = find_route(graph(), from, to, DEFAULT_PACE_MIN_PER_KM).unwrap().unwrap();
        let back = find_route(graph(), to, from, DEFAULT_PACE_MIN_PER_KM).unwrap().unwrap();

        prop_assert!((there.cost - back.cost).abs() < 1e-9);
        prop_assert_eq!(there.edges.len(), back.edges.len());
    }

    #[test]
    fn endpoints_within_tolerance_share_a_vertex(
        x in -179.0f64..179.0,
        y in -80.0f64..80.0,
        dx in -0.7f64..0.7,
        dy in -0.7f64..0.7,
    ) {
        // Offsets stay inside the tolerance circle
        let offset = FINE_SNAP_TOLERANCE * 0.99;
        let mut snapper = VertexSnapper::new(FINE_SNAP_TOLERANCE);
        let first = snapper.resolve(Point::new(x, y));
        let second = snapper.resolve(Point::new(x + dx * offset, y + dy * offset));
        prop_assert_eq!(first, second);
        prop_assert_eq!(snapper.into_vertices().len(), 1);
    }
}
