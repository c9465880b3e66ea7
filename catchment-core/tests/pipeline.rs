mod common;

use catchment_core::algo::{IsochroneParams, ZonationConfig, find_zonation, generate_isochrone};
use catchment_core::loading::read_records_csv;
use catchment_core::model::{RoadGraph, TopologyStatus};
use catchment_core::routing::{RoutingConfig, find_reachability, find_route};
use catchment_core::{DEFAULT_PACE_MIN_PER_KM, Error, NetworkStore};
use common::{deployed_grid, grid_point, load_graph, memory_store};

#[test]
fn grid_topology_is_created() {
    let store = memory_store();
    let network = deployed_grid(&store, 5);

    let meta = store.network(network).unwrap();
    assert_eq!(meta.topology_status, Some(TopologyStatus::Created));
    assert_eq!(store.vertices(network).unwrap().len(), 25);
    assert_eq!(store.edges(network).unwrap().len(), 40);
}

#[test]
fn route_crosses_the_grid() {
    let store = memory_store();
    let network = deployed_grid(&store, 5);
    let graph = load_graph(&store, network);

    let route = find_route(
        &graph,
        grid_point(0, 0),
        grid_point(4, 4),
        DEFAULT_PACE_MIN_PER_KM,
    )
    .unwrap()
    .unwrap();

    assert_eq!(route.edges.len(), 8);
    // Eight blocks of ~0.55 km
    assert!((4.3..4.5).contains(&route.length_km), "{}", route.length_km);
    assert_eq!(route.geometry.0.first(), Some(&grid_point(0, 0).0));
    assert_eq!(route.geometry.0.last(), Some(&grid_point(4, 4).0));
    assert!((route.cost - route.length_km * DEFAULT_PACE_MIN_PER_KM).abs() < 1e-6);
}

#[test]
fn zero_budget_reaches_incident_edges_only() {
    let store = memory_store();
    let network = deployed_grid(&store, 5);
    let graph = load_graph(&store, network);

    let corner = find_reachability(&graph, grid_point(0, 0), 0.0)
        .unwrap()
        .unwrap();
    assert_eq!(corner.edges.len(), 2);

    let center = find_reachability(&graph, grid_point(2, 2), 0.0)
        .unwrap()
        .unwrap();
    assert_eq!(center.edges.len(), 4);
}

#[test]
fn isochrone_covers_reached_area() {
    let graph = common::grid_graph(5);
    // One block is ~8.3 minutes
    let isochrone = generate_isochrone(&graph, grid_point(2, 2), 10.0, &IsochroneParams::default())
        .unwrap()
        .unwrap();

    assert!(isochrone.contains(&grid_point(2, 2)));
    assert!(isochrone.contains(&grid_point(3, 2)));
    assert!(!isochrone.contains(&grid_point(0, 0)));
}

#[test]
fn zonation_over_csv_records() {
    let graph = common::grid_graph(5);
    let schools = read_records_csv(
        "id,name,lat,lon\n\
         near,SD Dekat,-6.1900,106.8101\n\
         far,SD Jauh,-6.1801,106.8199\n"
            .as_bytes(),
        "schools",
        true,
    )
    .unwrap();
    let students = read_records_csv(
        "id,lat,lon\n1,-6.1900,106.8050\n".as_bytes(),
        "students",
        false,
    )
    .unwrap();

    let config = ZonationConfig {
        min_time: 10.0,
        max_time: 40.0,
        step: 10.0,
        in_zone_threshold: 3,
    };
    let result = find_zonation(
        &graph,
        grid_point(2, 2),
        &[schools.collection, students.collection],
        &config,
        &IsochroneParams::default(),
        DEFAULT_PACE_MIN_PER_KM,
    )
    .unwrap()
    .unwrap();

    let in_zone: Vec<&str> = result.in_zone.iter().map(|m| m.record.id.as_str()).collect();
    assert_eq!(in_zone, vec!["near", "far"]);
    assert_eq!(result.in_zone[0].time, 10.0);
    assert!(result.in_zone[1].time > 10.0);
    assert_eq!(result.out_of_zone.len(), 1);
    assert_eq!(result.routes.len(), 2);
}

#[test]
fn removed_network_cannot_be_loaded() {
    let store = memory_store();
    let network = deployed_grid(&store, 4);
    store.remove_network(network).unwrap();

    assert!(matches!(
        RoadGraph::from_store(store.as_ref(), network, &RoutingConfig::default()),
        Err(Error::UnknownNetwork(_))
    ));
}
