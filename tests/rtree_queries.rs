//! # End-to-end query tests
//!
//! Black-box coverage of the built index against brute-force oracles:
//!
//! 1. Nearest results agree with a linear scan under the engine's own
//!    distance function, and distances are non-decreasing.
//! 2. Box search over the whole world returns every segment exactly once.
//! 3. All three packing methods produce equivalent query results.
//! 4. A reopened on-disk index answers exactly like the freshly built one.
//! 5. The leaf file obeys the page layout: exact page multiples, per-leaf
//!    object counts in range, total count equal to the input.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

use edgetree::geometry::{mercator, project_point_on_segment, squared_euclidean_distance};
use edgetree::storage::LeafStorage;
use edgetree::{
    leaf_capacity, Coordinate, PackingMethod, Rectangle, RoadEdge, StaticRTree, LEAF_PAGE_SIZE,
};

const ALL_METHODS: [PackingMethod; 3] = [
    PackingMethod::Hilbert,
    PackingMethod::Str,
    PackingMethod::Omt,
];

/// Random short segments inside [-1, 1] x [-1, 1] degrees.
fn random_segments(count: usize, seed: u64) -> (Vec<Coordinate>, Vec<RoadEdge>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut coordinates = Vec::with_capacity(count * 2);
    let mut edges = Vec::with_capacity(count);

    for edge_id in 0..count {
        let lon = rng.gen_range(-1.0..1.0);
        let lat = rng.gen_range(-1.0..1.0);
        let u = Coordinate::from_degrees(lon, lat);
        let v = Coordinate::from_degrees(
            (lon + rng.gen_range(-0.01..0.01)).clamp(-1., 1.),
            (lat + rng.gen_range(-0.01..0.01)).clamp(-1., 1.),
        );

        let base = coordinates.len() as u32;
        coordinates.push(u);
        coordinates.push(v);
        edges.push(RoadEdge::new(base, base + 1, edge_id as u32));
    }
    (coordinates, edges)
}

/// The engine's distance: squared Euclidean from the projected query to the
/// nearest point on the projected segment, in fixed-point units.
fn projected_distance(query: Coordinate, edge: &RoadEdge, coordinates: &[Coordinate]) -> u64 {
    let projected_query = mercator::from_wgs84(query);
    let u = mercator::from_wgs84(coordinates[edge.source as usize]).to_float();
    let v = mercator::from_wgs84(coordinates[edge.target as usize]).to_float();
    let (_, nearest) = project_point_on_segment(u, v, projected_query.to_float());
    squared_euclidean_distance(projected_query, nearest.to_fixed())
}

fn brute_force_nearest_distances(
    query: Coordinate,
    k: usize,
    edges: &[RoadEdge],
    coordinates: &[Coordinate],
) -> Vec<u64> {
    let mut distances: Vec<u64> = edges
        .iter()
        .map(|edge| projected_distance(query, edge, coordinates))
        .collect();
    distances.sort_unstable();
    distances.truncate(k);
    distances
}

#[test]
fn nearest_agrees_with_brute_force() {
    let (coordinates, edges) = random_segments(10_000, 42);
    let dir = tempdir().unwrap();
    let tree = StaticRTree::build(
        &edges,
        &coordinates,
        dir.path().join("random.tree"),
        dir.path().join("random.leaves"),
        PackingMethod::default(),
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let query = Coordinate::from_degrees(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));

        let top = tree.nearest(query, 1);
        assert_eq!(top.len(), 1);
        let engine = projected_distance(query, &top[0], &coordinates);
        let oracle = brute_force_nearest_distances(query, 1, &edges, &coordinates)[0];
        assert_eq!(engine, oracle);
    }
}

#[test]
fn nearest_distances_are_non_decreasing() {
    let (coordinates, edges) = random_segments(2_000, 3);
    let dir = tempdir().unwrap();
    let tree = StaticRTree::build(
        &edges,
        &coordinates,
        dir.path().join("random.tree"),
        dir.path().join("random.leaves"),
        PackingMethod::default(),
    )
    .unwrap();

    let query = Coordinate::from_degrees(0.25, -0.125);
    let results = tree.nearest(query, 50);
    assert_eq!(results.len(), 50);

    let distances: Vec<u64> = results
        .iter()
        .map(|edge| projected_distance(query, edge, &coordinates))
        .collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));

    // And the distance multiset matches brute force for the same k.
    let mut sorted = distances.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, brute_force_nearest_distances(query, 50, &edges, &coordinates));
}

#[test]
fn world_box_returns_every_segment_once() {
    let (coordinates, edges) = random_segments(5_000, 11);
    let dir = tempdir().unwrap();
    let tree = StaticRTree::build(
        &edges,
        &coordinates,
        dir.path().join("random.tree"),
        dir.path().join("random.leaves"),
        PackingMethod::default(),
    )
    .unwrap();

    let world = Rectangle::new(
        Coordinate::from_degrees(-180., 0.).lon,
        Coordinate::from_degrees(180., 0.).lon,
        Coordinate::from_degrees(0., -85.).lat,
        Coordinate::from_degrees(0., 85.).lat,
    );

    let mut ids: Vec<u32> = tree.search_in_box(world).iter().map(|e| e.edge_id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), edges.len());
}

#[test]
fn box_results_match_a_linear_filter() {
    let (coordinates, edges) = random_segments(5_000, 23);
    let dir = tempdir().unwrap();
    let tree = StaticRTree::build(
        &edges,
        &coordinates,
        dir.path().join("random.tree"),
        dir.path().join("random.leaves"),
        PackingMethod::default(),
    )
    .unwrap();

    let rect = Rectangle::new(
        Coordinate::from_degrees(-0.5, 0.).lon,
        Coordinate::from_degrees(0.25, 0.).lon,
        Coordinate::from_degrees(0., -0.25).lat,
        Coordinate::from_degrees(0., 0.5).lat,
    );

    let mut engine: Vec<u32> = tree.search_in_box(rect).iter().map(|e| e.edge_id).collect();
    engine.sort_unstable();

    let mut oracle: Vec<u32> = edges
        .iter()
        .filter(|edge| {
            let u = coordinates[edge.source as usize];
            let v = coordinates[edge.target as usize];
            let mut bbox = Rectangle::INVALID;
            bbox.extend(u.lon, u.lat);
            bbox.extend(v.lon, v.lat);
            bbox.intersects(&rect)
        })
        .map(|edge| edge.edge_id)
        .collect();
    oracle.sort_unstable();

    assert_eq!(engine, oracle);
    assert!(!engine.is_empty());
}

#[test]
fn all_packers_answer_identically() {
    let (coordinates, edges) = random_segments(3_000, 99);
    let query = Coordinate::from_degrees(0.1, 0.1);
    let rect = Rectangle::new(
        Coordinate::from_degrees(-0.3, 0.).lon,
        Coordinate::from_degrees(0.3, 0.).lon,
        Coordinate::from_degrees(0., -0.3).lat,
        Coordinate::from_degrees(0., 0.3).lat,
    );

    let mut box_sets = Vec::new();
    let mut nearest_distances = Vec::new();

    for method in ALL_METHODS {
        let dir = tempdir().unwrap();
        let tree = StaticRTree::build(
            &edges,
            &coordinates,
            dir.path().join("random.tree"),
            dir.path().join("random.leaves"),
            method,
        )
        .unwrap();

        let mut ids: Vec<u32> = tree.search_in_box(rect).iter().map(|e| e.edge_id).collect();
        ids.sort_unstable();
        box_sets.push(ids);

        let mut distances: Vec<u64> = tree
            .nearest(query, 25)
            .iter()
            .map(|edge| projected_distance(query, edge, &coordinates))
            .collect();
        distances.sort_unstable();
        nearest_distances.push(distances);
    }

    assert_eq!(box_sets[0], box_sets[1]);
    assert_eq!(box_sets[0], box_sets[2]);
    assert_eq!(nearest_distances[0], nearest_distances[1]);
    assert_eq!(nearest_distances[0], nearest_distances[2]);
}

#[test]
fn reopened_index_matches_the_built_one() {
    let (coordinates, edges) = random_segments(2_000, 5);
    let dir = tempdir().unwrap();
    let tree_path = dir.path().join("random.tree");
    let leaf_path = dir.path().join("random.leaves");

    let built = StaticRTree::build(
        &edges,
        &coordinates,
        &tree_path,
        &leaf_path,
        PackingMethod::default(),
    )
    .unwrap();
    let reopened = StaticRTree::<RoadEdge>::open(&tree_path, &leaf_path, &coordinates).unwrap();

    let query = Coordinate::from_degrees(-0.4, 0.7);
    let from_built: Vec<u32> = built.nearest(query, 40).iter().map(|e| e.edge_id).collect();
    let from_disk: Vec<u32> = reopened.nearest(query, 40).iter().map(|e| e.edge_id).collect();
    assert_eq!(from_built, from_disk);

    let rect = Rectangle::new(
        Coordinate::from_degrees(-0.8, 0.).lon,
        Coordinate::from_degrees(-0.2, 0.).lon,
        Coordinate::from_degrees(0., 0.2).lat,
        Coordinate::from_degrees(0., 0.9).lat,
    );
    let mut box_built: Vec<u32> = built.search_in_box(rect).iter().map(|e| e.edge_id).collect();
    let mut box_disk: Vec<u32> =
        reopened.search_in_box(rect).iter().map(|e| e.edge_id).collect();
    box_built.sort_unstable();
    box_disk.sort_unstable();
    assert_eq!(box_built, box_disk);
}

#[test]
fn leaf_file_obeys_the_page_layout() {
    let (coordinates, edges) = random_segments(4_000, 17);

    for method in ALL_METHODS {
        let dir = tempdir().unwrap();
        let leaf_path = dir.path().join("random.leaves");
        StaticRTree::build(
            &edges,
            &coordinates,
            dir.path().join("random.tree"),
            &leaf_path,
            method,
        )
        .unwrap();

        let file_size = std::fs::metadata(&leaf_path).unwrap().len();
        assert_eq!(file_size % LEAF_PAGE_SIZE as u64, 0, "{method:?}");

        let leaves = LeafStorage::open(&leaf_path).unwrap();
        let mut total = 0u64;
        for index in 0..leaves.leaf_count() {
            let count = leaves.page(index).object_count();
            assert!(count > 0, "{method:?}: empty leaf page {index}");
            assert!(
                count as usize <= leaf_capacity::<RoadEdge>(),
                "{method:?}: overfull leaf page {index}"
            );
            total += u64::from(count);
        }
        assert_eq!(total, edges.len() as u64, "{method:?}");
    }
}

#[test]
fn direction_filters_compose_with_termination() {
    let (coordinates, edges) = random_segments(500, 31);
    let dir = tempdir().unwrap();
    let tree = StaticRTree::build(
        &edges,
        &coordinates,
        dir.path().join("random.tree"),
        dir.path().join("random.leaves"),
        PackingMethod::default(),
    )
    .unwrap();

    let query = Coordinate::from_degrees(0., 0.);

    // Keep only forward travel on even edge ids, stop at five matches.
    let results = tree.nearest_with(
        query,
        |candidate| (candidate.data.edge_id % 2 == 0, false),
        |num_results, _| num_results >= 5,
    );

    assert_eq!(results.len(), 5);
    for edge in &results {
        assert_eq!(edge.edge_id % 2, 0);
        assert!(edge.forward_enabled());
        assert!(!edge.reverse_enabled());
    }

    // Every accepted match is at least as close as the first rejected one
    // would have been: distances still come back sorted.
    let distances: Vec<u64> = results
        .iter()
        .map(|edge| projected_distance(query, edge, &coordinates))
        .collect();
    assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
}
