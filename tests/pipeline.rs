use hyperrail::filter::FilterChain;
use hyperrail::generate::generate_hyperedges;
use hyperrail::hyperedge::Hyperedge;
use hyperrail::model::{build_model, Assignment, Comparison, ConstraintFamily};
use hyperrail::plan::RoutingResult;
use hyperrail::problem::{
    ArrangementSpace, Connection, Instance, Orientation, Problem, TrainArrangement, TrainStation,
};
use hyperrail::solver::Z3Solver;
use hyperrail::{raw_problem, Error, Formulation, PipelineSettings};

fn arr(p: usize) -> TrainArrangement {
    TrainArrangement::new(0, Orientation::Forward, p)
}

fn stations(space: ArrangementSpace, stations: &[(&str, usize)]) -> Problem {
    let mut p = Problem::new(space);
    for (name, len) in stations {
        p.add_station(TrainStation::new(*name, *len, &space).unwrap())
            .unwrap();
    }
    p
}

fn con(o: usize, d: usize, p: usize, w: u64) -> Connection {
    Connection::new(o, d, arr(p), arr(p), w, o == d).unwrap()
}

#[test]
fn single_connection_single_trip() {
    let space = ArrangementSpace::new(1, 1);
    let mut problem = stations(space, &[("A", 1), ("B", 1)]);
    problem.add_trip(0, 1).unwrap();
    let connections = vec![con(0, 1, 0, 5)];

    let generated = generate_hyperedges(&connections, 1, false).unwrap();
    assert_eq!(generated.len(), 1);

    let chain = FilterChain::standard(&problem, PipelineSettings::default());
    let kept = chain.apply(generated, false);
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].weight(), 5);

    let model = build_model(&problem, kept).unwrap();
    let trips = model
        .constraints_of(ConstraintFamily::TripFulfillment)
        .collect::<Vec<_>>();
    assert_eq!(trips.len(), 1);
    assert_eq!(trips[0].expr.terms().collect::<Vec<_>>(), vec![(0, 1)]);
    assert_eq!(trips[0].comparison, Comparison::Eq);
    assert_eq!(trips[0].rhs, 1);
}

#[test]
fn station_length_limits_bundle_size() {
    let space = ArrangementSpace::new(1, 3);
    let problem = stations(space, &[("A", 2), ("B", 3)]);
    let connections = vec![con(0, 1, 0, 1), con(0, 1, 1, 1), con(0, 1, 2, 1)];

    let generated = generate_hyperedges(&connections, 3, false).unwrap();
    let triple = Hyperedge::new(connections.clone()).unwrap();
    assert!(generated.contains(&triple));

    let chain = FilterChain::standard(&problem, PipelineSettings::default());
    assert_eq!(chain.rejected_by(&triple), Some("train length"));

    let kept = chain.apply(generated, false);
    // Only {p0} and {p0, p1} are well positioned.
    assert_eq!(kept.len(), 2);
    assert!(kept.iter().all(|h| h.len() <= 2));
}

#[test]
fn trip_hyperedge_may_not_split() {
    let space = ArrangementSpace::new(1, 2);
    let mut problem = stations(space, &[("A", 2), ("B", 2), ("C", 2)]);
    problem.add_trip(0, 1).unwrap();
    let split = Hyperedge::new(vec![
        Connection::new(0, 1, arr(0), arr(0), 1, false).unwrap(),
        Connection::new(0, 2, arr(1), arr(0), 1, false).unwrap(),
    ])
    .unwrap();
    let chain = FilterChain::standard(&problem, PipelineSettings::default());
    assert_eq!(chain.rejected_by(&split), Some("trip atomicity"));
}

#[test]
fn station_without_inside_bundles_gets_empty_occupancy() {
    let space = ArrangementSpace::new(1, 1);
    let mut problem = stations(space, &[("A", 1), ("B", 1), ("C", 1)]);
    problem.add_trip(0, 1).unwrap();
    let hyperedges = vec![
        Hyperedge::new(vec![con(0, 1, 0, 5)]).unwrap(),
        Hyperedge::new(vec![con(0, 0, 0, 0)]).unwrap(),
    ];
    let model = build_model(&problem, hyperedges).unwrap();
    let c = model
        .constraints_of(ConstraintFamily::SingleInsideOccupancy)
        .find(|c| c.name == "single_inside_C")
        .unwrap();
    assert!(c.expr.is_empty());
    assert_eq!(c.to_string(), "single_inside_C: 0 <= 1");
    assert!(c.is_satisfied(&Assignment::new(vec![true, true])));

    let a = model
        .constraints_of(ConstraintFamily::SingleInsideOccupancy)
        .find(|c| c.name == "single_inside_A")
        .unwrap();
    assert_eq!(a.expr.len(), 1);
}

#[test]
fn missing_hyperedge_fails_before_solving() {
    let space = ArrangementSpace::new(1, 2);
    let mut problem = stations(space, &[("A", 2), ("B", 2)]);
    problem.add_trip(0, 1).unwrap();
    // Only position 1 is offered, which the positioning filter removes.
    let instance = Instance::new(problem, vec![con(0, 1, 1, 3)]).unwrap();
    let r = hyperrail::configure_model(&instance, PipelineSettings::default());
    assert!(matches!(r, Err(Error::UnserviceableTrip { .. })));
}

fn round_trip_instance() -> Instance {
    let space = ArrangementSpace::new(1, 1);
    let mut problem = stations(space, &[("A", 1), ("B", 1)]);
    problem.add_trip(0, 1).unwrap();
    let connections = vec![con(0, 1, 0, 5), con(1, 0, 0, 7), con(0, 0, 0, 0), con(1, 1, 0, 0)];
    Instance::new(problem, connections).unwrap()
}

#[test]
fn solve_round_trip() {
    let instance = round_trip_instance();
    let mut solver = Z3Solver::new();
    let result = hyperrail::solve(&instance, PipelineSettings::default(), &mut solver).unwrap();
    match result {
        RoutingResult::Routed(routing) => {
            assert_eq!(routing.objective, 12);
            assert_eq!(routing.hyperedges.len(), 4);
        }
        RoutingResult::Infeasible => panic!("expected a routing"),
    }
}

#[test]
fn open_trip_is_infeasible() {
    // Without a way back and without rearrangement the flow can't be conserved.
    let space = ArrangementSpace::new(1, 1);
    let mut problem = stations(space, &[("A", 1), ("B", 1)]);
    problem.add_trip(0, 1).unwrap();
    let instance = Instance::new(problem, vec![con(0, 1, 0, 5)]).unwrap();
    let mut solver = Z3Solver::new();
    let result = hyperrail::solve(&instance, PipelineSettings::default(), &mut solver).unwrap();
    assert!(matches!(result, RoutingResult::Infeasible));
}

#[test]
fn parallel_pipeline_builds_same_model() {
    let instance = round_trip_instance();
    let seq = hyperrail::configure_model(&instance, PipelineSettings::default()).unwrap();
    let par = hyperrail::configure_model(
        &instance,
        PipelineSettings {
            parallel: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(seq.hyperedges(), par.hyperedges());
    assert_eq!(seq.constraints(), par.constraints());
}

fn graph() -> PipelineSettings {
    PipelineSettings {
        formulation: Formulation::Graph,
        ..Default::default()
    }
}

#[test]
fn graph_solve_round_trip() {
    let instance = round_trip_instance();
    let mut solver = Z3Solver::new();
    match hyperrail::solve(&instance, graph(), &mut solver).unwrap() {
        RoutingResult::Routed(routing) => {
            assert_eq!(routing.objective, 12);
            assert_eq!(routing.hyperedges.len(), 4);
            assert!(routing.hyperedges.iter().all(|h| h.len() == 1));
        }
        RoutingResult::Infeasible => panic!("expected a routing"),
    }
}

#[test]
fn graph_open_trip_is_infeasible() {
    let space = ArrangementSpace::new(1, 1);
    let mut problem = stations(space, &[("A", 1), ("B", 1)]);
    problem.add_trip(0, 1).unwrap();
    let instance = Instance::new(problem, vec![con(0, 1, 0, 5)]).unwrap();
    let mut solver = Z3Solver::new();
    let result = hyperrail::solve(&instance, graph(), &mut solver).unwrap();
    assert!(matches!(result, RoutingResult::Infeasible));
}

#[test]
fn graph_keeps_unfiltered_connections() {
    // The hypergraph pipeline drops the lone position 1 connection; the
    // graph model keeps it and only bounds positions.
    let space = ArrangementSpace::new(1, 2);
    let mut problem = stations(space, &[("A", 2), ("B", 2)]);
    problem.add_trip(0, 1).unwrap();
    let instance = Instance::new(problem, vec![con(0, 1, 1, 3)]).unwrap();
    let model = hyperrail::configure_model(&instance, graph()).unwrap();
    assert_eq!(model.num_variables(), 1);
    let front = model
        .constraints_of(ConstraintFamily::Positioning)
        .find(|c| c.name == "position_A_B_1")
        .unwrap();
    assert!(!front.is_satisfied(&Assignment::new(vec![true])));
}

#[test]
fn five_station_instance_builds() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("instances/five_stations.json");
    let raw = raw_problem::read_instance(&path).unwrap();
    let instance = raw_problem::convert(&raw).unwrap();
    assert_eq!(instance.problem.stations.len(), 5);
    assert_eq!(instance.problem.trips.len(), 6);

    let model = hyperrail::configure_model(&instance, PipelineSettings::default()).unwrap();
    assert_eq!(model.constraints_of(ConstraintFamily::TripFulfillment).count(), 6);
    assert_eq!(model.constraints_of(ConstraintFamily::SingleInsideOccupancy).count(), 5);
    // 5 stations x 6 arrangements x 2
    assert_eq!(model.constraints_of(ConstraintFamily::FlowConservation).count(), 60);

    let graph_model = hyperrail::configure_model(&instance, graph()).unwrap();
    assert_eq!(graph_model.num_variables(), instance.connections.len());
    assert_eq!(graph_model.constraints_of(ConstraintFamily::TripFulfillment).count(), 6);
    assert_eq!(graph_model.constraints_of(ConstraintFamily::FlowConservation).count(), 60);
    assert_eq!(graph_model.constraints_of(ConstraintFamily::TrainLength).count(), 5);
    assert_eq!(graph_model.constraints_of(ConstraintFamily::SingleInsideOccupancy).count(), 0);
}
