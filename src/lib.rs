//! Train composition routing on hypergraphs.
//!
//! Primitive connections are bundled into hyperedges per station pair,
//! pruned by admissibility filters and turned into a 0/1 program whose
//! optimum selects the cheapest set of bundles servicing every timetable
//! trip.

pub mod error;
pub mod filter;
pub mod generate;
pub mod graph;
pub mod hyperedge;
pub mod model;
pub mod plan;
pub mod problem;
pub mod raw_problem;
pub mod solver;
pub mod supply;

pub use error::Error;

use hyperedge::Hyperedge;
use log::*;
use model::Model;
use plan::{Routing, RoutingResult};
use problem::Instance;
use solver::{IlpSolver, SolveOutcome};

/// Which integer program is built from an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Formulation {
    /// One variable per admissible hyperedge.
    Hypergraph,
    /// One variable per connection, with train length and positioning
    /// bounds instead of bundles.
    Graph,
}

impl Default for Formulation {
    fn default() -> Self {
        Formulation::Hypergraph
    }
}

impl std::str::FromStr for Formulation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hypergraph" => Ok(Formulation::Hypergraph),
            "graph" => Ok(Formulation::Graph),
            other => Err(format!("unknown formulation '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PipelineSettings {
    pub formulation: Formulation,
    /// Generate and filter buckets on the rayon thread pool.
    pub parallel: bool,
    /// Add the composition preserving filter for trip hyperedges.
    pub preserve_trip_composition: bool,
}

pub fn filtered_hyperedges(
    instance: &Instance,
    settings: PipelineSettings,
) -> Result<Vec<Hyperedge>, Error> {
    let hyperedges = generate::generate_hyperedges(
        &instance.connections,
        instance.problem.max_train_length(),
        settings.parallel,
    )?;
    let chain = filter::FilterChain::standard(&instance.problem, settings);
    Ok(chain.apply(hyperedges, settings.parallel))
}

pub fn configure_model(instance: &Instance, settings: PipelineSettings) -> Result<Model, Error> {
    match settings.formulation {
        Formulation::Hypergraph => {
            let hyperedges = filtered_hyperedges(instance, settings)?;
            model::build_model(&instance.problem, hyperedges)
        }
        Formulation::Graph => graph::build_graph_model(&instance.problem, &instance.connections),
    }
}

pub fn solve<S: IlpSolver>(
    instance: &Instance,
    settings: PipelineSettings,
    solver: &mut S,
) -> Result<RoutingResult, Error> {
    let model = configure_model(instance, settings)?;
    solve_model(&model, solver)
}

pub fn solve_model<S: IlpSolver>(model: &Model, solver: &mut S) -> Result<RoutingResult, Error> {
    info!("Solving with {}", solver.name());
    let outcome = {
        let _p = hprof::enter("solve");
        solver.solve(model)?
    };
    match outcome {
        SolveOutcome::Optimal(assignment) => {
            if let Some(c) = model.violated_constraint(&assignment) {
                return Err(Error::Solver(format!(
                    "{} returned an assignment violating {}",
                    solver.name(),
                    c
                )));
            }
            Ok(RoutingResult::Routed(Routing::from_assignment(model, &assignment)))
        }
        SolveOutcome::Infeasible => Ok(RoutingResult::Infeasible),
    }
}
