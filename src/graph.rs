//! Connection-level integer program.
//!
//! Every primitive connection gets its own binary variable. Coupling is not
//! modelled by bundles here; instead the number of trains entering a station
//! and the positions they leave from are bounded directly. Variables are
//! represented as single-connection hyperedges so the model, solver and
//! routing output are shared with the hypergraph formulation.

use crate::error::Error;
use crate::hyperedge::Hyperedge;
use crate::model::{self, Comparison, Constraint, ConstraintFamily, LinearExpr, Model, VarId};
use crate::problem::{Connection, Problem, StationId};
use log::*;
use std::collections::{BTreeMap, BTreeSet};

pub fn build_graph_model(problem: &Problem, connections: &[Connection]) -> Result<Model, Error> {
    let _p = hprof::enter("build graph model");
    let variables = connections
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|c| Hyperedge::new(vec![*c]))
        .collect::<Result<Vec<_>, _>>()?;
    debug!("Generated {} connection variables", variables.len());

    let mut constraints = cover_timetable_trips(problem, &variables)?;
    constraints.extend(model::flow_constraints(problem, &variables));
    constraints.extend(train_length(problem, &variables));
    constraints.extend(positioning(problem, &variables));
    Ok(Model::new(variables, constraints))
}

fn arc(h: &Hyperedge) -> &Connection {
    &h.arcs()[0]
}

fn cover_timetable_trips(
    problem: &Problem,
    variables: &[Hyperedge],
) -> Result<Vec<Constraint>, Error> {
    let mut constraints = Vec::new();
    for trip in problem.trips.iter() {
        let candidates = variables
            .iter()
            .enumerate()
            .filter(|(_, h)| {
                let a = arc(h);
                !a.inside && a.origin == trip.origin && a.destination == trip.destination
            })
            .map(|(v, _)| v)
            .collect::<Vec<_>>();
        let origin = problem.station_name(trip.origin);
        let destination = problem.station_name(trip.destination);
        if candidates.is_empty() {
            warn!("Trip {} -> {} has no connection", origin, destination);
            return Err(Error::UnserviceableTrip {
                origin: origin.to_string(),
                destination: destination.to_string(),
            });
        }
        // Several trains may share a trip, so at least one is required.
        constraints.push(Constraint {
            name: format!("trip_{}_{}", origin, destination),
            family: ConstraintFamily::TripFulfillment,
            expr: LinearExpr::sum(candidates),
            comparison: Comparison::GreaterEq,
            rhs: 1,
        });
    }
    Ok(constraints)
}

fn train_length(problem: &Problem, variables: &[Hyperedge]) -> Vec<Constraint> {
    problem
        .stations
        .iter()
        .enumerate()
        .map(|(station_id, station)| {
            let arriving = variables
                .iter()
                .enumerate()
                .filter(|(_, h)| !arc(h).inside && arc(h).destination == station_id)
                .map(|(v, _)| v);
            Constraint {
                name: format!("length_{}", station.name),
                family: ConstraintFamily::TrainLength,
                expr: LinearExpr::sum(arriving),
                comparison: Comparison::LessEq,
                rhs: station.max_train_length as i64,
            }
        })
        .collect()
}

/// Per station pair: at most one train leaves from the front position, and
/// every position is filled at least as often as the one behind it.
fn positioning(problem: &Problem, variables: &[Hyperedge]) -> Vec<Constraint> {
    let len = problem.max_train_length();
    let mut pairs: BTreeMap<(StationId, StationId), Vec<Vec<VarId>>> = BTreeMap::new();
    for (v, h) in variables.iter().enumerate() {
        let a = arc(h);
        if a.inside {
            continue;
        }
        let positions = pairs
            .entry((a.origin, a.destination))
            .or_insert_with(|| vec![Vec::new(); len]);
        let position = a.arrangement_origin.position;
        if positions.len() <= position {
            positions.resize(position + 1, Vec::new());
        }
        positions[position].push(v);
    }

    let mut constraints = Vec::new();
    for ((origin, destination), positions) in pairs {
        let pair = format!(
            "{}_{}",
            problem.station_name(origin),
            problem.station_name(destination)
        );
        constraints.push(Constraint {
            name: format!("position_{}_0", pair),
            family: ConstraintFamily::Positioning,
            expr: LinearExpr::sum(positions[0].iter().copied()),
            comparison: Comparison::LessEq,
            rhs: 1,
        });
        for (i, window) in positions.windows(2).enumerate() {
            let mut expr = LinearExpr::sum(window[0].iter().copied());
            for v in window[1].iter() {
                expr.add_term(*v, -1);
            }
            constraints.push(Constraint {
                name: format!("position_{}_{}", pair, i + 1),
                family: ConstraintFamily::Positioning,
                expr,
                comparison: Comparison::GreaterEq,
                rhs: 0,
            });
        }
    }
    constraints
}
