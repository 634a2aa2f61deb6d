//! Integer program over the admissible hyperedges.
//!
//! One binary variable per hyperedge (in canonical hyperedge order), a
//! minimization objective over the hyperedge weights and three constraint
//! families: trip fulfillment, flow conservation and single intra-station
//! occupancy.

use crate::error::Error;
use crate::hyperedge::Hyperedge;
use crate::problem::{Problem, StationId, TrainArrangement, Weight};
use log::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type VarId = usize;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinearExpr {
    terms: BTreeMap<VarId, i64>,
}

impl LinearExpr {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        let mut e = LinearExpr::new();
        for v in vars {
            e.add_term(v, 1);
        }
        e
    }

    pub fn add_term(&mut self, var: VarId, coefficient: i64) {
        let c = self.terms.entry(var).or_insert(0);
        *c += coefficient;
        if *c == 0 {
            self.terms.remove(&var);
        }
    }

    pub fn terms(&self) -> impl Iterator<Item = (VarId, i64)> + '_ {
        self.terms.iter().map(|(v, c)| (*v, *c))
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn evaluate(&self, assignment: &Assignment) -> i64 {
        self.terms()
            .filter(|(v, _)| assignment.value(*v))
            .map(|(_, c)| c)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    LessEq,
    Eq,
    GreaterEq,
}

impl Comparison {
    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            Comparison::LessEq => lhs <= rhs,
            Comparison::Eq => lhs == rhs,
            Comparison::GreaterEq => lhs >= rhs,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Comparison::LessEq => "<=",
            Comparison::Eq => "==",
            Comparison::GreaterEq => ">=",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstraintFamily {
    TripFulfillment,
    FlowConservation,
    SingleInsideOccupancy,
    TrainLength,
    Positioning,
}

impl ConstraintFamily {
    pub const ALL: [ConstraintFamily; 5] = [
        ConstraintFamily::TripFulfillment,
        ConstraintFamily::FlowConservation,
        ConstraintFamily::SingleInsideOccupancy,
        ConstraintFamily::TrainLength,
        ConstraintFamily::Positioning,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub name: String,
    pub family: ConstraintFamily,
    pub expr: LinearExpr,
    pub comparison: Comparison,
    pub rhs: i64,
}

impl Constraint {
    pub fn is_satisfied(&self, assignment: &Assignment) -> bool {
        self.comparison.holds(self.expr.evaluate(assignment), self.rhs)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.name)?;
        if self.expr.is_empty() {
            write!(f, "0")?;
        }
        for (i, (v, c)) in self.expr.terms().enumerate() {
            let sign = if c < 0 { "- " } else if i > 0 { "+ " } else { "" };
            let c = c.abs();
            if i > 0 {
                write!(f, " ")?;
            }
            if c == 1 {
                write!(f, "{}x{}", sign, v)?;
            } else {
                write!(f, "{}{} x{}", sign, c, v)?;
            }
        }
        write!(f, " {} {}", self.comparison, self.rhs)
    }
}

/// A 0/1 value per model variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    values: Vec<bool>,
}

impl Assignment {
    pub fn new(values: Vec<bool>) -> Self {
        Assignment { values }
    }

    pub fn value(&self, var: VarId) -> bool {
        self.values.get(var).copied().unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn selected(&self) -> impl Iterator<Item = VarId> + '_ {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, x)| **x)
            .map(|(v, _)| v)
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    variables: Vec<Hyperedge>,
    constraints: Vec<Constraint>,
}

impl Model {
    pub(crate) fn new(variables: Vec<Hyperedge>, constraints: Vec<Constraint>) -> Self {
        let model = Model {
            variables,
            constraints,
        };
        for family in ConstraintFamily::ALL.iter() {
            let count = model.constraints_of(*family).count();
            if count > 0 {
                debug!("{:?}: {} constraints", family, count);
            }
        }
        model
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn hyperedge(&self, var: VarId) -> &Hyperedge {
        &self.variables[var]
    }

    pub fn hyperedges(&self) -> &[Hyperedge] {
        &self.variables
    }

    /// Objective coefficients, to be minimized.
    pub fn objective(&self) -> impl Iterator<Item = (VarId, Weight)> + '_ {
        self.variables.iter().enumerate().map(|(v, h)| (v, h.weight()))
    }

    pub fn objective_value(&self, assignment: &Assignment) -> Weight {
        self.objective()
            .filter(|(v, _)| assignment.value(*v))
            .map(|(_, w)| w)
            .sum()
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraints_of(&self, family: ConstraintFamily) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.family == family)
    }

    /// The first constraint violated by the assignment, if any.
    pub fn violated_constraint(&self, assignment: &Assignment) -> Option<&Constraint> {
        self.constraints.iter().find(|c| !c.is_satisfied(assignment))
    }
}

/// Builds the model, failing before any constraint is emitted if a trip
/// has no admissible hyperedge.
pub fn build_model(
    problem: &Problem,
    hyperedges: impl IntoIterator<Item = Hyperedge>,
) -> Result<Model, Error> {
    let _p = hprof::enter("build model");
    let variables = hyperedges
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect::<Vec<_>>();
    debug!("Generated {} variables", variables.len());

    let mut constraints = fulfill_timetable_trips(problem, &variables)?;
    constraints.extend(flow_constraints(problem, &variables));
    constraints.extend(single_inside_hyperedge(problem, &variables));

    Ok(Model::new(variables, constraints))
}

fn fulfill_timetable_trips(
    problem: &Problem,
    variables: &[Hyperedge],
) -> Result<Vec<Constraint>, Error> {
    let mut constraints = Vec::new();
    for trip in problem.trips.iter() {
        let candidates = variables
            .iter()
            .enumerate()
            .filter(|(_, h)| !h.is_inside() && h.has_arc_from_to(trip.origin, trip.destination))
            .map(|(v, _)| v)
            .collect::<Vec<_>>();
        let origin = problem.station_name(trip.origin);
        let destination = problem.station_name(trip.destination);
        if candidates.is_empty() {
            warn!("Trip {} -> {} has no admissible hyperedge", origin, destination);
            return Err(Error::UnserviceableTrip {
                origin: origin.to_string(),
                destination: destination.to_string(),
            });
        }
        trace!(
            "Trip {} -> {}: {} candidate hyperedges",
            origin,
            destination,
            candidates.len()
        );
        constraints.push(Constraint {
            name: format!("trip_{}_{}", origin, destination),
            family: ConstraintFamily::TripFulfillment,
            expr: LinearExpr::sum(candidates),
            comparison: Comparison::Eq,
            rhs: 1,
        });
    }
    Ok(constraints)
}

#[derive(Default)]
struct NodeIncidence {
    inside_into: BTreeSet<VarId>,
    inside_out: BTreeSet<VarId>,
    outside_into: BTreeSet<VarId>,
    outside_out: BTreeSet<VarId>,
}

pub(crate) fn flow_constraints(problem: &Problem, variables: &[Hyperedge]) -> Vec<Constraint> {
    // Which hyperedges enter and leave each (station, arrangement) node.
    let mut nodes: BTreeMap<(StationId, TrainArrangement), NodeIncidence> = BTreeMap::new();
    for (v, h) in variables.iter().enumerate() {
        for arc in h.arcs() {
            let out = nodes.entry((arc.origin, arc.arrangement_origin)).or_default();
            if h.is_inside() {
                out.inside_out.insert(v);
            } else {
                out.outside_out.insert(v);
            }
            let into = nodes
                .entry((arc.destination, arc.arrangement_destination))
                .or_default();
            if h.is_inside() {
                into.inside_into.insert(v);
            } else {
                into.outside_into.insert(v);
            }
        }
    }

    let empty = NodeIncidence::default();
    let mut constraints = Vec::new();
    for (station_id, station) in problem.stations.iter().enumerate() {
        for arrangement in station.allowed_arrangements.iter() {
            let node = nodes.get(&(station_id, *arrangement)).unwrap_or(&empty);

            // Trains arriving from outside are rearranged inside before leaving.
            let mut arriving = LinearExpr::sum(node.outside_into.iter().copied());
            for v in node.inside_out.iter() {
                arriving.add_term(*v, -1);
            }
            constraints.push(Constraint {
                name: format!("flow_in_{}_{}", station.name, arrangement),
                family: ConstraintFamily::FlowConservation,
                expr: arriving,
                comparison: Comparison::Eq,
                rhs: 0,
            });

            let mut departing = LinearExpr::sum(node.inside_into.iter().copied());
            for v in node.outside_out.iter() {
                departing.add_term(*v, -1);
            }
            constraints.push(Constraint {
                name: format!("flow_out_{}_{}", station.name, arrangement),
                family: ConstraintFamily::FlowConservation,
                expr: departing,
                comparison: Comparison::Eq,
                rhs: 0,
            });
        }
    }
    constraints
}

fn single_inside_hyperedge(problem: &Problem, variables: &[Hyperedge]) -> Vec<Constraint> {
    problem
        .stations
        .iter()
        .enumerate()
        .map(|(station_id, station)| {
            let inside = variables
                .iter()
                .enumerate()
                .filter(|(_, h)| h.is_inside() && h.comes_from_station(station_id))
                .map(|(v, _)| v);
            Constraint {
                name: format!("single_inside_{}", station.name),
                family: ConstraintFamily::SingleInsideOccupancy,
                expr: LinearExpr::sum(inside),
                comparison: Comparison::LessEq,
                rhs: 1,
            }
        })
        .collect()
}
