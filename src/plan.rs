use crate::hyperedge::Hyperedge;
use crate::model::{Assignment, Model};
use crate::problem::{Problem, Weight};
use serde_json::json;
use std::path::Path;

#[derive(Debug)]
pub enum RoutingResult {
    Routed(Routing),
    Infeasible,
}

/// The hyperedges chosen by an optimal assignment.
#[derive(Debug)]
pub struct Routing {
    pub objective: Weight,
    pub hyperedges: Vec<Hyperedge>,
}

impl Routing {
    pub fn from_assignment(model: &Model, assignment: &Assignment) -> Self {
        Routing {
            objective: model.objective_value(assignment),
            hyperedges: assignment
                .selected()
                .filter(|v| *v < model.num_variables())
                .map(|v| model.hyperedge(v).clone())
                .collect(),
        }
    }
}

pub fn hyperedge_string(problem: &Problem, hyperedge: &Hyperedge) -> String {
    let mut s = format!(
        "Hyperedge of weight {}{}:",
        hyperedge.weight(),
        if hyperedge.is_inside() { " (inside)" } else { "" }
    );
    for arc in hyperedge.arcs() {
        s.push_str("\n ");
        s.push_str(&problem.connection_string(arc));
    }
    s
}

pub fn print_routing(problem: &Problem, routing: &Routing) -> String {
    let mut summary = format!("Optimal objective value: {}\n", routing.objective);
    summary.push_str("Chosen hyperedges:\n");
    for h in routing.hyperedges.iter() {
        summary.push_str(&hyperedge_string(problem, h));
        summary.push('\n');
    }
    summary
}

pub fn write_routing_json(filename: &Path, problem: &Problem, routing: &Routing) -> std::io::Result<()> {
    std::fs::write(filename, serde_json::to_string_pretty(&routing_json(problem, routing))?)?;
    Ok(())
}

fn routing_json(problem: &Problem, routing: &Routing) -> serde_json::Value {
    let hyperedges = routing
        .hyperedges
        .iter()
        .map(|h| {
            let arcs = h
                .arcs()
                .iter()
                .map(|a| {
                    json!({
                        "origin": problem.station_name(a.origin),
                        "destination": problem.station_name(a.destination),
                        "arrangement_origin": a.arrangement_origin,
                        "arrangement_destination": a.arrangement_destination,
                        "weight": a.weight,
                        "inside": a.inside,
                    })
                })
                .collect::<Vec<_>>();
            json!({ "weight": h.weight(), "inside": h.is_inside(), "arcs": arcs })
        })
        .collect::<Vec<_>>();
    json!({ "objective": routing.objective, "hyperedges": hyperedges })
}

/// Dumps hyperedges for inspection, smallest bundles first.
pub fn write_hyperedges(filename: &Path, problem: &Problem, hyperedges: &[Hyperedge]) -> std::io::Result<()> {
    let mut sorted = hyperedges.iter().collect::<Vec<_>>();
    sorted.sort_by_key(|h| h.len());
    let text = sorted
        .iter()
        .map(|h| hyperedge_string(problem, h))
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(filename, text)
}
