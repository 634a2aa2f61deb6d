use crate::error::Error;
use crate::problem::{
    ArrangementSpace, Connection, Instance, Orientation, Problem, TrainArrangement, TrainStation,
    Weight,
};
use crate::supply;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

#[derive(Serialize, Deserialize, Debug)]
pub struct RawInstance {
    pub train_types: usize,
    pub max_train_length: usize,
    pub stations: Vec<RawStation>,
    pub trips: Vec<RawTrip>,
    #[serde(default)]
    pub distances: Vec<RawDistance>,
    #[serde(default)]
    pub connections: Vec<RawConnectionRule>,
    /// Add position preserving turns along every trip with a known distance.
    #[serde(default = "default_true")]
    pub trip_turns: bool,
    /// Add deadhead trips between all connected stations, weighted by
    /// distance plus this surcharge.
    #[serde(default)]
    pub deadhead_surcharge: Option<Weight>,
}

fn default_true() -> bool {
    true
}

fn default_length() -> usize {
    1
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawStation {
    pub name: String,
    #[serde(default = "default_length")]
    pub max_train_length: usize,
    #[serde(default)]
    pub allowed_arrangements: Option<Vec<TrainArrangement>>,
    #[serde(default)]
    pub disallowed_arrangements: Vec<TrainArrangement>,
    #[serde(default)]
    pub discard: Option<RawDiscard>,
}

#[derive(Serialize, Deserialize, Debug, Default)]
pub struct RawDiscard {
    #[serde(default)]
    pub types: Vec<usize>,
    #[serde(default)]
    pub orientations: Vec<Orientation>,
    #[serde(default)]
    pub positions: Vec<usize>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawTrip {
    pub origin: String,
    pub destination: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawDistance {
    pub origin: String,
    pub destination: String,
    pub distance: Weight,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Turn,
    Turnaround,
    Deadhead,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RawConnectionRule {
    pub kind: ConnectionKind,
    pub origin: String,
    pub destination: String,
    pub weight: Weight,
    #[serde(default = "default_true")]
    pub preserve_position: bool,
    /// Defaults to true for connections within one station.
    #[serde(default)]
    pub inside: Option<bool>,
}

pub fn read_instance(path: &Path) -> Result<RawInstance, Error> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn convert(raw: &RawInstance) -> Result<Instance, Error> {
    if raw.train_types == 0 || raw.max_train_length == 0 {
        return Err(Error::InvalidInstance(
            "train_types and max_train_length must be positive".to_string(),
        ));
    }
    let space = ArrangementSpace::new(raw.train_types, raw.max_train_length);
    let mut problem = Problem::new(space);

    for s in raw.stations.iter() {
        let mut station = TrainStation::new(s.name.clone(), s.max_train_length, &space)?;
        if let Some(allowed) = s.allowed_arrangements.as_ref() {
            station = station.restrict_to(allowed.iter().copied(), &space)?;
        }
        station = station.disallow(s.disallowed_arrangements.iter().copied());
        if let Some(d) = s.discard.as_ref() {
            station = station.discard_arrangements_by(&d.types, &d.orientations, &d.positions);
        }
        problem.add_station(station)?;
    }

    for trip in raw.trips.iter() {
        let origin = problem.station_by_name(&trip.origin)?;
        let destination = problem.station_by_name(&trip.destination)?;
        problem.add_trip(origin, destination)?;
    }

    let mut distances = BTreeMap::new();
    for d in raw.distances.iter() {
        let key = (
            problem.station_by_name(&d.origin)?,
            problem.station_by_name(&d.destination)?,
        );
        if distances.insert(key, d.distance).is_some() {
            warn!("Distance {} -> {} given twice", d.origin, d.destination);
        }
    }

    let mut connections: BTreeSet<Connection> = BTreeSet::new();

    if raw.trip_turns {
        for trip in problem.trips.iter() {
            if let Some(dist) = distances.get(&(trip.origin, trip.destination)) {
                connections.extend(supply::trip_turns(trip, *dist)?);
            } else {
                warn!(
                    "No distance for trip {} -> {}",
                    problem.station_name(trip.origin),
                    problem.station_name(trip.destination)
                );
            }
        }
    }

    for rule in raw.connections.iter() {
        let origin = problem.station_by_name(&rule.origin)?;
        let destination = problem.station_by_name(&rule.destination)?;
        let inside = rule.inside.unwrap_or(origin == destination);
        let new = match rule.kind {
            ConnectionKind::Turn => supply::turns(
                &problem,
                origin,
                destination,
                rule.weight,
                rule.preserve_position,
                inside,
            )?,
            ConnectionKind::Turnaround => supply::turnarounds(
                &problem,
                origin,
                destination,
                rule.weight,
                rule.preserve_position,
                inside,
            )?,
            ConnectionKind::Deadhead => {
                supply::deadheads(&problem, origin, destination, rule.weight, inside)?
            }
        };
        trace!(
            "{:?} {} -> {}: {} connections",
            rule.kind,
            rule.origin,
            rule.destination,
            new.len()
        );
        connections.extend(new);
    }

    if let Some(surcharge) = raw.deadhead_surcharge {
        for ((origin, destination), dist) in distances.iter() {
            if origin == destination {
                continue;
            }
            let weight = dist.checked_add(surcharge).ok_or_else(|| {
                Error::InvalidInstance(format!(
                    "deadhead weight {} -> {} overflows",
                    problem.station_name(*origin),
                    problem.station_name(*destination)
                ))
            })?;
            connections.extend(supply::deadheads(
                &problem,
                *origin,
                *destination,
                weight,
                false,
            )?);
        }
    }

    debug!(
        "Converted instance with {} stations, {} trips, {} connections",
        problem.stations.len(),
        problem.trips.len(),
        connections.len()
    );

    let instance = Instance::new(problem, connections.into_iter().collect())?;
    instance.check_trips_connected()?;
    Ok(instance)
}
