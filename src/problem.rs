use crate::error::Error;
use log::*;
use std::collections::BTreeSet;
use std::fmt;

pub type StationId = usize;
pub type Weight = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Forward,
    Backward,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Orientation::Forward, Orientation::Backward];

    pub fn flipped(self) -> Orientation {
        match self {
            Orientation::Forward => Orientation::Backward,
            Orientation::Backward => Orientation::Forward,
        }
    }
}

/// Describes how a single train sits within a composition at a station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct TrainArrangement {
    pub train_type: usize,
    pub orientation: Orientation,
    pub position: usize,
}

impl TrainArrangement {
    pub fn new(train_type: usize, orientation: Orientation, position: usize) -> Self {
        TrainArrangement {
            train_type,
            orientation,
            position,
        }
    }
}

impl fmt::Display for TrainArrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = match self.orientation {
            Orientation::Forward => 'F',
            Orientation::Backward => 'B',
        };
        write!(f, "({},{},{})", self.train_type, o, self.position)
    }
}

/// The finite universe of arrangements, `train_types × 2 × max_train_length`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrangementSpace {
    pub train_types: usize,
    pub max_train_length: usize,
}

impl ArrangementSpace {
    pub fn new(train_types: usize, max_train_length: usize) -> Self {
        ArrangementSpace {
            train_types,
            max_train_length,
        }
    }

    pub fn contains(&self, arrangement: &TrainArrangement) -> bool {
        arrangement.train_type < self.train_types && arrangement.position < self.max_train_length
    }

    pub fn arrangements(&self) -> impl Iterator<Item = TrainArrangement> + '_ {
        (0..self.train_types).flat_map(move |t| {
            Orientation::ALL.iter().flat_map(move |o| {
                (0..self.max_train_length).map(move |p| TrainArrangement::new(t, *o, p))
            })
        })
    }

    pub fn len(&self) -> usize {
        self.train_types * 2 * self.max_train_length
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct TrainStation {
    pub name: String,
    pub max_train_length: usize,
    pub allowed_arrangements: BTreeSet<TrainArrangement>,
}

impl TrainStation {
    /// A station that permits every arrangement of the space.
    pub fn new(
        name: impl Into<String>,
        max_train_length: usize,
        space: &ArrangementSpace,
    ) -> Result<Self, Error> {
        let name = name.into();
        if max_train_length > space.max_train_length {
            return Err(Error::StationTooLong {
                station: name,
                max_train_length,
                global_max: space.max_train_length,
            });
        }
        Ok(TrainStation {
            name,
            max_train_length,
            allowed_arrangements: space.arrangements().collect(),
        })
    }

    /// Replaces the permitted arrangements by an explicit list.
    pub fn restrict_to(
        mut self,
        arrangements: impl IntoIterator<Item = TrainArrangement>,
        space: &ArrangementSpace,
    ) -> Result<Self, Error> {
        let arrangements = arrangements.into_iter().collect::<BTreeSet<_>>();
        if let Some(a) = arrangements.iter().find(|a| !space.contains(a)) {
            return Err(Error::ArrangementOutOfRange {
                station: self.name,
                arrangement: a.to_string(),
            });
        }
        self.allowed_arrangements = arrangements;
        Ok(self)
    }

    pub fn disallow(mut self, arrangements: impl IntoIterator<Item = TrainArrangement>) -> Self {
        for a in arrangements {
            self.allowed_arrangements.remove(&a);
        }
        self
    }

    /// Removes every arrangement matching one of the given types, orientations or positions.
    pub fn discard_arrangements_by(
        mut self,
        types: &[usize],
        orientations: &[Orientation],
        positions: &[usize],
    ) -> Self {
        self.allowed_arrangements.retain(|a| {
            !types.contains(&a.train_type)
                && !orientations.contains(&a.orientation)
                && !positions.contains(&a.position)
        });
        self
    }

    pub fn allows(&self, arrangement: &TrainArrangement) -> bool {
        self.allowed_arrangements.contains(arrangement)
    }
}

/// A directed, weighted movement of one train between two (station, arrangement) states.
///
/// The derived ordering (origin, destination, arrangements, weight, inside)
/// is the canonical order used for hyperedge identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Connection {
    pub origin: StationId,
    pub destination: StationId,
    pub arrangement_origin: TrainArrangement,
    pub arrangement_destination: TrainArrangement,
    pub weight: Weight,
    pub inside: bool,
}

impl Connection {
    pub fn new(
        origin: StationId,
        destination: StationId,
        arrangement_origin: TrainArrangement,
        arrangement_destination: TrainArrangement,
        weight: Weight,
        inside: bool,
    ) -> Result<Self, Error> {
        if inside && origin != destination {
            return Err(Error::InsideConnectionBetweenStations {
                origin,
                destination,
            });
        }
        Ok(Connection {
            origin,
            destination,
            arrangement_origin,
            arrangement_destination,
            weight,
            inside,
        })
    }
}

/// A timeless timetable trip between two stations.
#[derive(Debug, Clone)]
pub struct TimeTableTrip {
    pub origin: StationId,
    pub destination: StationId,
    /// Arrangements permitted at both ends.
    pub allowed_arrangements: BTreeSet<TrainArrangement>,
}

#[derive(Debug, Clone)]
pub struct Problem {
    pub space: ArrangementSpace,
    pub stations: Vec<TrainStation>,
    pub trips: Vec<TimeTableTrip>,
}

impl Problem {
    pub fn new(space: ArrangementSpace) -> Self {
        Problem {
            space,
            stations: Vec::new(),
            trips: Vec::new(),
        }
    }

    pub fn max_train_length(&self) -> usize {
        self.space.max_train_length
    }

    pub fn add_station(&mut self, station: TrainStation) -> Result<StationId, Error> {
        if self.station_id(&station.name).is_some() {
            return Err(Error::DuplicateStation(station.name));
        }
        if station.max_train_length > self.space.max_train_length {
            return Err(Error::StationTooLong {
                station: station.name,
                max_train_length: station.max_train_length,
                global_max: self.space.max_train_length,
            });
        }
        if let Some(a) = station
            .allowed_arrangements
            .iter()
            .find(|a| !self.space.contains(a))
        {
            return Err(Error::ArrangementOutOfRange {
                arrangement: a.to_string(),
                station: station.name,
            });
        }
        trace!(
            "Station {} max length {} with {} arrangements",
            station.name,
            station.max_train_length,
            station.allowed_arrangements.len()
        );
        self.stations.push(station);
        Ok(self.stations.len() - 1)
    }

    pub fn add_trip(&mut self, origin: StationId, destination: StationId) -> Result<usize, Error> {
        let (a, b) = match (self.stations.get(origin), self.stations.get(destination)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(Error::InvalidInstance(format!(
                    "trip between unknown stations {} and {}",
                    origin, destination
                )))
            }
        };
        let allowed_arrangements = a
            .allowed_arrangements
            .intersection(&b.allowed_arrangements)
            .copied()
            .collect();
        self.trips.push(TimeTableTrip {
            origin,
            destination,
            allowed_arrangements,
        });
        Ok(self.trips.len() - 1)
    }

    pub fn station(&self, id: StationId) -> &TrainStation {
        &self.stations[id]
    }

    pub fn station_id(&self, name: &str) -> Option<StationId> {
        self.stations.iter().position(|s| s.name == name)
    }

    pub fn station_by_name(&self, name: &str) -> Result<StationId, Error> {
        self.station_id(name)
            .ok_or_else(|| Error::UnknownStation(name.to_string()))
    }

    pub fn station_name(&self, id: StationId) -> &str {
        self.stations.get(id).map(|s| s.name.as_str()).unwrap_or("?")
    }

    pub fn connection_string(&self, c: &Connection) -> String {
        format!(
            "{} -> {} with {} --{}--> {}{}",
            self.station_name(c.origin),
            self.station_name(c.destination),
            c.arrangement_origin,
            c.weight,
            c.arrangement_destination,
            if c.inside { " (inside)" } else { "" }
        )
    }

    /// Checks that every connection refers to known stations and arrangements
    /// permitted by its endpoints.
    pub fn check_connection(&self, c: &Connection) -> Result<(), Error> {
        let (origin, destination) = match (self.stations.get(c.origin), self.stations.get(c.destination)) {
            (Some(o), Some(d)) => (o, d),
            _ => {
                return Err(Error::InvalidInstance(format!(
                    "connection between unknown stations {} and {}",
                    c.origin, c.destination
                )))
            }
        };
        if !origin.allows(&c.arrangement_origin) {
            return Err(Error::ArrangementOutOfRange {
                station: origin.name.clone(),
                arrangement: c.arrangement_origin.to_string(),
            });
        }
        if !destination.allows(&c.arrangement_destination) {
            return Err(Error::ArrangementOutOfRange {
                station: destination.name.clone(),
                arrangement: c.arrangement_destination.to_string(),
            });
        }
        Ok(())
    }
}

/// A problem together with its universe of primitive connections.
#[derive(Debug, Clone)]
pub struct Instance {
    pub problem: Problem,
    pub connections: Vec<Connection>,
}

impl Instance {
    pub fn new(problem: Problem, connections: Vec<Connection>) -> Result<Self, Error> {
        for c in connections.iter() {
            problem.check_connection(c)?;
        }
        Ok(Instance {
            problem,
            connections,
        })
    }

    /// Every trip needs at least one connection between its endpoints.
    pub fn check_trips_connected(&self) -> Result<(), Error> {
        for trip in self.problem.trips.iter() {
            let serviced = self
                .connections
                .iter()
                .any(|c| c.origin == trip.origin && c.destination == trip.destination && !c.inside);
            if !serviced {
                return Err(Error::TripNotConnected {
                    origin: self.problem.station_name(trip.origin).to_string(),
                    destination: self.problem.station_name(trip.destination).to_string(),
                });
            }
        }
        Ok(())
    }
}
