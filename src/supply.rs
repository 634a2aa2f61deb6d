//! Primitive connections between stations: turns, turnarounds and deadhead trips.

use crate::error::Error;
use crate::problem::{Connection, Problem, StationId, TimeTableTrip, Weight};

/// Direct turns between two stations.
///
/// With `preserve_position` each arrangement allowed at both ends maps to
/// itself, which rules out coupling and uncoupling. Otherwise any two
/// arrangements of equal type and orientation are connected.
pub fn turns(
    problem: &Problem,
    origin: StationId,
    destination: StationId,
    weight: Weight,
    preserve_position: bool,
    inside: bool,
) -> Result<Vec<Connection>, Error> {
    let (o, d) = (problem.station(origin), problem.station(destination));
    if preserve_position {
        o.allowed_arrangements
            .intersection(&d.allowed_arrangements)
            .map(|a| Connection::new(origin, destination, *a, *a, weight, inside))
            .collect()
    } else {
        let mut connections = Vec::new();
        for ao in o.allowed_arrangements.iter() {
            for ad in d.allowed_arrangements.iter() {
                if ao.train_type == ad.train_type && ao.orientation == ad.orientation {
                    connections.push(Connection::new(origin, destination, *ao, *ad, weight, inside)?);
                }
            }
        }
        Ok(connections)
    }
}

/// Turns servicing a timetable trip, one per arrangement permitted at both
/// ends of the trip.
pub fn trip_turns(trip: &TimeTableTrip, weight: Weight) -> Result<Vec<Connection>, Error> {
    trip.allowed_arrangements
        .iter()
        .map(|a| Connection::new(trip.origin, trip.destination, *a, *a, weight, false))
        .collect()
}

/// Turns that flip the orientation of the train.
pub fn turnarounds(
    problem: &Problem,
    origin: StationId,
    destination: StationId,
    weight: Weight,
    preserve_position: bool,
    inside: bool,
) -> Result<Vec<Connection>, Error> {
    let (o, d) = (problem.station(origin), problem.station(destination));
    let mut connections = Vec::new();
    for ao in o.allowed_arrangements.iter() {
        for ad in d.allowed_arrangements.iter() {
            if ao.train_type == ad.train_type
                && ao.orientation.flipped() == ad.orientation
                && (ao.position == ad.position || !preserve_position)
            {
                connections.push(Connection::new(origin, destination, *ao, *ad, weight, inside)?);
            }
        }
    }
    Ok(connections)
}

/// Deadhead trips keep the train type and may change orientation and
/// position, like a turnaround without position preservation.
pub fn deadheads(
    problem: &Problem,
    origin: StationId,
    destination: StationId,
    weight: Weight,
    inside: bool,
) -> Result<Vec<Connection>, Error> {
    turnarounds(problem, origin, destination, weight, false, inside)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ArrangementSpace, Orientation, TrainStation};

    fn problem() -> Problem {
        let space = ArrangementSpace::new(2, 2);
        let mut p = Problem::new(space);
        p.add_station(TrainStation::new("A", 2, &space).unwrap())
            .unwrap();
        p.add_station(
            TrainStation::new("B", 2, &space)
                .unwrap()
                .discard_arrangements_by(&[1], &[], &[]),
        )
        .unwrap();
        p
    }

    #[test]
    fn position_preserving_turns() {
        let p = problem();
        let cs = turns(&p, 0, 1, 3, true, false).unwrap();
        // Only type 0 is allowed at B: 2 orientations x 2 positions.
        assert_eq!(cs.len(), 4);
        assert!(cs
            .iter()
            .all(|c| c.arrangement_origin == c.arrangement_destination && c.weight == 3));
    }

    #[test]
    fn trip_turns_follow_trip_arrangements() {
        let mut p = problem();
        let t = p.add_trip(0, 1).unwrap();
        let cs = trip_turns(&p.trips[t], 4).unwrap();
        assert_eq!(cs, turns(&p, 0, 1, 4, true, false).unwrap());
        assert!(cs.iter().all(|c| c.arrangement_origin.train_type == 0 && !c.inside));
    }

    #[test]
    fn free_turns_keep_type_and_orientation() {
        let p = problem();
        let cs = turns(&p, 0, 1, 3, false, false).unwrap();
        assert_eq!(cs.len(), 8);
        assert!(cs.iter().all(|c| c.arrangement_origin.orientation
            == c.arrangement_destination.orientation));
    }

    #[test]
    fn turnarounds_flip_orientation() {
        let p = problem();
        let cs = turnarounds(&p, 0, 0, 1, true, true).unwrap();
        assert_eq!(cs.len(), 8);
        assert!(cs.iter().all(|c| c.inside
            && c.arrangement_origin.orientation.flipped() == c.arrangement_destination.orientation
            && c.arrangement_origin.position == c.arrangement_destination.position));
        let free = deadheads(&p, 0, 0, 1, true).unwrap();
        assert_eq!(free.len(), 16);
        assert!(free
            .iter()
            .any(|c| c.arrangement_origin.orientation == Orientation::Forward
                && c.arrangement_origin.position != c.arrangement_destination.position));
    }

    #[test]
    fn inside_between_stations_fails() {
        let p = problem();
        assert!(turns(&p, 0, 1, 0, true, true).is_err());
    }
}
