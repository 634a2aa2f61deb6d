use crate::error::Error;
use crate::problem::{Connection, StationId, Weight};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

/// A deduplicated bundle of connections that is selected as a whole.
///
/// Identity is the member set only: the arcs are kept sorted and without
/// duplicates, so equality, hashing and ordering compare that canonical
/// list. The remaining fields are derived once at construction.
///
/// Since a hyperedge has a single origin or a single destination station,
/// both groupings are contiguous runs of the sorted arcs and are stored
/// as `(station, start, end)` ranges.
#[derive(Debug, Clone)]
pub struct Hyperedge {
    arcs: Vec<Connection>,
    weight: Weight,
    inside: bool,
    origin_groups: Vec<(StationId, usize, usize)>,
    destination_groups: Vec<(StationId, usize, usize)>,
}

fn runs(
    arcs: &[Connection],
    key: impl Fn(&Connection) -> StationId,
) -> Vec<(StationId, usize, usize)> {
    let mut groups: Vec<(StationId, usize, usize)> = Vec::new();
    for (i, arc) in arcs.iter().enumerate() {
        let station = key(arc);
        if let Some(last) = groups.last_mut() {
            if last.0 == station {
                last.2 = i + 1;
                continue;
            }
        }
        groups.push((station, i, i + 1));
    }
    groups
}

impl Hyperedge {
    pub fn new(arcs: impl IntoIterator<Item = Connection>) -> Result<Self, Error> {
        let mut arcs = arcs.into_iter().collect::<Vec<_>>();
        arcs.sort_unstable();
        arcs.dedup();

        if arcs.is_empty() {
            return Err(Error::EmptyHyperedge);
        }

        // Arcs are sorted by origin first, so origin runs are complete groups.
        let origin_groups = runs(&arcs, |a| a.origin);
        let first_destination = arcs[0].destination;
        let multi_destination = arcs.iter().any(|a| a.destination != first_destination);
        if origin_groups.len() > 1 && multi_destination {
            let mut destinations = arcs.iter().map(|a| a.destination).collect::<Vec<_>>();
            destinations.sort_unstable();
            destinations.dedup();
            return Err(Error::ManyToManyHyperedge {
                origins: origin_groups.len(),
                destinations: destinations.len(),
            });
        }
        // With a single origin the arcs are sorted by destination next.
        let destination_groups = runs(&arcs, |a| a.destination);

        let weight = arcs.iter().map(|a| a.weight).sum();
        let inside = arcs.iter().all(|a| a.inside);

        Ok(Hyperedge {
            arcs,
            weight,
            inside,
            origin_groups,
            destination_groups,
        })
    }

    pub fn arcs(&self) -> &[Connection] {
        &self.arcs
    }

    pub fn len(&self) -> usize {
        self.arcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arcs.is_empty()
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    /// True iff every member connection stays inside its station.
    pub fn is_inside(&self) -> bool {
        self.inside
    }

    /// Member connections grouped by origin station.
    pub fn origin_arcs(&self) -> impl Iterator<Item = (StationId, &[Connection])> + '_ {
        self.origin_groups
            .iter()
            .map(move |(s, start, end)| (*s, &self.arcs[*start..*end]))
    }

    /// Member connections grouped by destination station.
    pub fn destination_arcs(&self) -> impl Iterator<Item = (StationId, &[Connection])> + '_ {
        self.destination_groups
            .iter()
            .map(move |(s, start, end)| (*s, &self.arcs[*start..*end]))
    }

    pub fn num_origin_stations(&self) -> usize {
        self.origin_groups.len()
    }

    pub fn num_destination_stations(&self) -> usize {
        self.destination_groups.len()
    }

    pub fn has_arc_from_to(&self, origin: StationId, destination: StationId) -> bool {
        self.arcs
            .iter()
            .any(|a| a.origin == origin && a.destination == destination)
    }

    pub fn comes_from_station(&self, station: StationId) -> bool {
        self.origin_groups.iter().any(|(s, _, _)| *s == station)
    }
}

impl PartialEq for Hyperedge {
    fn eq(&self, other: &Self) -> bool {
        self.arcs == other.arcs
    }
}

impl Eq for Hyperedge {}

impl Hash for Hyperedge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.arcs.hash(state);
    }
}

impl PartialOrd for Hyperedge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Hyperedge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.arcs.cmp(&other.arcs)
    }
}
