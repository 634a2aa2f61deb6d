//! Admissibility predicates over generated hyperedges.
//!
//! Each predicate is a pure value implementing [`HyperedgeFilter`]; the
//! [`FilterChain`] combines them with a short-circuiting AND. The predicates
//! are independent, so their order only affects cost.

use crate::hyperedge::Hyperedge;
use crate::problem::{Connection, Problem, TimeTableTrip};
use crate::PipelineSettings;
use log::*;
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

pub trait HyperedgeFilter: Sync {
    fn name(&self) -> &'static str;
    fn accepts(&self, hyperedge: &Hyperedge) -> bool;
}

/// No station may group more connections than its own maximum train
/// length or the global one.
pub struct TrainLengthFilter<'a> {
    problem: &'a Problem,
}

impl<'a> TrainLengthFilter<'a> {
    pub fn new(problem: &'a Problem) -> Self {
        TrainLengthFilter { problem }
    }

    fn fits(&self, station: usize, arcs: &[Connection]) -> bool {
        match self.problem.stations.get(station) {
            Some(s) => arcs.len() <= s.max_train_length.min(self.problem.max_train_length()),
            None => false,
        }
    }
}

impl<'a> HyperedgeFilter for TrainLengthFilter<'a> {
    fn name(&self) -> &'static str {
        "train length"
    }

    fn accepts(&self, hyperedge: &Hyperedge) -> bool {
        hyperedge
            .origin_arcs()
            .chain(hyperedge.destination_arcs())
            .all(|(station, arcs)| self.fits(station, arcs))
    }
}

/// A hyperedge between two stations must place its trains on the
/// positions `0..n` of each composition, without gaps or duplicates.
pub struct PositioningFilter;

impl HyperedgeFilter for PositioningFilter {
    fn name(&self) -> &'static str {
        "positioning"
    }

    fn accepts(&self, hyperedge: &Hyperedge) -> bool {
        if hyperedge.is_inside() {
            return true;
        }
        hyperedge
            .origin_arcs()
            .all(|(_, arcs)| well_ordered(arcs.iter().map(|a| a.arrangement_origin.position)))
            && hyperedge.destination_arcs().all(|(_, arcs)| {
                well_ordered(arcs.iter().map(|a| a.arrangement_destination.position))
            })
    }
}

/// True iff the positions are exactly `0..n` in some order.
pub fn well_ordered(positions: impl Iterator<Item = usize>) -> bool {
    let mut positions = positions.collect::<Vec<_>>();
    positions.sort_unstable();
    positions.iter().enumerate().all(|(i, p)| i == *p)
}

/// A hyperedge servicing a timetable trip must not split or join at the
/// same time: it may have only one origin and one destination station.
pub struct TripAtomicityFilter<'a> {
    trips: &'a [TimeTableTrip],
}

impl<'a> TripAtomicityFilter<'a> {
    pub fn new(trips: &'a [TimeTableTrip]) -> Self {
        TripAtomicityFilter { trips }
    }
}

impl<'a> HyperedgeFilter for TripAtomicityFilter<'a> {
    fn name(&self) -> &'static str {
        "trip atomicity"
    }

    fn accepts(&self, hyperedge: &Hyperedge) -> bool {
        if hyperedge.is_inside() {
            return true;
        }
        let spans_other_stations =
            hyperedge.num_origin_stations() > 1 || hyperedge.num_destination_stations() > 1;
        !(spans_other_stations
            && self
                .trips
                .iter()
                .any(|t| hyperedge.has_arc_from_to(t.origin, t.destination)))
    }
}

/// Trains running a timetable trip keep their arrangement from origin to
/// destination.
pub struct CompositionPreservingFilter<'a> {
    trips: &'a [TimeTableTrip],
}

impl<'a> CompositionPreservingFilter<'a> {
    pub fn new(trips: &'a [TimeTableTrip]) -> Self {
        CompositionPreservingFilter { trips }
    }
}

impl<'a> HyperedgeFilter for CompositionPreservingFilter<'a> {
    fn name(&self) -> &'static str {
        "composition preserving"
    }

    fn accepts(&self, hyperedge: &Hyperedge) -> bool {
        if hyperedge.is_inside() {
            return true;
        }
        let on_trip = self
            .trips
            .iter()
            .any(|t| hyperedge.has_arc_from_to(t.origin, t.destination));
        !on_trip
            || hyperedge
                .arcs()
                .iter()
                .all(|a| a.arrangement_origin == a.arrangement_destination)
    }
}

#[derive(Default)]
pub struct FilterChain<'a> {
    filters: Vec<Box<dyn HyperedgeFilter + 'a>>,
}

impl<'a> FilterChain<'a> {
    pub fn new() -> Self {
        FilterChain {
            filters: Vec::new(),
        }
    }

    /// Train length, positioning and trip atomicity, plus the optional
    /// composition rule.
    pub fn standard(problem: &'a Problem, settings: PipelineSettings) -> Self {
        let mut chain = FilterChain::new()
            .with(TrainLengthFilter::new(problem))
            .with(PositioningFilter)
            .with(TripAtomicityFilter::new(&problem.trips));
        if settings.preserve_trip_composition {
            chain.push(CompositionPreservingFilter::new(&problem.trips));
        }
        chain
    }

    pub fn push(&mut self, filter: impl HyperedgeFilter + 'a) {
        self.filters.push(Box::new(filter));
    }

    pub fn with(mut self, filter: impl HyperedgeFilter + 'a) -> Self {
        self.push(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn accepts(&self, hyperedge: &Hyperedge) -> bool {
        self.filters.iter().all(|f| f.accepts(hyperedge))
    }

    /// The first filter rejecting the hyperedge, if any.
    pub fn rejected_by(&self, hyperedge: &Hyperedge) -> Option<&'static str> {
        self.filters
            .iter()
            .find(|f| !f.accepts(hyperedge))
            .map(|f| f.name())
    }

    /// Keeps the admissible hyperedges, returned in canonical order.
    pub fn apply(
        &self,
        hyperedges: impl IntoIterator<Item = Hyperedge>,
        parallel: bool,
    ) -> Vec<Hyperedge> {
        let _p = hprof::enter("filter hyperedges");
        let rejected = self
            .filters
            .iter()
            .map(|_| AtomicUsize::new(0))
            .collect::<Vec<_>>();
        let keep = |h: &Hyperedge| match self.filters.iter().position(|f| !f.accepts(h)) {
            Some(idx) => {
                rejected[idx].fetch_add(1, Ordering::Relaxed);
                false
            }
            None => true,
        };

        let hyperedges = hyperedges.into_iter().collect::<Vec<_>>();
        let total = hyperedges.len();
        let mut kept = if parallel {
            hyperedges.into_par_iter().filter(|h| keep(h)).collect::<Vec<_>>()
        } else {
            hyperedges.into_iter().filter(|h| keep(h)).collect::<Vec<_>>()
        };
        kept.sort_unstable();
        kept.dedup();

        for (filter, count) in self.filters.iter().zip(rejected.iter()) {
            debug!(
                "Filter '{}' rejected {} hyperedges",
                filter.name(),
                count.load(Ordering::Relaxed)
            );
        }
        info!("Hyperedges remaining: {} of {}", kept.len(), total);
        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{ArrangementSpace, Orientation, TrainArrangement, TrainStation};

    fn arr(p: usize) -> TrainArrangement {
        TrainArrangement::new(0, Orientation::Forward, p)
    }

    fn con(o: usize, d: usize, po: usize, pd: usize) -> Connection {
        Connection::new(o, d, arr(po), arr(pd), 1, false).unwrap()
    }

    fn problem() -> Problem {
        let space = ArrangementSpace::new(1, 3);
        let mut p = Problem::new(space);
        for (name, len) in [("A", 3), ("B", 2), ("C", 3)].iter() {
            p.add_station(TrainStation::new(*name, *len, &space).unwrap())
                .unwrap();
        }
        p.add_trip(0, 1).unwrap();
        p
    }

    #[test]
    fn well_ordered_positions() {
        assert!(well_ordered(vec![0].into_iter()));
        assert!(well_ordered(vec![1, 0, 2].into_iter()));
        assert!(well_ordered(Vec::new().into_iter()));
        assert!(!well_ordered(vec![1].into_iter()));
        assert!(!well_ordered(vec![0, 0].into_iter()));
        assert!(!well_ordered(vec![0, 2].into_iter()));
    }

    #[test]
    fn train_length_uses_station_limit() {
        let p = problem();
        let f = TrainLengthFilter::new(&p);
        let two = Hyperedge::new(vec![con(0, 1, 0, 0), con(0, 1, 1, 1)]).unwrap();
        let three =
            Hyperedge::new(vec![con(0, 1, 0, 0), con(0, 1, 1, 1), con(0, 1, 2, 2)]).unwrap();
        assert!(f.accepts(&two));
        assert!(!f.accepts(&three));
        // A allows three, so the same size towards C is fine.
        let three_c =
            Hyperedge::new(vec![con(0, 2, 0, 0), con(0, 2, 1, 1), con(0, 2, 2, 2)]).unwrap();
        assert!(f.accepts(&three_c));
    }

    #[test]
    fn positioning_rejects_gaps_and_duplicates() {
        let f = PositioningFilter;
        assert!(f.accepts(&Hyperedge::new(vec![con(0, 1, 0, 0)]).unwrap()));
        assert!(!f.accepts(&Hyperedge::new(vec![con(0, 1, 1, 1)]).unwrap()));
        // Same origin position twice.
        let dup = Hyperedge::new(vec![con(0, 1, 0, 0), con(0, 1, 0, 1)]).unwrap();
        assert!(!f.accepts(&dup));
        let swapped = Hyperedge::new(vec![con(0, 1, 0, 1), con(0, 1, 1, 0)]).unwrap();
        assert!(f.accepts(&swapped));
    }

    #[test]
    fn positioning_skips_inside() {
        let a = TrainArrangement::new(0, Orientation::Forward, 2);
        let c = Connection::new(0, 0, a, a, 0, true).unwrap();
        assert!(PositioningFilter.accepts(&Hyperedge::new(vec![c]).unwrap()));
    }

    #[test]
    fn trip_atomicity() {
        let p = problem();
        let f = TripAtomicityFilter::new(&p.trips);
        let split = Hyperedge::new(vec![con(0, 1, 0, 0), con(0, 2, 1, 0)]).unwrap();
        assert!(!f.accepts(&split));
        // Not touching the trip A->B.
        let other = Hyperedge::new(vec![con(1, 0, 0, 0), con(1, 2, 1, 0)]).unwrap();
        assert!(f.accepts(&other));
        assert!(f.accepts(&Hyperedge::new(vec![con(0, 1, 0, 0)]).unwrap()));
    }

    #[test]
    fn composition_preserving() {
        let p = problem();
        let f = CompositionPreservingFilter::new(&p.trips);
        assert!(f.accepts(&Hyperedge::new(vec![con(0, 1, 0, 0)]).unwrap()));
        assert!(!f.accepts(&Hyperedge::new(vec![con(0, 1, 0, 1)]).unwrap()));
        assert!(f.accepts(&Hyperedge::new(vec![con(1, 2, 0, 1)]).unwrap()));
    }

    #[test]
    fn chain_reports_first_rejection() {
        let p = problem();
        let chain = FilterChain::standard(&p, PipelineSettings::default());
        assert_eq!(chain.len(), 3);
        let gap = Hyperedge::new(vec![con(0, 1, 1, 1)]).unwrap();
        assert_eq!(chain.rejected_by(&gap), Some("positioning"));
        let ok = Hyperedge::new(vec![con(0, 1, 0, 0)]).unwrap();
        assert_eq!(chain.rejected_by(&ok), None);
        let kept = chain.apply(vec![gap, ok.clone()], false);
        assert_eq!(kept, vec![ok]);
    }
}
