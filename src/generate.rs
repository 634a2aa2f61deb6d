use crate::error::Error;
use crate::hyperedge::Hyperedge;
use crate::problem::{Connection, StationId};
use itertools::Itertools;
use log::*;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub type Bucket = Vec<Connection>;

/// Partitions the connections by their (origin, destination) station pair.
/// Duplicated connections are dropped and each bucket is sorted.
pub fn bucket_connections<'a>(
    connections: impl IntoIterator<Item = &'a Connection>,
) -> BTreeMap<(StationId, StationId), Bucket> {
    let mut buckets: BTreeMap<(StationId, StationId), BTreeSet<Connection>> = BTreeMap::new();
    for c in connections {
        buckets
            .entry((c.origin, c.destination))
            .or_default()
            .insert(*c);
    }
    buckets
        .into_iter()
        .map(|(k, v)| (k, v.into_iter().collect()))
        .collect()
}

/// All hyperedges of one bucket with 1 to `max_train_length` members.
///
/// Members are drawn with replacement, since parallel trains may use the
/// same arc shape. Repeated members collapse in the hyperedge set.
pub fn bucket_hyperedges(
    bucket: &[Connection],
    max_train_length: usize,
) -> Result<HashSet<Hyperedge>, Error> {
    let mut hyperedges = HashSet::new();
    for size in 1..=max_train_length {
        for arcs in bucket.iter().copied().combinations_with_replacement(size) {
            hyperedges.insert(Hyperedge::new(arcs)?);
        }
    }
    Ok(hyperedges)
}

pub fn generate_hyperedges(
    connections: &[Connection],
    max_train_length: usize,
    parallel: bool,
) -> Result<HashSet<Hyperedge>, Error> {
    let _p = hprof::enter("generate hyperedges");
    let buckets = bucket_connections(connections);
    debug!(
        "Generating hyperedges from {} connections in {} buckets",
        connections.len(),
        buckets.len()
    );
    for ((origin, destination), bucket) in buckets.iter() {
        trace!("bucket {}->{}: {} connections", origin, destination, bucket.len());
    }

    let hyperedges = if parallel {
        buckets
            .par_iter()
            .map(|(_, bucket)| bucket_hyperedges(bucket, max_train_length))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flatten()
            .collect::<HashSet<_>>()
    } else {
        let mut hyperedges = HashSet::new();
        for bucket in buckets.values() {
            hyperedges.extend(bucket_hyperedges(bucket, max_train_length)?);
        }
        hyperedges
    };

    info!("Number of hyperedges: {}", hyperedges.len());
    Ok(hyperedges)
}
