//! Cluster resolution over matched record pairs
//!
//! Matching pairs form an undirected graph over record ids. Its connected
//! components are the duplicate clusters, and each cluster is represented by
//! its minimum id. Because the representative depends only on id ordering,
//! the assignment does not depend on the order edges are processed in.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::record::{ClusterState, Record, RecordId};

/// A matching pair discovered within one partition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchEdge {
    pub a: RecordId,
    pub b: RecordId,
    pub score: f64,
}

impl MatchEdge {
    /// Create an edge with endpoints in ascending order
    pub fn new(a: RecordId, b: RecordId, score: f64) -> Self {
        if a <= b {
            Self { a, b, score }
        } else {
            Self { a: b, b: a, score }
        }
    }
}

/// A set of at least two records describing the same work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Minimum id among the members
    pub canonical_id: RecordId,
    /// All member ids, ascending, including the canonical one
    pub members: Vec<RecordId>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members other than the canonical record
    pub fn duplicates(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.members
            .iter()
            .copied()
            .filter(move |&id| id != self.canonical_id)
    }
}

/// Union-find over record ids, confined to a single resolver pass
struct DisjointSet {
    slots: HashMap<RecordId, usize>,
    ids: Vec<RecordId>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn new() -> Self {
        Self {
            slots: HashMap::new(),
            ids: Vec::new(),
            parent: Vec::new(),
            rank: Vec::new(),
        }
    }

    fn slot(&mut self, id: RecordId) -> usize {
        if let Some(&slot) = self.slots.get(&id) {
            return slot;
        }
        let slot = self.ids.len();
        self.slots.insert(id, slot);
        self.ids.push(id);
        self.parent.push(slot);
        self.rank.push(0);
        slot
    }

    fn find(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Path compression
        let mut current = slot;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    fn union(&mut self, a: RecordId, b: RecordId) {
        let slot_a = self.slot(a);
        let slot_b = self.slot(b);
        let root_a = self.find(slot_a);
        let root_b = self.find(slot_b);
        if root_a == root_b {
            return;
        }

        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
    }

    fn into_components(mut self) -> Vec<Vec<RecordId>> {
        let mut components: BTreeMap<usize, Vec<RecordId>> = BTreeMap::new();
        for slot in 0..self.ids.len() {
            let root = self.find(slot);
            components.entry(root).or_default().push(self.ids[slot]);
        }
        components.into_values().collect()
    }
}

/// Compute duplicate clusters from matching pairs
///
/// Returns clusters of two or more records, ordered by canonical id. Self
/// loops are ignored.
pub fn resolve_clusters(edges: &[MatchEdge]) -> Vec<Cluster> {
    let mut set = DisjointSet::new();
    for edge in edges {
        if edge.a != edge.b {
            set.union(edge.a, edge.b);
        }
    }

    let mut clusters: Vec<Cluster> = set
        .into_components()
        .into_iter()
        .filter(|members| members.len() > 1)
        .map(|mut members| {
            members.sort_unstable();
            Cluster {
                canonical_id: members[0],
                members,
            }
        })
        .collect();

    clusters.sort_by_key(|cluster| cluster.canonical_id);
    clusters
}

/// Write cluster state onto every record
///
/// All records are reset first. Cluster members get `Member(canonical)` or
/// `Canonical`; every other record, including those never partitioned,
/// becomes a `Canonical` singleton.
pub fn apply_clusters(records: &mut [Record], clusters: &[Cluster]) {
    let mut assignment: HashMap<RecordId, RecordId> = HashMap::new();
    for cluster in clusters {
        for &member in &cluster.members {
            assignment.insert(member, cluster.canonical_id);
        }
    }

    for record in records.iter_mut() {
        record.reset_cluster();
        let state = match assignment.get(&record.id) {
            Some(&canonical) if canonical != record.id => ClusterState::Member(canonical),
            _ => ClusterState::Canonical,
        };
        record.assign_cluster(state);
    }
}
