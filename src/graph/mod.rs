//! Query graph: relations, joins, subset cardinalities, and the
//! connectivity oracle the DPsize driver uses to prune cross products.

use crate::bitset::{iter_bits, is_subset};
use crate::error::GraphError;
use std::collections::HashMap;

/// A base relation. `id` assigns its bit position in the 64-bit mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub id: u32,
    pub table_size: f64,
    pub cardinality: f64,
}

/// A join predicate normalized to single-bit endpoint masks.
///
/// Invariant: `left.count_ones() == 1`, `right.count_ones() == 1`, `left != right`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Join {
    pub left: u64,
    pub right: u64,
    pub selectivity: f64,
}

impl Join {
    /// Does this join connect `left_class` to `right_class` (in either
    /// orientation)?
    fn connects(&self, left_class: u64, right_class: u64) -> bool {
        (is_subset(self.left, left_class) && is_subset(self.right, right_class))
            || (is_subset(self.left, right_class) && is_subset(self.right, left_class))
    }
}

/// Relations, joins, per-subset cardinalities, and a precomputed
/// per-relation join lookup. Built once via [`QueryGraph::build`]; immutable
/// during DP.
#[derive(Debug, Clone)]
pub struct QueryGraph {
    pub relations: Vec<Relation>,
    pub joins: Vec<Join>,
    pub cardinalities: HashMap<u64, f64>,
    /// `join_lookup[i]` lists every join touching relation `i` (a join
    /// appears for both of its endpoints).
    join_lookup: Vec<Vec<usize>>,
}

impl QueryGraph {
    /// Build a query graph from relations (already bit-assigned), joins
    /// (already normalized to single-bit masks), and the subset
    /// cardinality table. Fails if there are more than 63 relations.
    pub fn build(
        relations: Vec<Relation>,
        joins: Vec<Join>,
        cardinalities: HashMap<u64, f64>,
    ) -> Result<Self, GraphError> {
        if relations.len() > 63 {
            return Err(GraphError::TooManyRelations(relations.len()));
        }
        let mut sorted = relations;
        sorted.sort_by_key(|r| r.id);
        let mut graph = QueryGraph {
            relations: sorted,
            joins,
            cardinalities,
            join_lookup: Vec::new(),
        };
        graph.prepare_lookup();
        Ok(graph)
    }

    /// Number of relations in the query.
    pub fn len(&self) -> usize {
        self.relations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Populate `join_lookup` from `joins`. Idempotent; called once by
    /// `build`.
    fn prepare_lookup(&mut self) {
        self.join_lookup = vec![Vec::new(); self.relations.len()];
        for (idx, join) in self.joins.iter().enumerate() {
            let left_bit = join.left.trailing_zeros() as usize;
            let right_bit = join.right.trailing_zeros() as usize;
            self.join_lookup[left_bit].push(idx);
            self.join_lookup[right_bit].push(idx);
        }
    }

    /// True iff the query graph has at least one join edge with one
    /// endpoint in `left_class` and the other in `right_class`.
    ///
    /// Iterates the smaller of the two classes' bits to bound work:
    /// O(|smaller| * max_degree).
    pub fn is_connected(&self, left_class: u64, right_class: u64) -> bool {
        let (smaller, larger) = if left_class.count_ones() <= right_class.count_ones() {
            (left_class, right_class)
        } else {
            (right_class, left_class)
        };
        let _ = larger;
        for bit in iter_bits(smaller) {
            for &join_idx in &self.join_lookup[bit as usize] {
                if self.joins[join_idx].connects(left_class, right_class) {
                    return true;
                }
            }
        }
        false
    }

    /// Look up the cardinality of a connected subset. A missing entry is a
    /// caller error: every connected subset the DP enumeration
    /// reaches must have one.
    pub fn cardinality(&self, subset: u64) -> Result<f64, GraphError> {
        self.cardinalities
            .get(&subset)
            .copied()
            .ok_or(GraphError::MissingCardinality(subset))
    }

    /// Look up a relation by its id. Assumes ids are dense over `[0, R)`,
    /// as required by the relation-id contract (`id` assigns a bit position); `build`
    /// keeps `relations` sorted by id so this is a direct index.
    pub fn relation(&self, id: u32) -> &Relation {
        &self.relations[id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(id: u32, name: &str, size: f64, card: f64) -> Relation {
        Relation {
            name: name.to_string(),
            id,
            table_size: size,
            cardinality: card,
        }
    }

    #[test]
    fn connectivity_is_symmetric() {
        let relations = vec![rel(0, "a", 100.0, 100.0), rel(1, "b", 200.0, 200.0)];
        let joins = vec![Join {
            left: 0b01,
            right: 0b10,
            selectivity: 0.01,
        }];
        let mut cards = HashMap::new();
        cards.insert(0b01, 100.0);
        cards.insert(0b10, 200.0);
        cards.insert(0b11, 50.0);
        let graph = QueryGraph::build(relations, joins, cards).unwrap();

        assert!(graph.is_connected(0b01, 0b10));
        assert!(graph.is_connected(0b10, 0b01));
    }

    #[test]
    fn disconnected_relations_are_not_connected() {
        let relations = vec![
            rel(0, "a", 100.0, 100.0),
            rel(1, "b", 100.0, 100.0),
            rel(2, "c", 100.0, 100.0),
        ];
        let graph = QueryGraph::build(relations, Vec::new(), HashMap::new()).unwrap();
        assert!(!graph.is_connected(0b001, 0b010));
        assert!(!graph.is_connected(0b001, 0b100));
    }

    #[test]
    fn star_join_excludes_the_unjoined_pair() {
        // F—D1, F—D2, no D1—D2.
        let relations = vec![
            rel(0, "f", 1000.0, 1000.0),
            rel(1, "d1", 10.0, 10.0),
            rel(2, "d2", 10.0, 10.0),
        ];
        let joins = vec![
            Join {
                left: 0b001,
                right: 0b010,
                selectivity: 1.0,
            },
            Join {
                left: 0b001,
                right: 0b100,
                selectivity: 1.0,
            },
        ];
        let graph = QueryGraph::build(relations, joins, HashMap::new()).unwrap();

        assert!(graph.is_connected(0b001, 0b010));
        assert!(graph.is_connected(0b001, 0b100));
        assert!(!graph.is_connected(0b010, 0b100));
    }

    #[test]
    fn too_many_relations_is_rejected() {
        let relations: Vec<Relation> = (0..64).map(|i| rel(i, "x", 1.0, 1.0)).collect();
        let err = QueryGraph::build(relations, Vec::new(), HashMap::new()).unwrap_err();
        assert!(matches!(err, GraphError::TooManyRelations(64)));
    }

    #[test]
    fn missing_cardinality_is_reported() {
        let graph = QueryGraph::build(vec![rel(0, "a", 1.0, 1.0)], Vec::new(), HashMap::new())
            .unwrap();
        let err = graph.cardinality(0b1).unwrap_err();
        assert!(matches!(err, GraphError::MissingCardinality(0b1)));
    }
}
