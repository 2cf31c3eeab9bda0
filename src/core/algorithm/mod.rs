//! Operator routing topologies.
//!
//! Each algorithm is a small graph: nodes are operators tagged carrier or modulator, edges are
//! modulation (or hard-sync) links. A self-loop (`from == to`) is feedback.
//!
//! The wire protocol has no per-edge addresses for modulation indices. Instead the six IM slots
//! are handed out by walking operators from low to high id and, within an operator, its outgoing
//! edges in declared order. [`Algorithm::modulation_slots`] is the single place that walk lives;
//! the assembler and the encoder both go through it.

mod table;

pub use table::ALGORITHMS;

use serde::{Deserialize, Serialize};

use crate::core::CodecError;

/// Number of entries in the topology table.
pub const ALGORITHM_COUNT: usize = 32;
/// Number of IM (index of modulation) slots on the wire.
pub const IM_SLOT_COUNT: usize = 6;
/// Number of carriers that own a Mix/Pan controller.
pub const CARRIER_CONTROL_SLOTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperatorRole {
    Carrier,
    Modulator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmNode {
    pub id: u8,
    pub role: OperatorRole,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    #[default]
    Modulation,
    Sync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmEdge {
    pub from: u8,
    pub to: u8,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl AlgorithmEdge {
    pub fn is_feedback(&self) -> bool {
        self.from == self.to
    }
}

/// Static table entry. Never mutated.
#[derive(Debug)]
pub struct AlgorithmTopology {
    pub id: &'static str,
    pub name: &'static str,
    pub nodes: &'static [AlgorithmNode],
    pub edges: &'static [AlgorithmEdge],
}

/// One IM slot and the edge it drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulationSlot {
    pub index: usize,
    pub from: u8,
    pub to: u8,
}

/// The algorithm a patch is using: an owned copy of a table entry, without layout data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Algorithm {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub nodes: Vec<AlgorithmNode>,
    pub edges: Vec<AlgorithmEdge>,
}

impl Algorithm {
    /// Look up a table entry by its wire index.
    pub fn from_index(index: usize) -> Option<Self> {
        ALGORITHMS
            .get(index)
            .map(|topology| Self::from_topology(index, topology))
    }

    pub fn from_topology(index: usize, topology: &AlgorithmTopology) -> Self {
        Self {
            index,
            id: topology.id.to_string(),
            name: topology.name.to_string(),
            nodes: topology.nodes.to_vec(),
            edges: topology.edges.to_vec(),
        }
    }

    pub fn role_of(&self, operator: u8) -> Option<OperatorRole> {
        self.nodes
            .iter()
            .find(|node| node.id == operator)
            .map(|node| node.role)
    }

    /// Operator ids in ascending order.
    pub fn operator_ids(&self) -> Vec<u8> {
        let mut ids: Vec<u8> = self.nodes.iter().map(|node| node.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Outgoing edges of one operator, in declared order (self-loop included).
    pub fn outgoing(&self, operator: u8) -> impl Iterator<Item = &AlgorithmEdge> {
        self.edges.iter().filter(move |edge| edge.from == operator)
    }

    /// The canonical IM slot enumeration: operators low to high id, then each operator's
    /// outgoing edges in declared order. Edges past [`IM_SLOT_COUNT`] get no slot.
    pub fn modulation_slots(&self) -> Vec<ModulationSlot> {
        self.operator_ids()
            .into_iter()
            .flat_map(|id| self.outgoing(id).copied().collect::<Vec<_>>())
            .take(IM_SLOT_COUNT)
            .enumerate()
            .map(|(index, edge)| ModulationSlot {
                index,
                from: edge.from,
                to: edge.to,
            })
            .collect()
    }

    /// IM slot driving the `from -> to` edge, if the edge exists and owns a slot.
    pub fn slot_for(&self, from: u8, to: u8) -> Option<usize> {
        self.modulation_slots()
            .into_iter()
            .find(|slot| slot.from == from && slot.to == to)
            .map(|slot| slot.index)
    }

    /// Carrier operator ids in ascending order.
    pub fn carriers(&self) -> Vec<u8> {
        self.operator_ids()
            .into_iter()
            .filter(|id| self.role_of(*id) == Some(OperatorRole::Carrier))
            .collect()
    }

    /// Ordinal position (0-based) of an operator among the carriers.
    pub fn carrier_index(&self, operator: u8) -> Option<usize> {
        self.carriers().iter().position(|id| *id == operator)
    }

    /// Check the topology invariants: operator ids are 1..=n without gaps, and every edge
    /// leaves a modulator unless it is a feedback loop.
    pub fn validate(&self) -> Result<(), CodecError> {
        let invalid = |reason: String| CodecError::InvalidTopology {
            id: self.id.clone(),
            reason,
        };

        let ids = self.operator_ids();
        if ids.is_empty() {
            return Err(invalid("no operators".to_string()));
        }
        for (position, id) in ids.iter().enumerate() {
            if *id as usize != position + 1 {
                return Err(invalid(format!("operator ids are not contiguous at {id}")));
            }
        }

        for edge in &self.edges {
            let (Some(from_role), Some(_)) = (self.role_of(edge.from), self.role_of(edge.to))
            else {
                return Err(invalid(format!(
                    "edge {} -> {} references a missing operator",
                    edge.from, edge.to
                )));
            };
            if from_role != OperatorRole::Modulator && !edge.is_feedback() {
                return Err(invalid(format!(
                    "edge {} -> {} starts at a carrier",
                    edge.from, edge.to
                )));
            }
        }
        Ok(())
    }
}

impl Default for Algorithm {
    fn default() -> Self {
        Self::from_topology(0, &ALGORITHMS[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: [AlgorithmNode; 3] = [
        AlgorithmNode {
            id: 1,
            role: OperatorRole::Carrier,
        },
        AlgorithmNode {
            id: 2,
            role: OperatorRole::Modulator,
        },
        AlgorithmNode {
            id: 3,
            role: OperatorRole::Modulator,
        },
    ];

    fn edge(from: u8, to: u8) -> AlgorithmEdge {
        AlgorithmEdge {
            from,
            to,
            kind: EdgeKind::Modulation,
        }
    }

    fn custom(edges: Vec<AlgorithmEdge>) -> Algorithm {
        Algorithm {
            index: 99,
            id: "custom".to_string(),
            name: "Custom".to_string(),
            nodes: NODES.to_vec(),
            edges,
        }
    }

    #[test]
    fn table_is_valid() {
        assert_eq!(ALGORITHMS.len(), ALGORITHM_COUNT);
        for index in 0..ALGORITHM_COUNT {
            let algorithm = Algorithm::from_index(index).unwrap();
            algorithm.validate().unwrap();
            assert_eq!(algorithm.id, format!("alg{}", index + 1));
            assert!(algorithm.edges.len() <= IM_SLOT_COUNT, "{}", algorithm.id);
            assert!(!algorithm.carriers().is_empty());
        }
        assert!(Algorithm::from_index(ALGORITHM_COUNT).is_none());
    }

    #[test]
    fn slots_follow_operator_then_edge_order() {
        // declared out of operator order on purpose
        let algorithm = custom(vec![edge(3, 1), edge(2, 1), edge(3, 3), edge(3, 2)]);
        let slots: Vec<(u8, u8)> = algorithm
            .modulation_slots()
            .iter()
            .map(|slot| (slot.from, slot.to))
            .collect();
        assert_eq!(slots, vec![(2, 1), (3, 1), (3, 3), (3, 2)]);
        assert_eq!(algorithm.slot_for(3, 3), Some(2));
        assert_eq!(algorithm.slot_for(1, 2), None);
    }

    #[test]
    fn sync_edges_take_slots_like_any_edge() {
        let mut sync = edge(3, 2);
        sync.kind = EdgeKind::Sync;
        let algorithm = custom(vec![edge(2, 1), sync]);
        assert_eq!(algorithm.slot_for(3, 2), Some(1));
    }

    #[test]
    fn slots_stop_at_six() {
        let algorithm = custom(vec![
            edge(2, 1),
            edge(2, 2),
            edge(3, 1),
            edge(3, 2),
            edge(3, 3),
            edge(2, 3),
            edge(3, 2),
        ]);
        assert_eq!(algorithm.modulation_slots().len(), IM_SLOT_COUNT);
    }

    #[test]
    fn feedback_owns_a_slot() {
        let algorithm = Algorithm::from_index(0).unwrap();
        let feedback: Vec<_> = algorithm
            .edges
            .iter()
            .filter(|edge| edge.is_feedback())
            .collect();
        assert_eq!(feedback.len(), 1);
        assert!(algorithm.slot_for(feedback[0].from, feedback[0].to).is_some());
    }

    #[test]
    fn feedback_takes_the_next_positional_slot() {
        // No slot is set aside for feedback
        let dx1 = Algorithm::from_index(0).unwrap();
        assert_eq!(dx1.slot_for(6, 6), Some(4));
        let dx2 = Algorithm::from_index(1).unwrap();
        assert_eq!(dx2.slot_for(2, 2), Some(1));
        let dx17 = Algorithm::from_index(16).unwrap();
        assert_eq!(dx17.slot_for(2, 2), Some(1));
    }

    #[test]
    fn carrier_ordinals() {
        // DX 22: carriers 1, 3, 4, 5
        let algorithm = Algorithm::from_index(21).unwrap();
        assert_eq!(algorithm.carriers(), vec![1, 3, 4, 5]);
        assert_eq!(algorithm.carrier_index(4), Some(2));
        assert_eq!(algorithm.carrier_index(2), None);

        let all = Algorithm::from_index(31).unwrap();
        assert_eq!(all.name, "DX 32 – 6 Carriers");
        assert_eq!(all.carriers(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(all.carrier_index(6), Some(5));
    }

    #[test]
    fn validate_rejects_carrier_sources_and_gaps() {
        let bad = custom(vec![edge(1, 2)]);
        assert!(matches!(
            bad.validate(),
            Err(CodecError::InvalidTopology { .. })
        ));
        // feedback on a carrier is fine
        custom(vec![edge(1, 1)]).validate().unwrap();

        let mut gap = custom(vec![]);
        gap.nodes[2].id = 4;
        assert!(gap.validate().is_err());
    }
}
