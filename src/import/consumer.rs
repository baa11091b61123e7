//! Receivers of resolved dense ids.

use crate::error::{IdMapError, Result};
use crate::idmap::DenseId;

/// A record that could not be mapped, with the reason.
#[derive(Debug)]
pub struct RejectedRecord {
    pub ordinal: u64,
    pub error: IdMapError,
}

/// Receives one result per node record and per relationship record, in
/// ordinal order.
pub trait DenseIdConsumer {
    fn node(&mut self, ordinal: u64, id: Result<DenseId>);

    fn relationship(&mut self, ordinal: u64, ids: Result<(DenseId, DenseId)>);
}

/// In-memory consumer keeping everything it receives.
#[derive(Debug, Default)]
pub struct CollectedIds {
    pub nodes: Vec<(u64, DenseId)>,
    pub relationships: Vec<(u64, DenseId, DenseId)>,
    pub rejected_nodes: Vec<RejectedRecord>,
    pub rejected_relationships: Vec<RejectedRecord>,
}

impl CollectedIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dense id received for node record `ordinal`.
    pub fn node_id(&self, ordinal: u64) -> Option<DenseId> {
        self.nodes
            .binary_search_by_key(&ordinal, |&(o, _)| o)
            .ok()
            .map(|i| self.nodes[i].1)
    }
}

impl DenseIdConsumer for CollectedIds {
    fn node(&mut self, ordinal: u64, id: Result<DenseId>) {
        match id {
            Ok(id) => self.nodes.push((ordinal, id)),
            Err(error) => self.rejected_nodes.push(RejectedRecord { ordinal, error }),
        }
    }

    fn relationship(&mut self, ordinal: u64, ids: Result<(DenseId, DenseId)>) {
        match ids {
            Ok((start, end)) => self.relationships.push((ordinal, start, end)),
            Err(error) => self
                .rejected_relationships
                .push(RejectedRecord { ordinal, error }),
        }
    }
}
