//! Topology analysis result types.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::grid::SwitchId;

/// Directional neighbor sets of one switch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NeighborGroups {
    /// Switches met before crossing the switch's own line
    pub upstream: BTreeSet<SwitchId>,
    /// Switches met after crossing it
    pub downstream: BTreeSet<SwitchId>,
}

impl NeighborGroups {
    pub fn contains(&self, id: SwitchId) -> bool {
        self.upstream.contains(&id) || self.downstream.contains(&id)
    }
}

/// Neighbor groups of every switch, keyed by switch id
pub type NeighborMap = BTreeMap<SwitchId, NeighborGroups>;
