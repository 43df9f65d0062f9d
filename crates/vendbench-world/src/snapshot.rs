//! Isolated copies of the world state.
//!
//! The decision agent and every external reader work from a snapshot, never
//! from a reference into the live state, so the loop can keep mutating the
//! original without aliasing.

use vendbench_types::WorldState;

/// Deep, independent copy of `state`.
///
/// Both inventories are copied item by item, along with the inbox, the sent
/// mail log, and the pending-delivery map.
pub fn snapshot(state: &WorldState) -> WorldState {
    state.clone()
}
