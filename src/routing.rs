//! Routing of pairings between inline processing and the work queue.

use crate::types::{PairedSource, Routing};

/// Decides how a batch of pairings is dispatched.
///
/// A lone pairing is processed directly. Zero or several pairings all go to the
/// queue in their original order; an empty queue is a no-op for the host.
pub fn route(pairings: Vec<PairedSource>) -> Routing {
    if pairings.len() == 1 {
        return Routing {
            direct_process: pairings.into_iter().next(),
            queued: Vec::new(),
        };
    }
    Routing {
        direct_process: None,
        queued: pairings,
    }
}
