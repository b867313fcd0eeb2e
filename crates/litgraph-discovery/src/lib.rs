//! litgraph-discovery — the discovery frontier (C2): visited-set + FIFO
//! queue bounded by depth/fanout/paper-count, plus near-duplicate detection.

pub mod discover;
pub mod frontier;
pub mod simhash;

pub use discover::{discover_next, DiscoveryOutcome};
pub use frontier::{Frontier, FrontierItem, FrontierLimits};
