//! Branch-and-bound for models with integer variables.

mod branching;
mod incumbent;
mod node;
mod queue;
mod tree;

pub use branching::{select_most_fractional, BranchDecision};
pub use incumbent::{mip_gap, Incumbent};
pub use node::{BoundChange, SearchNode};
pub use queue::NodeQueue;
pub use tree::{solve_mip, BranchAndBound};
