//! Wiki logic that does not touch storage: page trees and mentions.

mod mentions;
mod tree;

#[cfg(test)]
mod mentions_test;

pub use mentions::{MENTION_SUGGESTION_LIMIT, extract_mentions};
pub use tree::{DocumentNode, build_tree, would_create_cycle};
