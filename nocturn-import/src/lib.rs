//! nocturn-import library interface
//!
//! The archive import/indexing pipeline: a level-grammar directory walker,
//! per-convention name parsers, DST/elapsed-time resolution, a deduplicating
//! merge into the destination clip store, and quota-based retention planning.

pub mod decode;
pub mod grammar;
pub mod merge;
pub mod prune;
pub mod resolve;
pub mod retention;
pub mod store;
pub mod types;
pub mod walk;

pub use grammar::{NameGrammar, ParseContext, ParseError};
pub use merge::{MergeCounters, MergeVisitor};
pub use resolve::TimeResolver;
pub use store::{ClipStore, MemoryStore};
pub use types::{ClipDescriptor, ClipTime, LevelKind};
pub use walk::{ArchiveWalker, Visitor, WalkCounters};
