//! Hierarchic configuration model.
//!
//! Configuration is gathered from several kinds of source files, each
//! parsed into one [`Node`] tree whose scalars remember the file they came
//! from, and the trees are merged in order into the effective
//! configuration.
//!
//! # Pipeline
//!
//! 1. **Dispatch**: [`parse_file`] picks a [`Format`] from the extension
//!    (or sniffs extension-less content).
//!
//! 2. **Parse**: property lines, settings tags, JSON or the indentation
//!    based block format become a tree. Raw values go through
//!    [`coerce_value`], so `42` and `true` are typed.
//!
//! 3. **Merge**: [`merge`] folds an update tree into the current one. Empty
//!    update values delete keys, and `@+name` / `@-name` keys add to or
//!    remove from the list `name`.
//!
//! Paths into a tree are [`HierarchicKey`]s such as `a.b[0]["x.y"]`.

mod arena;
mod error;
mod json;
mod key;
mod literal;
mod merge;
mod parser;
mod properties;
mod scanner;
mod source;
mod tree;
mod value;

pub use arena::{FlatValue, LeafPath, LeafPaths, NodeArena, NodeId};
pub use error::{ConfigError, Result};
pub use key::{HierarchicKey, Segment};
pub use literal::coerce_value;
pub use merge::{diff, merge, merge_sources, remove_empty, MergeOptions};
pub use parser::{parse_block, parse_lines, MAX_RETRIES};
pub use properties::{decode_entities, rewrite_key};
pub use source::{parse_file, parse_str, Format};
pub use tree::MAX_LIST_GAP;
pub use value::{Node, Provenance, Scalar, ScalarValue};
