// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON Model Interchange (JMI) conversions for MBEE.
//!
//! MBEE moves model records (elements, artifacts, ...) around in three
//! interchangeable shapes:
//!
//! 1. a flat, arbitrarily ordered list of records that point at their parent,
//! 2. a map of records keyed by a unique field ([`RecordIndex`]),
//! 3. a nested tree of records under their parents ([`TreeNode`]).
//!
//! This crate converts between them ([`convert_jmi`]), assembles element
//! hierarchies where only packages may contain other elements
//! ([`ElementTree`]), and flattens trees back into a canonical pre-order list
//! ([`flatten`]).
//!
//! # Invariants
//!
//! - Keys are unique; a repeated key is a [`JmiError::DuplicateKey`], never
//!   an overwrite.
//! - Every record of a tree is reachable from its single root; dangling
//!   parents and cycles are a [`JmiError::CircularReference`].
//! - Errors never come with a partially built structure.
//!
//! Every call is a pure function of its input: builder state lives only for
//! the duration of the call. Assembly, walks, flattening, dropping and
//! [`TreeNode::to_writer`] use explicit stacks, so they handle hierarchies of
//! any depth. The derived `Serialize`, `Deserialize`, `Clone`, `Debug` and
//! `PartialEq` impls on [`TreeNode`] recurse once per level.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod assemble;
pub mod convert;
pub mod element;
pub mod error;
pub mod flatten;
pub mod index;
pub mod record;
pub mod tree;

pub use assemble::{NonPackagePolicy, RootPolicy};
pub use convert::{convert_jmi, convert_records, Jmi, JmiType};
pub use element::{ElementTree, ElementTreeOptions, Walk};
pub use error::{ErrorKind, JmiError, Result};
pub use flatten::{flatten, PreOrder};
pub use index::{build_index, RecordIndex};
pub use record::{records_from_value, FieldPath, Record, PACKAGE_TYPE};
pub use tree::{build_forest, build_tree, TreeNode, TreeOptions};
