//! Repository facts providers
//!
//! Produce the [`RepositorySnapshot`](crate::types::RepositorySnapshot) a run
//! bases its selection and planning on.

mod facts;

pub use facts::{FsRepositoryFacts, StaticRepositoryFacts};
