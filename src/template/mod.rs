//! Data access template
//!
//! [`GraphOperations`] is the data-access interface over a graph database;
//! [`GraphTemplate`] implements it on top of an embedded [`GraphDatabase`].
//! Mutating operations run in implicit transactions, every failure surfaces as
//! a [`DataAccessError`](crate::error::DataAccessError), and multi-valued
//! results come back as lazy [`QueryResult`](crate::conversion::QueryResult)s.

mod graph_template;
mod operations;

pub use graph_template::GraphTemplate;
pub use operations::GraphOperations;

use crate::database::GraphDatabase;

/// Work run against the database by `GraphOperations::exec`
pub trait GraphCallback<T>: FnOnce(&GraphDatabase) -> anyhow::Result<T> {}

impl<T, F> GraphCallback<T> for F where F: FnOnce(&GraphDatabase) -> anyhow::Result<T> {}
