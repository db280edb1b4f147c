//! State store: computed fields and last observed values of managed resources.

mod models;
mod repository;
mod schema;

pub use models::{DbOperation, StateEntry, StoredResource};
pub use repository::StateStore;
pub use schema::init_db;
pub(crate) use schema::get_schema_version;
