//! SQLite-backed persistence: accounts and API tokens, projects, and the
//! category/template catalog. Each store owns a pool clone; all writes go
//! through single statements or short transactions.

pub mod catalog;
pub mod projects;
pub mod users;

pub use catalog::CatalogStore;
pub use projects::ProjectStore;
pub use users::UserStore;
