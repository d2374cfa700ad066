//! Configuration and translation logic of the admin: model schemas, field
//! descriptors, the site registry, predicate construction, record
//! serialization and export encoding. No I/O lives here.

pub mod definition;
pub mod error;
pub mod export;
pub mod fields;
pub mod filters;
pub mod inline;
pub mod menu;
pub mod model_admin;
pub mod password;
pub mod query;
pub mod schema;
pub mod site;
pub mod types;
pub mod upload;
pub mod value;
