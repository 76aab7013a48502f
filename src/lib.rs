//! docloom - A schema-driven document engine over plain JSON files
//!
//! Each document is one JSON file under `<data_dir>/<namespace>/<Type>/<id>`.
//! Requests are graph query documents; query arguments compile to predicate
//! trees, mutations come from schema annotations, and related documents are
//! loaded in per-type batches.
//!
//! ```ignore
//! use docloom::{EngineConfig, EngineContext};
//!
//! let ctx = EngineContext::open(EngineConfig::new("/var/lib/docloom").with_schema_path("schema.json"))?;
//! let response = ctx.execute(r#"{ empleados(nameEquals: "Juan") { name provincia { nombre } } }"#);
//! ```

pub mod config;
pub mod context;
pub mod crash_point;
pub mod error;
pub mod executor;
pub mod filter;
pub mod middleware;
pub mod mutation;
pub mod observability;
pub mod schema;
pub mod store;

pub use config::EngineConfig;
pub use context::EngineContext;
pub use error::{EngineError, EngineResult};
pub use executor::{QueryExecutor, Response};
pub use filter::{Filter, FilterCompiler, QuerySpec};
pub use store::{Document, DocumentStore};
