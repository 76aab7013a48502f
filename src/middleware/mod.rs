//! Middleware pipeline
//!
//! Ordered handler chains around reads and writes. Restriction handlers
//! rewrite the compiled filter of a read; execution handlers wrap the
//! persistence step of a mutation and the output of a read.

mod pipeline;
mod registry;

pub use pipeline::{handler, Handler, Next, Pipeline, PipelineContext};
pub use registry::{
    tag, HandlerRegistry, TypeHooks, DELETE_SUFFIX, READ_SUFFIX, RESTRICTION_SUFFIX, WRITE_SUFFIX,
};
