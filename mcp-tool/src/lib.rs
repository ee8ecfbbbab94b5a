//! Tool registry and invocation dispatcher.
//!
//! A [`ToolRegistry`] holds the ordered set of handlers a server exposes;
//! a [`Dispatcher`] validates arguments, enforces per-call deadlines, and
//! records every invocation into a bounded ring buffer for `/stats`.

pub mod dispatcher;
pub mod registry;
pub mod schema;
pub mod tool;

pub use dispatcher::{Dispatcher, InvocationRecord, InvocationStatus};
pub use registry::ToolRegistry;
pub use tool::{Concurrency, Tool, ToolDescriptor};
