//! # Slashhook Engine
//!
//! Runtime half of a slash command: the [`binder`] turns invocation arguments
//! into an HTTP request, the [`renderer`] turns the response into reply text,
//! and the [`pipeline`] ties both to a catalog and a transport.
//!
//! Field extraction uses jq via [`query`]; body and reply templates use the
//! substitution-only [`templates`] language.

pub mod binder;
pub mod pipeline;
pub mod query;
pub mod renderer;
pub mod templates;

pub use binder::{BindError, bind};
pub use pipeline::{COMMAND_NOT_FOUND_REPLY, InvocationOutcome, MAX_REPLY_CHARS, Pipeline, PipelineError};
pub use query::{Query, QueryError, QueryParseError, QueryRun};
pub use renderer::{ExtractedFields, RenderError, extract, render};
pub use templates::{Template, TemplateError, render_template};
