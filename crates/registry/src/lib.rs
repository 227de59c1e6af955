//! Registry crate for slashhook command definitions.
//!
//! This crate loads the declarative command catalog and compiles it into the
//! native application commands registered with Discord.

pub mod catalog;
pub mod compiler;
pub mod error;

pub use catalog::Catalog;
pub use compiler::{compile, lint};
pub use error::{CompileError, LoadError};
pub use slashhook_types::{ApplicationCommand, Command, Parameter, ParameterType};
