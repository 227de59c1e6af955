//! jq queries used to extract fields from responses.
//!
//! Queries run on the jaq engine with its standard and JSON function libraries.
//! Evaluation is a stream: a query may yield zero or more values, and a runtime
//! error ends the stream after whatever was already produced. `halt` and
//! `halt_error` raise an error instead of exiting the process.

use std::fmt;

use jaq_core::load::{Arena, File, Loader};
use jaq_core::{Compiler, Ctx, Filter, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("query syntax error: {message}")]
pub struct QueryParseError {
    pub message: String,
}

/// Runtime error raised while evaluating a query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct QueryError {
    pub message: String,
}

/// Output of running a query: every produced value plus the error, if any, that ended the stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryRun {
    pub values: Vec<Value>,
    pub error: Option<QueryError>,
}

impl QueryRun {
    pub fn last(&self) -> Option<&Value> {
        self.values.last()
    }
}

/// A compiled query expression.
pub struct Query {
    source: String,
    filter: Filter<Native<Val>>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").field("source", &self.source).finish_non_exhaustive()
    }
}

impl Query {
    pub fn parse(source: &str) -> Result<Self, QueryParseError> {
        let program = File { code: source, path: () };
        let loader = Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = Arena::default();

        let modules = loader.load(&arena, program).map_err(|errors| QueryParseError {
            message: errors
                .into_iter()
                .map(|(_, error)| format!("{error:?}"))
                .collect::<Vec<_>>()
                .join("; "),
        })?;

        // `halt` would exit the whole process; rebind it to `error`.
        let natives: Vec<_> = jaq_std::funs().chain(jaq_json::funs()).collect();
        let raise = natives
            .iter()
            .find(|(name, args, _)| *name == "error" && args.is_empty())
            .map(|(_, _, native)| native.clone());
        let natives = natives.into_iter().filter_map(|(name, args, native)| {
            if name.starts_with("halt") {
                raise.clone().map(|raise| (name, args, raise))
            } else {
                Some((name, args, native))
            }
        });

        let filter = Compiler::default()
            .with_funs(natives)
            .compile(modules)
            .map_err(|errors| QueryParseError {
                message: errors
                    .into_iter()
                    .flat_map(|(_, undefined)| undefined)
                    .map(|(name, _)| format!("undefined '{name}'"))
                    .collect::<Vec<_>>()
                    .join("; "),
            })?;

        Ok(Query {
            source: source.to_string(),
            filter,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn run(&self, input: &Value) -> QueryRun {
        let inputs = RcIter::new(core::iter::empty());
        let mut run = QueryRun::default();
        for output in self.filter.run((Ctx::new([], &inputs), Val::from(input.clone()))) {
            match output {
                Ok(value) => run.values.push(Value::from(value)),
                Err(error) => {
                    run.error = Some(QueryError {
                        message: error.to_string(),
                    });
                    break;
                }
            }
        }
        run
    }
}
