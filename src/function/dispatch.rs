//! Overload dispatch
//!
//! The chain is walked in registration order:
//! 1. Records whose arity range excludes the call are skipped
//! 2. The first record whose thunk produces a result wins
//! 3. A thunk reporting `Mismatch` passes the call on to the next record
//! 4. A thunk raising an error ends dispatch with that error
//!
//! When no record produces a result, one `TypeError` names the function, the
//! call's argument count and the candidate arity ranges.

use std::fmt::Write as _;

use super::args::CallError;
use super::FunctionObject;
use crate::capability::boundary;
use crate::config;
use crate::error::{PyErr, PyResult};
use crate::logging::trace;
use crate::object::{KwArgs, PyObject};

/// How the callee was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallConvention {
    /// Called directly; every argument is explicit
    Free,
    /// Called through a bound method; the receiver is argument 0
    Member,
}

impl CallConvention {
    /// Arguments supplied by the call machinery rather than the caller
    #[inline]
    pub const fn implicit_args(self) -> usize {
        match self {
            Self::Free => 0,
            Self::Member => 1,
        }
    }
}

pub(crate) fn walk_chain(
    function: &FunctionObject,
    args: &[PyObject],
    kwargs: Option<&KwArgs>,
    convention: CallConvention,
) -> PyResult<PyObject> {
    let keywords = kwargs.map_or(0, <[_]>::len);
    let arity = args.len() + keywords;
    let chain = function.overloads();
    let mut rejected = 0usize;

    for (position, overload) in chain.iter().enumerate() {
        if !overload.accepts(arity) {
            continue;
        }
        match overload.invoke(args, kwargs) {
            Ok(result) => {
                trace!(function = %function.qualname(), position, arity, "overload selected");
                return Ok(result);
            }
            Err(CallError::Mismatch { argument, expected, found }) => {
                trace!(
                    function = %function.qualname(),
                    position,
                    %argument,
                    expected,
                    %found,
                    "overload rejected arguments"
                );
                rejected += 1;
            }
            Err(CallError::Raised(err)) => return Err(err),
        }
    }

    Err(no_match(function, &chain, args.len(), keywords, rejected, convention))
}

fn no_match(
    function: &FunctionObject,
    chain: &[std::sync::Arc<super::Overload>],
    positional: usize,
    keywords: usize,
    rejected: usize,
    convention: CallConvention,
) -> PyErr {
    let implicit = convention.implicit_args();
    let mut message = format!(
        "no matching overload for {}() called with {}",
        function.qualname(),
        plural(positional.saturating_sub(implicit), "argument")
    );
    if keywords > 0 {
        let _ = write!(message, " and {}", plural(keywords, "keyword argument"));
    }

    let settings = &config::global().dispatch;
    if settings.list_candidates && !chain.is_empty() {
        let limit = settings.max_listed_candidates.max(1);
        let mut ranges: Vec<String> = chain
            .iter()
            .take(limit)
            .map(|overload| {
                arity_range(
                    overload.min_args().saturating_sub(implicit),
                    overload.max_args().saturating_sub(implicit),
                )
            })
            .collect();
        if chain.len() > limit {
            ranges.push("...".to_string());
        }
        let _ = write!(message, "; candidates take {} argument(s)", ranges.join(", "));
    }
    if rejected > 0 {
        let _ = write!(message, " ({} rejected the argument types)", plural(rejected, "candidate"));
    }

    PyErr::type_error(message)
}

fn arity_range(min: usize, max: usize) -> String {
    if min == max {
        min.to_string()
    } else {
        format!("{min}-{max}")
    }
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

/// `tp_call` of the builtin function type
pub(crate) fn function_call(
    callable: &PyObject,
    args: &[PyObject],
    kwargs: Option<&KwArgs>,
) -> Option<PyObject> {
    boundary("function_call", || match callable.as_function() {
        Some(function) => function.call(args, kwargs),
        None => Err(PyErr::system_error(format!(
            "'{}' object reached the function call slot",
            callable.type_name()
        ))),
    })
}

/// `tp_call` of the builtin bound-method type
pub(crate) fn method_call(
    callable: &PyObject,
    args: &[PyObject],
    kwargs: Option<&KwArgs>,
) -> Option<PyObject> {
    boundary("method_call", || match callable.as_method() {
        Some(method) => method.call(args, kwargs),
        None => Err(PyErr::system_error(format!(
            "'{}' object reached the method call slot",
            callable.type_name()
        ))),
    })
}
