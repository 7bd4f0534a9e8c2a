//! Host error model - exception kinds and the pending-error side channel
//!
//! Design: Every boundary function reports failure twice, the way the host
//! expects it:
//! 1. A sentinel return value (`None` for object slots, `-1` for integer slots)
//! 2. A pending `PyErr` stored in a thread-local slot
//!
//! Native code works with `PyResult<T>` and only touches the pending slot at
//! the trampoline boundary (`PyErr::restore`) or when reading a slot result
//! back (`PyErr::fetch`).

use std::any::Any;
use std::cell::RefCell;
use std::fmt;

use thiserror::Error;

use crate::logging::{debug, trace};

/// Host exception classes the binding layer can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    TypeError,
    ValueError,
    IndexError,
    KeyError,
    AttributeError,
    RuntimeError,
    MemoryError,
    SystemError,
}

impl ExceptionKind {
    /// Host-visible class name
    pub const fn name(self) -> &'static str {
        match self {
            Self::TypeError => "TypeError",
            Self::ValueError => "ValueError",
            Self::IndexError => "IndexError",
            Self::KeyError => "KeyError",
            Self::AttributeError => "AttributeError",
            Self::RuntimeError => "RuntimeError",
            Self::MemoryError => "MemoryError",
            Self::SystemError => "SystemError",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A host exception: kind plus message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PyErr {
    kind: ExceptionKind,
    message: String,
}

/// Result alias used across the binding layer
pub type PyResult<T> = Result<T, PyErr>;

thread_local! {
    static PENDING: RefCell<Option<PyErr>> = const { RefCell::new(None) };
}

impl PyErr {
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::TypeError, message)
    }

    pub fn value_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::ValueError, message)
    }

    pub fn index_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::IndexError, message)
    }

    pub fn key_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::KeyError, message)
    }

    pub fn attribute_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::AttributeError, message)
    }

    pub fn runtime_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::RuntimeError, message)
    }

    pub fn memory_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::MemoryError, message)
    }

    pub fn system_error(message: impl Into<String>) -> Self {
        Self::new(ExceptionKind::SystemError, message)
    }

    #[inline]
    pub fn kind(&self) -> ExceptionKind {
        self.kind
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Check the exception class
    #[inline]
    pub fn is(&self, kind: ExceptionKind) -> bool {
        self.kind == kind
    }

    /// Make this the pending host error, replacing any previous one
    pub fn restore(self) {
        trace!(event = "error_set", kind = %self.kind, message = %self.message);
        PENDING.with(|slot| {
            if let Some(previous) = slot.borrow_mut().replace(self) {
                debug!(replaced = %previous, "pending error overwritten");
            }
        });
    }

    /// Take the pending host error, clearing the slot
    pub fn fetch() -> Option<PyErr> {
        PENDING.with(|slot| slot.borrow_mut().take())
    }

    /// Check whether an error is pending
    pub fn occurred() -> bool {
        PENDING.with(|slot| slot.borrow().is_some())
    }

    /// Drop any pending error
    pub fn clear() {
        PENDING.with(|slot| slot.borrow_mut().take());
    }

    /// Take the pending error after a slot returned its failure sentinel
    ///
    /// A sentinel without a pending error is itself a bug in the slot.
    pub fn fetch_after_sentinel() -> PyErr {
        Self::fetch().unwrap_or_else(|| Self::system_error("error return without exception set"))
    }

    /// Convert a caught panic payload into a host error
    ///
    /// `std::panic::panic_any(PyErr)` travels through unchanged; string
    /// payloads keep their message.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> PyErr {
        let payload = match payload.downcast::<PyErr>() {
            Ok(err) => return *err,
            Err(other) => other,
        };
        let payload = match payload.downcast::<String>() {
            Ok(message) => return Self::runtime_error(*message),
            Err(other) => other,
        };
        match payload.downcast::<&'static str>() {
            Ok(message) => Self::runtime_error(*message),
            Err(_) => Self::runtime_error("unidentifiable native panic"),
        }
    }
}
