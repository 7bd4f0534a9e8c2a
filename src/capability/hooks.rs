//! Per-type instance hooks
//!
//! A registered class supplies one `InstanceHooks` implementation. Enabling a
//! capability routes the host slot through a trampoline into the matching
//! hook here. Hooks that a class enables but never overrides raise
//! `RuntimeError("Unimplemented <hook>")`.

use std::cmp::Ordering;

use crate::error::{PyErr, PyResult};
use crate::logging::error;
use crate::object::{KwArgs, PyObject};

/// Error raised by a hook the class enabled but did not implement
pub fn unimplemented(hook: &'static str) -> PyErr {
    error!(hook, "capability enabled without an overriding hook");
    PyErr::runtime_error(format!("Unimplemented {hook}"))
}

/// Overridable instance operations, one per capability
pub trait InstanceHooks: Send + Sync {
    fn instance_repr(&self, _instance: &PyObject) -> PyResult<PyObject> {
        Err(unimplemented("instance_repr"))
    }

    fn instance_str(&self, _instance: &PyObject) -> PyResult<PyObject> {
        Err(unimplemented("instance_str"))
    }

    /// A result of `-1` is remapped by the trampoline
    fn instance_hash(&self, _instance: &PyObject) -> PyResult<isize> {
        Err(unimplemented("instance_hash"))
    }

    fn instance_compare(&self, _instance: &PyObject, _other: &PyObject) -> PyResult<Ordering> {
        Err(unimplemented("instance_compare"))
    }

    fn instance_call(
        &self,
        _instance: &PyObject,
        _args: &[PyObject],
        _kwargs: Option<&KwArgs>,
    ) -> PyResult<PyObject> {
        Err(unimplemented("instance_call"))
    }

    fn instance_getattr(&self, _instance: &PyObject, _name: &str) -> PyResult<PyObject> {
        Err(unimplemented("instance_getattr"))
    }

    /// `value` of `None` requests deletion
    fn instance_setattr(
        &self,
        _instance: &PyObject,
        _name: &str,
        _value: Option<&PyObject>,
    ) -> PyResult<()> {
        Err(unimplemented("instance_setattr"))
    }

    fn instance_mapping_length(&self, _instance: &PyObject) -> PyResult<isize> {
        Err(unimplemented("instance_mapping_length"))
    }

    fn instance_mapping_subscript(&self, _instance: &PyObject, _key: &PyObject) -> PyResult<PyObject> {
        Err(unimplemented("instance_mapping_subscript"))
    }

    fn instance_mapping_ass_subscript(
        &self,
        _instance: &PyObject,
        _key: &PyObject,
        _value: Option<&PyObject>,
    ) -> PyResult<()> {
        Err(unimplemented("instance_mapping_ass_subscript"))
    }

    fn instance_sequence_length(&self, _instance: &PyObject) -> PyResult<isize> {
        Err(unimplemented("instance_sequence_length"))
    }

    fn instance_sequence_item(&self, _instance: &PyObject, _index: isize) -> PyResult<PyObject> {
        Err(unimplemented("instance_sequence_item"))
    }

    fn instance_sequence_ass_item(
        &self,
        _instance: &PyObject,
        _index: isize,
        _value: Option<&PyObject>,
    ) -> PyResult<()> {
        Err(unimplemented("instance_sequence_ass_item"))
    }

    fn instance_sequence_concat(&self, _instance: &PyObject, _other: &PyObject) -> PyResult<PyObject> {
        Err(unimplemented("instance_sequence_concat"))
    }

    fn instance_sequence_repeat(&self, _instance: &PyObject, _count: isize) -> PyResult<PyObject> {
        Err(unimplemented("instance_sequence_repeat"))
    }

    fn instance_sequence_slice(
        &self,
        _instance: &PyObject,
        _start: isize,
        _end: isize,
    ) -> PyResult<PyObject> {
        Err(unimplemented("instance_sequence_slice"))
    }

    fn instance_sequence_ass_slice(
        &self,
        _instance: &PyObject,
        _start: isize,
        _end: isize,
        _value: Option<&PyObject>,
    ) -> PyResult<()> {
        Err(unimplemented("instance_sequence_ass_slice"))
    }
}

/// Hooks for types that override nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl InstanceHooks for DefaultHooks {}
