//! Slot trampolines - host calling convention on one side, hooks on the other
//!
//! Every trampoline runs its hook inside `boundary`, which:
//! - converts `Err` into a pending host error
//! - catches panics so they never unwind into the host
//! - returns `None` so the caller can pick its failure sentinel

use std::cmp::Ordering;
use std::panic::{self, AssertUnwindSafe};

use super::hooks::InstanceHooks;
use crate::config;
use crate::error::{PyErr, PyResult};
use crate::logging::warn;
use crate::object::{KwArgs, PyObject};

/// Run `body`, publishing any failure as the pending host error
pub(crate) fn boundary<T>(operation: &'static str, body: impl FnOnce() -> PyResult<T>) -> Option<T> {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(value)) => Some(value),
        Ok(Err(err)) => {
            err.restore();
            None
        }
        Err(payload) => {
            let err = PyErr::from_panic(payload);
            warn!(operation, error = %err, "native panic stopped at slot boundary");
            err.restore();
            None
        }
    }
}

#[inline]
fn hooks(instance: &PyObject) -> &dyn InstanceHooks {
    instance.type_object().hooks()
}

#[inline]
fn status(outcome: Option<()>) -> i32 {
    outcome.map_or(-1, |()| 0)
}

fn checked_length(length: isize) -> PyResult<isize> {
    if length < 0 {
        Err(PyErr::value_error("__len__() should return >= 0"))
    } else {
        Ok(length)
    }
}

pub(crate) fn slot_repr(instance: &PyObject) -> Option<PyObject> {
    boundary("instance_repr", || hooks(instance).instance_repr(instance))
}

pub(crate) fn slot_str(instance: &PyObject) -> Option<PyObject> {
    boundary("instance_str", || hooks(instance).instance_str(instance))
}

pub(crate) fn slot_hash(instance: &PyObject) -> isize {
    boundary("instance_hash", || {
        let hash = hooks(instance).instance_hash(instance)?;
        // -1 is the host's error sentinel
        Ok(if hash == -1 { -2 } else { hash })
    })
    .unwrap_or(-1)
}

pub(crate) fn slot_compare(instance: &PyObject, other: &PyObject) -> i32 {
    boundary("instance_compare", || hooks(instance).instance_compare(instance, other))
        .map_or(-1, |ordering: Ordering| ordering as i32)
}

pub(crate) fn slot_call(
    instance: &PyObject,
    args: &[PyObject],
    kwargs: Option<&KwArgs>,
) -> Option<PyObject> {
    boundary("instance_call", || hooks(instance).instance_call(instance, args, kwargs))
}

pub(crate) fn slot_getattr(instance: &PyObject, name: &str) -> Option<PyObject> {
    boundary("instance_getattr", || hooks(instance).instance_getattr(instance, name))
}

pub(crate) fn slot_setattr(instance: &PyObject, name: &str, value: Option<&PyObject>) -> i32 {
    status(boundary("instance_setattr", || {
        hooks(instance).instance_setattr(instance, name, value)
    }))
}

pub(crate) fn slot_mp_length(instance: &PyObject) -> isize {
    boundary("instance_mapping_length", || {
        checked_length(hooks(instance).instance_mapping_length(instance)?)
    })
    .unwrap_or(-1)
}

pub(crate) fn slot_mp_subscript(instance: &PyObject, key: &PyObject) -> Option<PyObject> {
    boundary("instance_mapping_subscript", || {
        hooks(instance).instance_mapping_subscript(instance, key)
    })
}

pub(crate) fn slot_mp_ass_subscript(
    instance: &PyObject,
    key: &PyObject,
    value: Option<&PyObject>,
) -> i32 {
    status(boundary("instance_mapping_ass_subscript", || {
        hooks(instance).instance_mapping_ass_subscript(instance, key, value)
    }))
}

pub(crate) fn slot_sq_length(instance: &PyObject) -> isize {
    boundary("instance_sequence_length", || {
        checked_length(hooks(instance).instance_sequence_length(instance)?)
    })
    .unwrap_or(-1)
}

/// Item access with a bounds check against the type's own length slot
pub(crate) fn slot_sq_item(instance: &PyObject, index: isize) -> Option<PyObject> {
    boundary("instance_sequence_item", || {
        let ty = instance.type_object();
        if config::global().protocol.sequence_bounds_check {
            let length_slot = ty.slots().as_sequence().and_then(|methods| methods.sq_length);
            if let Some(length_slot) = length_slot {
                let length = length_slot(instance);
                if length < 0 {
                    return Err(PyErr::fetch_after_sentinel());
                }
                if index < 0 || index >= length {
                    return Err(PyErr::index_error(format!("{} index out of range", ty.name())));
                }
            }
        }
        ty.hooks().instance_sequence_item(instance, index)
    })
}

pub(crate) fn slot_sq_ass_item(instance: &PyObject, index: isize, value: Option<&PyObject>) -> i32 {
    status(boundary("instance_sequence_ass_item", || {
        hooks(instance).instance_sequence_ass_item(instance, index, value)
    }))
}

pub(crate) fn slot_sq_concat(instance: &PyObject, other: &PyObject) -> Option<PyObject> {
    boundary("instance_sequence_concat", || {
        hooks(instance).instance_sequence_concat(instance, other)
    })
}

pub(crate) fn slot_sq_repeat(instance: &PyObject, count: isize) -> Option<PyObject> {
    boundary("instance_sequence_repeat", || {
        hooks(instance).instance_sequence_repeat(instance, count)
    })
}

pub(crate) fn slot_sq_slice(instance: &PyObject, start: isize, end: isize) -> Option<PyObject> {
    boundary("instance_sequence_slice", || {
        hooks(instance).instance_sequence_slice(instance, start, end)
    })
}

pub(crate) fn slot_sq_ass_slice(
    instance: &PyObject,
    start: isize,
    end: isize,
    value: Option<&PyObject>,
) -> i32 {
    status(boundary("instance_sequence_ass_slice", || {
        hooks(instance).instance_sequence_ass_slice(instance, start, end, value)
    }))
}
