//! Host-side protocol entry points
//!
//! These play the interpreter's part: look up the slot on the object's type,
//! call it, and turn its sentinel return plus the pending error back into a
//! `PyResult`. Types without the slot fall back to builtin behavior for the
//! builtin payloads, or raise the host's usual `TypeError`.

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::{KwArgs, Payload, PyObject};
use crate::config;
use crate::error::{PyErr, PyResult};
use crate::function::BoundMethod;

#[inline]
fn object_result(result: Option<PyObject>) -> PyResult<PyObject> {
    result.ok_or_else(PyErr::fetch_after_sentinel)
}

#[inline]
fn status_result(status: i32) -> PyResult<()> {
    if status < 0 {
        Err(PyErr::fetch_after_sentinel())
    } else {
        Ok(())
    }
}

#[inline]
fn size_result(size: isize) -> PyResult<isize> {
    if size < 0 {
        Err(PyErr::fetch_after_sentinel())
    } else {
        Ok(size)
    }
}

pub fn repr(obj: &PyObject) -> PyResult<PyObject> {
    match obj.type_object().slots().tp_repr {
        Some(slot) => object_result(slot(obj)),
        None => Ok(PyObject::from_string(format!("{:?}", obj))),
    }
}

/// `str()`; falls back to `repr` for non-strings
pub fn str(obj: &PyObject) -> PyResult<PyObject> {
    match obj.type_object().slots().tp_str {
        Some(slot) => object_result(slot(obj)),
        None if obj.as_str().is_some() => Ok(obj.clone()),
        None => repr(obj),
    }
}

pub fn hash(obj: &PyObject) -> PyResult<isize> {
    if let Some(slot) = obj.type_object().slots().tp_hash {
        let hash = slot(obj);
        return if hash == -1 {
            Err(PyErr::fetch_after_sentinel())
        } else {
            Ok(hash)
        };
    }
    builtin_hash(obj)
}

fn builtin_hash(obj: &PyObject) -> PyResult<isize> {
    let hash = match obj.payload() {
        Payload::None => 0,
        Payload::Bool(value) => *value as isize,
        Payload::Int(value) => *value as isize,
        Payload::Float(value) if value.fract() == 0.0 && value.is_finite() => *value as i64 as isize,
        Payload::Float(value) => hash_of(&value.to_bits()),
        Payload::Str(value) => hash_of(value),
        Payload::Tuple(items) => {
            let mut hasher = DefaultHasher::new();
            for item in items {
                hash(item)?.hash(&mut hasher);
            }
            hasher.finish() as isize
        }
        // Identity hash for everything else
        _ => Arc::as_ptr(&obj.inner) as usize as isize,
    };
    Ok(if hash == -1 { -2 } else { hash })
}

fn hash_of<T: Hash + ?Sized>(value: &T) -> isize {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish() as isize
}

/// Three-way comparison
///
/// The slot's `-1` means both `Less` and failure, told apart by the pending
/// error. A stale error left pending by earlier code is discarded before the
/// slot runs so it cannot turn a `Less` into a failure.
pub fn compare(left: &PyObject, right: &PyObject) -> PyResult<Ordering> {
    if let Some(slot) = left.type_object().slots().tp_compare {
        PyErr::clear();
        let result = slot(left, right);
        if result == -1 && PyErr::occurred() {
            return Err(PyErr::fetch_after_sentinel());
        }
        return Ok(result.cmp(&0));
    }

    if left.is(right) {
        return Ok(Ordering::Equal);
    }
    let ordering = match (left.payload(), right.payload()) {
        (Payload::Str(a), Payload::Str(b)) => Some(a.cmp(b)),
        (Payload::Int(a), Payload::Int(b)) => Some(a.cmp(b)),
        (Payload::Bool(a), Payload::Bool(b)) => Some(a.cmp(b)),
        _ => match (left.as_float(), right.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    ordering.ok_or_else(|| {
        PyErr::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))
    })
}

pub fn call(callable: &PyObject, args: &[PyObject], kwargs: Option<&KwArgs>) -> PyResult<PyObject> {
    match callable.type_object().slots().tp_call {
        Some(slot) => object_result(slot(callable, args, kwargs)),
        None => Err(PyErr::type_error(format!(
            "'{}' object is not callable",
            callable.type_name()
        ))),
    }
}

pub fn getattr(obj: &PyObject, name: &str) -> PyResult<PyObject> {
    match obj.type_object().slots().tp_getattr {
        Some(slot) => object_result(slot(obj, name)),
        None => generic_getattr(obj, name),
    }
}

/// Namespace lookup, then class lookup with functions bound to `obj`
pub fn generic_getattr(obj: &PyObject, name: &str) -> PyResult<PyObject> {
    if let Some(value) = obj.dict().and_then(|dict| dict.get(name)) {
        return Ok(value);
    }
    match obj.type_object().dict().get(name) {
        Some(attr) if attr.as_function().is_some() => {
            Ok(PyObject::from_method(BoundMethod::new(obj.clone(), attr)))
        }
        Some(attr) => Ok(attr),
        None => Err(no_attribute(obj, name)),
    }
}

pub fn setattr(obj: &PyObject, name: &str, value: &PyObject) -> PyResult<()> {
    match obj.type_object().slots().tp_setattr {
        Some(slot) => status_result(slot(obj, name, Some(value))),
        None => match obj.dict() {
            Some(dict) => {
                dict.set(name, value.clone());
                Ok(())
            }
            None => Err(no_attribute(obj, name)),
        },
    }
}

pub fn delattr(obj: &PyObject, name: &str) -> PyResult<()> {
    match obj.type_object().slots().tp_setattr {
        Some(slot) => status_result(slot(obj, name, None)),
        None => obj
            .dict()
            .and_then(|dict| dict.remove(name))
            .map(|_| ())
            .ok_or_else(|| no_attribute(obj, name)),
    }
}

fn no_attribute(obj: &PyObject, name: &str) -> PyErr {
    PyErr::attribute_error(format!("'{}' object has no attribute '{}'", obj.type_name(), name))
}

/// `len()`; the sequence slot takes precedence over the mapping slot
pub fn len(obj: &PyObject) -> PyResult<usize> {
    let slots = obj.type_object().slots();
    let slot = slots
        .as_sequence()
        .and_then(|methods| methods.sq_length)
        .or_else(|| slots.as_mapping().and_then(|methods| methods.mp_length));
    if let Some(slot) = slot {
        return size_result(slot(obj)).map(|size| size as usize);
    }
    match obj.payload() {
        Payload::Str(value) => Ok(value.chars().count()),
        Payload::Tuple(items) => Ok(items.len()),
        _ => Err(PyErr::type_error(format!(
            "object of type '{}' has no len()",
            obj.type_name()
        ))),
    }
}

/// `obj[key]`; mapping slot first, then the sequence slot for int keys
pub fn get_item(obj: &PyObject, key: &PyObject) -> PyResult<PyObject> {
    let slots = obj.type_object().slots();
    if let Some(slot) = slots.as_mapping().and_then(|methods| methods.mp_subscript) {
        return object_result(slot(obj, key));
    }
    match key.as_int() {
        Some(index) => sequence_get_item(obj, index as isize),
        None => Err(PyErr::type_error(format!(
            "'{}' object is not subscriptable",
            obj.type_name()
        ))),
    }
}

pub fn set_item(obj: &PyObject, key: &PyObject, value: &PyObject) -> PyResult<()> {
    assign_item(obj, key, Some(value))
}

pub fn del_item(obj: &PyObject, key: &PyObject) -> PyResult<()> {
    assign_item(obj, key, None)
}

fn assign_item(obj: &PyObject, key: &PyObject, value: Option<&PyObject>) -> PyResult<()> {
    let slots = obj.type_object().slots();
    if let Some(slot) = slots.as_mapping().and_then(|methods| methods.mp_ass_subscript) {
        return status_result(slot(obj, key, value));
    }
    match key.as_int() {
        Some(index) => sequence_set_item(obj, index as isize, value),
        None => Err(PyErr::type_error(format!(
            "'{}' object does not support item {}",
            obj.type_name(),
            if value.is_some() { "assignment" } else { "deletion" }
        ))),
    }
}

/// Add the sequence length to a negative index when the type reports one
fn normalize_index(obj: &PyObject, index: isize) -> PyResult<isize> {
    if index >= 0 || !config::global().protocol.normalize_negative_indices {
        return Ok(index);
    }
    match obj.type_object().slots().as_sequence().and_then(|methods| methods.sq_length) {
        Some(length) => Ok(index + size_result(length(obj))?),
        None => Ok(index),
    }
}

pub fn sequence_get_item(obj: &PyObject, index: isize) -> PyResult<PyObject> {
    if let Some(slot) = obj.type_object().slots().as_sequence().and_then(|methods| methods.sq_item) {
        let index = normalize_index(obj, index)?;
        return object_result(slot(obj, index));
    }
    match obj.payload() {
        Payload::Tuple(items) => {
            let position = if index < 0 { index + items.len() as isize } else { index };
            usize::try_from(position)
                .ok()
                .and_then(|position| items.get(position))
                .cloned()
                .ok_or_else(|| PyErr::index_error("tuple index out of range"))
        }
        _ => Err(PyErr::type_error(format!(
            "'{}' object does not support indexing",
            obj.type_name()
        ))),
    }
}

/// `value` of `None` deletes the item
pub fn sequence_set_item(obj: &PyObject, index: isize, value: Option<&PyObject>) -> PyResult<()> {
    match obj.type_object().slots().as_sequence().and_then(|methods| methods.sq_ass_item) {
        Some(slot) => {
            let index = normalize_index(obj, index)?;
            status_result(slot(obj, index, value))
        }
        None => Err(PyErr::type_error(format!(
            "'{}' object does not support item assignment",
            obj.type_name()
        ))),
    }
}

pub fn concat(left: &PyObject, right: &PyObject) -> PyResult<PyObject> {
    if let Some(slot) = left.type_object().slots().as_sequence().and_then(|methods| methods.sq_concat) {
        return object_result(slot(left, right));
    }
    match (left.payload(), right.payload()) {
        (Payload::Str(a), Payload::Str(b)) => Ok(PyObject::from_string(format!("{a}{b}"))),
        (Payload::Tuple(a), Payload::Tuple(b)) => {
            Ok(PyObject::tuple(a.iter().chain(b.iter()).cloned().collect()))
        }
        _ => Err(PyErr::type_error(format!(
            "can only concatenate '{}' (not '{}') to '{}'",
            left.type_name(),
            right.type_name(),
            left.type_name()
        ))),
    }
}

pub fn repeat(obj: &PyObject, count: isize) -> PyResult<PyObject> {
    if let Some(slot) = obj.type_object().slots().as_sequence().and_then(|methods| methods.sq_repeat) {
        return object_result(slot(obj, count));
    }
    match obj.payload() {
        Payload::Str(value) => repeat_str(value, count),
        _ => Err(PyErr::type_error(format!(
            "can't multiply sequence '{}' by non-int",
            obj.type_name()
        ))),
    }
}

/// Repeat a string without aborting on oversized results
fn repeat_str(value: &str, count: isize) -> PyResult<PyObject> {
    let count = usize::try_from(count).unwrap_or(0);
    let size = value
        .len()
        .checked_mul(count)
        .ok_or_else(|| PyErr::memory_error("repeated string is too long"))?;
    let mut repeated = String::new();
    repeated
        .try_reserve_exact(size)
        .map_err(|_| PyErr::memory_error("cannot allocate repeated string"))?;
    for _ in 0..count {
        repeated.push_str(value);
    }
    Ok(PyObject::from_string(repeated))
}

pub fn get_slice(obj: &PyObject, start: isize, end: isize) -> PyResult<PyObject> {
    match obj.type_object().slots().as_sequence().and_then(|methods| methods.sq_slice) {
        Some(slot) => object_result(slot(obj, start, end)),
        None => Err(PyErr::type_error(format!(
            "'{}' object is not sliceable",
            obj.type_name()
        ))),
    }
}

/// `value` of `None` deletes the slice
pub fn set_slice(obj: &PyObject, start: isize, end: isize, value: Option<&PyObject>) -> PyResult<()> {
    match obj.type_object().slots().as_sequence().and_then(|methods| methods.sq_ass_slice) {
        Some(slot) => status_result(slot(obj, start, end, value)),
        None => Err(PyErr::type_error(format!(
            "'{}' object does not support slice assignment",
            obj.type_name()
        ))),
    }
}
