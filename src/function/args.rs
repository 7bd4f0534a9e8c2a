//! Argument conversion for overload thunks
//!
//! A thunk distinguishes two failures:
//! - `CallError::Mismatch`: the arguments do not fit this overload, try the next
//! - `CallError::Raised`: the overload ran and raised, stop dispatching

use thiserror::Error;

use crate::error::PyErr;
use crate::object::{KwArgs, PyObject};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    #[error("{argument}: expected {expected}, found {found}")]
    Mismatch {
        argument: String,
        expected: &'static str,
        found: String,
    },
    #[error(transparent)]
    Raised(#[from] PyErr),
}

impl CallError {
    pub fn mismatch(argument: impl Into<String>, expected: &'static str, found: Option<&PyObject>) -> Self {
        Self::Mismatch {
            argument: argument.into(),
            expected,
            found: found.map_or_else(|| "nothing".to_string(), |obj| obj.type_name().to_string()),
        }
    }

    #[inline]
    pub fn is_mismatch(&self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}

/// Conversion from a host object into a native value
pub trait FromPyObject: Sized {
    /// Host type name reported on mismatch
    const TYPE_NAME: &'static str;

    fn extract(obj: &PyObject) -> Option<Self>;
}

impl FromPyObject for i64 {
    const TYPE_NAME: &'static str = "int";

    fn extract(obj: &PyObject) -> Option<Self> {
        obj.as_int()
    }
}

impl FromPyObject for f64 {
    const TYPE_NAME: &'static str = "float";

    fn extract(obj: &PyObject) -> Option<Self> {
        obj.as_float()
    }
}

impl FromPyObject for bool {
    const TYPE_NAME: &'static str = "bool";

    fn extract(obj: &PyObject) -> Option<Self> {
        obj.as_bool()
    }
}

impl FromPyObject for String {
    const TYPE_NAME: &'static str = "str";

    fn extract(obj: &PyObject) -> Option<Self> {
        obj.as_str().map(str::to_owned)
    }
}

impl FromPyObject for PyObject {
    const TYPE_NAME: &'static str = "object";

    fn extract(obj: &PyObject) -> Option<Self> {
        Some(obj.clone())
    }
}

/// Conversion from a native result into a host object
pub trait IntoPyObject {
    fn into_py(self) -> PyObject;
}

impl IntoPyObject for PyObject {
    fn into_py(self) -> PyObject {
        self
    }
}

impl IntoPyObject for () {
    fn into_py(self) -> PyObject {
        PyObject::none()
    }
}

impl IntoPyObject for bool {
    fn into_py(self) -> PyObject {
        PyObject::from_bool(self)
    }
}

impl IntoPyObject for i64 {
    fn into_py(self) -> PyObject {
        PyObject::from_int(self)
    }
}

impl IntoPyObject for i32 {
    fn into_py(self) -> PyObject {
        PyObject::from_int(i64::from(self))
    }
}

impl IntoPyObject for f64 {
    fn into_py(self) -> PyObject {
        PyObject::from_float(self)
    }
}

impl IntoPyObject for String {
    fn into_py(self) -> PyObject {
        PyObject::from_string(self)
    }
}

impl IntoPyObject for &str {
    fn into_py(self) -> PyObject {
        PyObject::from_string(self)
    }
}

impl<T: IntoPyObject> IntoPyObject for Option<T> {
    fn into_py(self) -> PyObject {
        self.map_or_else(PyObject::none, IntoPyObject::into_py)
    }
}

/// Convert positional argument `index`
pub fn extract<T: FromPyObject>(args: &[PyObject], index: usize) -> Result<T, CallError> {
    let obj = args.get(index);
    obj.and_then(T::extract)
        .ok_or_else(|| CallError::mismatch(format!("argument {index}"), T::TYPE_NAME, obj))
}

/// Convert keyword argument `name`, if given
pub fn keyword<T: FromPyObject>(kwargs: Option<&KwArgs>, name: &str) -> Result<Option<T>, CallError> {
    let Some(obj) = find_keyword(kwargs, name) else {
        return Ok(None);
    };
    T::extract(obj)
        .map(Some)
        .ok_or_else(|| CallError::mismatch(format!("keyword '{name}'"), T::TYPE_NAME, Some(obj)))
}

/// Convert an argument given either at position `index` or as keyword `name`
pub fn argument<T: FromPyObject>(
    args: &[PyObject],
    kwargs: Option<&KwArgs>,
    index: usize,
    name: &str,
) -> Result<T, CallError> {
    if index < args.len() {
        return extract(args, index);
    }
    keyword(kwargs, name)?.ok_or_else(|| CallError::mismatch(format!("argument '{name}'"), T::TYPE_NAME, None))
}

fn find_keyword<'a>(kwargs: Option<&'a KwArgs>, name: &str) -> Option<&'a PyObject> {
    kwargs?
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value)
}
