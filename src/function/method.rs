use std::fmt;

use crate::error::{PyErr, PyResult};
use crate::object::{KwArgs, PyObject};

/// A function looked up through an instance, remembering that instance
#[derive(Clone)]
pub struct BoundMethod {
    receiver: PyObject,
    function: PyObject,
}

impl BoundMethod {
    /// `function` must hold a `FunctionObject`; anything else fails at call time
    pub fn new(receiver: PyObject, function: PyObject) -> Self {
        Self { receiver, function }
    }

    #[inline]
    pub fn receiver(&self) -> &PyObject {
        &self.receiver
    }

    #[inline]
    pub fn function(&self) -> &PyObject {
        &self.function
    }

    /// Call the function with the receiver prepended
    pub fn call(&self, args: &[PyObject], kwargs: Option<&KwArgs>) -> PyResult<PyObject> {
        let function = self.function.as_function().ok_or_else(|| {
            PyErr::type_error(format!("'{}' object is not a function", self.function.type_name()))
        })?;
        function.call_method(&self.receiver, args, kwargs)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("receiver", &self.receiver)
            .field("function", &self.function)
            .finish()
    }
}
