//! Native modules and the module builder

use std::fmt;

use crate::error::{PyErr, PyResult};
use crate::function::{add_to_namespace, FunctionObject, Overload};
use crate::logging::info;
use crate::object::{Namespace, PyObject};

/// A named namespace exposed to the host
pub struct Module {
    name: String,
    dict: Namespace,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dict: Namespace::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn dict(&self) -> &Namespace {
        &self.dict
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("names", &self.dict.names())
            .finish()
    }
}

/// Populates a module; the first registration error is reported by `finish`
pub struct ModuleBuilder {
    module: PyObject,
    error: Option<PyErr>,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module: PyObject::from_module(Module::new(name)),
            error: None,
        }
    }

    fn bind(mut self, name: &str, value: PyObject, doc: Option<&str>) -> Self {
        if self.error.is_none() {
            if let Err(err) = add_to_namespace(&self.module, name, value, doc) {
                self.error = Some(err);
            }
        }
        self
    }

    /// Register `overload` under `name`, extending any function already there
    pub fn def(self, name: &str, overload: Overload) -> Self {
        let function = PyObject::from_function(FunctionObject::new(name, overload));
        self.bind(name, function, None)
    }

    pub fn def_doc(self, name: &str, overload: Overload, doc: &str) -> Self {
        let function = PyObject::from_function(FunctionObject::new(name, overload));
        self.bind(name, function, Some(doc))
    }

    /// Bind a class object under its type name
    pub fn add(mut self, class: PyObject) -> Self {
        match class.as_type().map(|ty| ty.name().to_string()) {
            Some(name) => self.bind(&name, class, None),
            None => {
                if self.error.is_none() {
                    self.error = Some(PyErr::type_error(format!(
                        "expected a class, found '{}'",
                        class.type_name()
                    )));
                }
                self
            }
        }
    }

    pub fn add_value(self, name: &str, value: PyObject) -> Self {
        self.bind(name, value, None)
    }

    pub fn finish(self) -> PyResult<PyObject> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if let Some(module) = self.module.as_module() {
            info!(module = module.name(), names = module.dict().len(), "module initialized");
        }
        Ok(self.module)
    }
}
