//! Class registration
//!
//! `ClassBuilder` owns the type descriptor while capabilities are enabled,
//! then freezes it into a class object and binds the collected methods into
//! the class namespace. Calling the class object dispatches its `__init__`
//! overloads, each of which builds the native value for a new instance.

use std::any::Any;
use std::sync::{Arc, Weak};

use crate::capability::{self, boundary, Capability, InstanceHooks};
use crate::error::{PyErr, PyResult};
use crate::function::{add_to_namespace, CallError, FunctionObject, Overload};
use crate::logging::{info, perf};
use crate::object::{KwArgs, PyObject, TypeObject};

type PendingInit = Box<dyn FnOnce(Weak<TypeObject>) -> Overload + Send>;

pub struct ClassBuilder {
    ty: TypeObject,
    methods: Vec<(String, Overload, Option<String>)>,
    inits: Vec<PendingInit>,
    error: Option<PyErr>,
}

impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_type(TypeObject::new(name))
    }

    /// Class whose enabled capabilities dispatch into `hooks`
    pub fn with_hooks(name: impl Into<String>, hooks: impl InstanceHooks + 'static) -> Self {
        Self::from_type(TypeObject::with_hooks(name, hooks))
    }

    fn from_type(ty: TypeObject) -> Self {
        Self {
            ty,
            methods: Vec::new(),
            inits: Vec::new(),
            error: None,
        }
    }

    fn record(&mut self, outcome: PyResult<()>) {
        if let Err(err) = outcome {
            self.error.get_or_insert(err);
        }
    }

    pub fn enable(mut self, capability: Capability) -> Self {
        let outcome = capability::enable(capability, &mut self.ty);
        self.record(outcome);
        self
    }

    pub fn enable_all(mut self, capabilities: impl IntoIterator<Item = Capability>) -> Self {
        for capability in capabilities {
            let outcome = capability::enable(capability, &mut self.ty);
            self.record(outcome);
        }
        self
    }

    /// Enable every capability `base` has
    pub fn inherit_capabilities(mut self, base: &TypeObject) -> Self {
        let outcome = capability::inherit(&mut self.ty, Some(base));
        self.record(outcome);
        self
    }

    /// Register a method; repeated names build an overload chain
    pub fn def(mut self, name: &str, overload: Overload) -> Self {
        self.methods.push((name.to_string(), overload, None));
        self
    }

    pub fn def_doc(mut self, name: &str, overload: Overload, doc: &str) -> Self {
        self.methods.push((name.to_string(), overload, Some(doc.to_string())));
        self
    }

    /// Register a constructor overload producing the instance's native value
    pub fn def_init<T, F>(mut self, min_args: usize, max_args: usize, init: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&[PyObject], Option<&KwArgs>) -> Result<T, CallError> + Send + Sync + 'static,
    {
        self.inits.push(Box::new(move |class: Weak<TypeObject>| {
            Overload::new(min_args, max_args, move |args, kwargs| {
                let value = init(args, kwargs)?;
                let class = class
                    .upgrade()
                    .ok_or_else(|| PyErr::runtime_error("class object no longer exists"))?;
                Ok(PyObject::new_instance(&class, value))
            })
        }));
        self
    }

    pub fn finish(self) -> PyResult<PyObject> {
        let ClassBuilder {
            ty,
            methods,
            inits,
            error,
        } = self;
        if let Some(err) = error {
            return Err(err);
        }
        let _perf = perf::track("class_finish");

        let ty = Arc::new(ty);
        let class = PyObject::from_type(ty.clone());

        for init in inits {
            let overload = init(Arc::downgrade(&ty));
            let function = PyObject::from_function(FunctionObject::new("__init__", overload));
            add_to_namespace(&class, "__init__", function, None)?;
        }
        for (name, overload, doc) in methods {
            let function = PyObject::from_function(FunctionObject::new(name.as_str(), overload));
            add_to_namespace(&class, &name, function, doc.as_deref())?;
        }

        info!(
            class = ty.name(),
            capabilities = ?ty.capabilities(),
            methods = ty.dict().len(),
            "class registered"
        );
        Ok(class)
    }
}

/// `tp_call` of the builtin `type` type: construct an instance
pub(crate) fn type_call(
    callable: &PyObject,
    args: &[PyObject],
    kwargs: Option<&KwArgs>,
) -> Option<PyObject> {
    boundary("type_call", || construct(callable, args, kwargs))
}

fn construct(callable: &PyObject, args: &[PyObject], kwargs: Option<&KwArgs>) -> PyResult<PyObject> {
    let ty = callable
        .as_type()
        .ok_or_else(|| PyErr::system_error("type call slot reached by a non-type"))?;
    let init = ty
        .dict()
        .get("__init__")
        .ok_or_else(|| PyErr::type_error(format!("cannot create '{}' instances", ty.name())))?;
    let function = init
        .as_function()
        .ok_or_else(|| PyErr::type_error(format!("'{}.__init__' is not a function", ty.name())))?;

    let instance = function.call(args, kwargs)?;
    if !Arc::ptr_eq(instance.type_object(), ty) {
        return Err(PyErr::type_error(format!(
            "__init__ of '{}' produced a '{}' instance",
            ty.name(),
            instance.type_name()
        )));
    }
    Ok(instance)
}
