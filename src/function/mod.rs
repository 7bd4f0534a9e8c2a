//! Overloaded native functions
//!
//! Design:
//! - `FunctionObject` owns an ordered chain of `Overload` records
//! - Registering a second callable under a bound name appends to that chain
//!   (`add_to_namespace`), so earlier registrations win when both accept
//! - Dispatch (`dispatch.rs`) walks the chain by arity, then by argument fit
//! - `BoundMethod` pairs a function with the receiver that gets prepended

mod args;
mod dispatch;
mod method;


pub use args::{argument, extract, keyword, CallError, FromPyObject, IntoPyObject};
pub use dispatch::CallConvention;
pub use method::BoundMethod;

pub(crate) use dispatch::{function_call, method_call};

use std::fmt;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::error::{PyErr, PyResult};
use crate::logging::debug;
use crate::object::{KwArgs, PyObject};

/// Type-erased native callable behind one overload
pub type Thunk =
    Arc<dyn Fn(&[PyObject], Option<&KwArgs>) -> Result<PyObject, CallError> + Send + Sync>;

/// One native implementation with its accepted arity range
#[derive(Clone)]
pub struct Overload {
    thunk: Thunk,
    min_args: usize,
    max_args: usize,
    doc: Option<String>,
}

impl Overload {
    /// Arity counts positional and keyword arguments together. A `max_args`
    /// below `min_args` is raised to `min_args`.
    pub fn new<F>(min_args: usize, max_args: usize, thunk: F) -> Self
    where
        F: Fn(&[PyObject], Option<&KwArgs>) -> Result<PyObject, CallError> + Send + Sync + 'static,
    {
        Self {
            thunk: Arc::new(thunk),
            min_args,
            max_args: max_args.max(min_args),
            doc: None,
        }
    }

    pub fn exact<F>(arity: usize, thunk: F) -> Self
    where
        F: Fn(&[PyObject], Option<&KwArgs>) -> Result<PyObject, CallError> + Send + Sync + 'static,
    {
        Self::new(arity, arity, thunk)
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    #[inline]
    pub fn min_args(&self) -> usize {
        self.min_args
    }

    #[inline]
    pub fn max_args(&self) -> usize {
        self.max_args
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    #[inline]
    pub fn accepts(&self, arity: usize) -> bool {
        (self.min_args..=self.max_args).contains(&arity)
    }

    #[inline]
    pub(crate) fn invoke(&self, args: &[PyObject], kwargs: Option<&KwArgs>) -> Result<PyObject, CallError> {
        (self.thunk)(args, kwargs)
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overload")
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("doc", &self.doc)
            .finish_non_exhaustive()
    }
}

/// Host-callable function with an overload chain
pub struct FunctionObject {
    name: String,
    owner: OnceCell<String>,
    chain: RwLock<Vec<Arc<Overload>>>,
}

impl FunctionObject {
    pub fn new(name: impl Into<String>, overload: Overload) -> Self {
        Self {
            name: name.into(),
            owner: OnceCell::new(),
            chain: RwLock::new(vec![Arc::new(overload)]),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the class this function was bound into, if any
    pub fn owner(&self) -> Option<&str> {
        self.owner.get().map(String::as_str)
    }

    /// First owner wins; later calls are ignored
    pub(crate) fn set_owner(&self, owner: &str) {
        let _ = self.owner.set(owner.to_string());
    }

    /// Display name used in error messages
    pub fn qualname(&self) -> String {
        match self.owner() {
            Some(owner) => format!("{}.{}", owner, self.name),
            None => self.name.clone(),
        }
    }

    pub fn overload_count(&self) -> usize {
        self.chain.read().len()
    }

    /// Snapshot of the chain in dispatch order
    pub fn overloads(&self) -> Vec<Arc<Overload>> {
        self.chain.read().clone()
    }

    /// Append every record of `other` to the end of this chain
    pub fn add_overload(&self, other: &FunctionObject) {
        if std::ptr::eq(self, other) {
            return;
        }
        let incoming = other.overloads();
        let mut chain = self.chain.write();
        chain.extend(incoming);
        debug!(function = %self.qualname(), overloads = chain.len(), "overload appended");
    }

    /// Attach `doc` to every record that has none
    pub(crate) fn document(&self, doc: &str) {
        let mut chain = self.chain.write();
        for record in chain.iter_mut().filter(|record| record.doc.is_none()) {
            *record = Arc::new(Overload::clone(&**record).with_doc(doc));
        }
    }

    /// Documentation of every record, joined in chain order
    pub fn doc(&self) -> Option<String> {
        let chain = self.chain.read();
        let docs: Vec<&str> = chain.iter().filter_map(|record| record.doc()).collect();
        if docs.is_empty() {
            None
        } else {
            Some(docs.join("\n"))
        }
    }

    /// Dispatch a plain call
    pub fn call(&self, args: &[PyObject], kwargs: Option<&KwArgs>) -> PyResult<PyObject> {
        dispatch::walk_chain(self, args, kwargs, CallConvention::Free)
    }

    /// Dispatch a call with `receiver` prepended as the first argument
    pub fn call_method(
        &self,
        receiver: &PyObject,
        args: &[PyObject],
        kwargs: Option<&KwArgs>,
    ) -> PyResult<PyObject> {
        let mut full: SmallVec<[PyObject; 8]> = SmallVec::with_capacity(args.len() + 1);
        full.push(receiver.clone());
        full.extend(args.iter().cloned());
        dispatch::walk_chain(self, &full, kwargs, CallConvention::Member)
    }
}

impl fmt::Debug for FunctionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionObject")
            .field("name", &self.qualname())
            .field("overloads", &self.overload_count())
            .finish()
    }
}

/// Bind `attribute` under `name` in the namespace of `target`
///
/// - A function bound over an existing function appends its overloads
/// - A function bound over a non-function value is rejected
/// - Binding the object already there is a no-op
/// - Any other value replaces the binding
///
/// Functions bound into a type take the type's name as owner. `doc` is
/// attached to the incoming records that have none.
pub fn add_to_namespace(
    target: &PyObject,
    name: &str,
    attribute: PyObject,
    doc: Option<&str>,
) -> PyResult<()> {
    let namespace = target.dict().ok_or_else(|| {
        PyErr::type_error(format!("'{}' object has no attribute namespace", target.type_name()))
    })?;

    // Applied only once the binding is known to go ahead
    let prepare = |attribute: &PyObject| {
        if let Some(function) = attribute.as_function() {
            if let Some(ty) = target.as_type() {
                function.set_owner(ty.name());
            }
            if let Some(doc) = doc {
                function.document(doc);
            }
        }
    };

    match namespace.entry(name) {
        Entry::Vacant(slot) => {
            prepare(&attribute);
            slot.insert(attribute);
        }
        Entry::Occupied(mut existing) => {
            if existing.get().is(&attribute) {
                return Ok(());
            }
            let merged = match (existing.get().as_function(), attribute.as_function()) {
                (Some(current), Some(incoming)) => {
                    prepare(&attribute);
                    current.add_overload(incoming);
                    true
                }
                (None, Some(_)) => {
                    return Err(PyErr::type_error(format!(
                        "cannot overload '{}': existing attribute of type '{}' is not a function",
                        name,
                        existing.get().type_name()
                    )));
                }
                _ => {
                    prepare(&attribute);
                    false
                }
            };
            if !merged {
                existing.insert(attribute);
            }
        }
    }

    debug!(namespace = ?target, name, "attribute bound");
    Ok(())
}
