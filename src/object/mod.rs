//! Host object model - the boundary the binding layer is written against
//!
//! Design: The host interpreter is an external collaborator, so this module
//! only carries what crosses the boundary:
//! - `PyObject`: reference-counted handle (type descriptor + payload)
//! - `TypeObject` / `TypeSlots`: type descriptors with protocol slots at stable offsets
//! - `Namespace`: module and type dictionaries
//! - `protocol`: host-side entry points that call through slots and check sentinels
//!
//! Builtin payloads are limited to the values native code needs to exchange
//! with the host.

mod namespace;
pub mod protocol;
mod types;


pub use namespace::Namespace;
pub use types::{
    AllMethods, BinaryFunc, CallFunc, CompareFunc, GetAttrFunc, HashFunc, LenFunc,
    MappingMethods, ObjObjArgProc, ReprFunc, SequenceMethods, SetAttrFunc, SsizeArgFunc,
    SsizeObjArgProc, SsizeSsizeArgFunc, SsizeSsizeObjArgProc, TypeObject, TypeSlots,
};

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::function::{BoundMethod, FunctionObject};
use crate::module::Module;

/// Keyword arguments as passed across the boundary
pub type KwArgs = [(String, PyObject)];

/// Object payload - one representation per builtin kind
pub enum Payload {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Tuple(Vec<PyObject>),
    Type(Arc<TypeObject>),
    Function(FunctionObject),
    Method(BoundMethod),
    Module(Module),
    /// Instance of a registered native class
    Native(Box<dyn Any + Send + Sync>),
}

struct ObjectInner {
    ob_type: Arc<TypeObject>,
    payload: Payload,
}

/// Universal host object reference
///
/// Cloning bumps the reference count; the binding layer never frees a host
/// object explicitly.
#[derive(Clone)]
pub struct PyObject {
    inner: Arc<ObjectInner>,
}

static NONE_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| Arc::new(TypeObject::new("NoneType")));
static BOOL_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| Arc::new(TypeObject::new("bool")));
static INT_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| Arc::new(TypeObject::new("int")));
static FLOAT_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| Arc::new(TypeObject::new("float")));
static STR_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| Arc::new(TypeObject::new("str")));
static TUPLE_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| Arc::new(TypeObject::new("tuple")));
static TYPE_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| {
    let mut ty = TypeObject::new("type");
    ty.slots_mut().tp_call = Some(crate::class::type_call);
    Arc::new(ty)
});
static MODULE_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| Arc::new(TypeObject::new("module")));

static FUNCTION_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| {
    let mut ty = TypeObject::new("function");
    ty.slots_mut().tp_call = Some(crate::function::function_call);
    Arc::new(ty)
});

static METHOD_TYPE: Lazy<Arc<TypeObject>> = Lazy::new(|| {
    let mut ty = TypeObject::new("method");
    ty.slots_mut().tp_call = Some(crate::function::method_call);
    Arc::new(ty)
});

static NONE: Lazy<PyObject> = Lazy::new(|| PyObject::from_parts(NONE_TYPE.clone(), Payload::None));

impl PyObject {
    #[inline]
    fn from_parts(ob_type: Arc<TypeObject>, payload: Payload) -> Self {
        Self {
            inner: Arc::new(ObjectInner { ob_type, payload }),
        }
    }

    /// The None singleton
    #[inline]
    pub fn none() -> Self {
        NONE.clone()
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_parts(BOOL_TYPE.clone(), Payload::Bool(value))
    }

    pub fn from_int(value: i64) -> Self {
        Self::from_parts(INT_TYPE.clone(), Payload::Int(value))
    }

    pub fn from_float(value: f64) -> Self {
        Self::from_parts(FLOAT_TYPE.clone(), Payload::Float(value))
    }

    pub fn from_string(value: impl Into<String>) -> Self {
        Self::from_parts(STR_TYPE.clone(), Payload::Str(value.into()))
    }

    pub fn tuple(items: Vec<PyObject>) -> Self {
        Self::from_parts(TUPLE_TYPE.clone(), Payload::Tuple(items))
    }

    /// Wrap a type descriptor as a host object
    pub fn from_type(ty: Arc<TypeObject>) -> Self {
        Self::from_parts(TYPE_TYPE.clone(), Payload::Type(ty))
    }

    pub fn from_function(function: FunctionObject) -> Self {
        Self::from_parts(FUNCTION_TYPE.clone(), Payload::Function(function))
    }

    pub fn from_method(method: BoundMethod) -> Self {
        Self::from_parts(METHOD_TYPE.clone(), Payload::Method(method))
    }

    pub fn from_module(module: Module) -> Self {
        Self::from_parts(MODULE_TYPE.clone(), Payload::Module(module))
    }

    /// Create an instance of a registered native class holding `value`
    pub fn new_instance<T: Any + Send + Sync>(ty: &Arc<TypeObject>, value: T) -> Self {
        Self::from_parts(ty.clone(), Payload::Native(Box::new(value)))
    }

    /// Declared type of this object
    #[inline]
    pub fn type_object(&self) -> &Arc<TypeObject> {
        &self.inner.ob_type
    }

    #[inline]
    pub fn type_name(&self) -> &str {
        self.inner.ob_type.name()
    }

    #[inline]
    pub fn payload(&self) -> &Payload {
        &self.inner.payload
    }

    /// Identity comparison
    #[inline]
    pub fn is(&self, other: &PyObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Current reference count (for debugging/testing)
    #[inline]
    pub fn refcount(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self.payload(), Payload::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.payload() {
            Payload::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.payload() {
            Payload::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// Float value, widening ints
    pub fn as_float(&self) -> Option<f64> {
        match self.payload() {
            Payload::Float(value) => Some(*value),
            Payload::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.payload() {
            Payload::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[PyObject]> {
        match self.payload() {
            Payload::Tuple(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&Arc<TypeObject>> {
        match self.payload() {
            Payload::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionObject> {
        match self.payload() {
            Payload::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&BoundMethod> {
        match self.payload() {
            Payload::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&Module> {
        match self.payload() {
            Payload::Module(module) => Some(module),
            _ => None,
        }
    }

    /// Borrow the native value of a class instance
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self.payload() {
            Payload::Native(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Attribute namespace of a type or module
    pub fn dict(&self) -> Option<&Namespace> {
        match self.payload() {
            Payload::Type(ty) => Some(ty.dict()),
            Payload::Module(module) => Some(module.dict()),
            _ => None,
        }
    }
}

impl fmt::Debug for PyObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.payload() {
            Payload::None => f.write_str("None"),
            Payload::Bool(value) => write!(f, "{}", if *value { "True" } else { "False" }),
            Payload::Int(value) => write!(f, "{}", value),
            Payload::Float(value) => write!(f, "{:?}", value),
            Payload::Str(value) => write!(f, "{:?}", value),
            Payload::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{:?}", item)?;
                }
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Payload::Type(ty) => write!(f, "<class '{}'>", ty.name()),
            Payload::Function(function) => write!(f, "<function {}>", function.qualname()),
            Payload::Method(method) => match method.function().as_function() {
                Some(function) => write!(f, "<bound method {} of {:?}>", function.qualname(), method.receiver()),
                None => write!(f, "<bound method of {:?}>", method.receiver()),
            },
            Payload::Module(module) => write!(f, "<module '{}'>", module.name()),
            Payload::Native(_) => write!(f, "<{} object>", self.type_name()),
        }
    }
}
