//! Type descriptors - protocol slot layout and the type object
//!
//! Design: `TypeSlots` mirrors the host's fixed-layout type structure. Every
//! field is pointer-sized and `#[repr(C)]`, so slots sit at stable offsets
//! that the capability table addresses with `offset_of!`. Grouped protocols
//! (mapping, sequence) live in separate substructures reached through a
//! pointer slot; those substructures are interned and shared, never owned.

use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use super::namespace::Namespace;
use super::{KwArgs, PyObject};
use crate::capability::{CapabilitySet, DefaultHooks, InstanceHooks};

pub type ReprFunc = fn(&PyObject) -> Option<PyObject>;
pub type HashFunc = fn(&PyObject) -> isize;
pub type CompareFunc = fn(&PyObject, &PyObject) -> i32;
pub type CallFunc = fn(&PyObject, &[PyObject], Option<&KwArgs>) -> Option<PyObject>;
pub type GetAttrFunc = fn(&PyObject, &str) -> Option<PyObject>;
pub type SetAttrFunc = fn(&PyObject, &str, Option<&PyObject>) -> i32;
pub type LenFunc = fn(&PyObject) -> isize;
pub type BinaryFunc = fn(&PyObject, &PyObject) -> Option<PyObject>;
pub type ObjObjArgProc = fn(&PyObject, &PyObject, Option<&PyObject>) -> i32;
pub type SsizeArgFunc = fn(&PyObject, isize) -> Option<PyObject>;
pub type SsizeObjArgProc = fn(&PyObject, isize, Option<&PyObject>) -> i32;
pub type SsizeSsizeArgFunc = fn(&PyObject, isize, isize) -> Option<PyObject>;
pub type SsizeSsizeObjArgProc = fn(&PyObject, isize, isize, Option<&PyObject>) -> i32;

/// Mapping protocol substructure
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct MappingMethods {
    pub mp_length: Option<LenFunc>,
    pub mp_subscript: Option<BinaryFunc>,
    pub mp_ass_subscript: Option<ObjObjArgProc>,
}

/// Sequence protocol substructure
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct SequenceMethods {
    pub sq_length: Option<LenFunc>,
    pub sq_concat: Option<BinaryFunc>,
    pub sq_repeat: Option<SsizeArgFunc>,
    pub sq_item: Option<SsizeArgFunc>,
    pub sq_slice: Option<SsizeSsizeArgFunc>,
    pub sq_ass_item: Option<SsizeObjArgProc>,
    pub sq_ass_slice: Option<SsizeSsizeObjArgProc>,
}

/// Staging aggregate holding one of every substructure
///
/// The installer copies a category's current substructure into its field
/// here, patches it, and interns the bytes of that field.
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct AllMethods {
    pub mapping: MappingMethods,
    pub sequence: SequenceMethods,
}

/// Protocol slots of a type descriptor
#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct TypeSlots {
    pub tp_hash: Option<HashFunc>,
    pub tp_call: Option<CallFunc>,
    pub tp_str: Option<ReprFunc>,
    pub tp_getattr: Option<GetAttrFunc>,
    pub tp_setattr: Option<SetAttrFunc>,
    pub tp_compare: Option<CompareFunc>,
    pub tp_repr: Option<ReprFunc>,
    pub tp_as_mapping: Option<NonNull<MappingMethods>>,
    pub tp_as_sequence: Option<NonNull<SequenceMethods>>,
}

// Substructure pointers target interned blobs that are immutable and live
// until blob-store teardown.
unsafe impl Send for TypeSlots {}
unsafe impl Sync for TypeSlots {}

impl TypeSlots {
    /// Mapping substructure, if the type has one
    #[inline]
    pub fn as_mapping(&self) -> Option<&MappingMethods> {
        self.tp_as_mapping.map(|ptr| unsafe { &*ptr.as_ptr() })
    }

    /// Sequence substructure, if the type has one
    #[inline]
    pub fn as_sequence(&self) -> Option<&SequenceMethods> {
        self.tp_as_sequence.map(|ptr| unsafe { &*ptr.as_ptr() })
    }
}

impl fmt::Debug for TypeSlots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSlots")
            .field("tp_hash", &self.tp_hash.is_some())
            .field("tp_call", &self.tp_call.is_some())
            .field("tp_str", &self.tp_str.is_some())
            .field("tp_getattr", &self.tp_getattr.is_some())
            .field("tp_setattr", &self.tp_setattr.is_some())
            .field("tp_compare", &self.tp_compare.is_some())
            .field("tp_repr", &self.tp_repr.is_some())
            .field("tp_as_mapping", &self.tp_as_mapping)
            .field("tp_as_sequence", &self.tp_as_sequence)
            .finish()
    }
}

/// Host-visible type object
///
/// Capabilities are enabled while the descriptor is still exclusively owned
/// (see `ClassBuilder`); after it is wrapped in an `Arc` the slots are frozen.
pub struct TypeObject {
    name: String,
    slots: TypeSlots,
    hooks: Arc<dyn InstanceHooks>,
    capabilities: CapabilitySet,
    dict: Namespace,
}

impl TypeObject {
    /// Create a type with no hooks overridden
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_hooks(name, DefaultHooks)
    }

    /// Create a type whose trampolines dispatch into `hooks`
    pub fn with_hooks(name: impl Into<String>, hooks: impl InstanceHooks + 'static) -> Self {
        Self {
            name: name.into(),
            slots: TypeSlots::default(),
            hooks: Arc::new(hooks),
            capabilities: CapabilitySet::new(),
            dict: Namespace::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn slots(&self) -> &TypeSlots {
        &self.slots
    }

    #[inline]
    pub(crate) fn slots_mut(&mut self) -> &mut TypeSlots {
        &mut self.slots
    }

    #[inline]
    pub fn hooks(&self) -> &dyn InstanceHooks {
        self.hooks.as_ref()
    }

    #[inline]
    pub fn dict(&self) -> &Namespace {
        &self.dict
    }

    /// Capabilities enabled through the installer
    #[inline]
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    #[inline]
    pub(crate) fn capabilities_mut(&mut self) -> &mut CapabilitySet {
        &mut self.capabilities
    }
}

impl fmt::Debug for TypeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeObject")
            .field("name", &self.name)
            .field("slots", &self.slots)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}
