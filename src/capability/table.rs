//! Static capability table
//!
//! One entry per `Capability`, in enum order. Direct capabilities patch a
//! slot of `TypeSlots` in place. Grouped capabilities name the pointer slot
//! in `TypeSlots` (`offset1`), the field inside the substructure
//! (`offset2`), the substructure size, and where the substructure sits in
//! the `AllMethods` staging aggregate.

use std::fmt;
use std::mem::{offset_of, size_of};

use super::trampoline;
use super::Capability;
use crate::object::{
    AllMethods, BinaryFunc, CallFunc, CompareFunc, GetAttrFunc, HashFunc, LenFunc,
    MappingMethods, ObjObjArgProc, ReprFunc, SequenceMethods, SetAttrFunc, SsizeArgFunc,
    SsizeObjArgProc, SsizeSsizeArgFunc, SsizeSsizeObjArgProc, TypeSlots,
};

/// Type-erased trampoline pointer, written into a slot verbatim
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct Dispatch(*const ());

// Points at a plain function with static lifetime.
unsafe impl Send for Dispatch {}
unsafe impl Sync for Dispatch {}

impl Dispatch {
    pub const fn new(function: *const ()) -> Self {
        Self(function)
    }

    #[inline]
    pub fn as_ptr(self) -> *const () {
        self.0
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dispatch({:p})", self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CapabilityEntry {
    pub capability: Capability,
    /// Offset of the slot (direct) or substructure pointer (grouped) in `TypeSlots`
    pub offset1: usize,
    /// Offset of the slot inside the substructure; unused for direct entries
    pub offset2: usize,
    pub dispatch: Dispatch,
    /// Zero for direct entries
    pub substructure_size: usize,
    /// Offset of the substructure inside `AllMethods`
    pub allmethods_offset: usize,
}

impl CapabilityEntry {
    #[inline]
    pub const fn is_grouped(&self) -> bool {
        self.substructure_size != 0
    }
}

macro_rules! direct {
    ($capability:ident, $slot:ident, $trampoline:path as $ty:ty) => {
        CapabilityEntry {
            capability: Capability::$capability,
            offset1: offset_of!(TypeSlots, $slot),
            offset2: 0,
            dispatch: Dispatch::new($trampoline as $ty as *const ()),
            substructure_size: 0,
            allmethods_offset: 0,
        }
    };
}

macro_rules! grouped {
    ($capability:ident, $pointer:ident, $group:ident: $sub:ty, $slot:ident, $trampoline:path as $ty:ty) => {
        CapabilityEntry {
            capability: Capability::$capability,
            offset1: offset_of!(TypeSlots, $pointer),
            offset2: offset_of!($sub, $slot),
            dispatch: Dispatch::new($trampoline as $ty as *const ()),
            substructure_size: size_of::<$sub>(),
            allmethods_offset: offset_of!(AllMethods, $group),
        }
    };
}

pub static CAPABILITIES: [CapabilityEntry; Capability::COUNT] = [
    direct!(Hash, tp_hash, trampoline::slot_hash as HashFunc),
    direct!(Call, tp_call, trampoline::slot_call as CallFunc),
    direct!(Str, tp_str, trampoline::slot_str as ReprFunc),
    direct!(GetAttr, tp_getattr, trampoline::slot_getattr as GetAttrFunc),
    direct!(SetAttr, tp_setattr, trampoline::slot_setattr as SetAttrFunc),
    direct!(Compare, tp_compare, trampoline::slot_compare as CompareFunc),
    direct!(Repr, tp_repr, trampoline::slot_repr as ReprFunc),
    grouped!(
        MappingLength, tp_as_mapping, mapping: MappingMethods, mp_length,
        trampoline::slot_mp_length as LenFunc
    ),
    grouped!(
        MappingSubscript, tp_as_mapping, mapping: MappingMethods, mp_subscript,
        trampoline::slot_mp_subscript as BinaryFunc
    ),
    grouped!(
        MappingAssSubscript, tp_as_mapping, mapping: MappingMethods, mp_ass_subscript,
        trampoline::slot_mp_ass_subscript as ObjObjArgProc
    ),
    grouped!(
        SequenceLength, tp_as_sequence, sequence: SequenceMethods, sq_length,
        trampoline::slot_sq_length as LenFunc
    ),
    grouped!(
        SequenceItem, tp_as_sequence, sequence: SequenceMethods, sq_item,
        trampoline::slot_sq_item as SsizeArgFunc
    ),
    grouped!(
        SequenceAssItem, tp_as_sequence, sequence: SequenceMethods, sq_ass_item,
        trampoline::slot_sq_ass_item as SsizeObjArgProc
    ),
    grouped!(
        SequenceConcat, tp_as_sequence, sequence: SequenceMethods, sq_concat,
        trampoline::slot_sq_concat as BinaryFunc
    ),
    grouped!(
        SequenceRepeat, tp_as_sequence, sequence: SequenceMethods, sq_repeat,
        trampoline::slot_sq_repeat as SsizeArgFunc
    ),
    grouped!(
        SequenceSlice, tp_as_sequence, sequence: SequenceMethods, sq_slice,
        trampoline::slot_sq_slice as SsizeSsizeArgFunc
    ),
    grouped!(
        SequenceAssSlice, tp_as_sequence, sequence: SequenceMethods, sq_ass_slice,
        trampoline::slot_sq_ass_slice as SsizeSsizeObjArgProc
    ),
];

/// Table entry for `capability`
#[inline]
pub fn entry(capability: Capability) -> &'static CapabilityEntry {
    &CAPABILITIES[capability.index()]
}
