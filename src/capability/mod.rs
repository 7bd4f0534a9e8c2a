//! Type capabilities - protocol behaviors a type object opts into at registration
//!
//! Architecture:
//! - `blob.rs` - Deduplicated store for substructure byte images
//! - `table.rs` - Static capability table (slot offsets + trampolines)
//! - `install.rs` - Writes trampolines into a type's slots
//! - `trampoline.rs` - Slot adapters with error/panic conversion
//! - `hooks.rs` - Per-type hook trait the trampolines dispatch into

pub mod blob;
mod hooks;
mod install;
pub mod table;
mod trampoline;

#[cfg(test)]
mod tests;

pub use blob::{BlobRef, BlobStore};
pub use hooks::{unimplemented, DefaultHooks, InstanceHooks};
pub use install::{enable, inherit, is_enabled, points_at_trampoline};
pub use table::{CapabilityEntry, Dispatch, CAPABILITIES};

pub(crate) use trampoline::boundary;

use std::fmt;

use bitvec::array::BitArray;
use bitvec::order::Lsb0;

/// Grouping of a capability's slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Slot lives directly in `TypeSlots`
    Direct,
    /// Slot lives in the shared `MappingMethods` substructure
    Mapping,
    /// Slot lives in the shared `SequenceMethods` substructure
    Sequence,
}

/// One host-visible protocol operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Capability {
    Hash = 0,
    Call = 1,
    Str = 2,
    GetAttr = 3,
    SetAttr = 4,
    Compare = 5,
    Repr = 6,
    MappingLength = 7,
    MappingSubscript = 8,
    MappingAssSubscript = 9,
    SequenceLength = 10,
    SequenceItem = 11,
    SequenceAssItem = 12,
    SequenceConcat = 13,
    SequenceRepeat = 14,
    SequenceSlice = 15,
    SequenceAssSlice = 16,
}

impl Capability {
    pub const COUNT: usize = 17;

    /// Every capability in table order
    pub const ALL: [Capability; Capability::COUNT] = [
        Self::Hash,
        Self::Call,
        Self::Str,
        Self::GetAttr,
        Self::SetAttr,
        Self::Compare,
        Self::Repr,
        Self::MappingLength,
        Self::MappingSubscript,
        Self::MappingAssSubscript,
        Self::SequenceLength,
        Self::SequenceItem,
        Self::SequenceAssItem,
        Self::SequenceConcat,
        Self::SequenceRepeat,
        Self::SequenceSlice,
        Self::SequenceAssSlice,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn from_index(index: usize) -> Option<Capability> {
        if index < Self::COUNT {
            Some(Self::ALL[index])
        } else {
            None
        }
    }

    pub const fn category(self) -> Category {
        match self {
            Self::Hash
            | Self::Call
            | Self::Str
            | Self::GetAttr
            | Self::SetAttr
            | Self::Compare
            | Self::Repr => Category::Direct,
            Self::MappingLength | Self::MappingSubscript | Self::MappingAssSubscript => {
                Category::Mapping
            }
            _ => Category::Sequence,
        }
    }

    /// Name of the hook the trampoline invokes
    pub const fn hook_name(self) -> &'static str {
        match self {
            Self::Hash => "instance_hash",
            Self::Call => "instance_call",
            Self::Str => "instance_str",
            Self::GetAttr => "instance_getattr",
            Self::SetAttr => "instance_setattr",
            Self::Compare => "instance_compare",
            Self::Repr => "instance_repr",
            Self::MappingLength => "instance_mapping_length",
            Self::MappingSubscript => "instance_mapping_subscript",
            Self::MappingAssSubscript => "instance_mapping_ass_subscript",
            Self::SequenceLength => "instance_sequence_length",
            Self::SequenceItem => "instance_sequence_item",
            Self::SequenceAssItem => "instance_sequence_ass_item",
            Self::SequenceConcat => "instance_sequence_concat",
            Self::SequenceRepeat => "instance_sequence_repeat",
            Self::SequenceSlice => "instance_sequence_slice",
            Self::SequenceAssSlice => "instance_sequence_ass_slice",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.hook_name().trim_start_matches("instance_"))
    }
}

/// Fixed-width set of capabilities
#[derive(Clone, Default)]
pub struct CapabilitySet {
    bits: BitArray<[u32; 1], Lsb0>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: Capability) {
        self.bits.set(capability.index(), true);
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.bits[capability.index()]
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    /// Members in table order
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.bits.iter_ones().filter_map(Capability::from_index)
    }
}

impl PartialEq for CapabilitySet {
    fn eq(&self, other: &Self) -> bool {
        self.bits.as_raw_slice() == other.bits.as_raw_slice()
    }
}

impl Eq for CapabilitySet {}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = Self::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
