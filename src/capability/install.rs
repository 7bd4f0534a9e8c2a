//! Capability installer - patches trampolines into a type's slots
//!
//! Direct capabilities write the trampoline into the slot itself. Grouped
//! capabilities never mutate a substructure in place: the current one is
//! copied into a staging `AllMethods`, patched, interned in the blob store,
//! and the type's pointer slot is redirected at the interned copy. Types with
//! the same grouped capability set therefore share one substructure.

use std::mem::size_of;
use std::ptr::{self, NonNull};
use std::slice;

use super::blob::{self, BlobRef};
use super::table::{self, CapabilityEntry, Dispatch};
use super::Capability;
use crate::error::PyResult;
use crate::logging::{debug, trace};
use crate::object::{AllMethods, TypeObject, TypeSlots};

/// Word-sized slot view: a nullable function or substructure pointer
type RawSlot = Option<NonNull<u8>>;

#[inline]
unsafe fn read_slot(base: *const u8, offset: usize) -> RawSlot {
    ptr::read(base.add(offset).cast::<RawSlot>())
}

#[inline]
fn slots_base(slots: &TypeSlots) -> *const u8 {
    (slots as *const TypeSlots).cast::<u8>()
}

/// Enable one capability on a type descriptor
///
/// Idempotent. Fails only if interning the patched substructure cannot
/// allocate, in which case the type is left unchanged.
pub fn enable(capability: Capability, ty: &mut TypeObject) -> PyResult<()> {
    let entry = table::entry(capability);
    debug_assert!(entry.offset1 + size_of::<RawSlot>() <= size_of::<TypeSlots>());

    let value = if entry.is_grouped() {
        let shared = stage_and_intern(ty.slots(), entry)?;
        trace!(
            capability = %capability,
            blob = ?shared,
            "grouped slot redirected to shared substructure"
        );
        shared.cast::<u8>()
    } else {
        // Fn pointers are never null
        unsafe { NonNull::new_unchecked(entry.dispatch.as_ptr().cast_mut().cast::<u8>()) }
    };

    let base = (ty.slots_mut() as *mut TypeSlots).cast::<u8>();
    unsafe {
        ptr::write(base.add(entry.offset1).cast::<RawSlot>(), Some(value));
    }
    ty.capabilities_mut().insert(capability);

    debug!(ty = ty.name(), capability = %capability, "capability enabled");
    Ok(())
}

/// Copy the current substructure into staging, patch it, and intern it
fn stage_and_intern(slots: &TypeSlots, entry: &CapabilityEntry) -> PyResult<BlobRef> {
    debug_assert!(entry.allmethods_offset + entry.substructure_size <= size_of::<AllMethods>());
    debug_assert!(entry.offset2 + size_of::<Dispatch>() <= entry.substructure_size);

    let mut staging = AllMethods::default();
    unsafe {
        let stage = (&mut staging as *mut AllMethods)
            .cast::<u8>()
            .add(entry.allmethods_offset);

        if let Some(current) = read_slot(slots_base(slots), entry.offset1) {
            ptr::copy_nonoverlapping(current.as_ptr(), stage, entry.substructure_size);
        }
        ptr::write(stage.add(entry.offset2).cast::<Dispatch>(), entry.dispatch);

        blob::intern(slice::from_raw_parts(stage, entry.substructure_size))
    }
}

/// Whether the slot addressed by `capability` is populated on `slots`
pub fn is_enabled(capability: Capability, slots: &TypeSlots) -> bool {
    installed(table::entry(capability), slots).is_some()
}

/// Whether the slot addressed by `capability` holds its trampoline
pub fn points_at_trampoline(capability: Capability, slots: &TypeSlots) -> bool {
    let entry = table::entry(capability);
    installed(entry, slots)
        .is_some_and(|slot| slot.as_ptr().cast_const().cast::<()>() == entry.dispatch.as_ptr())
}

fn installed(entry: &CapabilityEntry, slots: &TypeSlots) -> RawSlot {
    unsafe {
        let outer = read_slot(slots_base(slots), entry.offset1);
        if !entry.is_grouped() {
            return outer;
        }
        outer.and_then(|sub| read_slot(sub.as_ptr(), entry.offset2))
    }
}

/// Enable on `dest` every capability `src` has, or all of them when `src` is absent
pub fn inherit(dest: &mut TypeObject, src: Option<&TypeObject>) -> PyResult<()> {
    for capability in Capability::ALL {
        let wanted = src.map_or(true, |src| is_enabled(capability, src.slots()));
        if wanted {
            enable(capability, dest)?;
        }
    }
    debug!(
        ty = dest.name(),
        source = src.map(TypeObject::name),
        enabled = dest.capabilities().len(),
        "capabilities inherited"
    );
    Ok(())
}
