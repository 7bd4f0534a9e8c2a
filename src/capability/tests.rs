use std::cmp::Ordering;
use std::mem::size_of;
use std::sync::Arc;

use proptest::prelude::*;

use super::*;
use crate::error::{ExceptionKind, PyErr, PyResult};
use crate::object::{AllMethods, PyObject, TypeObject, TypeSlots};

struct Fixed {
    hash: isize,
    length: isize,
}

impl InstanceHooks for Fixed {
    fn instance_hash(&self, _instance: &PyObject) -> PyResult<isize> {
        Ok(self.hash)
    }

    fn instance_sequence_length(&self, _instance: &PyObject) -> PyResult<isize> {
        Ok(self.length)
    }

    fn instance_sequence_item(&self, _instance: &PyObject, index: isize) -> PyResult<PyObject> {
        Ok(PyObject::from_int(index as i64 * 10))
    }

    fn instance_compare(&self, instance: &PyObject, other: &PyObject) -> PyResult<Ordering> {
        let left = instance.downcast_ref::<i64>().copied().unwrap_or_default();
        let right = other.downcast_ref::<i64>().copied().unwrap_or_default();
        Ok(left.cmp(&right))
    }

    fn instance_repr(&self, _instance: &PyObject) -> PyResult<PyObject> {
        panic!("repr exploded");
    }
}

fn fixed_type(name: &str, hash: isize, length: isize, caps: &[Capability]) -> Arc<TypeObject> {
    let mut ty = TypeObject::with_hooks(name, Fixed { hash, length });
    for &cap in caps {
        enable(cap, &mut ty).unwrap();
    }
    Arc::new(ty)
}

#[test]
fn test_table_is_in_capability_order() {
    for (index, entry) in CAPABILITIES.iter().enumerate() {
        assert_eq!(entry.capability.index(), index);
        assert_eq!(Capability::from_index(index), Some(entry.capability));
    }
    assert_eq!(Capability::from_index(Capability::COUNT), None);
}

#[test]
fn test_table_offsets_fit_layouts() {
    for entry in &CAPABILITIES {
        assert!(entry.offset1 + size_of::<usize>() <= size_of::<TypeSlots>());
        match entry.capability.category() {
            Category::Direct => assert!(!entry.is_grouped()),
            Category::Mapping | Category::Sequence => {
                assert!(entry.is_grouped());
                assert!(entry.offset2 + size_of::<usize>() <= entry.substructure_size);
                assert!(entry.allmethods_offset + entry.substructure_size <= size_of::<AllMethods>());
            }
        }
    }
}

#[test]
fn test_capability_set() {
    let mut set = CapabilitySet::new();
    assert!(set.is_empty());

    set.insert(Capability::Repr);
    set.insert(Capability::SequenceItem);
    set.insert(Capability::Repr);

    assert_eq!(set.len(), 2);
    assert!(set.contains(Capability::SequenceItem));
    assert!(!set.contains(Capability::Hash));
    assert_eq!(
        set.iter().collect::<Vec<_>>(),
        vec![Capability::Repr, Capability::SequenceItem]
    );

    let same: CapabilitySet = [Capability::SequenceItem, Capability::Repr].into_iter().collect();
    assert_eq!(set, same);
}

#[test]
fn test_enable_direct_capability() {
    let mut ty = TypeObject::new("Direct");
    assert!(!is_enabled(Capability::Hash, ty.slots()));

    enable(Capability::Hash, &mut ty).unwrap();
    enable(Capability::Hash, &mut ty).unwrap();

    assert!(is_enabled(Capability::Hash, ty.slots()));
    assert!(points_at_trampoline(Capability::Hash, ty.slots()));
    assert!(ty.slots().tp_repr.is_none());
    assert_eq!(ty.capabilities().len(), 1);
}

#[test]
fn test_grouped_capabilities_accumulate() {
    let mut ty = TypeObject::new("Accumulate");
    enable(Capability::MappingLength, &mut ty).unwrap();
    let first = ty.slots().tp_as_mapping;
    enable(Capability::MappingSubscript, &mut ty).unwrap();

    assert_ne!(ty.slots().tp_as_mapping, first);
    assert!(points_at_trampoline(Capability::MappingLength, ty.slots()));
    assert!(points_at_trampoline(Capability::MappingSubscript, ty.slots()));
    assert!(!is_enabled(Capability::MappingAssSubscript, ty.slots()));
    assert!(ty.slots().tp_as_sequence.is_none());
}

#[test]
fn test_equal_grouped_sets_share_substructure() {
    let mut a = TypeObject::new("A");
    let mut b = TypeObject::new("B");
    let mut c = TypeObject::new("C");

    enable(Capability::MappingLength, &mut a).unwrap();
    enable(Capability::MappingSubscript, &mut a).unwrap();

    // Enabling order does not matter
    enable(Capability::MappingSubscript, &mut b).unwrap();
    enable(Capability::MappingLength, &mut b).unwrap();

    enable(Capability::MappingLength, &mut c).unwrap();
    enable(Capability::MappingAssSubscript, &mut c).unwrap();

    assert!(a.slots().tp_as_mapping.is_some());
    assert_eq!(a.slots().tp_as_mapping, b.slots().tp_as_mapping);
    assert_ne!(a.slots().tp_as_mapping, c.slots().tp_as_mapping);
}

#[test]
fn test_inherit_all() {
    let mut ty = TypeObject::new("Everything");
    inherit(&mut ty, None).unwrap();

    for capability in Capability::ALL {
        assert!(points_at_trampoline(capability, ty.slots()), "{capability}");
    }
    assert_eq!(ty.capabilities().len(), Capability::COUNT);
}

#[test]
fn test_inherit_from_source() {
    let mut base = TypeObject::new("Base");
    enable(Capability::Repr, &mut base).unwrap();
    enable(Capability::SequenceLength, &mut base).unwrap();

    let mut derived = TypeObject::new("Derived");
    inherit(&mut derived, Some(&base)).unwrap();

    assert_eq!(derived.capabilities(), base.capabilities());
    assert_eq!(derived.slots().tp_as_sequence, base.slots().tp_as_sequence);
    assert!(derived.slots().tp_hash.is_none());
}

#[test]
fn test_unimplemented_hook_raises() {
    let ty = Arc::new({
        let mut ty = TypeObject::new("Bare");
        enable(Capability::Hash, &mut ty).unwrap();
        ty
    });
    let instance = PyObject::new_instance(&ty, ());
    PyErr::clear();

    let hash = ty.slots().tp_hash.unwrap();
    assert_eq!(hash(&instance), -1);

    let err = PyErr::fetch().unwrap();
    assert!(err.is(ExceptionKind::RuntimeError));
    assert_eq!(err.message(), "Unimplemented instance_hash");
}

#[test]
fn test_hash_minus_one_is_remapped() {
    let ty = fixed_type("MinusOne", -1, 0, &[Capability::Hash]);
    let instance = PyObject::new_instance(&ty, ());
    let hash = ty.slots().tp_hash.unwrap();

    assert_eq!(hash(&instance), -2);
    assert!(!PyErr::occurred());
}

#[test]
fn test_sequence_item_bounds_check() {
    let ty = fixed_type(
        "Triple",
        0,
        3,
        &[Capability::SequenceLength, Capability::SequenceItem],
    );
    let instance = PyObject::new_instance(&ty, ());
    let item = ty.slots().as_sequence().unwrap().sq_item.unwrap();
    PyErr::clear();

    assert_eq!(item(&instance, 2).unwrap().as_int(), Some(20));

    assert!(item(&instance, 5).is_none());
    let err = PyErr::fetch().unwrap();
    assert!(err.is(ExceptionKind::IndexError));
    assert_eq!(err.message(), "Triple index out of range");
}

#[test]
fn test_sequence_item_rejects_negative_index() {
    let ty = fixed_type(
        "Triple",
        0,
        3,
        &[Capability::SequenceLength, Capability::SequenceItem],
    );
    let instance = PyObject::new_instance(&ty, ());
    let item = ty.slots().as_sequence().unwrap().sq_item.unwrap();
    PyErr::clear();

    assert!(item(&instance, -1).is_none());
    let err = PyErr::fetch().unwrap();
    assert!(err.is(ExceptionKind::IndexError));
    assert_eq!(err.message(), "Triple index out of range");
}

#[test]
fn test_sequence_item_without_length_slot() {
    let ty = fixed_type("Unbounded", 0, 3, &[Capability::SequenceItem]);
    let instance = PyObject::new_instance(&ty, ());
    let item = ty.slots().as_sequence().unwrap().sq_item.unwrap();

    assert_eq!(item(&instance, 7).unwrap().as_int(), Some(70));
}

#[test]
fn test_negative_length_is_value_error() {
    let ty = fixed_type(
        "Negative",
        0,
        -4,
        &[Capability::SequenceLength, Capability::SequenceItem],
    );
    let instance = PyObject::new_instance(&ty, ());
    let sequence = ty.slots().as_sequence().unwrap();
    PyErr::clear();

    assert_eq!((sequence.sq_length.unwrap())(&instance), -1);
    assert!(PyErr::fetch().unwrap().is(ExceptionKind::ValueError));

    // The failing length propagates out of the item slot
    assert!((sequence.sq_item.unwrap())(&instance, 0).is_none());
    assert!(PyErr::fetch().unwrap().is(ExceptionKind::ValueError));
}

#[test]
fn test_compare_maps_ordering() {
    let ty = fixed_type("Ordered", 0, 0, &[Capability::Compare]);
    let low = PyObject::new_instance(&ty, 1i64);
    let high = PyObject::new_instance(&ty, 9i64);
    let compare = ty.slots().tp_compare.unwrap();

    assert_eq!(compare(&low, &high), -1);
    assert_eq!(compare(&high, &low), 1);
    assert_eq!(compare(&low, &low), 0);
    assert!(!PyErr::occurred());
}

#[test]
fn test_panic_becomes_pending_error() {
    let ty = fixed_type("Panicky", 0, 0, &[Capability::Repr]);
    let instance = PyObject::new_instance(&ty, ());
    let repr = ty.slots().tp_repr.unwrap();
    PyErr::clear();

    assert!(repr(&instance).is_none());
    let err = PyErr::fetch().unwrap();
    assert!(err.is(ExceptionKind::RuntimeError));
    assert_eq!(err.message(), "repr exploded");
}

#[test]
fn test_blob_store_dedup() {
    let mut store = BlobStore::new();
    let a = store.intern(b"abc").unwrap();
    let b = store.intern(b"xyz").unwrap();
    let again = store.intern(b"abc").unwrap();

    assert_eq!(a, again);
    assert_ne!(a, b);
    assert_eq!(store.len(), 2);
    assert_eq!(unsafe { a.as_bytes() }, b"abc");
    assert_eq!(store.lookup(b"xyz"), Some(b));
    assert_eq!(store.lookup(b"nope"), None);
}

#[test]
fn test_blob_store_empty_and_alignment() {
    let mut store = BlobStore::new();
    let empty = store.intern(&[]).unwrap();
    assert!(empty.is_empty());
    assert_eq!(store.intern(&[]).unwrap(), empty);

    let odd = store.intern(&[1, 2, 3, 4, 5]).unwrap();
    assert_eq!(odd.as_ptr() as usize % std::mem::align_of::<usize>(), 0);
}

#[test]
fn test_blob_handles_survive_growth() {
    let mut store = BlobStore::new();
    let first = store.intern(b"anchor").unwrap();
    for i in 0..1000u32 {
        store.intern(&i.to_le_bytes()).unwrap();
    }
    assert_eq!(store.intern(b"anchor").unwrap(), first);
    assert_eq!(unsafe { first.as_bytes() }, b"anchor");
    assert!(store.is_ordered());
}

#[test]
fn test_failed_intern_leaves_store_unchanged() {
    let mut store = BlobStore::new();
    let kept = store.intern(b"kept").unwrap();

    blob::FAIL_NEXT_ALLOCATION.with(|fail| fail.set(true));
    let err = store.intern(b"refused").unwrap_err();
    assert!(err.is(ExceptionKind::MemoryError));
    assert_eq!(store.len(), 1);
    assert_eq!(store.lookup(b"refused"), None);
    assert_eq!(store.lookup(b"kept"), Some(kept));

    // Existing entries never allocate
    blob::FAIL_NEXT_ALLOCATION.with(|fail| fail.set(true));
    assert_eq!(store.intern(b"kept").unwrap(), kept);
    blob::FAIL_NEXT_ALLOCATION.with(|fail| fail.set(false));

    store.intern(b"refused").unwrap();
    assert_eq!(store.len(), 2);
    assert!(store.is_ordered());
}

proptest! {
    #[test]
    fn prop_interning_is_canonical(blobs in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..24), 0..64)) {
        let mut store = BlobStore::new();
        let handles: Vec<BlobRef> = blobs.iter().map(|bytes| store.intern(bytes).unwrap()).collect();

        prop_assert!(store.is_ordered());

        for (bytes, handle) in blobs.iter().zip(&handles) {
            prop_assert_eq!(unsafe { handle.as_bytes() }, bytes.as_slice());
            prop_assert_eq!(store.intern(bytes).unwrap(), *handle);
        }

        let mut distinct = blobs.clone();
        distinct.sort();
        distinct.dedup();
        prop_assert_eq!(store.len(), distinct.len());
    }
}
