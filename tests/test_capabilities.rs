use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use typthon_bind::capability::{self, blob, BlobStore};
use typthon_bind::object::protocol;
use typthon_bind::{
    Capability, ClassBuilder, ExceptionKind, InstanceHooks, PyErr, PyObject, PyResult, TypeObject,
};

#[test]
fn test_dedup_idempotence() {
    let mut store = BlobStore::new();
    let first = store.intern(&[1, 2, 3, 4]).unwrap();
    let second = store.intern(&[1, 2, 3, 4]).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.as_ptr(), second.as_ptr());
    assert_eq!(store.len(), 1);

    // Same length, different bytes
    let other = store.intern(&[1, 2, 3, 5]).unwrap();
    assert_ne!(other, first);
    assert_eq!(store.len(), 2);
}

#[test]
fn test_global_store_shares_handles() {
    let a = blob::intern(b"shared substructure image").unwrap();
    let b = blob::intern(b"shared substructure image").unwrap();
    assert_eq!(a, b);
    assert!(blob::global_len() >= 1);
}

#[test]
fn test_capability_sharing_across_types() {
    let build = |name: &str, caps: &[Capability]| {
        let mut ty = TypeObject::new(name);
        for &cap in caps {
            capability::enable(cap, &mut ty).unwrap();
        }
        ty
    };

    let first = build("First", &[Capability::MappingLength, Capability::MappingSubscript]);
    let second = build("Second", &[Capability::MappingLength, Capability::MappingSubscript]);
    let third = build("Third", &[Capability::MappingLength, Capability::MappingAssSubscript]);

    assert_eq!(first.slots().tp_as_mapping, second.slots().tp_as_mapping);
    assert_ne!(first.slots().tp_as_mapping, third.slots().tp_as_mapping);

    for ty in [&first, &second] {
        assert!(capability::points_at_trampoline(Capability::MappingLength, ty.slots()));
        assert!(capability::points_at_trampoline(Capability::MappingSubscript, ty.slots()));
    }
}

struct Counted {
    item_calls: Arc<AtomicUsize>,
}

impl InstanceHooks for Counted {
    fn instance_sequence_length(&self, _instance: &PyObject) -> PyResult<isize> {
        Ok(3)
    }

    fn instance_sequence_item(&self, _instance: &PyObject, index: isize) -> PyResult<PyObject> {
        self.item_calls.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(PyObject::from_int(index as i64))
    }
}

#[test]
fn test_bounds_auto_check() {
    let item_calls = Arc::new(AtomicUsize::new(0));
    let class = ClassBuilder::with_hooks(
        "Three",
        Counted {
            item_calls: item_calls.clone(),
        },
    )
    .enable(Capability::SequenceLength)
    .enable(Capability::SequenceItem)
    .finish()
    .unwrap();
    let ty = class.as_type().unwrap();
    let instance = PyObject::new_instance(ty, ());

    let err = protocol::sequence_get_item(&instance, 5).unwrap_err();
    assert!(err.is(ExceptionKind::IndexError));
    assert_eq!(item_calls.load(AtomicOrdering::SeqCst), 0);

    // Still negative after adding the length
    let err = protocol::sequence_get_item(&instance, -10).unwrap_err();
    assert!(err.is(ExceptionKind::IndexError));
    assert_eq!(err.message(), "Three index out of range");
    assert_eq!(item_calls.load(AtomicOrdering::SeqCst), 0);

    let item = protocol::sequence_get_item(&instance, 2).unwrap();
    assert_eq!(item.as_int(), Some(2));
    assert_eq!(item_calls.load(AtomicOrdering::SeqCst), 1);
}

#[test]
fn test_unimplemented_hook_surfaces_runtime_error() {
    let class = ClassBuilder::new("Unhashable")
        .enable(Capability::Hash)
        .finish()
        .unwrap();
    let instance = PyObject::new_instance(class.as_type().unwrap(), ());

    let err = protocol::hash(&instance).unwrap_err();
    assert!(err.is(ExceptionKind::RuntimeError));
    assert!(err.message().contains("instance_hash"));
    assert!(!PyErr::occurred());
}

struct Versioned;

impl InstanceHooks for Versioned {
    fn instance_compare(&self, instance: &PyObject, other: &PyObject) -> PyResult<Ordering> {
        let left = instance.downcast_ref::<u32>();
        let right = other.downcast_ref::<u32>();
        match (left, right) {
            (Some(left), Some(right)) => Ok(left.cmp(right)),
            _ => Err(PyErr::type_error("can only compare versions")),
        }
    }

    fn instance_str(&self, instance: &PyObject) -> PyResult<PyObject> {
        match instance.downcast_ref::<u32>() {
            Some(version) => Ok(PyObject::from_string(format!("v{version}"))),
            None => panic!("instance lost its version"),
        }
    }

    fn instance_hash(&self, instance: &PyObject) -> PyResult<isize> {
        Ok(instance.downcast_ref::<u32>().map_or(-1, |version| *version as isize - 1))
    }
}

#[test]
fn test_hooks_through_host_protocol() {
    let class = ClassBuilder::with_hooks("Version", Versioned)
        .enable_all([Capability::Compare, Capability::Str, Capability::Hash])
        .finish()
        .unwrap();
    let ty = class.as_type().unwrap();
    let old = PyObject::new_instance(ty, 1u32);
    let new = PyObject::new_instance(ty, 2u32);

    assert_eq!(protocol::compare(&old, &new).unwrap(), Ordering::Less);
    assert_eq!(protocol::compare(&new, &old).unwrap(), Ordering::Greater);
    assert_eq!(protocol::str(&new).unwrap().as_str(), Some("v2"));

    // Hook hash of -1 is remapped rather than read as failure
    assert_eq!(protocol::hash(&PyObject::new_instance(ty, 0u32)).unwrap(), -2);

    let err = protocol::compare(&old, &PyObject::from_int(3)).unwrap_err();
    assert!(err.is(ExceptionKind::TypeError));
}

#[test]
fn test_hook_panic_does_not_unwind() {
    let class = ClassBuilder::with_hooks("Fragile", Versioned)
        .enable(Capability::Str)
        .finish()
        .unwrap();
    let broken = PyObject::new_instance(class.as_type().unwrap(), "not a version");

    let err = protocol::str(&broken).unwrap_err();
    assert!(err.is(ExceptionKind::RuntimeError));
    assert_eq!(err.message(), "instance lost its version");
}

#[test]
fn test_inherit_capabilities_from_base() {
    let base = ClassBuilder::with_hooks("Base", Versioned)
        .enable_all([Capability::Compare, Capability::SequenceLength])
        .finish()
        .unwrap();
    let derived = ClassBuilder::with_hooks("Derived", Versioned)
        .inherit_capabilities(base.as_type().unwrap())
        .finish()
        .unwrap();

    let base = base.as_type().unwrap();
    let derived = derived.as_type().unwrap();
    assert_eq!(derived.capabilities(), base.capabilities());
    assert_eq!(derived.slots().tp_as_sequence, base.slots().tp_as_sequence);
    assert!(derived.slots().tp_hash.is_none());
}
