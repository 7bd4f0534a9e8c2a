//! Dispatch benchmarks
//!
//! Measures overload chain walking and slot trampolines.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use typthon_bind::capability::BlobStore;
use typthon_bind::object::protocol;
use typthon_bind::{
    extract, Capability, ClassBuilder, FunctionObject, InstanceHooks, IntoPyObject, Overload,
    PyObject, PyResult,
};

/// Function whose matching overload sits at the end of a chain of `depth`
fn chained_function(depth: usize) -> FunctionObject {
    let function = FunctionObject::new(
        "f",
        Overload::exact(1, |args, _| {
            let value: String = extract(args, 0)?;
            Ok(value.into_py())
        }),
    );
    for arity in 2..depth + 1 {
        function.add_overload(&FunctionObject::new(
            "f",
            Overload::exact(arity, |_, _| Ok(PyObject::none())),
        ));
    }
    function.add_overload(&FunctionObject::new(
        "f",
        Overload::exact(1, |args, _| {
            let value: i64 = extract(args, 0)?;
            Ok((value + 1).into_py())
        }),
    ));
    function
}

fn bench_chain_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_walk");
    let args = [PyObject::from_int(41)];

    for depth in [1, 4, 16, 64] {
        let function = chained_function(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| function.call(black_box(&args), None))
        });
    }

    group.finish();
}

struct Sized3;

impl InstanceHooks for Sized3 {
    fn instance_sequence_length(&self, _instance: &PyObject) -> PyResult<isize> {
        Ok(3)
    }

    fn instance_sequence_item(&self, _instance: &PyObject, index: isize) -> PyResult<PyObject> {
        Ok(PyObject::from_int(index as i64))
    }

    fn instance_hash(&self, _instance: &PyObject) -> PyResult<isize> {
        Ok(7)
    }
}

fn bench_trampolines(c: &mut Criterion) {
    let class = ClassBuilder::with_hooks("Sized3", Sized3)
        .enable_all([Capability::SequenceLength, Capability::SequenceItem, Capability::Hash])
        .finish()
        .expect("class registration");
    let ty = class.as_type().expect("class object");
    let instance = PyObject::new_instance(ty, ());

    c.bench_function("trampoline_hash", |b| {
        b.iter(|| protocol::hash(black_box(&instance)))
    });

    c.bench_function("trampoline_item_checked", |b| {
        b.iter(|| protocol::sequence_get_item(black_box(&instance), black_box(2)))
    });

    c.bench_function("trampoline_item_out_of_range", |b| {
        b.iter(|| protocol::sequence_get_item(black_box(&instance), black_box(9)))
    });
}

fn bench_blob_intern(c: &mut Criterion) {
    let images: Vec<Vec<u8>> = (0..256u32)
        .map(|i| i.to_le_bytes().repeat(14))
        .collect();

    c.bench_function("blob_intern_256", |b| {
        b.iter(|| {
            let mut store = BlobStore::new();
            for image in &images {
                black_box(store.intern(image).ok());
            }
            // Second pass hits existing entries only
            for image in &images {
                black_box(store.intern(image).ok());
            }
        })
    });
}

criterion_group!(benches, bench_chain_walk, bench_trampolines, bench_blob_intern);
criterion_main!(benches);
