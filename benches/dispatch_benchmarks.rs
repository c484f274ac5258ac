//! Benchmarks for the native-to-host dispatch path and generic value churn.
//!
//! ```bash
//! cargo bench --bench dispatch_benchmarks
//! ```

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gobind::prelude::*;
use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn button(backend: &Arc<InProcessBackend>) -> Object {
    let object = backend.create_object(false);
    backend.install_signal(object.as_raw(), "clicked", TypeTag::None);
    backend.install_signal(object.as_raw(), "key-press", TypeTag::Bool);
    object
}

fn bench_emission(c: &mut Criterion) {
    let mut group = c.benchmark_group("emission");

    for handlers in [1usize, 8, 64] {
        let backend = InProcessBackend::new();
        let object = button(&backend);
        let registry = CallbackRegistry::new();
        let hits = Arc::new(AtomicUsize::new(0));
        for _ in 0..handlers {
            let hits = hits.clone();
            registry
                .connect(
                    &object,
                    "clicked",
                    Handler::plain(move || {
                        hits.fetch_add(1, Ordering::Relaxed);
                    }),
                )
                .unwrap();
        }

        group.throughput(Throughput::Elements(handlers as u64));
        group.bench_with_input(BenchmarkId::new("plain", handlers), &handlers, |b, _| {
            b.iter(|| object.emit(black_box("clicked")).unwrap())
        });
    }

    let backend = InProcessBackend::new();
    let object = button(&backend);
    let registry = CallbackRegistry::new();
    registry
        .connect_with_data(
            &object,
            "key-press",
            Handler::with_return(|ctx| {
                let code = ctx.arg(1).map_or(0, |arg| arg.as_uint());
                ctx.data_as::<u32>() == Some(&code)
            }),
            13u32,
        )
        .unwrap();
    let args = [Primitive::from("Return"), Primitive::UInt(13)];
    group.throughput(Throughput::Elements(1));
    group.bench_function("with_args_and_return", |b| {
        b.iter(|| {
            backend
                .emit_with_args(object.as_raw(), "key-press", black_box(&args))
                .unwrap()
        })
    });

    group.finish();
}

fn bench_direct_dispatch(c: &mut Criterion) {
    let backend = InProcessBackend::new();
    let object = button(&backend);
    let registry = CallbackRegistry::new();
    let id = registry
        .connect(&object, "key-press", Handler::with_return(|ctx| ctx.arg_count() == 1))
        .unwrap();
    let args = [NativeArg::new(42, TypeTag::Int)];

    c.bench_function("registry_dispatch", |b| {
        b.iter(|| {
            let mut invocation = Invocation::new(black_box(id), &args);
            registry.dispatch(&mut invocation);
            invocation.return_value()
        })
    });
}

fn bench_value_churn(c: &mut Criterion) {
    let backend = InProcessBackend::new();
    let mut group = c.benchmark_group("value");

    group.bench_function("int_round_trip", |b| {
        b.iter(|| {
            let value = Value::from_native(backend.clone(), black_box(&Primitive::Int(7))).unwrap();
            value.to_native().unwrap()
        })
    });

    let text = Primitive::from("a moderately long label for a widget");
    group.bench_function("string_round_trip", |b| {
        b.iter(|| {
            let value = Value::from_native(backend.clone(), black_box(&text)).unwrap();
            value.to_native().unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_emission, bench_direct_dispatch, bench_value_churn);
criterion_main!(benches);
