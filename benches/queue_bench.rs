//! Prefetch queue benchmark.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use netpredictor::dns::Name;
use netpredictor::predictor::{HostNameQueue, ResolutionMotivation};

fn names(count: usize) -> Vec<Name> {
    (0..count).map(|i| Name::new(format!("host{i}.example.com"))).collect()
}

fn queue_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("host_name_queue");

    for size in [8usize, 64, 512] {
        let hosts = names(size);
        group.bench_with_input(BenchmarkId::new("mixed_push_pop", size), &hosts, |b, hosts| {
            b.iter(|| {
                let mut queue = HostNameQueue::new();
                for (i, name) in hosts.iter().enumerate() {
                    let motivation = if i % 3 == 0 {
                        ResolutionMotivation::MouseOver
                    } else {
                        ResolutionMotivation::PageScan
                    };
                    queue.push(name.clone(), motivation);
                }
                while let Some(name) = queue.pop() {
                    black_box(name);
                }
            })
        });
    }

    group.finish();
}

fn queue_drain(c: &mut Criterion) {
    let hosts = names(512);
    c.bench_function("host_name_queue_drain", |b| {
        b.iter(|| {
            let mut queue = HostNameQueue::new();
            for name in &hosts {
                queue.push(name.clone(), ResolutionMotivation::StaticReferral);
            }
            black_box(queue.drain().count())
        })
    });
}

criterion_group!(benches, queue_push_pop, queue_drain);
criterion_main!(benches);
