use criterion::{criterion_group, criterion_main, Criterion};

use rsync_core::channel::MessageChannel;
use rsync_core::sender::match_sums;
use rsync_core::signature::compute_signature;

fn synthetic_basis(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn synthetic_update(len: usize) -> Vec<u8> {
    let mut data = synthetic_basis(len);
    // mutate a small tail so most blocks still match the basis.
    let tail_start = len.saturating_sub(len / 20);
    for byte in &mut data[tail_start..] {
        *byte = byte.wrapping_add(1);
    }
    data
}

pub fn signature_benchmark(c: &mut Criterion) {
    let basis = synthetic_basis(1_000_000);

    c.bench_function("signature [1_000_000 bytes]", |b| {
        b.iter(|| compute_signature(&basis, 0, 16))
    });
}

pub fn match_benchmark(c: &mut Criterion) {
    let basis = synthetic_basis(1_000_000);
    let signature = compute_signature(&basis, 0, 16);
    let updated = synthetic_update(1_000_000);

    c.bench_function("match [1_000_000 bytes, 5% tail changed]", |b| {
        b.iter(|| {
            let mut channel = MessageChannel::new(std::io::Cursor::new(Vec::<u8>::new()));
            match_sums(&mut channel, &signature, &updated, 0, 32 * 1024).unwrap()
        })
    });
}

criterion_group!(benches, signature_benchmark, match_benchmark);
criterion_main!(benches);
