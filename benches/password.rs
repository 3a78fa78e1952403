//! Argon2 密码哈希性能基准测试

use criterion::{Criterion, criterion_group, criterion_main};
use mediremind::utils::password::{hash_password, verify_against_dummy, verify_password};

fn bench_hash_password(c: &mut Criterion) {
    c.bench_function("password/hash", |b| {
        b.iter(|| {
            let _ = hash_password("test_password_123");
        });
    });
}

fn bench_verify_password(c: &mut Criterion) {
    let password = "correct_password_456";
    let hash = hash_password(password).expect("hash should succeed");

    let mut group = c.benchmark_group("password/verify");
    group.bench_function("correct", |b| {
        b.iter(|| assert!(verify_password(password, &hash)));
    });
    group.bench_function("wrong", |b| {
        b.iter(|| assert!(!verify_password("wrong_password", &hash)));
    });
    group.finish();
}

/// 未知邮箱登录走 dummy 校验，耗时应与正常校验相近
fn bench_unknown_user(c: &mut Criterion) {
    c.bench_function("password/verify_dummy", |b| {
        b.iter(|| verify_against_dummy("whatever"));
    });
}

criterion_group!(
    benches,
    bench_hash_password,
    bench_verify_password,
    bench_unknown_user,
);
criterion_main!(benches);
