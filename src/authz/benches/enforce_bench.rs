//! Enforcement and scope decision benchmarks
//!
//! Tracks the two hot paths: statement evaluation against growing role
//! inventories, and cached subtree management checks.

use orgward_authz::{
    core::AuthzCore,
    statement::{Effect, EnforceRequest, Enforcer, PatternCache, Statement},
    store::{DirectoryStore, InMemoryDirectory},
    types::{Organization, Role, Session},
};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// One role carrying `count` allow statements with distinct literal actions
fn statement_fan(count: usize) -> Role {
    let mut role = Role::new("r-fan", "Fan");
    for i in 0..count {
        role = role.with_statement(
            Statement::new(Effect::Allow).with_action(format!("task{}:run", i)),
        );
    }
    role
}

async fn enforcer_with_statements(count: usize) -> Enforcer {
    let dir = InMemoryDirectory::new();
    dir.upsert_role(statement_fan(count)).await.unwrap();
    dir.grant_role("worker", "r-fan").await.unwrap();
    Enforcer::new(Arc::new(dir))
}

fn bench_enforcement_by_statement_count(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("enforcement");

    for statement_count in [10, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("statements", statement_count),
            statement_count,
            |b, &count| {
                let enforcer = rt.block_on(enforcer_with_statements(count));

                // Worst case: the matching statement sits at the end.
                let request = EnforceRequest::new("worker", format!("task{}:run", count - 1));

                b.to_async(&rt).iter(|| async {
                    let decision = enforcer.enforce(black_box(&request)).await.unwrap();
                    black_box(decision);
                });
            },
        );
    }

    group.finish();
}

fn bench_enforcement_with_warm_patterns(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("enforcement_wildcards");

    for pattern_count in [10, 100].iter() {
        group.bench_with_input(
            BenchmarkId::new("patterns", pattern_count),
            pattern_count,
            |b, &count| {
                let enforcer = rt.block_on(async {
                    let dir = InMemoryDirectory::new();
                    let mut role = Role::new("r-wild", "Wild");
                    for i in 0..count {
                        role = role.with_statement(
                            Statement::new(Effect::Allow)
                                .with_action(format!("svc{}:*", i))
                                .with_resource(format!("orgs/{}/*", i)),
                        );
                    }
                    dir.upsert_role(role).await.unwrap();
                    dir.grant_role("worker", "r-wild").await.unwrap();
                    Enforcer::new(Arc::new(dir))
                });

                let request = EnforceRequest::new("worker", format!("svc{}:run", count - 1))
                    .with_resource(format!("orgs/{}/7", count - 1));

                // Prime the pattern cache so the loop measures matching,
                // not regex compilation.
                rt.block_on(async {
                    enforcer.enforce(&request).await.unwrap();
                });

                b.to_async(&rt).iter(|| async {
                    let decision = enforcer.enforce(black_box(&request)).await.unwrap();
                    black_box(decision);
                });
            },
        );
    }

    group.finish();
}

fn bench_batch_enforcement(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("enforce_batch_100", |b| {
        let enforcer = rt.block_on(enforcer_with_statements(100));

        let requests: Vec<EnforceRequest> = (0..100)
            .map(|i| EnforceRequest::new("worker", format!("task{}:run", i)))
            .collect();

        b.to_async(&rt).iter(|| async {
            let decisions = enforcer.enforce_batch(black_box(&requests)).await.unwrap();
            black_box(decisions);
        });
    });
}

fn bench_cached_scope_decision(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("scope_decision");

    for depth in [2usize, 8, 32].iter() {
        group.bench_with_input(BenchmarkId::new("depth", depth), depth, |b, &depth| {
            let core = rt.block_on(async {
                let dir = InMemoryDirectory::new();
                dir.upsert_organization(Organization::root("n0", "Root")).await.unwrap();
                for i in 1..depth {
                    dir.upsert_organization(Organization::child_of(
                        &format!("n{}", i - 1),
                        format!("n{}", i),
                        "Node",
                    ))
                    .await
                    .unwrap();
                }
                dir.insert_admin_edge("n0", "admin").await.unwrap();

                let core = AuthzCore::new(Arc::new(dir));
                // Warm the scope cache; the loop measures the cached path.
                let session = Session::new("admin");
                core.can_manage_organization(&session, &format!("n{}", depth - 1)).await;
                core
            });

            let session = Session::new("admin");
            let leaf = format!("n{}", depth - 1);

            b.to_async(&rt).iter(|| async {
                let decision = core
                    .can_manage_organization(black_box(&session), black_box(&leaf))
                    .await;
                black_box(decision);
            });
        });
    }

    group.finish();
}

fn bench_wildcard_match(c: &mut Criterion) {
    c.bench_function("wildcard_match", |b| {
        let patterns = PatternCache::new();
        // Compile once outside the loop.
        patterns.matches("orgs/2/*", "orgs/2/7/9");

        b.iter(|| {
            let matched = patterns.matches(black_box("orgs/2/*"), black_box("orgs/2/7/9"));
            black_box(matched);
        });
    });
}

criterion_group!(
    benches,
    bench_enforcement_by_statement_count,
    bench_enforcement_with_warm_patterns,
    bench_batch_enforcement,
    bench_cached_scope_decision,
    bench_wildcard_match
);
criterion_main!(benches);
