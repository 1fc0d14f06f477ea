//! Performance benchmarks for the picker core.
//!
//! Run with: cargo bench
//!
//! Target performance:
//! - Local filter/rank of 1000 customers: < 1ms per keystroke
//! - Render plan: negligible

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use picker_core::entities::{BlacklistStatus, CustomerType, Status};
use picker_core::{Customer, Predicate, RelevanceFilter, Tier, VirtualizationPolicy};

fn customers(count: usize) -> Vec<Customer> {
    let tiers = [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum];
    (0..count)
        .map(|i| Customer {
            id: i.to_string(),
            name: format!("Customer {} Trading Company", i),
            code: format!("CUST{:05}", i),
            customer_type: if i % 3 == 0 {
                CustomerType::Individual
            } else {
                CustomerType::Business
            },
            tier: tiers[i % tiers.len()],
            status: if i % 10 == 0 { Status::Inactive } else { Status::Active },
            blacklist_status: if i % 50 == 0 {
                BlacklistStatus::Blacklisted
            } else {
                BlacklistStatus::Clear
            },
            credit_limit: Some(10_000.0),
            lifetime_value: None,
            last_transaction_date: (i % 2 == 0).then(|| "2024-01-15".to_string()),
        })
        .collect()
}

/// Benchmark local filtering and ranking (the provisional display path).
fn bench_filter_and_rank(c: &mut Criterion) {
    let items = customers(1_000);
    let filter = RelevanceFilter::new(["name", "code"])
        .with_predicate(Predicate::ActiveOnly)
        .with_predicate(Predicate::ExcludeBlacklisted);

    let queries = ["", "c", "customer 5", "cust00042", "trading"];

    let mut group = c.benchmark_group("filter_and_rank");

    for query in queries {
        group.bench_with_input(BenchmarkId::from_parameter(query), &query, |b, query| {
            b.iter(|| black_box(filter.filter_and_rank(black_box(&items), black_box(query))))
        });
    }

    group.finish();
}

/// Benchmark the predicate pipeline alone.
fn bench_predicates(c: &mut Criterion) {
    let items = customers(1_000);
    let filter = RelevanceFilter::new(["name"])
        .with_predicate(Predicate::MinimumTier { tier: Tier::Gold })
        .with_predicate(Predicate::RequireTransactionHistory);

    c.bench_function("predicates_only", |b| {
        b.iter(|| black_box(items.iter().filter(|c| filter.admits(c)).count()))
    });
}

/// Benchmark the render mode decision.
fn bench_render_plan(c: &mut Criterion) {
    let policy = VirtualizationPolicy::default();

    c.bench_function("render_plan", |b| {
        b.iter(|| {
            let plan = policy.plan(black_box(1_000), black_box(2));
            black_box(plan.rows(black_box(6_000)))
        })
    });
}

criterion_group!(benches, bench_filter_and_rank, bench_predicates, bench_render_plan);

criterion_main!(benches);
