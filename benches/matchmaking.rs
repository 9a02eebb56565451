use chrono::Utc;
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::time::Duration;
use voicelink_server::coordination::{CoordinatorSettings, CoordinatorState, Outbox};
use voicelink_server::metrics::SessionDurationTracker;

const VOCABULARY: &[&str] = &["music", "sports", "art", "games", "books", "travel", "film"];

fn interests_for(seed: usize) -> Vec<String> {
    (0..3)
        .map(|offset| VOCABULARY[(seed + offset * 2) % VOCABULARY.len()].to_string())
        .collect()
}

fn bench_matchmaking(c: &mut Criterion) {
    c.bench_function("matchmaking_pair_1000", |b| {
        b.iter(|| {
            let mut state = CoordinatorState::new(CoordinatorSettings::default());
            let now = Utc::now();
            let mut out = Outbox::new();
            for seed in 0..1000 {
                let id = state.register(now);
                let _ = state.start_matching(&id, &interests_for(seed), now, &mut out);
            }
            black_box(out.len())
        });
    });

    c.bench_function("matchmaking_skip_churn", |b| {
        let mut state = CoordinatorState::new(CoordinatorSettings::default());
        let now = Utc::now();
        let mut out = Outbox::new();
        let ids: Vec<_> = (0..201)
            .map(|seed| {
                let id = state.register(now);
                let _ = state.start_matching(&id, &interests_for(seed), now, &mut out);
                id
            })
            .collect();

        let mut next = 0usize;
        b.iter(|| {
            let mut out = Outbox::new();
            let outcome = state.skip(&ids[next % ids.len()], now, &mut out);
            next = next.wrapping_add(7);
            black_box(outcome)
        });
    });
}

fn bench_session_tracker(c: &mut Criterion) {
    c.bench_function("session_tracker_metrics", |b| {
        let mut tracker = SessionDurationTracker::new(100);
        for sample in 0..5000u64 {
            tracker.record(Duration::from_secs(60 + (sample % 600)));
        }

        b.iter(|| black_box(tracker.metrics()));
    });
}

criterion_group!(matchmaking, bench_matchmaking, bench_session_tracker);
criterion_main!(matchmaking);
