use criterion::{criterion_group, criterion_main, Criterion};
use mapforge::config::Config;
use mapforge::corpus::{Assets, RawCodable};
use mapforge::operators::Mutate;
use mapforge::problem::{Problem, ProblemBuildParams};
use serde_json::json;
use std::hint::black_box;

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

fn setup_problem() -> Problem {
    let keys: Vec<char> = ALPHABET.chars().collect();
    let mut mapping = serde_json::Map::new();
    for i in 0..120 {
        mapping.insert(format!("R{}", i), json!(keys[(i * 11) % keys.len()].to_string()));
    }
    let config = json!({
        "form": { "alphabet": ALPHABET, "mapping": mapping },
        "encoder": { "max_length": 4, "select_keys": ["_", ";"] },
        "objective": {
            "characters_full": { "duplication": 1.0, "key_distribution": 0.1, "pair_equivalence": 0.05 },
            "words_full": { "duplication": 0.5 }
        }
    });
    let config = Config::from_json(&config.to_string()).expect("Failed to parse config");

    // Manually build a corpus of 6k characters and 2k words
    let mut rng = fastrand::Rng::with_seed(42);
    let mut codables = Vec::new();
    for i in 0..8000u32 {
        let word = i >= 6000;
        let chars = if word { 2 + rng.usize(..2) } else { 1 };
        let name: String = (0..chars)
            .filter_map(|k| char::from_u32(0x4E00 + i * 4 + k as u32))
            .collect();
        let len = if word { chars.min(4) } else { 1 + rng.usize(..3) };
        let sequence: Vec<String> = (0..len).map(|_| format!("R{}", rng.usize(..120))).collect();
        codables.push(RawCodable::new(&name, &sequence.join(" "), rng.u64(1..100_000)));
    }

    let mut assets = Assets::default();
    for a in ALPHABET.chars() {
        for b in ALPHABET.chars() {
            assets.pair_equivalence.insert(format!("{}{}", a, b), rng.f64() * 3.0);
        }
    }

    ProblemBuildParams::builder()
        .config(config)
        .codables(codables)
        .assets(assets)
        .build()
        .build_problem()
        .expect("Failed to build problem")
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut problem = setup_problem();
    let initial = problem.initial().clone();
    let mut rng = fastrand::Rng::with_seed(7);

    c.bench_function("evaluate_from_scratch (8k objects)", |b| {
        b.iter(|| problem.evaluate_from_scratch(black_box(&initial)).unwrap())
    });

    problem.evaluate(&initial).unwrap();
    let mut current = initial.clone();
    c.bench_function("evaluate incremental (one mutation)", |b| {
        b.iter(|| {
            problem.operator().mutate(&mut current, &mut rng).unwrap();
            black_box(problem.evaluate(&current).unwrap())
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
