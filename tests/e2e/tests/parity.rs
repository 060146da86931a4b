//! Model Parity Tests
//!
//! Replays the reference corpus three ways and requires agreement to 1e-6:
//! 1. A direct transcription of the published FSRS-6 equations
//! 2. `MemoryModel::update` step by step
//! 3. The full scheduler (recorder + SQLite) with the clock advanced per step

use chrono::Duration;
use lexis_core::{CardKey, Grade, MemoryModel, MemoryState, Mode, ReviewRequest, FSRS6_WEIGHTS};
use lexis_e2e_tests::{ParityCase, TestDataFactory, TestDatabaseManager};

const TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy)]
struct Replayed {
    stability: f64,
    difficulty: f64,
    interval: f64,
    reps: u32,
    lapses: u32,
}

// ============================================================================
// REFERENCE EQUATIONS
// ============================================================================

fn reference_replay(case: &ParityCase) -> Replayed {
    let w = FSRS6_WEIGHTS;
    let decay = w[20];
    let factor = 0.9f64.powf(-1.0 / decay) - 1.0;
    let interval = |s: f64| s / factor * (0.9f64.powf(-1.0 / decay) - 1.0);

    let mut state: Option<(f64, f64)> = None;
    let (mut reps, mut lapses) = (0u32, 0u32);
    let mut last_interval = 0.0;

    for &(grade, elapsed) in &case.steps {
        let g = grade as f64;
        let (s, d) = match state {
            None => {
                reps = 1;
                lapses = u32::from(grade == 1);
                let d0 = (w[4] - (w[5] * (g - 1.0)).exp() + 1.0).clamp(1.0, 10.0);
                (w[grade as usize - 1], d0)
            }
            Some((s, d)) => {
                reps += 1;
                if grade == 1 {
                    lapses += 1;
                }
                let r = (1.0 + factor * elapsed / s.max(1e-4)).powf(-decay);
                let tmp = d + (-w[6] * (g - 3.0)) * (10.0 - d) / 9.0;
                let d0_easy = w[4] - (w[5] * 3.0).exp() + 1.0;
                let d_next = (w[7] * d0_easy + (1.0 - w[7]) * tmp).clamp(1.0, 10.0);
                let s_next = if grade == 1 {
                    w[11]
                        * d_next.powf(-w[12])
                        * ((s + 1.0).powf(w[13]) - 1.0)
                        * (w[14] * (1.0 - r)).exp()
                } else {
                    let hard = if grade == 2 { w[15] } else { 1.0 };
                    let easy = if grade == 4 { w[16] } else { 1.0 };
                    s * ((w[8]).exp()
                        * (11.0 - d_next)
                        * s.powf(-w[9])
                        * ((w[10] * (1.0 - r)).exp() - 1.0)
                        * hard
                        * easy
                        + 1.0)
                };
                (s_next, d_next)
            }
        };
        last_interval = interval(s);
        state = Some((s, d));
    }

    let (stability, difficulty) = state.expect("corpus cases are non-empty");
    Replayed {
        stability,
        difficulty,
        interval: last_interval,
        reps,
        lapses,
    }
}

fn model_replay(case: &ParityCase) -> Replayed {
    let model = MemoryModel::default();
    let mut memory: Option<MemoryState> = None;
    let (mut reps, mut lapses) = (0, 0);
    let mut last = None;

    for &(grade, elapsed) in &case.steps {
        let grade = Grade::from_value(grade as i64).expect("corpus grade");
        let out = model.update(memory, elapsed, grade, reps, lapses, 0.9);
        memory = Some(out.memory());
        reps = out.reps;
        lapses = out.lapses;
        last = Some(out);
    }

    let out = last.expect("corpus cases are non-empty");
    Replayed {
        stability: out.stability,
        difficulty: out.difficulty,
        interval: out.interval_days,
        reps: out.reps,
        lapses: out.lapses,
    }
}

fn scheduler_replay(case: &ParityCase) -> Replayed {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["parity"]);
    let scheduler = db.scheduler();
    let key = CardKey::new("learner", "parity", Mode::WORD_TO_DEFINITION);

    let mut now = TestDataFactory::clock();
    for &(grade, elapsed) in &case.steps {
        now += Duration::milliseconds((elapsed * 86_400_000.0) as i64);
        let grade = Grade::from_value(grade as i64).expect("corpus grade");
        scheduler
            .record_review_at(&ReviewRequest::new(key.clone(), grade), now)
            .expect("review recorded");
    }

    let card = db.card(&key).expect("card stored");
    let memory = card.memory.expect("graded card has memory");
    Replayed {
        stability: memory.stability,
        difficulty: memory.difficulty,
        interval: card.interval_days.expect("graded card has interval"),
        reps: card.reps,
        lapses: card.lapses,
    }
}

fn assert_close(case: &str, what: &str, left: Replayed, right: Replayed) {
    assert_eq!(left.reps, right.reps, "{} reps ({})", case, what);
    assert_eq!(left.lapses, right.lapses, "{} lapses ({})", case, what);
    for (field, a, b) in [
        ("stability", left.stability, right.stability),
        ("difficulty", left.difficulty, right.difficulty),
        ("interval", left.interval, right.interval),
    ] {
        assert!(
            (a - b).abs() < TOLERANCE,
            "{} {} ({}): {} vs {}",
            case,
            field,
            what,
            a,
            b
        );
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[test]
fn test_model_matches_reference_equations() {
    for case in TestDataFactory::parity_corpus() {
        assert_close(case.name, "model", reference_replay(&case), model_replay(&case));
    }
}

#[test]
fn test_scheduler_matches_model() {
    for case in TestDataFactory::parity_corpus() {
        assert_close(case.name, "scheduler", model_replay(&case), scheduler_replay(&case));
    }
}

#[test]
fn test_new_card_good_values() {
    let case = &TestDataFactory::parity_corpus()[0];
    let out = model_replay(case);
    assert!((out.stability - 2.3065).abs() < TOLERANCE);
    assert!((out.difficulty - 2.118104).abs() < TOLERANCE);
    assert!((out.interval - out.stability).abs() < TOLERANCE);
    assert_eq!((out.reps, out.lapses), (1, 0));
}

#[test]
fn test_lapse_counted_once() {
    let case = TestDataFactory::parity_corpus()
        .into_iter()
        .find(|c| c.name == "lapse-then-recover")
        .expect("case present");
    let out = model_replay(&case);
    assert_eq!((out.reps, out.lapses), (3, 1));
}

#[test]
fn test_replay_is_deterministic() {
    for case in TestDataFactory::parity_corpus() {
        let a = model_replay(&case);
        let b = model_replay(&case);
        assert_eq!(a.stability.to_bits(), b.stability.to_bits(), "{}", case.name);
        assert_eq!(a.difficulty.to_bits(), b.difficulty.to_bits(), "{}", case.name);
    }
}

#[test]
fn test_overdue_grows_stability_more() {
    let corpus = TestDataFactory::parity_corpus();
    let overdue = corpus
        .iter()
        .find(|c| c.name == "overdue-capped")
        .expect("case present");
    let prompt = ParityCase {
        name: "on-time",
        steps: vec![(3, 0.0), (3, 5.0), (3, 10.0)],
    };
    assert!(model_replay(overdue).stability > model_replay(&prompt).stability);
}
