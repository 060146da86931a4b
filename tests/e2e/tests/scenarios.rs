//! Scenario Tests
//!
//! "Learned" requires every mode of the scenario at or above the graduation
//! threshold, and follows the cards back down after a lapse.

use chrono::{DateTime, Utc};
use lexis_core::{
    CardKey, Grade, LearnerId, Mode, ReviewRequest, Scenario, Scheduler, Scope, WordId,
};
use lexis_e2e_tests::{TestDataFactory, TestDatabaseManager};

const LEARNER: &str = "learner";

/// Grade Easy at each due time until the card passes `threshold`
fn graduate(
    scheduler: &Scheduler,
    key: &CardKey,
    threshold: f64,
    mut now: DateTime<Utc>,
) -> DateTime<Utc> {
    for _ in 0..10 {
        let out = scheduler
            .record_review_at(&ReviewRequest::new(key.clone(), Grade::Easy), now)
            .unwrap();
        if out.state.stability().is_some_and(|s| s >= threshold) {
            return now;
        }
        now = out.state.due_at().expect("graded card is scheduled");
    }
    panic!("{} never reached stability {}", key, threshold);
}

#[test]
fn test_is_learned_round_trip() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["huis", "boom"]);
    let scheduler = db.scheduler();
    let understanding = Scenario::find_builtin("understanding").unwrap();
    let recognition = Scenario::find_builtin("recognition").unwrap();
    let learner = LearnerId::from(LEARNER);
    let word = WordId::from("huis");
    let w2d = TestDataFactory::key(LEARNER, "huis", Mode::WORD_TO_DEFINITION);
    let d2w = TestDataFactory::key(LEARNER, "huis", Mode::DEFINITION_TO_WORD);
    let start = TestDataFactory::clock();

    assert!(!scheduler.is_learned(&learner, &word, &understanding).unwrap());

    let t = graduate(&scheduler, &w2d, understanding.graduation_threshold, start);
    assert!(scheduler.is_learned(&learner, &word, &recognition).unwrap());
    assert!(!scheduler.is_learned(&learner, &word, &understanding).unwrap());

    let t = graduate(&scheduler, &d2w, understanding.graduation_threshold, t);
    assert!(scheduler.is_learned(&learner, &word, &understanding).unwrap());

    // A lapse on one mode drops the word out of "learned"
    let due = db.card(&w2d).unwrap().due_at().unwrap().max(t);
    let out = scheduler
        .record_review_at(&ReviewRequest::new(w2d.clone(), Grade::Fail), due)
        .unwrap();
    assert!(out.state.stability().unwrap() < understanding.graduation_threshold);
    assert!(!scheduler.is_learned(&learner, &word, &understanding).unwrap());
    assert!(!scheduler.is_learned(&learner, &word, &recognition).unwrap());
}

#[test]
fn test_scenario_stats_over_scope() {
    let db = TestDatabaseManager::new_temp();
    db.catalog.set_list("week-1", ["huis", "boom", "kat"]);
    db.add_words(["vis"]);
    let scheduler = db.scheduler();
    let understanding = Scenario::find_builtin("understanding").unwrap();
    let start = TestDataFactory::clock();

    for mode in [Mode::WORD_TO_DEFINITION, Mode::DEFINITION_TO_WORD] {
        graduate(
            &scheduler,
            &TestDataFactory::key(LEARNER, "huis", mode),
            understanding.graduation_threshold,
            start,
        );
    }
    let boom = TestDataFactory::key(LEARNER, "boom", Mode::WORD_TO_DEFINITION);
    scheduler
        .record_review_at(&ReviewRequest::new(boom, Grade::Success), start)
        .unwrap();

    let learner = LearnerId::from(LEARNER);
    let stats = scheduler
        .scenario_stats(&learner, &Scope::list("week-1"), &understanding)
        .unwrap();
    assert_eq!(stats.scenario_id, "understanding");
    assert_eq!(
        (stats.learned, stats.in_progress, stats.new, stats.total),
        (1, 1, 1, 3)
    );

    let all = scheduler
        .scenario_stats(&learner, &Scope::All, &understanding)
        .unwrap();
    assert_eq!(all.total, 4);
    assert_eq!(all.new, 2);
}

#[test]
fn test_custom_threshold_scenario() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["kat"]);
    let scheduler = db.scheduler();
    let quick = Scenario::new("quick", "Quick", vec![Mode::word_to_definition()]).with_threshold(5.0);
    let key = TestDataFactory::key(LEARNER, "kat", Mode::WORD_TO_DEFINITION);

    // A first Easy seeds stability above five days
    scheduler
        .record_review_at(&ReviewRequest::new(key, Grade::Easy), TestDataFactory::clock())
        .unwrap();
    assert!(scheduler
        .is_learned(&LearnerId::from(LEARNER), &WordId::from("kat"), &quick)
        .unwrap());
}
