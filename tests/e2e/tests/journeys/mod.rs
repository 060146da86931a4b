//! Journey Tests
//!
//! Complete learner workflows through the public scheduler surface:
//! select, grade with the version seen, select again.

use chrono::Duration;
use lexis_core::{
    CardFilter, CardKey, Grade, LearnerId, LearnerSettings, Mode, QueueSource, QueueTurn,
    QueueTurnCursor, ReviewRequest, ReviewType, Scheduler, Scope, SelectRequest, SelectedCard,
};
use lexis_e2e_tests::{TestDataFactory, TestDatabaseManager};

const LEARNER: &str = "learner";

fn grade_selected(
    scheduler: &Scheduler,
    picked: &SelectedCard,
    grade: Grade,
    now: chrono::DateTime<chrono::Utc>,
) -> lexis_core::ReviewOutcome {
    let key = CardKey::new(LEARNER, picked.word_id.clone(), picked.mode.clone());
    scheduler
        .record_review_at(
            &ReviewRequest::new(key, grade).expect_version(picked.expected_version()),
            now,
        )
        .expect("review recorded")
}

/// One overdue card, one unseen word, a single new card per day
#[test]
fn test_overdue_then_new_then_capped() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["alpha", "beta"]);
    db.set_settings(
        LEARNER,
        LearnerSettings {
            daily_new_limit: 1,
            ..Default::default()
        },
    );
    let scheduler = db.single_mode_scheduler(Mode::word_to_definition());
    let now = TestDataFactory::clock();
    let alpha = TestDataFactory::key(LEARNER, "alpha", Mode::WORD_TO_DEFINITION);
    db.seed_overdue(alpha.clone(), 3.0, 5, now);

    let req = SelectRequest::new(LEARNER, Scope::All);

    let first = scheduler
        .select_next_at(&req, now)
        .unwrap()
        .expect("overdue card selected");
    assert_eq!(first.word_id.as_str(), "alpha");
    assert_eq!(first.source, QueueSource::Review);
    assert_eq!(first.stats.review_due, 1);
    let out = grade_selected(&scheduler, &first, Grade::Success, now);
    assert_eq!(out.review.as_ref().map(|r| r.review_type), Some(ReviewType::Review));
    assert!(out.state.next_due_at.unwrap() > now);

    let second = scheduler
        .select_next_at(&req, now + Duration::minutes(1))
        .unwrap()
        .expect("new word selected");
    assert_eq!(second.word_id.as_str(), "beta");
    assert_eq!(second.source, QueueSource::New);
    assert!(second.state.is_none());
    let out = grade_selected(&scheduler, &second, Grade::Success, now + Duration::minutes(1));
    assert_eq!(out.review.as_ref().map(|r| r.review_type), Some(ReviewType::New));

    let third = scheduler
        .select_next_at(&req, now + Duration::minutes(2))
        .unwrap();
    assert!(third.is_none(), "new cap reached and nothing due: {:?}", third);

    let stats = scheduler
        .daily_stats_at(&LearnerId::from(LEARNER), &Scope::All, now + Duration::minutes(2))
        .unwrap();
    assert_eq!(stats.new_cards_today, 1);
    assert_eq!(stats.review_cards_done, 1);
    assert_eq!(stats.new_remaining(), 0);
}

/// Same journey with both modes configured: the reviewed word's other mode
/// must not take the only new slot from the unseen word
#[test]
fn test_overdue_then_unseen_word_with_all_modes() {
    for _ in 0..20 {
        let db = TestDatabaseManager::new_temp();
        db.add_words(["alpha", "beta"]);
        db.set_settings(
            LEARNER,
            LearnerSettings {
                daily_new_limit: 1,
                ..Default::default()
            },
        );
        let scheduler = db.scheduler();
        let now = TestDataFactory::clock();
        let alpha = TestDataFactory::key(LEARNER, "alpha", Mode::WORD_TO_DEFINITION);
        db.seed_overdue(alpha.clone(), 3.0, 5, now);

        let first = scheduler
            .select_next_at(&SelectRequest::new(LEARNER, Scope::All).turn(QueueTurn::Review), now)
            .unwrap()
            .expect("overdue card selected");
        assert_eq!(first.word_id.as_str(), "alpha");
        assert_eq!(first.source, QueueSource::Review);
        let out = grade_selected(&scheduler, &first, Grade::Success, now);
        assert!(out.state.next_due_at.unwrap() > now);

        let later = now + Duration::minutes(1);
        let second = scheduler
            .select_next_at(&SelectRequest::new(LEARNER, Scope::All).turn(QueueTurn::New), later)
            .unwrap()
            .expect("unseen word selected");
        assert_eq!(second.word_id.as_str(), "beta");
        assert_eq!(second.source, QueueSource::New);
        assert_eq!(second.stats.new_pool_size, 1);

        let out = grade_selected(&scheduler, &second, Grade::Fail, later);
        assert_eq!(out.state.lapses, 1);
        let step_end = out.state.learning_due_at.expect("learning step set");
        assert!(step_end < later + Duration::days(1));
        assert!(out.state.next_due_at.is_none());
    }
}

/// The next morning the new-card cap resets
#[test]
fn test_next_day_resets_caps() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(TestDataFactory::words("w", 4));
    db.set_settings(
        LEARNER,
        LearnerSettings {
            daily_new_limit: 2,
            ..Default::default()
        },
    );
    let scheduler = db.single_mode_scheduler(Mode::word_to_definition());
    let req = SelectRequest::new(LEARNER, Scope::All).turn(QueueTurn::New);
    let day1 = TestDataFactory::clock();

    for _ in 0..2 {
        let picked = scheduler.select_next_at(&req, day1).unwrap().expect("new card");
        grade_selected(&scheduler, &picked, Grade::Easy, day1);
    }
    assert!(scheduler.select_next_at(&req, day1).unwrap().is_none());

    let day2 = day1 + Duration::days(1);
    let picked = scheduler
        .select_next_at(&req, day2)
        .unwrap()
        .expect("cap reset overnight");
    assert_eq!(picked.source, QueueSource::New);
    assert_eq!(picked.stats.new_today, 0);
}

/// A failed new card re-enters through the learning pool after its step
#[test]
fn test_fail_then_relearn() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["gamma"]);
    let scheduler = db.single_mode_scheduler(Mode::word_to_definition());
    let req = SelectRequest::new(LEARNER, Scope::All);
    let now = TestDataFactory::clock();

    let picked = scheduler.select_next_at(&req, now).unwrap().expect("new card");
    let out = grade_selected(&scheduler, &picked, Grade::Fail, now);
    assert_eq!(out.state.lapses, 1);
    let step_end = out.state.learning_due_at.expect("learning step set");
    assert!(step_end <= now + Duration::minutes(10));

    assert!(scheduler.select_next_at(&req, now).unwrap().is_none());

    let again = scheduler
        .select_next_at(&req, step_end)
        .unwrap()
        .expect("learning card due");
    assert_eq!(again.source, QueueSource::Learning);
    assert_eq!(again.expected_version(), 1);

    let out = grade_selected(&scheduler, &again, Grade::Success, step_end);
    assert_eq!(out.state.reps, 2);
    assert_eq!(out.state.version, 2);
}

/// A caller alternating turns with the cursor sees the configured mix
#[test]
fn test_turn_cursor_alternates_pools() {
    let db = TestDatabaseManager::new_temp();
    let words = TestDataFactory::words("mix", 6);
    db.add_words(words.iter().cloned());
    let scheduler = db.single_mode_scheduler(Mode::word_to_definition());
    let now = TestDataFactory::clock();

    // Three overdue cards, three unseen words; the sixth turn asks for a
    // review but only new words remain
    for word in &words[..3] {
        db.seed_overdue(
            TestDataFactory::key(LEARNER, word, Mode::WORD_TO_DEFINITION),
            4.0,
            1,
            now,
        );
    }

    let mut cursor = QueueTurnCursor::new(2);
    let mut sources = Vec::new();
    for i in 0..6 {
        let req = SelectRequest::new(LEARNER, Scope::All).turn(cursor.current(CardFilter::Both));
        let at = now + Duration::seconds(i);
        let picked = scheduler.select_next_at(&req, at).unwrap().expect("card available");
        sources.push(picked.source);
        grade_selected(&scheduler, &picked, Grade::Success, at);
        cursor.advance(CardFilter::Both);
    }

    assert_eq!(
        sources,
        vec![
            QueueSource::New,
            QueueSource::Review,
            QueueSource::Review,
            QueueSource::New,
            QueueSource::Review,
            QueueSource::New,
        ]
    );
}

/// Clicks land in the ledger and push the card back into learning
#[test]
fn test_click_journey() {
    let db = TestDatabaseManager::new_temp();
    db.add_words(["delta"]);
    let scheduler = db.scheduler();
    let now = TestDataFactory::clock();
    let key = TestDataFactory::key(LEARNER, "delta", Mode::DEFINITION_TO_WORD);

    let out = scheduler
        .record_click_at(&key, Some("turn-1".to_string()), now)
        .unwrap();
    assert_eq!(out.state.click_count, 1);
    assert_eq!(out.state.lapses, 1);
    let entry = out.review.expect("click logged");
    assert_eq!(entry.review_type, ReviewType::Click);
    assert_eq!(entry.grade, Grade::Fail);
    assert_eq!(entry.turn_id.as_deref(), Some("turn-1"));

    let last = scheduler.last_review(&key).unwrap().expect("ledger entry");
    assert_eq!(last.id, entry.id);

    let stats = scheduler
        .daily_stats_at(&LearnerId::from(LEARNER), &Scope::All, now)
        .unwrap();
    assert_eq!(stats.clicks_today, 1);
    assert_eq!(stats.new_cards_today, 0);
}

/// Word lists narrow every pool
#[test]
fn test_list_scope() {
    let db = TestDatabaseManager::new_temp();
    db.catalog.set_list("week-1", ["een", "twee"]);
    db.add_words(["drie"]);
    let scheduler = db.single_mode_scheduler(Mode::word_to_definition());
    let now = TestDataFactory::clock();

    let req = SelectRequest::new(LEARNER, Scope::list("week-1"));
    let mut seen = Vec::new();
    while let Some(picked) = scheduler.select_next_at(&req, now).unwrap() {
        seen.push(picked.word_id.as_str().to_string());
        grade_selected(&scheduler, &picked, Grade::Easy, now);
    }
    seen.sort();
    assert_eq!(seen, vec!["een", "twee"]);

    let unknown = SelectRequest::new(LEARNER, Scope::list("week-9"));
    assert!(scheduler.select_next_at(&unknown, now).is_err());
}
