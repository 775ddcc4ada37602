use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use quiz_core::model::{
    AttemptRecord, Category, CategoryId, Difficulty, Question, QuestionId, Quiz, QuizId,
    QuizSettings,
};
use quiz_core::time::{fixed_clock, fixed_now};
use services::{
    GrantOutcome, LoadStatus, Navigation, OfferError, OfferResult, PersistenceStatus,
    QuizSessionController, Resource, Reward, RewardError, RewardedOfferProvider, SessionError,
    SessionEvent, SessionIssue, SessionPhase, SubmitOutcome,
};
use storage::repository::{
    AttemptRepository, AttemptRow, CatalogRepository, InMemoryRepository, StorageError,
};

//
// ─── FAKES ─────────────────────────────────────────────────────────────────────
//

/// Scripted deviation from the seeded data for one list call.
enum Reply {
    Empty,
    Fail,
    Hang,
    /// Waits for the gate, then answers from the seeded data.
    WaitFor(Arc<Notify>),
}

/// Catalog backed by seeded data, with per-key scripted replies consumed first.
#[derive(Clone, Default)]
struct ScriptedCatalog {
    data: InMemoryRepository,
    quiz_replies: Arc<Mutex<HashMap<CategoryId, VecDeque<Reply>>>>,
    question_replies: Arc<Mutex<HashMap<QuizId, VecDeque<Reply>>>>,
    quiz_calls: Arc<Mutex<HashMap<CategoryId, usize>>>,
    question_calls: Arc<Mutex<HashMap<QuizId, usize>>>,
}

impl ScriptedCatalog {
    fn script_quizzes(&self, category_id: CategoryId, replies: Vec<Reply>) {
        self.quiz_replies
            .lock()
            .unwrap()
            .insert(category_id, replies.into());
    }

    fn script_questions(&self, quiz_id: QuizId, replies: Vec<Reply>) {
        self.question_replies
            .lock()
            .unwrap()
            .insert(quiz_id, replies.into());
    }

    fn quiz_calls(&self, category_id: CategoryId) -> usize {
        self.quiz_calls
            .lock()
            .unwrap()
            .get(&category_id)
            .copied()
            .unwrap_or(0)
    }

    fn question_calls(&self, quiz_id: QuizId) -> usize {
        self.question_calls
            .lock()
            .unwrap()
            .get(&quiz_id)
            .copied()
            .unwrap_or(0)
    }

    fn next_quiz_reply(&self, category_id: CategoryId) -> Option<Reply> {
        *self.quiz_calls.lock().unwrap().entry(category_id).or_default() += 1;
        self.quiz_replies
            .lock()
            .unwrap()
            .get_mut(&category_id)
            .and_then(VecDeque::pop_front)
    }

    fn next_question_reply(&self, quiz_id: QuizId) -> Option<Reply> {
        *self.question_calls.lock().unwrap().entry(quiz_id).or_default() += 1;
        self.question_replies
            .lock()
            .unwrap()
            .get_mut(&quiz_id)
            .and_then(VecDeque::pop_front)
    }
}

async fn play<T>(
    reply: Option<Reply>,
    seeded: impl Future<Output = Result<Vec<T>, StorageError>>,
) -> Result<Vec<T>, StorageError> {
    match reply {
        None => seeded.await,
        Some(Reply::Empty) => Ok(Vec::new()),
        Some(Reply::Fail) => Err(StorageError::Connection("catalog offline".into())),
        Some(Reply::Hang) => std::future::pending().await,
        Some(Reply::WaitFor(gate)) => {
            gate.notified().await;
            seeded.await
        }
    }
}

#[async_trait]
impl CatalogRepository for ScriptedCatalog {
    async fn upsert_category(&self, category: &Category) -> Result<(), StorageError> {
        self.data.upsert_category(category).await
    }

    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        self.data.upsert_quiz(quiz).await
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        self.data.upsert_question(question).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, StorageError> {
        self.data.list_categories().await
    }

    async fn list_quizzes(&self, category_id: CategoryId) -> Result<Vec<Quiz>, StorageError> {
        let reply = self.next_quiz_reply(category_id);
        play(reply, self.data.list_quizzes(category_id)).await
    }

    async fn list_questions(&self, quiz_id: QuizId) -> Result<Vec<Question>, StorageError> {
        let reply = self.next_question_reply(quiz_id);
        play(reply, self.data.list_questions(quiz_id)).await
    }
}

struct FailingAttempts;

#[async_trait]
impl AttemptRepository for FailingAttempts {
    async fn record_attempt(&self, _attempt: &AttemptRecord) -> Result<i64, StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn list_attempts(
        &self,
        _quiz_id: QuizId,
        _limit: u32,
    ) -> Result<Vec<AttemptRow>, StorageError> {
        Ok(Vec::new())
    }
}

struct ScriptedOffer {
    result: Result<OfferResult, OfferError>,
    shown: AtomicUsize,
}

impl ScriptedOffer {
    fn new(result: Result<OfferResult, OfferError>) -> Self {
        Self {
            result,
            shown: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl RewardedOfferProvider for ScriptedOffer {
    async fn show_rewarded_offer(&self) -> Result<OfferResult, OfferError> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

//
// ─── FIXTURES ──────────────────────────────────────────────────────────────────
//

const GEOGRAPHY: CategoryId = CategoryId::new(1);
const CAPITALS: QuizId = QuizId::new(10);
const RIVERS: QuizId = QuizId::new(11);
const SCIENCE: CategoryId = CategoryId::new(2);
const ELEMENTS: QuizId = QuizId::new(20);

fn category(id: CategoryId) -> Category {
    Category::new(id, format!("folder-{id}"), Difficulty::Medium, 2).unwrap()
}

/// Seeds `quiz_id` declaring `declared` questions but holding `loaded`.
/// Option 0 is always the correct one.
async fn seed_quiz(
    catalog: &ScriptedCatalog,
    category_id: CategoryId,
    quiz_id: QuizId,
    declared: u32,
    loaded: u64,
) -> Quiz {
    let quiz = Quiz::new(quiz_id, category_id, format!("Quiz {quiz_id}"), declared).unwrap();
    catalog.upsert_quiz(&quiz).await.unwrap();
    for n in 1..=loaded {
        let question = Question::new(
            QuestionId::new(quiz_id.value() * 100 + n),
            quiz_id,
            format!("Question {n}?"),
            vec!["right".into(), "wrong".into(), "also wrong".into(), "nope".into()],
            0,
            "Because.",
        )
        .unwrap();
        catalog.upsert_question(&question).await.unwrap();
    }
    quiz
}

/// Geography with a 7-question quiz first and a 3-question quiz second.
async fn geography() -> (ScriptedCatalog, Quiz, Quiz) {
    let catalog = ScriptedCatalog::default();
    catalog.upsert_category(&category(GEOGRAPHY)).await.unwrap();
    let capitals = seed_quiz(&catalog, GEOGRAPHY, CAPITALS, 7, 7).await;
    let rivers = seed_quiz(&catalog, GEOGRAPHY, RIVERS, 3, 3).await;
    (catalog, capitals, rivers)
}

fn controller(
    catalog: &ScriptedCatalog,
    attempts: Arc<dyn AttemptRepository>,
) -> QuizSessionController {
    QuizSessionController::new(
        QuizSettings::default(),
        fixed_clock(),
        Arc::new(catalog.clone()),
        attempts,
    )
}

/// Answers every question in order, correct where `pattern` says so.
fn answer_all(ctl: &mut QuizSessionController, pattern: &[bool]) -> Navigation {
    let mut last = Navigation::AtBoundary(0);
    for &correct in pattern {
        ctl.answer_current(if correct { 0 } else { 1 }).unwrap();
        last = ctl.next_question().unwrap();
    }
    last
}

async fn started_on_capitals() -> (ScriptedCatalog, InMemoryRepository, QuizSessionController) {
    let (catalog, _, _) = geography().await;
    let attempts = InMemoryRepository::new();
    let mut ctl = controller(&catalog, Arc::new(attempts.clone()));
    ctl.select_category(category(GEOGRAPHY));
    ctl.settle().await;
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
    (catalog, attempts, ctl)
}

//
// ─── SELECTION AND LOADING ─────────────────────────────────────────────────────
//

#[tokio::test(start_paused = true)]
async fn selecting_a_category_auto_selects_and_starts_the_first_quiz() {
    let (catalog, _, _) = geography().await;
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    assert_eq!(ctl.phase(), SessionPhase::CategorySelected);

    let events = ctl.settle().await;
    assert!(events.contains(&SessionEvent::QuizzesLoaded {
        category_id: GEOGRAPHY,
        count: 2
    }));
    assert!(events.contains(&SessionEvent::QuizAutoSelected { quiz_id: CAPITALS }));
    assert!(events.contains(&SessionEvent::QuestionsLoaded {
        quiz_id: CAPITALS,
        count: 7
    }));
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::Started { quiz_id, .. } if *quiz_id == CAPITALS))
    );

    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::InProgress);
    assert_eq!(snapshot.quiz.as_ref().map(Quiz::id), Some(CAPITALS));
    assert_eq!(snapshot.quizzes.len(), 2);
    assert_eq!(snapshot.current_index, 0);
    assert!(snapshot.attempt_id.is_some());
}

#[tokio::test(start_paused = true)]
async fn empty_questions_are_rechecked_once_then_reported() {
    let (catalog, _, _) = geography().await;
    catalog.script_questions(CAPITALS, vec![Reply::Empty, Reply::Empty]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    let events = ctl.settle().await;

    assert_eq!(catalog.question_calls(CAPITALS), 2);
    assert!(events.contains(&SessionEvent::EmptyResult {
        resource: Resource::Questions(CAPITALS)
    }));
    assert_eq!(ctl.phase(), SessionPhase::QuizSelected(LoadStatus::Empty));
    assert_eq!(
        ctl.issue(),
        Some(&SessionIssue::EmptyResult {
            resource: Resource::Questions(CAPITALS)
        })
    );
    assert!(matches!(
        ctl.start_quiz(),
        Err(SessionError::InvalidStateTransition { .. })
    ));

    assert_eq!(ctl.retry_load().unwrap(), Resource::Questions(CAPITALS));
    ctl.settle().await;
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
    assert!(ctl.issue().is_none());
}

#[tokio::test(start_paused = true)]
async fn a_single_empty_answer_is_recovered_by_the_recheck() {
    let (catalog, _, _) = geography().await;
    catalog.script_questions(CAPITALS, vec![Reply::Empty]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    ctl.settle().await;

    assert_eq!(catalog.question_calls(CAPITALS), 2);
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
}

#[tokio::test(start_paused = true)]
async fn failing_quiz_loads_are_reported_after_three_attempts() {
    let (catalog, _, _) = geography().await;
    catalog.script_quizzes(GEOGRAPHY, vec![Reply::Fail, Reply::Fail, Reply::Fail]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    let events = ctl.settle().await;

    assert_eq!(catalog.quiz_calls(GEOGRAPHY), 3);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::LoadFailed {
            resource: Resource::Quizzes(GEOGRAPHY),
            attempts: 3,
            ..
        }
    )));
    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::CategorySelected);
    assert_eq!(snapshot.quiz_list, LoadStatus::Failed);
    assert!(matches!(
        snapshot.issue,
        Some(SessionIssue::LoadFailure { attempts: 3, .. })
    ));

    assert_eq!(ctl.retry_load().unwrap(), Resource::Quizzes(GEOGRAPHY));
    ctl.settle().await;
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
}

#[tokio::test(start_paused = true)]
async fn a_transient_failure_is_retried_transparently() {
    let (catalog, _, _) = geography().await;
    catalog.script_questions(CAPITALS, vec![Reply::Fail]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    let events = ctl.settle().await;

    assert_eq!(catalog.question_calls(CAPITALS), 2);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::LoadFailed { .. })));
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
}

#[tokio::test(start_paused = true)]
async fn late_results_for_a_replaced_quiz_are_discarded() {
    let (catalog, _, rivers) = geography().await;
    let gate = Arc::new(Notify::new());
    catalog.script_questions(CAPITALS, vec![Reply::WaitFor(Arc::clone(&gate))]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    assert!(ctl.process_next().await);
    assert_eq!(ctl.phase(), SessionPhase::QuizSelected(LoadStatus::Loading));

    ctl.select_quiz(rivers).unwrap();
    assert!(ctl.process_next().await);
    assert_eq!(ctl.phase(), SessionPhase::InProgress);

    gate.notify_one();
    assert!(ctl.process_next().await);

    let events = ctl.drain_events();
    assert!(events.contains(&SessionEvent::StaleResultDiscarded {
        resource: Resource::Questions(CAPITALS)
    }));
    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.quiz.as_ref().map(Quiz::id), Some(RIVERS));
    assert_eq!(snapshot.questions.len(), 3);
    assert!(snapshot.questions.iter().all(|q| q.quiz_id() == RIVERS));
}

#[tokio::test(start_paused = true)]
async fn late_quizzes_for_a_replaced_category_are_discarded() {
    let (catalog, _, _) = geography().await;
    catalog.upsert_category(&category(SCIENCE)).await.unwrap();
    seed_quiz(&catalog, SCIENCE, ELEMENTS, 4, 4).await;
    let gate = Arc::new(Notify::new());
    catalog.script_quizzes(GEOGRAPHY, vec![Reply::WaitFor(Arc::clone(&gate))]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    ctl.select_category(category(SCIENCE));
    ctl.settle().await;
    assert_eq!(ctl.phase(), SessionPhase::InProgress);

    gate.notify_one();
    assert!(ctl.process_next().await);

    let events = ctl.drain_events();
    assert!(events.contains(&SessionEvent::StaleResultDiscarded {
        resource: Resource::Quizzes(GEOGRAPHY)
    }));
    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.category.as_ref().map(Category::id), Some(SCIENCE));
    assert_eq!(snapshot.quiz.as_ref().map(Quiz::id), Some(ELEMENTS));
    assert!(snapshot.quizzes.iter().all(|q| q.category_id() == SCIENCE));
    assert_eq!(snapshot.phase, SessionPhase::InProgress);
}

#[tokio::test(start_paused = true)]
async fn settling_does_not_wait_on_a_hung_fetch_for_a_replaced_quiz() {
    let (catalog, _, rivers) = geography().await;
    catalog.script_questions(CAPITALS, vec![Reply::Hang]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    assert!(ctl.process_next().await);
    ctl.select_quiz(rivers).unwrap();

    let settled = tokio::time::timeout(Duration::from_secs(600), ctl.settle()).await;
    assert!(settled.is_ok(), "settle kept waiting on the replaced quiz");
    assert!(!ctl.has_pending_work());
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
    assert_eq!(ctl.snapshot().quiz.as_ref().map(Quiz::id), Some(RIVERS));
}

#[tokio::test(start_paused = true)]
async fn reset_discards_results_still_in_flight() {
    let (catalog, _, _) = geography().await;
    let gate = Arc::new(Notify::new());
    catalog.script_questions(CAPITALS, vec![Reply::WaitFor(Arc::clone(&gate))]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    assert!(ctl.process_next().await);
    ctl.reset_quiz();

    gate.notify_one();
    ctl.settle().await;
    assert_eq!(ctl.phase(), SessionPhase::Idle);
    assert!(ctl.snapshot().questions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn hung_question_fetch_is_restarted_by_the_fallback_timer() {
    let (catalog, _, _) = geography().await;
    catalog.script_questions(CAPITALS, vec![Reply::Hang]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    let events = ctl.settle().await;

    assert!(events.contains(&SessionEvent::QuestionRefetchForced { quiz_id: CAPITALS }));
    assert_eq!(catalog.question_calls(CAPITALS), 2);
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
}

#[tokio::test(start_paused = true)]
async fn fallback_timer_of_a_replaced_quiz_does_nothing() {
    let (catalog, _, rivers) = geography().await;
    catalog.script_questions(CAPITALS, vec![Reply::Hang]);
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    assert!(ctl.process_next().await);
    ctl.select_quiz(rivers).unwrap();
    assert!(ctl.process_next().await);

    tokio::time::sleep(Duration::from_secs(5)).await;
    ctl.process_ready();

    let events = ctl.drain_events();
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::QuestionRefetchForced { .. })));
    assert_eq!(catalog.question_calls(CAPITALS), 1);
    assert_eq!(ctl.snapshot().quiz.as_ref().map(Quiz::id), Some(RIVERS));
}

#[tokio::test(start_paused = true)]
async fn reselecting_within_the_freshness_window_uses_the_cache() {
    let (catalog, _, _) = geography().await;
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    ctl.select_category(category(GEOGRAPHY));
    ctl.settle().await;

    ctl.select_category(category(GEOGRAPHY));
    assert_eq!(ctl.phase(), SessionPhase::InProgress);
    assert_eq!(catalog.quiz_calls(GEOGRAPHY), 1);
    assert_eq!(catalog.question_calls(CAPITALS), 1);

    tokio::time::advance(Duration::from_secs(6 * 60)).await;
    ctl.select_category(category(GEOGRAPHY));
    assert_eq!(ctl.phase(), SessionPhase::CategorySelected);
    ctl.settle().await;
    assert_eq!(catalog.quiz_calls(GEOGRAPHY), 2);
}

//
// ─── ANSWERING AND SCORING ─────────────────────────────────────────────────────
//

#[tokio::test(start_paused = true)]
async fn seven_questions_five_correct_scores_71_percent() {
    let (_, attempts, mut ctl) = started_on_capitals().await;

    let last = answer_all(&mut ctl, &[true, true, true, true, true, false, false]);
    let Navigation::Finished(report) = last else {
        panic!("expected the last step to finish, got {last:?}");
    };
    assert_eq!(report.accuracy, 71);
    assert_eq!(report.points, 50);
    assert_eq!(report.correct, 5);
    assert_eq!(report.incorrect, 2);
    assert_eq!(ctl.phase(), SessionPhase::Finished);

    let events = ctl.settle().await;
    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::AttemptSaved { id: 1, .. }))
    );
    assert_eq!(ctl.snapshot().persistence, PersistenceStatus::Saved { id: 1 });

    let rows = attempts.list_attempts(CAPITALS, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    let record = &rows[0].record;
    assert_eq!(record.score(), 71);
    assert_eq!(record.points(), 50);
    assert_eq!(record.incorrect_answers(), 2);
    assert!(record.completed());
    assert_eq!(record.completed_at(), fixed_now());
}

#[tokio::test(start_paused = true)]
async fn resubmitting_an_answer_credits_it_once() {
    let (_, _, mut ctl) = started_on_capitals().await;

    assert_eq!(
        ctl.answer_current(0).unwrap(),
        SubmitOutcome::Recorded {
            newly_credited: true
        }
    );
    assert_eq!(
        ctl.answer_current(0).unwrap(),
        SubmitOutcome::Recorded {
            newly_credited: false
        }
    );
    ctl.answer_current(2).unwrap();

    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.correct_answers, 1);
    let current = snapshot.current_question().unwrap();
    assert_eq!(snapshot.answer_for(current.id()), Some(2));
    assert_eq!(snapshot.answered_correctly(current), Some(false));
}

#[tokio::test(start_paused = true)]
async fn answers_are_validated_against_the_loaded_quiz() {
    let (_, _, mut ctl) = started_on_capitals().await;

    let unknown = ctl.submit_answer(QuestionId::new(9_999), 0, true).unwrap_err();
    assert!(matches!(unknown, SessionError::UnknownQuestion(_)));

    let current = ctl.current_question().unwrap().id();
    let out_of_range = ctl.submit_answer(current, 4, false).unwrap_err();
    assert!(matches!(
        out_of_range,
        SessionError::InvalidOption { option: 4, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn finishing_early_is_rejected() {
    let (_, _, mut ctl) = started_on_capitals().await;
    ctl.answer_current(0).unwrap();

    let err = ctl.finish_quiz().unwrap_err();
    assert!(matches!(
        err,
        SessionError::InvalidStateTransition {
            phase: SessionPhase::InProgress,
            ..
        }
    ));
    assert_eq!(ctl.previous_question().unwrap(), Navigation::AtBoundary(0));
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_the_finished_result() {
    let (catalog, _, _) = geography().await;
    let mut ctl = controller(&catalog, Arc::new(FailingAttempts));
    ctl.select_category(category(GEOGRAPHY));
    ctl.settle().await;

    answer_all(&mut ctl, &[true; 7]);
    let events = ctl.settle().await;

    assert!(
        events
            .iter()
            .any(|e| matches!(e, SessionEvent::AttemptNotSaved { .. }))
    );
    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Finished);
    assert_eq!(snapshot.score.map(|s| s.accuracy), Some(100));
    assert!(matches!(
        snapshot.persistence,
        PersistenceStatus::Failed { .. }
    ));
    assert!(matches!(
        snapshot.issue,
        Some(SessionIssue::PersistenceFailure { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn review_walks_the_answers_and_reset_returns_to_idle() {
    let (_, attempts, mut ctl) = started_on_capitals().await;
    let Navigation::Finished(report) = answer_all(&mut ctl, &[true; 7]) else {
        panic!("attempt should finish");
    };
    ctl.settle().await;

    assert!(!ctl.start_quiz().unwrap());
    assert_eq!(ctl.phase(), SessionPhase::Finished);

    ctl.review_answers().unwrap();
    assert_eq!(ctl.phase(), SessionPhase::Reviewing);
    assert_eq!(ctl.previous_question().unwrap(), Navigation::AtBoundary(0));
    for index in 1..7 {
        assert_eq!(ctl.next_question().unwrap(), Navigation::Moved(index));
    }
    assert_eq!(ctl.next_question().unwrap(), Navigation::AtBoundary(6));
    assert_eq!(ctl.answer_current(1).unwrap(), SubmitOutcome::Ignored);

    // Finishing again hands back the same report without another save.
    assert_eq!(ctl.finish_quiz().unwrap(), report);
    assert!(!ctl.has_pending_work());
    assert_eq!(attempts.list_attempts(CAPITALS, 10).await.unwrap().len(), 1);

    ctl.reset_quiz();
    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.phase, SessionPhase::Idle);
    assert!(snapshot.category.is_none());
    assert!(snapshot.quiz.is_none());
    assert_eq!(snapshot.points, 0);
}

#[tokio::test(start_paused = true)]
async fn operations_out_of_order_are_rejected() {
    let (catalog, capitals, _) = geography().await;
    let mut ctl = controller(&catalog, Arc::new(InMemoryRepository::new()));

    assert!(matches!(
        ctl.submit_answer(QuestionId::new(1_001), 0, true),
        Err(SessionError::InvalidStateTransition {
            phase: SessionPhase::Idle,
            ..
        })
    ));
    assert!(matches!(
        ctl.select_quiz(capitals),
        Err(SessionError::InvalidStateTransition { .. })
    ));
    assert!(ctl.next_question().is_err());
    assert!(ctl.review_answers().is_err());
    assert!(matches!(ctl.retry_load(), Err(SessionError::NothingToRetry)));

    let other = CategoryId::new(2);
    catalog.upsert_category(&category(other)).await.unwrap();
    let foreign = seed_quiz(&catalog, other, QuizId::new(20), 1, 1).await;
    ctl.select_category(category(GEOGRAPHY));
    assert!(matches!(
        ctl.select_quiz(foreign),
        Err(SessionError::QuizOutsideCategory { .. })
    ));
}

//
// ─── BONUS ─────────────────────────────────────────────────────────────────────
//

#[tokio::test(start_paused = true)]
async fn bonus_is_granted_once_per_attempt() {
    let (_, _, mut ctl) = started_on_capitals().await;
    assert!(!ctl.can_offer_bonus());

    answer_all(&mut ctl, &[true, true, true, true, true, false, false]);
    assert!(ctl.can_offer_bonus());

    let first = ctl.grant_bonus(Reward { amount: 25 }).unwrap();
    assert_eq!(first, GrantOutcome::Granted { amount: 25 });
    assert_eq!(ctl.snapshot().points, 75);

    let second = ctl.grant_bonus(Reward { amount: 25 }).unwrap();
    assert_eq!(second, GrantOutcome::AlreadyGranted { amount: 25 });

    let snapshot = ctl.snapshot();
    assert_eq!(snapshot.points, 75);
    assert!(snapshot.reward_consumed);
    assert!(!snapshot.can_offer_bonus);
}

#[tokio::test(start_paused = true)]
async fn declined_offer_leaves_the_attempt_eligible() {
    let (_, _, mut ctl) = started_on_capitals().await;
    answer_all(&mut ctl, &[true; 7]);

    let declined = ScriptedOffer::new(Ok(OfferResult {
        granted: false,
        amount: 0,
    }));
    assert_eq!(
        ctl.claim_bonus(&declined).await.unwrap_err(),
        RewardError::Declined
    );
    assert!(matches!(
        ctl.issue(),
        Some(SessionIssue::RewardFailure { .. })
    ));
    assert!(ctl.can_offer_bonus());

    let broken = ScriptedOffer::new(Err(OfferError::Unavailable("no fill".into())));
    assert!(matches!(
        ctl.claim_bonus(&broken).await,
        Err(RewardError::Offer(_))
    ));
    assert!(ctl.can_offer_bonus());

    let watched = ScriptedOffer::new(Ok(OfferResult {
        granted: true,
        amount: 15,
    }));
    assert_eq!(
        ctl.claim_bonus(&watched).await.unwrap(),
        GrantOutcome::Granted { amount: 15 }
    );
    assert_eq!(
        ctl.claim_bonus(&watched).await.unwrap(),
        GrantOutcome::AlreadyGranted { amount: 15 }
    );
    assert_eq!(watched.shown.load(Ordering::SeqCst), 1);
    assert_eq!(ctl.snapshot().points, 85);
}

#[tokio::test(start_paused = true)]
async fn partial_attempts_earn_no_bonus() {
    let catalog = ScriptedCatalog::default();
    catalog.upsert_category(&category(GEOGRAPHY)).await.unwrap();
    seed_quiz(&catalog, GEOGRAPHY, CAPITALS, 7, 5).await;
    let attempts = InMemoryRepository::new();
    let mut ctl = controller(&catalog, Arc::new(attempts.clone()));

    ctl.select_category(category(GEOGRAPHY));
    ctl.settle().await;
    answer_all(&mut ctl, &[true; 5]);
    ctl.settle().await;

    assert_eq!(ctl.phase(), SessionPhase::Finished);
    assert!(!ctl.can_offer_bonus());
    assert_eq!(
        ctl.grant_bonus(Reward { amount: 10 }).unwrap_err(),
        RewardError::NotEligible
    );

    let rows = attempts.list_attempts(CAPITALS, 10).await.unwrap();
    assert!(!rows[0].record.completed());
}

#[tokio::test(start_paused = true)]
async fn snapshot_serializes_for_rendering() {
    let (_, _, ctl) = started_on_capitals().await;
    let json = serde_json::to_value(ctl.snapshot()).unwrap();

    assert_eq!(json["phase"]["phase"], "in_progress");
    assert_eq!(json["quiz_list"], "loaded");
    assert_eq!(json["questions"].as_array().map(Vec::len), Some(7));
    assert_eq!(json["persistence"]["status"], "not_requested");
}
