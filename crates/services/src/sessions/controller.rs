use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tokio::time::sleep;

use quiz_core::Clock;
use quiz_core::model::{
    AttemptId, AttemptRecord, Category, CategoryId, Question, QuestionId, Quiz, QuizId,
    QuizSettings,
};
use quiz_core::scoring::{AttemptSummary, ScoreReport, is_complete_attempt, score};
use storage::repository::{AttemptRepository, CatalogRepository, Storage};

use super::events::{ControllerEvent, SessionEvent};
use super::snapshot::SessionSnapshot;
use super::state::{LoadStatus, PersistenceStatus, SessionPhase, SessionState};
use crate::error::{Resource, RewardError, SessionError, SessionIssue};
use crate::loader::{LoadMode, LoadOutcome, LoadPolicy, LoadStart, LoadTicket, ResourceLoader};
use crate::reward::{GrantOutcome, Reward, RewardCoordinator, RewardedOfferProvider};

//
// ─── RESULTS ───────────────────────────────────────────────────────────────────
//

/// Result of `submit_answer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// `newly_credited` is true when this answer raised the correct count.
    Recorded { newly_credited: bool },
    /// The attempt is already finished; nothing changed.
    Ignored,
}

/// Result of moving between questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Moved(usize),
    /// Already at the first or last question; the index is unchanged.
    AtBoundary(usize),
    /// Advancing past the last question finished the attempt.
    Finished(ScoreReport),
}

struct FallbackTimer {
    quiz_id: QuizId,
    handle: AbortHandle,
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one player through category, quiz, questions, score and bonus.
///
/// Operations are synchronous and change state immediately. Loads and saves
/// run as tokio tasks whose results come back as internal events; call
/// [`Self::process_next`], [`Self::process_ready`] or [`Self::settle`] to
/// apply them. Must be created and driven inside a tokio runtime.
pub struct QuizSessionController {
    settings: QuizSettings,
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn AttemptRepository>,
    quiz_loader: ResourceLoader<CategoryId, Quiz>,
    question_loader: ResourceLoader<QuizId, Question>,
    rewards: RewardCoordinator,
    state: SessionState,
    fallback: Option<FallbackTimer>,
    pending_saves: usize,
    events_tx: UnboundedSender<ControllerEvent>,
    events_rx: UnboundedReceiver<ControllerEvent>,
    outbox: Vec<SessionEvent>,
}

impl QuizSessionController {
    #[must_use]
    pub fn new(
        settings: QuizSettings,
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        let policy = LoadPolicy::from(&settings);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            clock,
            catalog,
            attempts,
            quiz_loader: ResourceLoader::new(policy),
            question_loader: ResourceLoader::new(policy),
            rewards: RewardCoordinator::new(),
            state: SessionState::default(),
            fallback: None,
            pending_saves: 0,
            events_tx,
            events_rx,
            outbox: Vec::new(),
        }
    }

    #[must_use]
    pub fn from_storage(settings: QuizSettings, clock: Clock, storage: &Storage) -> Self {
        Self::new(
            settings,
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.attempts),
        )
    }

    #[must_use]
    pub fn settings(&self) -> &QuizSettings {
        &self.settings
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.state.phase()
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.state.current_question()
    }

    #[must_use]
    pub fn score_report(&self) -> Option<ScoreReport> {
        self.state.report
    }

    #[must_use]
    pub fn issue(&self) -> Option<&SessionIssue> {
        self.state.issue.as_ref()
    }

    //
    // ─── SELECTION ─────────────────────────────────────────────────────────────
    //

    /// Starts over with `category` and begins loading its quizzes.
    ///
    /// The first quiz is selected automatically once the list arrives.
    pub fn select_category(&mut self, category: Category) {
        log::debug!("selecting category {}", category.id());
        self.cancel_fallback();
        self.question_loader.deactivate();
        self.state = SessionState::default();

        let category_id = category.id();
        self.state.category = Some(category);
        self.request_quizzes(category_id, LoadMode::Reuse);
    }

    /// Switches to `quiz`, dropping the current attempt and loading its questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidStateTransition` without a selected category
    /// and `SessionError::QuizOutsideCategory` if `quiz` belongs elsewhere.
    pub fn select_quiz(&mut self, quiz: Quiz) -> Result<(), SessionError> {
        let Some(category) = &self.state.category else {
            return Err(self.invalid("select a quiz"));
        };
        if quiz.category_id() != category.id() {
            return Err(SessionError::QuizOutsideCategory {
                quiz_id: quiz.id(),
                category_id: category.id(),
            });
        }
        self.begin_quiz(quiz);
        Ok(())
    }

    fn begin_quiz(&mut self, quiz: Quiz) {
        log::debug!("selecting quiz {}", quiz.id());
        self.cancel_fallback();
        self.state.clear_quiz();

        let quiz_id = quiz.id();
        self.state.quiz = Some(quiz);
        self.request_questions(quiz_id, LoadMode::Reuse);
    }

    /// Starts the attempt over the loaded questions.
    ///
    /// Returns `Ok(false)` when an attempt is already running or finished.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidStateTransition` if no questions are loaded.
    pub fn start_quiz(&mut self) -> Result<bool, SessionError> {
        if self.state.started {
            return Ok(false);
        }
        if self.state.questions.is_empty() {
            return Err(self.invalid("start the quiz"));
        }
        self.start_attempt();
        Ok(true)
    }

    fn start_attempt(&mut self) {
        let attempt_id = AttemptId::new_random();
        self.state.started = true;
        self.state.current_index = 0;
        self.state.attempt_id = Some(attempt_id);

        if let Some(quiz) = &self.state.quiz {
            log::info!(
                "attempt {attempt_id} started on quiz {} ({} questions)",
                quiz.id(),
                self.state.questions.len()
            );
            self.outbox.push(SessionEvent::Started {
                quiz_id: quiz.id(),
                attempt_id,
            });
        }
    }

    //
    // ─── ANSWERING ─────────────────────────────────────────────────────────────
    //

    /// Records `option` as the answer to `question_id`.
    ///
    /// Re-answering replaces the stored option; correctness is credited once.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidStateTransition` outside an attempt, and
    /// `UnknownQuestion` or `InvalidOption` for ids not in the loaded quiz.
    pub fn submit_answer(
        &mut self,
        question_id: QuestionId,
        option: usize,
        is_correct: bool,
    ) -> Result<SubmitOutcome, SessionError> {
        match self.phase() {
            SessionPhase::InProgress => {}
            SessionPhase::Finished | SessionPhase::Reviewing => {
                log::debug!("ignoring answer to {question_id} after the attempt finished");
                return Ok(SubmitOutcome::Ignored);
            }
            _ => return Err(self.invalid("submit an answer")),
        }

        let question = self
            .state
            .questions
            .iter()
            .find(|q| q.id() == question_id)
            .ok_or(SessionError::UnknownQuestion(question_id))?;
        if !question.has_option(option) {
            return Err(SessionError::InvalidOption {
                question_id,
                option,
            });
        }

        let newly_credited = self.state.record_answer(question_id, option, is_correct);
        Ok(SubmitOutcome::Recorded { newly_credited })
    }

    /// Answers the current question, judging it against its correct option.
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit_answer`].
    pub fn answer_current(&mut self, option: usize) -> Result<SubmitOutcome, SessionError> {
        let Some(question) = self.state.current_question() else {
            return Err(self.invalid("answer a question"));
        };
        let question_id = question.id();
        let is_correct = question.is_correct(option);
        self.submit_answer(question_id, option, is_correct)
    }

    /// Moves forward. On the last question of a running attempt this finishes it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidStateTransition` outside an attempt or review.
    pub fn next_question(&mut self) -> Result<Navigation, SessionError> {
        match self.phase() {
            SessionPhase::InProgress if self.state.is_last_question() => {
                self.finish_quiz().map(Navigation::Finished)
            }
            SessionPhase::Reviewing if self.state.is_last_question() => {
                Ok(Navigation::AtBoundary(self.state.current_index))
            }
            SessionPhase::InProgress | SessionPhase::Reviewing => {
                self.state.current_index += 1;
                Ok(Navigation::Moved(self.state.current_index))
            }
            _ => Err(self.invalid("move to the next question")),
        }
    }

    /// # Errors
    ///
    /// Returns `SessionError::InvalidStateTransition` outside an attempt or review.
    pub fn previous_question(&mut self) -> Result<Navigation, SessionError> {
        match self.phase() {
            SessionPhase::InProgress | SessionPhase::Reviewing => {
                if self.state.current_index == 0 {
                    return Ok(Navigation::AtBoundary(0));
                }
                self.state.current_index -= 1;
                Ok(Navigation::Moved(self.state.current_index))
            }
            _ => Err(self.invalid("move to the previous question")),
        }
    }

    //
    // ─── FINISHING ─────────────────────────────────────────────────────────────
    //

    /// Scores the attempt and saves it in the background.
    ///
    /// Finishing an already finished attempt returns the same report and
    /// does not save it again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidStateTransition` outside an attempt or
    /// before the last question is reached.
    pub fn finish_quiz(&mut self) -> Result<ScoreReport, SessionError> {
        match self.phase() {
            SessionPhase::Finished | SessionPhase::Reviewing => {
                if let Some(report) = self.state.report {
                    return Ok(report);
                }
                return Err(self.invalid("finish the quiz"));
            }
            SessionPhase::InProgress if self.state.is_last_question() => {}
            _ => return Err(self.invalid("finish the quiz")),
        }

        let report = score(
            self.state.question_total(),
            self.state.correct_count,
            self.settings.points_per_correct(),
        );
        self.state.finished = true;
        self.state.report = Some(report);
        self.state.points = report.points;

        log::info!(
            "attempt finished: {}/{} correct, {}%, {} points",
            report.correct,
            report.total,
            report.accuracy,
            report.points
        );
        self.persist_attempt(report);
        Ok(report)
    }

    fn persist_attempt(&mut self, report: ScoreReport) {
        let Some(attempt) = self.attempt_summary() else {
            return;
        };
        let record = AttemptRecord::from_report(
            attempt.quiz_id,
            &report,
            is_complete_attempt(&attempt),
            self.clock.now(),
        );

        self.state.persistence = PersistenceStatus::Pending;
        self.pending_saves += 1;

        let attempts = Arc::clone(&self.attempts);
        let tx = self.events_tx.clone();
        let attempt_id = attempt.attempt_id;
        tokio::spawn(async move {
            let result = attempts.record_attempt(&record).await;
            let _ = tx.send(ControllerEvent::AttemptPersisted { attempt_id, result });
        });
    }

    /// Enters review mode on the first question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidStateTransition` before the attempt is finished.
    pub fn review_answers(&mut self) -> Result<(), SessionError> {
        match self.phase() {
            SessionPhase::Finished | SessionPhase::Reviewing => {
                self.state.reviewing = true;
                self.state.current_index = 0;
                Ok(())
            }
            _ => Err(self.invalid("review answers")),
        }
    }

    /// Back to `Idle`. Work still in flight is ignored when it lands.
    pub fn reset_quiz(&mut self) {
        log::debug!("resetting session from {}", self.phase());
        self.cancel_fallback();
        self.quiz_loader.deactivate();
        self.question_loader.deactivate();
        self.state = SessionState::default();
    }

    /// Asks the catalog again after an empty or failed load.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NothingToRetry` if the current list did not end
    /// empty or failed.
    pub fn retry_load(&mut self) -> Result<Resource, SessionError> {
        let retryable =
            |status: LoadStatus| matches!(status, LoadStatus::Empty | LoadStatus::Failed);

        if let Some(quiz_id) = self.state.quiz.as_ref().map(Quiz::id) {
            if retryable(self.state.question_list) && !self.state.started {
                self.state.issue = None;
                self.request_questions(quiz_id, LoadMode::Force);
                return Ok(Resource::Questions(quiz_id));
            }
        } else if let Some(category_id) = self.state.category.as_ref().map(Category::id) {
            if retryable(self.state.quiz_list) {
                self.state.issue = None;
                self.request_quizzes(category_id, LoadMode::Force);
                return Ok(Resource::Quizzes(category_id));
            }
        }
        Err(SessionError::NothingToRetry)
    }

    //
    // ─── BONUS ─────────────────────────────────────────────────────────────────
    //

    /// The attempt as the reward rules see it.
    #[must_use]
    pub fn attempt_summary(&self) -> Option<AttemptSummary> {
        let quiz = self.state.quiz.as_ref()?;
        let attempt_id = self.state.attempt_id?;
        Some(AttemptSummary {
            attempt_id,
            quiz_id: quiz.id(),
            total_questions: self.state.question_total(),
            expected_questions: self
                .settings
                .required_question_count()
                .unwrap_or_else(|| quiz.question_count()),
            finished: self.state.finished,
        })
    }

    #[must_use]
    pub fn can_offer_bonus(&self) -> bool {
        self.attempt_summary()
            .is_some_and(|attempt| self.rewards.can_offer(&attempt))
    }

    /// Adds `reward` to the finished attempt's points, once.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::NotEligible` for missing, unfinished or partial attempts.
    pub fn grant_bonus(&mut self, reward: Reward) -> Result<GrantOutcome, RewardError> {
        let attempt = self.attempt_summary().ok_or(RewardError::NotEligible)?;
        let outcome = self.rewards.grant(&attempt, reward)?;

        if let GrantOutcome::Granted { amount } = outcome {
            self.state.points = self.state.points.saturating_add(amount);
            self.state.reward_consumed = true;
            log::info!("granted {amount} bonus points to attempt {}", attempt.attempt_id);
        }
        Ok(outcome)
    }

    /// Shows a rewarded offer and grants its reward if the player completes it.
    ///
    /// A declined or failed offer leaves the attempt eligible.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::NotEligible` when no bonus can be offered,
    /// `Declined` when the offer was not completed, and `Offer` when the
    /// provider failed.
    pub async fn claim_bonus(
        &mut self,
        offers: &dyn RewardedOfferProvider,
    ) -> Result<GrantOutcome, RewardError> {
        let attempt = self.attempt_summary().ok_or(RewardError::NotEligible)?;
        if let Some(amount) = self.rewards.granted_amount(attempt.attempt_id) {
            return Ok(GrantOutcome::AlreadyGranted { amount });
        }
        if !self.rewards.can_offer(&attempt) {
            return Err(RewardError::NotEligible);
        }

        let offer = match offers.show_rewarded_offer().await {
            Ok(offer) => offer,
            Err(err) => {
                log::warn!("rewarded offer failed: {err}");
                self.state.issue = Some(SessionIssue::RewardFailure {
                    message: err.to_string(),
                });
                return Err(err.into());
            }
        };
        if !offer.granted {
            log::info!("rewarded offer closed without a reward");
            self.state.issue = Some(SessionIssue::RewardFailure {
                message: RewardError::Declined.to_string(),
            });
            return Err(RewardError::Declined);
        }

        self.grant_bonus(Reward {
            amount: offer.amount,
        })
    }

    //
    // ─── SNAPSHOT ──────────────────────────────────────────────────────────────
    //

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = &self.state;
        SessionSnapshot {
            phase: state.phase(),
            category: state.category.clone(),
            quizzes: state.quizzes.clone(),
            quiz_list: state.quiz_list,
            quiz: state.quiz.clone(),
            questions: state.questions.clone(),
            question_list: state.question_list,
            current_index: state.current_index,
            answers: state.answers.iter().map(|(id, option)| (*id, *option)).collect(),
            correct_answers: state.correct_count,
            points: state.points,
            score: state.report,
            attempt_id: state.attempt_id,
            reward_consumed: state.reward_consumed,
            can_offer_bonus: self.can_offer_bonus(),
            persistence: state.persistence.clone(),
            issue: state.issue.clone(),
        }
    }

    //
    // ─── BACKGROUND RESULTS ────────────────────────────────────────────────────
    //

    /// Waits for the next background result and applies it.
    ///
    /// Returns `false` if no result can arrive anymore.
    pub async fn process_next(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Applies every result that has already arrived. Returns how many.
    pub fn process_ready(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    /// True while a load for the current selection or a save has not
    /// reported back. Loads for replaced selections are not waited on.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.quiz_loader.has_active_in_flight()
            || self.question_loader.has_active_in_flight()
            || self.pending_saves > 0
    }

    /// Applies results until no load or save is pending, then drains events.
    ///
    /// A hung question fetch is restarted by the fallback timer; a hung quiz
    /// list fetch keeps this from returning. Use [`Self::process_next`] there.
    pub async fn settle(&mut self) -> Vec<SessionEvent> {
        self.process_ready();
        while self.has_pending_work() {
            if !self.process_next().await {
                break;
            }
        }
        self.drain_events()
    }

    /// Takes the events recorded since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbox)
    }

    fn apply(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::QuizzesResolved {
                category_id,
                ticket,
                outcome,
            } => match self.quiz_loader.resolve(&category_id, ticket, outcome) {
                Some(outcome) => self.apply_quizzes(category_id, outcome),
                None => self.outbox.push(SessionEvent::StaleResultDiscarded {
                    resource: Resource::Quizzes(category_id),
                }),
            },
            ControllerEvent::QuestionsResolved {
                quiz_id,
                ticket,
                outcome,
            } => {
                match self.question_loader.resolve(&quiz_id, ticket, outcome) {
                    Some(outcome) => self.apply_questions(quiz_id, outcome),
                    None => self.outbox.push(SessionEvent::StaleResultDiscarded {
                        resource: Resource::Questions(quiz_id),
                    }),
                }
            }
            ControllerEvent::QuestionsOverdue { quiz_id } => self.questions_overdue(quiz_id),
            ControllerEvent::AttemptPersisted { attempt_id, result } => {
                self.attempt_persisted(attempt_id, result.map_err(|err| err.to_string()));
            }
        }
    }

    //
    // ─── LOADING ───────────────────────────────────────────────────────────────
    //

    fn request_quizzes(&mut self, category_id: CategoryId, mode: LoadMode) {
        self.state.quiz_list = LoadStatus::Loading;

        let catalog = Arc::clone(&self.catalog);
        let tx = self.events_tx.clone();
        let start = self.quiz_loader.load(
            category_id,
            mode,
            move || {
                let catalog = Arc::clone(&catalog);
                async move { catalog.list_quizzes(category_id).await }
            },
            move |ticket: LoadTicket, outcome: LoadOutcome<Quiz>| {
                let _ = tx.send(ControllerEvent::QuizzesResolved {
                    category_id,
                    ticket,
                    outcome,
                });
            },
        );

        if let LoadStart::Cached(quizzes) = start {
            self.apply_quizzes(category_id, LoadOutcome::Success(quizzes));
        }
    }

    fn request_questions(&mut self, quiz_id: QuizId, mode: LoadMode) {
        self.state.question_list = LoadStatus::Loading;

        let catalog = Arc::clone(&self.catalog);
        let tx = self.events_tx.clone();
        let start = self.question_loader.load(
            quiz_id,
            mode,
            move || {
                let catalog = Arc::clone(&catalog);
                async move { catalog.list_questions(quiz_id).await }
            },
            move |ticket: LoadTicket, outcome: LoadOutcome<Question>| {
                let _ = tx.send(ControllerEvent::QuestionsResolved {
                    quiz_id,
                    ticket,
                    outcome,
                });
            },
        );

        match start {
            LoadStart::Cached(questions) => {
                self.apply_questions(quiz_id, LoadOutcome::Success(questions));
            }
            LoadStart::Started | LoadStart::AlreadyInFlight if mode == LoadMode::Reuse => {
                self.arm_fallback(quiz_id);
            }
            LoadStart::Started | LoadStart::AlreadyInFlight => {}
        }
    }

    fn apply_quizzes(&mut self, category_id: CategoryId, outcome: LoadOutcome<Quiz>) {
        let resource = Resource::Quizzes(category_id);
        match outcome {
            LoadOutcome::Success(quizzes) => {
                log::debug!("loaded {} quizzes for category {category_id}", quizzes.len());
                self.outbox.push(SessionEvent::QuizzesLoaded {
                    category_id,
                    count: quizzes.len(),
                });
                let first = quizzes.first().cloned();
                self.state.quizzes = quizzes;
                self.state.quiz_list = LoadStatus::Loaded;

                if self.state.quiz.is_some() {
                    return;
                }
                if let Some(first) = first {
                    self.outbox.push(SessionEvent::QuizAutoSelected { quiz_id: first.id() });
                    self.begin_quiz(first);
                }
            }
            outcome => self.load_did_not_succeed(resource, outcome),
        }
    }

    fn apply_questions(&mut self, quiz_id: QuizId, outcome: LoadOutcome<Question>) {
        self.cancel_fallback();
        match outcome {
            LoadOutcome::Success(questions) => {
                log::debug!("loaded {} questions for quiz {quiz_id}", questions.len());
                self.outbox.push(SessionEvent::QuestionsLoaded {
                    quiz_id,
                    count: questions.len(),
                });
                self.state.questions = questions;
                self.state.question_list = LoadStatus::Loaded;

                if !self.state.started {
                    self.start_attempt();
                }
            }
            outcome => self.load_did_not_succeed(Resource::Questions(quiz_id), outcome),
        }
    }

    fn load_did_not_succeed<T>(&mut self, resource: Resource, outcome: LoadOutcome<T>) {
        let status = match outcome {
            LoadOutcome::Success(_) => return,
            LoadOutcome::SuccessEmpty => {
                log::warn!("no {resource} available");
                self.state.issue = Some(SessionIssue::EmptyResult { resource });
                self.outbox.push(SessionEvent::EmptyResult { resource });
                LoadStatus::Empty
            }
            LoadOutcome::Failure { attempts, error } => {
                log::warn!("giving up on {resource} after {attempts} attempts: {error}");
                let message = error.to_string();
                self.state.issue = Some(SessionIssue::LoadFailure {
                    resource,
                    attempts,
                    message: message.clone(),
                });
                self.outbox.push(SessionEvent::LoadFailed {
                    resource,
                    attempts,
                    message,
                });
                LoadStatus::Failed
            }
        };

        match resource {
            Resource::Quizzes(_) => self.state.quiz_list = status,
            Resource::Questions(_) => self.state.question_list = status,
        }
    }

    //
    // ─── FALLBACK TIMER ────────────────────────────────────────────────────────
    //

    fn arm_fallback(&mut self, quiz_id: QuizId) {
        self.cancel_fallback();
        let delay = self.settings.question_fallback_delay();
        let tx = self.events_tx.clone();
        let task = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(ControllerEvent::QuestionsOverdue { quiz_id });
        });
        self.fallback = Some(FallbackTimer {
            quiz_id,
            handle: task.abort_handle(),
        });
    }

    fn cancel_fallback(&mut self) {
        if let Some(timer) = self.fallback.take() {
            timer.handle.abort();
        }
    }

    fn questions_overdue(&mut self, quiz_id: QuizId) {
        let armed_for_quiz = self
            .fallback
            .as_ref()
            .is_some_and(|timer| timer.quiz_id == quiz_id);
        if !armed_for_quiz {
            log::debug!("ignoring expired fallback timer for quiz {quiz_id}");
            return;
        }
        self.fallback = None;

        let waiting = self.state.question_list == LoadStatus::Loading
            && self.question_loader.is_active(&quiz_id);
        if !waiting || !self.question_loader.is_stalled(&quiz_id) {
            return;
        }

        log::warn!(
            "questions for quiz {quiz_id} still pending after {:?}, fetching again",
            self.settings.question_fallback_delay()
        );
        self.outbox.push(SessionEvent::QuestionRefetchForced { quiz_id });
        self.request_questions(quiz_id, LoadMode::Force);
    }

    //
    // ─── PERSISTENCE RESULTS ───────────────────────────────────────────────────
    //

    fn attempt_persisted(&mut self, attempt_id: AttemptId, result: Result<i64, String>) {
        self.pending_saves = self.pending_saves.saturating_sub(1);
        let current = self.state.attempt_id == Some(attempt_id);

        match result {
            Ok(id) => {
                log::info!("attempt {attempt_id} saved as #{id}");
                if current {
                    self.state.persistence = PersistenceStatus::Saved { id };
                }
                self.outbox.push(SessionEvent::AttemptSaved { attempt_id, id });
            }
            Err(message) => {
                log::warn!("attempt {attempt_id} was not saved: {message}");
                if current {
                    self.state.persistence = PersistenceStatus::Failed {
                        message: message.clone(),
                    };
                    self.state.issue = Some(SessionIssue::PersistenceFailure {
                        message: message.clone(),
                    });
                }
                self.outbox.push(SessionEvent::AttemptNotSaved {
                    attempt_id,
                    message,
                });
            }
        }
    }

    fn invalid(&self, operation: &'static str) -> SessionError {
        SessionError::InvalidStateTransition {
            operation,
            phase: self.phase(),
        }
    }
}

impl Drop for QuizSessionController {
    fn drop(&mut self) {
        self.cancel_fallback();
    }
}
