use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::clock::Clock;
use crate::services::catalog::{CourseId, Question, Quiz, QuizId};
use crate::services::EngineError;

/// Outcome of one attempt, the only state that outlives a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    /// Whole-percent score, 0..=100.
    pub score: u32,
    pub passed: bool,
    /// Question index to chosen option index; unanswered questions are absent.
    pub answers: BTreeMap<usize, usize>,
}

/// `round(100 * correct / total)`, 0 for an empty quiz. A question counts as
/// correct only when the recorded option equals its designated answer.
pub fn score_answers(questions: &[Question], answers: &BTreeMap<usize, usize>) -> u32 {
    if questions.is_empty() {
        return 0;
    }
    let correct = questions
        .iter()
        .enumerate()
        .filter(|(index, question)| answers.get(index) == Some(&question.correct_answer))
        .count();
    (correct as f64 / questions.len() as f64 * 100.0).round() as u32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    InProgress,
    Finished,
}

#[derive(Debug, Clone)]
enum SessionPhase {
    InProgress {
        question_index: usize,
        remaining_seconds: u32,
    },
    Finished {
        score: u32,
        passed: bool,
    },
}

/// Countdown/answer state machine for a single attempt. Pure state: the
/// ticking itself lives in [`QuizSessionService`].
#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    course_id: CourseId,
    quiz: Arc<Quiz>,
    phase: SessionPhase,
    answers: BTreeMap<usize, usize>,
    touched_at: DateTime<Utc>,
}

impl QuizSession {
    fn new(quiz: Arc<Quiz>, course_id: CourseId, now: DateTime<Utc>) -> Self {
        let mut session = Self {
            id: Uuid::new_v4(),
            course_id,
            phase: SessionPhase::InProgress {
                question_index: 0,
                remaining_seconds: quiz.time_per_question,
            },
            quiz,
            answers: BTreeMap::new(),
            touched_at: now,
        };
        // A quiz without questions has nothing to ask.
        if session.quiz.questions.is_empty() {
            session.finish();
        }
        session
    }

    /// Records or overwrites the chosen option. Silent no-op once finished.
    fn select_answer(&mut self, question_index: usize, option_index: usize) -> Result<(), EngineError> {
        if matches!(self.phase, SessionPhase::Finished { .. }) {
            return Ok(());
        }
        let question = self
            .quiz
            .questions
            .get(question_index)
            .ok_or_else(|| EngineError::validation("question index out of range"))?;
        if option_index >= question.options.len() {
            return Err(EngineError::validation("option index out of range"));
        }
        self.answers.insert(question_index, option_index);
        Ok(())
    }

    /// Guarded "Next": the current question must have a recorded answer.
    fn advance(&mut self) -> Result<(), EngineError> {
        match self.phase {
            SessionPhase::Finished { .. } => {
                Err(EngineError::validation("quiz session already finished"))
            }
            SessionPhase::InProgress { question_index, .. } => {
                if !self.answers.contains_key(&question_index) {
                    return Err(EngineError::validation(
                        "current question has no recorded answer",
                    ));
                }
                self.force_advance();
                Ok(())
            }
        }
    }

    /// The timeout path: same movement as `advance` without the answered
    /// guard, so an unanswered question stays unanswered.
    fn force_advance(&mut self) {
        if let SessionPhase::InProgress { question_index, .. } = self.phase {
            if question_index + 1 < self.quiz.questions.len() {
                self.phase = SessionPhase::InProgress {
                    question_index: question_index + 1,
                    remaining_seconds: self.quiz.time_per_question,
                };
            } else {
                self.finish();
            }
        }
    }

    /// No-op on the first question; resets the countdown otherwise.
    fn retreat(&mut self) -> Result<(), EngineError> {
        match self.phase {
            SessionPhase::Finished { .. } => {
                Err(EngineError::validation("quiz session already finished"))
            }
            SessionPhase::InProgress { question_index, .. } => {
                if question_index > 0 {
                    self.phase = SessionPhase::InProgress {
                        question_index: question_index - 1,
                        remaining_seconds: self.quiz.time_per_question,
                    };
                }
                Ok(())
            }
        }
    }

    /// One elapsed time unit. Reaching zero auto-advances. Returns whether
    /// the session is still in progress afterwards.
    fn tick(&mut self) -> bool {
        let hit_zero = match &mut self.phase {
            SessionPhase::InProgress {
                remaining_seconds, ..
            } => {
                *remaining_seconds = remaining_seconds.saturating_sub(1);
                *remaining_seconds == 0
            }
            SessionPhase::Finished { .. } => return false,
        };
        if hit_zero {
            self.force_advance();
        }
        matches!(self.phase, SessionPhase::InProgress { .. })
    }

    fn finish(&mut self) {
        let score = score_answers(&self.quiz.questions, &self.answers);
        self.phase = SessionPhase::Finished {
            score,
            passed: score >= self.quiz.passing_score,
        };
    }

    fn view(&self) -> QuizSessionView {
        let (status, question_index, remaining_seconds, score, passed) = match self.phase {
            SessionPhase::InProgress {
                question_index,
                remaining_seconds,
            } => (
                SessionStatus::InProgress,
                Some(question_index),
                Some(remaining_seconds),
                None,
                None,
            ),
            SessionPhase::Finished { score, passed } => {
                (SessionStatus::Finished, None, None, Some(score), Some(passed))
            }
        };
        QuizSessionView {
            id: self.id,
            quiz_id: self.quiz.id,
            course_id: self.course_id,
            status,
            total_questions: self.quiz.questions.len(),
            question_index,
            remaining_seconds,
            answers: self.answers.clone(),
            score,
            passed,
        }
    }
}

/// Client-facing snapshot. Question bodies are not repeated here; the
/// client fetched the quiz itself already.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSessionView {
    pub id: Uuid,
    pub quiz_id: QuizId,
    pub course_id: CourseId,
    pub status: SessionStatus,
    pub total_questions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u32>,
    pub answers: BTreeMap<usize, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

/// What `submit` hands back for recording: the result plus the pair of ids
/// it belongs to.
#[derive(Debug, Clone)]
pub struct CompletedAttempt {
    pub course_id: CourseId,
    pub quiz_id: QuizId,
    pub result: QuizResult,
}

/// Owns live sessions and one ticker task per in-progress session. Tickers
/// stop on their own when a session finishes and are aborted on
/// submit/abandon/sweep, so no tick ever lands on a finished session.
pub struct QuizSessionService {
    clock: Arc<dyn Clock>,
    sessions: RwLock<HashMap<Uuid, QuizSession>>,
    tickers: Mutex<HashMap<Uuid, JoinHandle<()>>>,
    tick_period: Duration,
    // Handle to ourselves for the ticker tasks. Only `None`-upgrading once
    // the last outside Arc is gone, at which point no ticker should start.
    me: Weak<QuizSessionService>,
}

impl QuizSessionService {
    pub fn new(clock: Arc<dyn Clock>) -> Arc<Self> {
        Self::with_tick_period(clock, Duration::from_secs(1))
    }

    /// Tick period is one wall second in production; tests shrink it.
    pub fn with_tick_period(clock: Arc<dyn Clock>, tick_period: Duration) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            clock,
            sessions: RwLock::new(HashMap::new()),
            tickers: Mutex::new(HashMap::new()),
            tick_period,
            me: me.clone(),
        })
    }

    pub fn start(&self, quiz: Quiz, course_id: CourseId) -> QuizSessionView {
        let session = QuizSession::new(Arc::new(quiz), course_id, self.clock.now());
        let id = session.id;
        let view = session.view();
        let in_progress = matches!(session.phase, SessionPhase::InProgress { .. });

        self.sessions.write().insert(id, session);
        if in_progress {
            self.spawn_ticker(id);
        }
        view
    }

    /// Also refreshes the staleness stamp: a polling client counts as alive.
    pub fn get(&self, session_id: Uuid) -> Result<QuizSessionView, EngineError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| EngineError::not_found("quiz session"))?;
        session.touched_at = self.clock.now();
        Ok(session.view())
    }

    pub fn select_answer(
        &self,
        session_id: Uuid,
        question_index: usize,
        option_index: usize,
    ) -> Result<QuizSessionView, EngineError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| EngineError::not_found("quiz session"))?;
        session.select_answer(question_index, option_index)?;
        session.touched_at = self.clock.now();
        Ok(session.view())
    }

    pub fn advance(&self, session_id: Uuid) -> Result<QuizSessionView, EngineError> {
        let view = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .get_mut(&session_id)
                .ok_or_else(|| EngineError::not_found("quiz session"))?;
            session.advance()?;
            session.touched_at = self.clock.now();
            session.view()
        };
        if view.status == SessionStatus::Finished {
            self.stop_ticker(session_id);
        }
        Ok(view)
    }

    pub fn retreat(&self, session_id: Uuid) -> Result<QuizSessionView, EngineError> {
        let mut sessions = self.sessions.write();
        let session = sessions
            .get_mut(&session_id)
            .ok_or_else(|| EngineError::not_found("quiz session"))?;
        session.retreat()?;
        session.touched_at = self.clock.now();
        Ok(session.view())
    }

    /// Hands the finished result over and discards the session. Submitting
    /// an in-progress session is rejected.
    pub fn submit(&self, session_id: Uuid) -> Result<CompletedAttempt, EngineError> {
        let attempt = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .remove(&session_id)
                .ok_or_else(|| EngineError::not_found("quiz session"))?;
            match session.phase {
                SessionPhase::InProgress { .. } => {
                    sessions.insert(session_id, session);
                    return Err(EngineError::validation("quiz session is still in progress"));
                }
                SessionPhase::Finished { score, passed } => CompletedAttempt {
                    course_id: session.course_id,
                    quiz_id: session.quiz.id,
                    result: QuizResult {
                        score,
                        passed,
                        answers: session.answers,
                    },
                },
            }
        };
        self.stop_ticker(session_id);
        Ok(attempt)
    }

    /// Tears the session down and returns its last snapshot.
    pub fn abandon(&self, session_id: Uuid) -> Result<QuizSessionView, EngineError> {
        let view = {
            let mut sessions = self.sessions.write();
            let session = sessions
                .remove(&session_id)
                .ok_or_else(|| EngineError::not_found("quiz session"))?;
            session.view()
        };
        self.stop_ticker(session_id);
        Ok(view)
    }

    /// Removes sessions with no client contact for `older_than` and stops
    /// their tickers. Ticks do not count as contact, so an in-progress
    /// session whose client is gone is reaped as well.
    pub fn sweep_stale(&self, older_than: chrono::Duration) -> usize {
        let cutoff = self.clock.now() - older_than;
        let stale: Vec<Uuid> = {
            let mut sessions = self.sessions.write();
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, s)| s.touched_at <= cutoff)
                .map(|(id, _)| *id)
                .collect();
            for id in &ids {
                sessions.remove(id);
            }
            ids
        };
        for id in &stale {
            self.stop_ticker(*id);
        }
        stale.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    fn tick(&self, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.write();
        match sessions.get_mut(&session_id) {
            Some(session) => session.tick(),
            None => false,
        }
    }

    fn spawn_ticker(&self, session_id: Uuid) {
        let Some(service) = self.me.upgrade() else {
            return;
        };
        let period = self.tick_period;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // completes immediately
            loop {
                interval.tick().await;
                if !service.tick(session_id) {
                    break;
                }
            }
            service.tickers.lock().remove(&session_id);
        });
        self.tickers.lock().insert(session_id, handle);
    }

    fn stop_ticker(&self, session_id: Uuid) {
        if let Some(handle) = self.tickers.lock().remove(&session_id) {
            handle.abort();
        }
    }

    #[cfg(test)]
    fn ticker_count(&self) -> usize {
        self.tickers.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, SystemClock};

    fn question(prompt: &str, correct: usize) -> Question {
        Question {
            question: prompt.to_string(),
            options: vec![
                "A".to_string(),
                "B".to_string(),
                "C".to_string(),
                "D".to_string(),
            ],
            correct_answer: correct,
        }
    }

    fn quiz(questions: Vec<Question>, passing_score: u32, time_per_question: u32) -> Quiz {
        Quiz {
            id: 1,
            lesson_id: 10,
            title: "Checkpoint".to_string(),
            questions,
            passing_score,
            time_per_question,
        }
    }

    fn four_question_quiz() -> Quiz {
        quiz(
            vec![
                question("q0", 0),
                question("q1", 1),
                question("q2", 2),
                question("q3", 3),
            ],
            70,
            30,
        )
    }

    fn session(quiz: Quiz) -> QuizSession {
        QuizSession::new(Arc::new(quiz), 1, Utc::now())
    }

    #[test]
    fn three_of_four_correct_scores_75() {
        let quiz = four_question_quiz();
        let mut answers = BTreeMap::new();
        answers.insert(0, 0);
        answers.insert(1, 1);
        answers.insert(2, 9);
        answers.insert(3, 3);
        assert_eq!(score_answers(&quiz.questions, &answers), 75);
    }

    #[test]
    fn unanswered_counts_as_incorrect() {
        let quiz = four_question_quiz();
        let mut answers = BTreeMap::new();
        answers.insert(0, 0);
        assert_eq!(score_answers(&quiz.questions, &answers), 25);
    }

    #[test]
    fn empty_quiz_scores_zero() {
        assert_eq!(score_answers(&[], &BTreeMap::new()), 0);
    }

    #[test]
    fn advance_requires_an_answer() {
        let mut s = session(four_question_quiz());
        assert!(s.advance().is_err());
        s.select_answer(0, 2).unwrap();
        s.advance().unwrap();
        match s.phase {
            SessionPhase::InProgress { question_index, remaining_seconds } => {
                assert_eq!(question_index, 1);
                assert_eq!(remaining_seconds, 30);
            }
            SessionPhase::Finished { .. } => panic!("should still be in progress"),
        }
    }

    #[test]
    fn select_answer_overwrites_and_ignores_finished() {
        let mut s = session(quiz(vec![question("q0", 1)], 50, 30));
        s.select_answer(0, 0).unwrap();
        s.select_answer(0, 1).unwrap();
        s.advance().unwrap();
        assert!(matches!(s.phase, SessionPhase::Finished { score: 100, passed: true }));

        // finished: recording is a no-op, not an error
        s.select_answer(0, 0).unwrap();
        assert_eq!(s.answers[&0], 1);
    }

    #[test]
    fn select_answer_rejects_out_of_range_indices() {
        let mut s = session(four_question_quiz());
        assert!(s.select_answer(9, 0).is_err());
        assert!(s.select_answer(0, 9).is_err());
    }

    #[test]
    fn retreat_is_noop_on_first_question_and_resets_countdown() {
        let mut s = session(four_question_quiz());
        s.retreat().unwrap();
        assert!(matches!(
            s.phase,
            SessionPhase::InProgress { question_index: 0, .. }
        ));

        s.select_answer(0, 0).unwrap();
        s.advance().unwrap();
        for _ in 0..5 {
            s.tick();
        }
        s.retreat().unwrap();
        match s.phase {
            SessionPhase::InProgress { question_index, remaining_seconds } => {
                assert_eq!(question_index, 0);
                assert_eq!(remaining_seconds, 30);
            }
            SessionPhase::Finished { .. } => panic!("should still be in progress"),
        }
    }

    #[test]
    fn countdown_expiry_advances_without_an_answer() {
        let mut s = session(quiz(vec![question("q0", 0), question("q1", 1)], 50, 3));
        assert!(s.tick());
        assert!(s.tick());
        assert!(s.tick()); // hits zero, moves on
        match s.phase {
            SessionPhase::InProgress { question_index, remaining_seconds } => {
                assert_eq!(question_index, 1);
                assert_eq!(remaining_seconds, 3);
            }
            SessionPhase::Finished { .. } => panic!("should be on the second question"),
        }
        assert!(!s.answers.contains_key(&0));
    }

    #[test]
    fn countdown_expiry_on_last_question_finishes() {
        let mut s = session(quiz(vec![question("q0", 0)], 50, 2));
        s.select_answer(0, 0).unwrap();
        assert!(s.tick());
        assert!(!s.tick());
        assert!(matches!(
            s.phase,
            SessionPhase::Finished { score: 100, passed: true }
        ));
        assert!(!s.tick());
    }

    #[test]
    fn zero_question_quiz_finishes_immediately_with_zero_score() {
        let s = session(quiz(Vec::new(), 70, 30));
        assert!(matches!(
            s.phase,
            SessionPhase::Finished { score: 0, passed: false }
        ));
    }

    #[test]
    fn passed_tracks_the_passing_score() {
        let mut s = session(quiz(vec![question("q0", 0), question("q1", 1)], 50, 30));
        s.select_answer(0, 0).unwrap();
        s.select_answer(1, 3).unwrap();
        s.advance().unwrap();
        s.advance().unwrap();
        assert!(matches!(
            s.phase,
            SessionPhase::Finished { score: 50, passed: true }
        ));
    }

    fn service() -> Arc<QuizSessionService> {
        QuizSessionService::with_tick_period(Arc::new(SystemClock), Duration::from_millis(10))
    }

    #[tokio::test]
    async fn ticker_drives_the_countdown_to_auto_advance() {
        let service = service();
        let view = service.start(quiz(vec![question("q0", 0), question("q1", 1)], 50, 2), 1);
        assert_eq!(view.question_index, Some(0));

        tokio::time::sleep(Duration::from_millis(250)).await;
        let view = service.get(view.id).unwrap();
        // two fast ticks per question; by now the first expired unanswered
        assert!(
            view.question_index >= Some(1) || view.status == SessionStatus::Finished,
            "countdown never advanced: {view:?}"
        );
    }

    #[tokio::test]
    async fn ticker_exits_after_the_session_finishes() {
        let service = service();
        let view = service.start(quiz(vec![question("q0", 0)], 50, 1), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let after = service.get(view.id).unwrap();
        assert_eq!(after.status, SessionStatus::Finished);
        assert_eq!(after.score, Some(0));
        assert_eq!(service.ticker_count(), 0);
    }

    #[tokio::test]
    async fn submit_returns_the_result_and_discards_the_session() {
        let service = service();
        let quiz = quiz(vec![question("q0", 2)], 50, 600);
        let view = service.start(quiz, 7);

        service.select_answer(view.id, 0, 2).unwrap();
        let finished = service.advance(view.id).unwrap();
        assert_eq!(finished.status, SessionStatus::Finished);

        let attempt = service.submit(view.id).unwrap();
        assert_eq!(attempt.course_id, 7);
        assert_eq!(attempt.quiz_id, 1);
        assert_eq!(attempt.result.score, 100);
        assert!(attempt.result.passed);
        assert_eq!(attempt.result.answers[&0], 2);

        assert_eq!(
            service.get(view.id).unwrap_err(),
            EngineError::not_found("quiz session")
        );
        assert_eq!(service.session_count(), 0);
    }

    #[tokio::test]
    async fn submit_rejects_an_in_progress_session() {
        let service = service();
        let view = service.start(four_question_quiz(), 1);
        let err = service.submit(view.id).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert_eq!(service.session_count(), 1);
    }

    #[tokio::test]
    async fn abandon_removes_the_session_and_its_ticker() {
        let service = service();
        let view = service.start(four_question_quiz(), 1);
        service.abandon(view.id).unwrap();
        assert_eq!(service.session_count(), 0);
        assert_eq!(service.ticker_count(), 0);
        assert!(service.abandon(view.id).is_err());
    }

    #[tokio::test]
    async fn sweep_reaps_only_untouched_sessions() {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let service = QuizSessionService::with_tick_period(
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::from_secs(3600),
        );

        let old = service.start(four_question_quiz(), 1);
        clock.advance(chrono::Duration::minutes(45));
        let fresh = service.start(four_question_quiz(), 2);

        let removed = service.sweep_stale(chrono::Duration::minutes(30));
        assert_eq!(removed, 1);
        assert!(service.get(old.id).is_err());
        assert!(service.get(fresh.id).is_ok());
    }
}
