use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::services::catalog::{CatalogStore, Course, CourseId, LessonId, QuizId};
use crate::services::quiz::QuizResult;
use crate::services::EngineError;

/// Per-course learner state. At most one record per course; absence means
/// not enrolled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub course_id: CourseId,
    pub completed_lessons: BTreeSet<LessonId>,
    pub quiz_scores: BTreeMap<QuizId, QuizResult>,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

/// Course joined with its derived progress, the enrolled-courses view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    #[serde(flatten)]
    pub course: Course,
    pub progress_percent: f64,
    pub enrolled_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Enrollment,
    Lesson,
    Quiz,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_courses: usize,
    pub completed_courses: usize,
    /// Mean of the enrolled progress percents, rounded to whole percent.
    pub overall_progress: u32,
}

/// Owns every Progress record plus the recent-activity feed. All mutations
/// go through the single write lock, which serializes per-course updates.
pub struct ProgressTracker {
    catalog: Arc<CatalogStore>,
    clock: Arc<dyn Clock>,
    records: RwLock<HashMap<CourseId, Progress>>,
    activity: RwLock<VecDeque<ActivityEntry>>,
    max_activity: usize,
}

impl ProgressTracker {
    pub fn new(catalog: Arc<CatalogStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalog,
            clock,
            records: RwLock::new(HashMap::new()),
            activity: RwLock::new(VecDeque::new()),
            max_activity: 200,
        }
    }

    pub fn get(&self, course_id: CourseId) -> Option<Progress> {
        self.records.read().get(&course_id).cloned()
    }

    /// Idempotent: a second call returns the existing record unchanged.
    pub fn enroll(&self, course_id: CourseId) -> Result<Progress, EngineError> {
        let title = self.catalog.course(course_id)?.title.clone();

        let (progress, created) = {
            let mut records = self.records.write();
            if let Some(existing) = records.get(&course_id) {
                (existing.clone(), false)
            } else {
                let now = self.clock.now();
                let progress = Progress {
                    course_id,
                    completed_lessons: BTreeSet::new(),
                    quiz_scores: BTreeMap::new(),
                    enrolled_at: now,
                    last_accessed: now,
                };
                records.insert(course_id, progress.clone());
                (progress, true)
            }
        };

        if created {
            self.record_activity(
                ActivityKind::Enrollment,
                format!("Enrolled in course: {title}"),
            );
        }
        Ok(progress)
    }

    /// Set semantics: completing an already-completed lesson only refreshes
    /// the last-accessed stamp.
    pub fn complete_lesson(
        &self,
        course_id: CourseId,
        lesson_id: LessonId,
    ) -> Result<Progress, EngineError> {
        let (progress, newly_completed, lesson_title) = {
            let mut records = self.records.write();
            let record = records
                .get_mut(&course_id)
                .ok_or(EngineError::NotEnrolled { course_id })?;

            let course = self.catalog.course(course_id)?;
            let lesson = self
                .catalog
                .find_lesson(course, lesson_id)
                .ok_or_else(|| EngineError::not_found("lesson"))?;
            let lesson_title = lesson.title.clone();

            let newly_completed = record.completed_lessons.insert(lesson_id);
            record.last_accessed = self.clock.now();
            (record.clone(), newly_completed, lesson_title)
        };

        if newly_completed {
            self.record_activity(
                ActivityKind::Lesson,
                format!("Completed lesson: {lesson_title}"),
            );
        }
        Ok(progress)
    }

    /// Re-submission overwrites the prior result for that quiz.
    pub fn save_quiz_result(
        &self,
        course_id: CourseId,
        quiz_id: QuizId,
        result: QuizResult,
    ) -> Result<Progress, EngineError> {
        let (progress, description) = {
            let mut records = self.records.write();
            let record = records
                .get_mut(&course_id)
                .ok_or(EngineError::NotEnrolled { course_id })?;

            let quiz_title = self.catalog.quiz(quiz_id)?.title.clone();
            let description = if result.passed {
                format!("Passed quiz: {quiz_title}")
            } else {
                format!("Failed quiz: {quiz_title}")
            };

            record.quiz_scores.insert(quiz_id, result);
            record.last_accessed = self.clock.now();
            (record.clone(), description)
        };

        self.record_activity(ActivityKind::Quiz, description);
        Ok(progress)
    }

    /// Join of every Progress record with its course. Records whose course
    /// is missing from the catalog are dropped. Ordered by course id.
    pub fn enrolled_courses(&self) -> Vec<EnrolledCourse> {
        let records = self.records.read();
        let mut enrolled: Vec<EnrolledCourse> = records
            .values()
            .filter_map(|progress| {
                let course = self.catalog.course(progress.course_id).ok()?;
                let total = CatalogStore::total_lessons(course);
                let percent = if total > 0 {
                    progress.completed_lessons.len() as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                Some(EnrolledCourse {
                    course: course.clone(),
                    progress_percent: percent,
                    enrolled_at: progress.enrolled_at,
                    last_accessed: progress.last_accessed,
                })
            })
            .collect();
        enrolled.sort_by_key(|e| e.course.id);
        enrolled
    }

    pub fn summary(&self) -> DashboardSummary {
        let enrolled = self.enrolled_courses();
        let total_courses = enrolled.len();
        let completed_courses = enrolled
            .iter()
            .filter(|e| e.progress_percent >= 100.0)
            .count();
        let overall_progress = if total_courses > 0 {
            let mean: f64 =
                enrolled.iter().map(|e| e.progress_percent).sum::<f64>() / total_courses as f64;
            mean.round() as u32
        } else {
            0
        };
        DashboardSummary {
            total_courses,
            completed_courses,
            overall_progress,
        }
    }

    /// Newest first, up to `limit` entries.
    pub fn recent_activity(&self, limit: usize) -> Vec<ActivityEntry> {
        let activity = self.activity.read();
        activity.iter().take(limit).cloned().collect()
    }

    fn record_activity(&self, kind: ActivityKind, description: String) {
        let entry = ActivityEntry {
            kind,
            description,
            timestamp: self.clock.now(),
        };
        let mut activity = self.activity.write();
        activity.push_front(entry);
        while activity.len() > self.max_activity {
            activity.pop_back();
        }
    }

    #[cfg(test)]
    fn insert_record(&self, progress: Progress) {
        self.records.write().insert(progress.course_id, progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::services::catalog::{Course, Difficulty, Lesson, LessonKind, Module, Quiz};

    fn course(id: CourseId, lesson_ids: &[LessonId]) -> Course {
        Course {
            id,
            title: format!("Course {id}"),
            description: String::new(),
            instructor: "Sam Ortiz".to_string(),
            category: "Programming".to_string(),
            difficulty: Difficulty::Beginner,
            duration: 3,
            thumbnail: String::new(),
            modules: vec![Module {
                id: 1,
                title: "Module".to_string(),
                lessons: lesson_ids
                    .iter()
                    .map(|&id| Lesson {
                        id,
                        title: format!("Lesson {id}"),
                        kind: LessonKind::Video,
                        duration: 5,
                        video_url: String::new(),
                    })
                    .collect(),
            }],
        }
    }

    fn tracker() -> (ProgressTracker, Arc<ManualClock>) {
        let catalog = Arc::new(CatalogStore::new(
            vec![course(1, &[11, 12, 13]), course(2, &[21])],
            vec![Quiz {
                id: 5,
                lesson_id: 11,
                title: "Checkpoint".to_string(),
                questions: Vec::new(),
                passing_score: 70,
                time_per_question: 30,
            }],
        ));
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        (
            ProgressTracker::new(catalog, Arc::clone(&clock) as Arc<dyn Clock>),
            clock,
        )
    }

    fn passing_result() -> QuizResult {
        QuizResult {
            score: 80,
            passed: true,
            answers: BTreeMap::new(),
        }
    }

    #[test]
    fn enroll_is_idempotent() {
        let (tracker, clock) = tracker();
        let first = tracker.enroll(1).unwrap();
        clock.advance(chrono::Duration::hours(1));
        let second = tracker.enroll(1).unwrap();
        assert_eq!(first.enrolled_at, second.enrolled_at);
        assert_eq!(first.last_accessed, second.last_accessed);
    }

    #[test]
    fn enroll_unknown_course_fails() {
        let (tracker, _) = tracker();
        assert_eq!(
            tracker.enroll(99).unwrap_err(),
            EngineError::not_found("course")
        );
    }

    #[test]
    fn complete_lesson_requires_enrollment() {
        let (tracker, _) = tracker();
        assert_eq!(
            tracker.complete_lesson(1, 11).unwrap_err(),
            EngineError::NotEnrolled { course_id: 1 }
        );
        assert!(tracker.get(1).is_none());
    }

    #[test]
    fn complete_lesson_has_set_semantics() {
        let (tracker, clock) = tracker();
        tracker.enroll(1).unwrap();
        let first = tracker.complete_lesson(1, 11).unwrap();
        assert_eq!(first.completed_lessons.len(), 1);

        clock.advance(chrono::Duration::minutes(5));
        let second = tracker.complete_lesson(1, 11).unwrap();
        assert_eq!(second.completed_lessons.len(), 1);
        assert!(second.last_accessed > first.last_accessed);
    }

    #[test]
    fn complete_unknown_lesson_fails_without_mutation() {
        let (tracker, _) = tracker();
        tracker.enroll(1).unwrap();
        assert_eq!(
            tracker.complete_lesson(1, 999).unwrap_err(),
            EngineError::not_found("lesson")
        );
        assert!(tracker.get(1).unwrap().completed_lessons.is_empty());
    }

    #[test]
    fn completing_all_lessons_reaches_exactly_100() {
        let (tracker, _) = tracker();
        tracker.enroll(1).unwrap();
        for lesson in [11, 12, 13] {
            tracker.complete_lesson(1, lesson).unwrap();
        }
        let enrolled = tracker.enrolled_courses();
        assert_eq!(enrolled[0].progress_percent, 100.0);
    }

    #[test]
    fn save_quiz_result_requires_enrollment_and_leaves_no_record() {
        let (tracker, _) = tracker();
        assert_eq!(
            tracker.save_quiz_result(1, 5, passing_result()).unwrap_err(),
            EngineError::NotEnrolled { course_id: 1 }
        );
        assert!(tracker.get(1).is_none());
    }

    #[test]
    fn save_quiz_result_overwrites_prior_result() {
        let (tracker, _) = tracker();
        tracker.enroll(1).unwrap();
        tracker.save_quiz_result(1, 5, passing_result()).unwrap();

        let retake = QuizResult {
            score: 40,
            passed: false,
            answers: BTreeMap::new(),
        };
        let progress = tracker.save_quiz_result(1, 5, retake).unwrap();
        assert_eq!(progress.quiz_scores.len(), 1);
        assert_eq!(progress.quiz_scores[&5].score, 40);
        assert!(!progress.quiz_scores[&5].passed);
    }

    #[test]
    fn enrolled_view_drops_records_for_missing_courses() {
        let (tracker, clock) = tracker();
        tracker.enroll(1).unwrap();
        let now = clock.now();
        tracker.insert_record(Progress {
            course_id: 999,
            completed_lessons: BTreeSet::new(),
            quiz_scores: BTreeMap::new(),
            enrolled_at: now,
            last_accessed: now,
        });

        let enrolled = tracker.enrolled_courses();
        assert_eq!(enrolled.len(), 1);
        assert_eq!(enrolled[0].course.id, 1);
    }

    #[test]
    fn summary_averages_progress_and_rounds() {
        let (tracker, _) = tracker();
        tracker.enroll(1).unwrap();
        tracker.enroll(2).unwrap();
        tracker.complete_lesson(1, 11).unwrap();
        tracker.complete_lesson(2, 21).unwrap();

        // course 1 at 1/3, course 2 at 100 percent
        let summary = tracker.summary();
        assert_eq!(summary.total_courses, 2);
        assert_eq!(summary.completed_courses, 1);
        assert_eq!(summary.overall_progress, 67);
    }

    #[test]
    fn activity_feed_is_newest_first_and_worded_like_the_dashboard() {
        let (tracker, clock) = tracker();
        tracker.enroll(1).unwrap();
        clock.advance(chrono::Duration::minutes(1));
        tracker.complete_lesson(1, 11).unwrap();
        clock.advance(chrono::Duration::minutes(1));
        tracker.save_quiz_result(1, 5, passing_result()).unwrap();

        let feed = tracker.recent_activity(10);
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[0].kind, ActivityKind::Quiz);
        assert_eq!(feed[0].description, "Passed quiz: Checkpoint");
        assert_eq!(feed[1].description, "Completed lesson: Lesson 11");
        assert_eq!(feed[2].description, "Enrolled in course: Course 1");
    }

    #[test]
    fn duplicate_completion_does_not_repeat_activity() {
        let (tracker, _) = tracker();
        tracker.enroll(1).unwrap();
        tracker.complete_lesson(1, 11).unwrap();
        tracker.complete_lesson(1, 11).unwrap();
        let lessons = tracker
            .recent_activity(10)
            .into_iter()
            .filter(|e| e.kind == ActivityKind::Lesson)
            .count();
        assert_eq!(lessons, 1);
    }
}
