use serde::{Deserialize, Serialize};

use crate::services::EngineError;

pub type CourseId = u32;
pub type ModuleId = u32;
pub type LessonId = u32;
pub type QuizId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    pub description: String,
    pub instructor: String,
    pub category: String,
    pub difficulty: Difficulty,
    /// Total length in hours.
    pub duration: u32,
    pub thumbnail: String,
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub id: ModuleId,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonKind {
    Video,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: LessonId,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: LessonKind,
    /// Length in minutes.
    pub duration: u32,
    pub video_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: QuizId,
    pub lesson_id: LessonId,
    pub title: String,
    pub questions: Vec<Question>,
    pub passing_score: u32,
    /// Countdown per question in seconds. Absent in fixtures means 30.
    #[serde(default = "default_time_per_question")]
    pub time_per_question: u32,
}

fn default_time_per_question() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
}

/// Combined catalog filter. Every field is optional; set fields compose
/// with AND, results keep catalog order.
#[derive(Debug, Clone, Default)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub duration: Option<DurationBand>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationBand {
    UpToTwo,
    TwoToFive,
    FiveToTen,
    OverTen,
}

impl DurationBand {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "0-2" => Some(Self::UpToTwo),
            "2-5" => Some(Self::TwoToFive),
            "5-10" => Some(Self::FiveToTen),
            "10+" => Some(Self::OverTen),
            _ => None,
        }
    }

    fn matches(self, hours: u32) -> bool {
        match self {
            Self::UpToTwo => hours <= 2,
            Self::TwoToFive => hours > 2 && hours <= 5,
            Self::FiveToTen => hours > 5 && hours <= 10,
            Self::OverTen => hours > 10,
        }
    }
}

/// Course and quiz bank. Immutable once seeded, so reads take no lock.
pub struct CatalogStore {
    courses: Vec<Course>,
    quizzes: Vec<Quiz>,
}

impl CatalogStore {
    pub fn new(courses: Vec<Course>, quizzes: Vec<Quiz>) -> Self {
        Self { courses, quizzes }
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn course(&self, course_id: CourseId) -> Result<&Course, EngineError> {
        self.courses
            .iter()
            .find(|c| c.id == course_id)
            .ok_or_else(|| EngineError::not_found("course"))
    }

    pub fn quiz(&self, quiz_id: QuizId) -> Result<&Quiz, EngineError> {
        self.quizzes
            .iter()
            .find(|q| q.id == quiz_id)
            .ok_or_else(|| EngineError::not_found("quiz"))
    }

    /// A lesson may have no quiz attached; that is not an error.
    pub fn quiz_for_lesson(&self, lesson_id: LessonId) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.lesson_id == lesson_id)
    }

    /// Progress and notes reference lessons by id only, so resolution walks
    /// the course's module tree.
    pub fn find_lesson<'a>(&self, course: &'a Course, lesson_id: LessonId) -> Option<&'a Lesson> {
        course
            .modules
            .iter()
            .flat_map(|m| m.lessons.iter())
            .find(|l| l.id == lesson_id)
    }

    pub fn total_lessons(course: &Course) -> usize {
        course.modules.iter().map(|m| m.lessons.len()).sum()
    }

    pub fn search(&self, query: &CatalogQuery) -> Vec<&Course> {
        let term = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        self.courses
            .iter()
            .filter(|course| {
                let matches_search = term.as_deref().map_or(true, |t| {
                    course.title.to_lowercase().contains(t)
                        || course.description.to_lowercase().contains(t)
                        || course.instructor.to_lowercase().contains(t)
                });
                let matches_category = query
                    .category
                    .as_deref()
                    .map_or(true, |c| course.category == c);
                let matches_difficulty = query
                    .difficulty
                    .map_or(true, |d| course.difficulty == d);
                let matches_duration = query
                    .duration
                    .map_or(true, |band| band.matches(course.duration));

                matches_search && matches_category && matches_difficulty && matches_duration
            })
            .collect()
    }
}
