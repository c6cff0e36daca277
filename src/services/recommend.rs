use std::collections::HashSet;

use crate::services::catalog::{Course, CourseId, Difficulty};
use crate::services::progress::EnrolledCourse;

pub const MAX_RECOMMENDATIONS: usize = 6;

/// Course shortlist derived from what the learner has finished. Plain
/// filter in catalog order, first matches win; a course matching both the
/// category rule and the difficulty rule gets no extra weight.
pub fn recommend_courses(catalog: &[Course], enrolled: &[EnrolledCourse]) -> Vec<Course> {
    let enrolled_ids: HashSet<CourseId> = enrolled.iter().map(|e| e.course.id).collect();
    let completed: Vec<&EnrolledCourse> = enrolled
        .iter()
        .filter(|e| e.progress_percent >= 100.0)
        .collect();

    // Nothing finished yet: suggest entry-level courses.
    if completed.is_empty() {
        return catalog
            .iter()
            .filter(|c| c.difficulty == Difficulty::Beginner && !enrolled_ids.contains(&c.id))
            .take(MAX_RECOMMENDATIONS)
            .cloned()
            .collect();
    }

    let completed_categories: HashSet<&str> = completed
        .iter()
        .map(|e| e.course.category.as_str())
        .collect();
    let has_intermediate = completed
        .iter()
        .any(|e| e.course.difficulty == Difficulty::Intermediate);
    let has_advanced = completed
        .iter()
        .any(|e| e.course.difficulty == Difficulty::Advanced);

    catalog
        .iter()
        .filter(|course| {
            if enrolled_ids.contains(&course.id) {
                return false;
            }
            let familiar_category = completed_categories.contains(course.category.as_str());
            let next_difficulty_step = match course.difficulty {
                Difficulty::Intermediate => !has_intermediate,
                Difficulty::Advanced => has_intermediate && !has_advanced,
                Difficulty::Beginner => completed.len() < 2,
            };
            familiar_category || next_difficulty_step
        })
        .take(MAX_RECOMMENDATIONS)
        .cloned()
        .collect()
}
