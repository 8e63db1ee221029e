//! Training module progress
//!
//! Each module's progress is one serializable state value. Events move it
//! forward through `ModuleProgress::apply`, which never touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub const DEFAULT_MIN_VIDEO_WATCH_PERCENT: u8 = 95;
pub const DEFAULT_PASS_SCORE: u8 = 75;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    #[error("unknown training module: {0}")]
    UnknownModule(String),

    #[error("'{title}' is not a {kind} in module {module_id}")]
    UnknownItem {
        module_id: String,
        kind: &'static str,
        title: String,
    },

    #[error("{field} must be between 0 and 100 (got {value})")]
    OutOfRange { field: &'static str, value: u8 },
}

/// Checklist definition for a training module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDefinition {
    pub id: String,
    pub title: String,
    /// Mandatory videos
    pub videos: Vec<String>,
    pub readings: Vec<String>,
    /// Assignments, including quizzes
    pub assignments: Vec<String>,
    /// Watch percentage at which a video counts as complete (85-95)
    pub min_video_watch_percent: u8,
    pub pass_score: u8,
}

impl ModuleDefinition {
    pub fn total_items(&self) -> usize {
        self.videos.len() + self.readings.len() + self.assignments.len()
    }

    fn ensure_known(&self, kind: &'static str, items: &[String], title: &str) -> Result<(), ProgressError> {
        if items.iter().any(|t| t == title) {
            Ok(())
        } else {
            Err(ProgressError::UnknownItem {
                module_id: self.id.clone(),
                kind,
                title: title.to_string(),
            })
        }
    }
}

/// A learner action against a module
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    VideoProgress { title: String, percentage: u8 },
    ReadingCompleted { title: String },
    QuizSubmitted { title: String, score: u8 },
    AssignmentSubmitted { title: String },
}

/// Learner state for one module
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModuleProgress {
    #[serde(default)]
    pub videos_watched: BTreeMap<String, u8>,
    #[serde(default)]
    pub readings_completed: BTreeSet<String>,
    #[serde(default)]
    pub quiz_scores: BTreeMap<String, u8>,
    #[serde(default)]
    pub assignments_submitted: BTreeSet<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ModuleProgress {
    /// Apply an event, returning the next state
    pub fn apply(
        mut self,
        module: &ModuleDefinition,
        event: &ProgressEvent,
        at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        match event {
            ProgressEvent::VideoProgress { title, percentage } => {
                module.ensure_known("video", &module.videos, title)?;
                check_percent("percentage", *percentage)?;
                let watched = self.videos_watched.entry(title.clone()).or_insert(0);
                *watched = (*watched).max(*percentage);
            }
            ProgressEvent::ReadingCompleted { title } => {
                module.ensure_known("reading", &module.readings, title)?;
                self.readings_completed.insert(title.clone());
            }
            ProgressEvent::QuizSubmitted { title, score } => {
                module.ensure_known("assignment", &module.assignments, title)?;
                check_percent("score", *score)?;
                self.quiz_scores.insert(title.clone(), *score);
                if *score >= module.pass_score {
                    self.assignments_submitted.insert(title.clone());
                }
            }
            ProgressEvent::AssignmentSubmitted { title } => {
                module.ensure_known("assignment", &module.assignments, title)?;
                self.assignments_submitted.insert(title.clone());
            }
        }

        self.updated_at = Some(at);
        Ok(self)
    }

    pub fn summarize(&self, module: &ModuleDefinition) -> ProgressSummary {
        let videos_completed = module
            .videos
            .iter()
            .filter(|v| {
                self.videos_watched.get(*v).copied().unwrap_or(0) >= module.min_video_watch_percent
            })
            .count();
        let readings_completed = module
            .readings
            .iter()
            .filter(|r| self.readings_completed.contains(*r))
            .count();
        let assignments_completed = module
            .assignments
            .iter()
            .filter(|a| self.assignments_submitted.contains(*a))
            .count();

        let total = module.total_items();
        let completed = videos_completed + readings_completed + assignments_completed;
        let percentage = completion_percentage(completed, total);

        ProgressSummary {
            module_id: module.id.clone(),
            percentage,
            complete: total > 0 && completed == total,
            videos_completed,
            videos_total: module.videos.len(),
            readings_completed,
            readings_total: module.readings.len(),
            assignments_completed,
            assignments_total: module.assignments.len(),
        }
    }
}

fn check_percent(field: &'static str, value: u8) -> Result<(), ProgressError> {
    if value > 100 {
        return Err(ProgressError::OutOfRange { field, value });
    }
    Ok(())
}

/// `round(completed / total * 100)`, 0 for an empty checklist
pub fn completion_percentage(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProgressSummary {
    pub module_id: String,
    pub percentage: u8,
    pub complete: bool,
    pub videos_completed: usize,
    pub videos_total: usize,
    pub readings_completed: usize,
    pub readings_total: usize,
    pub assignments_completed: usize,
    pub assignments_total: usize,
}

/// Response DTO for a module's progress
#[derive(Debug, Clone, Serialize)]
pub struct ModuleProgressResponse {
    pub progress: ModuleProgress,
    pub summary: ProgressSummary,
}

/// Built-in onboarding catalogue
#[derive(Debug, Clone)]
pub struct ModuleCatalog {
    modules: Vec<ModuleDefinition>,
}

impl ModuleCatalog {
    pub fn new(modules: Vec<ModuleDefinition>) -> Self {
        Self { modules }
    }

    pub fn onboarding_program() -> Self {
        fn titles(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self::new(vec![
            ModuleDefinition {
                id: "day-1".into(),
                title: "Welcome & Australian Legal Framework".into(),
                videos: titles(&[
                    "Welcome to National Recovery Partners",
                    "Australian Consumer Law for Contractors",
                    "Dealing with Vulnerable Consumers",
                ]),
                readings: titles(&[
                    "Competition and Consumer Act 2010 - Key Sections",
                    "Unfair Contract Terms Guide",
                ]),
                assignments: titles(&["ACL Compliance Self-Audit", "Consumer Rights Quiz"]),
                min_video_watch_percent: DEFAULT_MIN_VIDEO_WATCH_PERCENT,
                pass_score: 80,
            },
            ModuleDefinition {
                id: "day-2".into(),
                title: "Insurance Contracts Act & Section 54 Rights".into(),
                videos: titles(&[
                    "Section 54 Insurance Contracts Act Explained",
                    "Managing Insurance Authorisations",
                    "Cash Settlement vs Replacement",
                ]),
                readings: titles(&[
                    "Insurance Contracts Act 1984 - Critical Sections",
                    "General Insurance Code of Practice 2020",
                ]),
                assignments: titles(&["Insurance Calculation Workbook"]),
                min_video_watch_percent: DEFAULT_MIN_VIDEO_WATCH_PERCENT,
                pass_score: 85,
            },
            ModuleDefinition {
                id: "day-3".into(),
                title: "Building & Construction Security of Payment".into(),
                videos: titles(&[
                    "Security of Payment Acts - State by State",
                    "Preparing Valid Payment Claims",
                ]),
                readings: titles(&["Building and Construction Industry Security of Payment Acts"]),
                assignments: titles(&["Draft Payment Claim"]),
                min_video_watch_percent: 90,
                pass_score: DEFAULT_PASS_SCORE,
            },
        ])
    }

    pub fn get(&self, module_id: &str) -> Result<&ModuleDefinition, ProgressError> {
        self.modules
            .iter()
            .find(|m| m.id == module_id)
            .ok_or_else(|| ProgressError::UnknownModule(module_id.to_string()))
    }

    pub fn modules(&self) -> &[ModuleDefinition] {
        &self.modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> ModuleDefinition {
        ModuleDefinition {
            id: "m1".into(),
            title: "Test".into(),
            videos: vec!["Intro".into(), "Safety".into()],
            readings: vec!["Handbook".into()],
            assignments: vec!["Quiz".into()],
            min_video_watch_percent: 90,
            pass_score: 75,
        }
    }

    fn video(title: &str, percentage: u8) -> ProgressEvent {
        ProgressEvent::VideoProgress {
            title: title.into(),
            percentage,
        }
    }

    #[test]
    fn video_progress_keeps_the_maximum() {
        let m = module();
        let now = Utc::now();
        let p = ModuleProgress::default()
            .apply(&m, &video("Intro", 92), now)
            .unwrap()
            .apply(&m, &video("Intro", 40), now)
            .unwrap();
        assert_eq!(p.videos_watched["Intro"], 92);
        assert_eq!(p.updated_at, Some(now));
    }

    #[test]
    fn video_below_threshold_does_not_count() {
        let m = module();
        let p = ModuleProgress::default()
            .apply(&m, &video("Intro", 89), Utc::now())
            .unwrap();
        let summary = p.summarize(&m);
        assert_eq!(summary.videos_completed, 0);
        assert_eq!(summary.percentage, 0);
    }

    #[test]
    fn failed_quiz_records_score_only() {
        let m = module();
        let quiz = |score| ProgressEvent::QuizSubmitted {
            title: "Quiz".into(),
            score,
        };
        let p = ModuleProgress::default()
            .apply(&m, &quiz(60), Utc::now())
            .unwrap();
        assert_eq!(p.quiz_scores["Quiz"], 60);
        assert!(p.assignments_submitted.is_empty());

        let p = p.apply(&m, &quiz(75), Utc::now()).unwrap();
        assert!(p.assignments_submitted.contains("Quiz"));
    }

    #[test]
    fn percentage_is_rounded() {
        let m = module();
        let p = ModuleProgress::default()
            .apply(&m, &video("Intro", 100), Utc::now())
            .unwrap();
        // 1 of 4
        assert_eq!(p.summarize(&m).percentage, 25);

        let three = ModuleDefinition {
            videos: vec!["Intro".into()],
            readings: vec!["A".into(), "B".into()],
            assignments: vec![],
            ..module()
        };
        let p = ModuleProgress::default()
            .apply(&three, &video("Intro", 100), Utc::now())
            .unwrap();
        assert_eq!(p.summarize(&three).percentage, 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(0, 0), 0);
    }

    #[test]
    fn full_checklist_is_complete() {
        let m = module();
        let now = Utc::now();
        let events = [
            video("Intro", 95),
            video("Safety", 100),
            ProgressEvent::ReadingCompleted {
                title: "Handbook".into(),
            },
            ProgressEvent::AssignmentSubmitted {
                title: "Quiz".into(),
            },
        ];
        let p = events
            .iter()
            .try_fold(ModuleProgress::default(), |p, e| p.apply(&m, e, now))
            .unwrap();
        let summary = p.summarize(&m);
        assert_eq!(summary.percentage, 100);
        assert!(summary.complete);
    }

    #[test]
    fn unknown_items_are_rejected() {
        let m = module();
        let err = ModuleProgress::default()
            .apply(
                &m,
                &ProgressEvent::ReadingCompleted {
                    title: "Missing".into(),
                },
                Utc::now(),
            )
            .unwrap_err();
        assert!(matches!(err, ProgressError::UnknownItem { kind: "reading", .. }));

        let err = ModuleProgress::default()
            .apply(&m, &video("Intro", 101), Utc::now())
            .unwrap_err();
        assert_eq!(
            err,
            ProgressError::OutOfRange {
                field: "percentage",
                value: 101
            }
        );
    }

    #[test]
    fn catalog_lookup() {
        let catalog = ModuleCatalog::onboarding_program();
        assert_eq!(catalog.modules().len(), 3);
        assert_eq!(catalog.get("day-2").unwrap().pass_score, 85);
        assert!(matches!(
            catalog.get("day-99"),
            Err(ProgressError::UnknownModule(_))
        ));
    }

    #[test]
    fn progress_round_trips_through_json() {
        let m = module();
        let p = ModuleProgress::default()
            .apply(&m, &video("Safety", 50), Utc::now())
            .unwrap();
        let json = serde_json::to_string(&p).unwrap();
        let back: ModuleProgress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
