//! Analysis output schema.
//!
//! The LLM's JSON lands in `RawAnalysis`, where every field is optional.
//! `RoastAnalysis::ingest` is the single repair/validation boundary: the
//! narrative fields are required (a roast without a rejection is a failed
//! call, surfaced as retryable), collections default to empty, the
//! competition and ATS blocks fall back to fixed neutral values, and the
//! legacy flat skill-gap list is derived from the heatmap. Nothing past
//! this boundary handles a missing field.
//!
//! Wire casing is camelCase end-to-end: the prompt asks for it and the
//! persisted details document keeps it.

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("analysis output missing required field '{0}'")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecruiterNote {
    pub section: String,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillStatus {
    Missing,
    Weak,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGapEntry {
    pub skill: String,
    pub status: SkillStatus,
    #[serde(default)]
    pub jd_mention: bool,
    #[serde(default)]
    pub resume_mention: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub rank: u32,
    pub issue: String,
    pub effort: Level,
    pub impact: Level,
    pub action: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompetitionLevel {
    Low,
    Medium,
    High,
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Competition {
    pub estimated_applicants: u32,
    pub estimated_rank: u32,
    pub percentile: u32,
    pub competition_level: CompetitionLevel,
}

impl Default for Competition {
    fn default() -> Self {
        Competition {
            estimated_applicants: 150,
            estimated_rank: 75,
            percentile: 50,
            competition_level: CompetitionLevel::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletRewrite {
    pub before: String,
    pub after: String,
    pub why: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtsCategory {
    Keywords,
    Formatting,
    Sections,
    Length,
    #[serde(rename = "Contact Info")]
    ContactInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AtsSeverity {
    Critical,
    Warning,
    Minor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtsIssue {
    pub category: AtsCategory,
    pub severity: AtsSeverity,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AtsReport {
    pub score: u32,
    pub issues: Vec<AtsIssue>,
    pub missing_keywords: Vec<String>,
    pub tips: Vec<String>,
}

impl Default for AtsReport {
    fn default() -> Self {
        AtsReport {
            score: 50,
            issues: Vec::new(),
            missing_keywords: Vec::new(),
            tips: Vec::new(),
        }
    }
}

/// The LLM's JSON as deserialized — everything optional, nothing trusted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    pub grade: Option<String>,
    pub headline: Option<String>,
    pub rejection: Option<String>,
    pub recruiter_notes: Option<Vec<RecruiterNote>>,
    pub skill_gap_heatmap: Option<Vec<SkillGapEntry>>,
    pub priorities: Option<Vec<Priority>>,
    pub competition: Option<Competition>,
    pub bullet_rewrite: Option<BulletRewrite>,
    pub ats_score: Option<AtsReport>,
    pub hiring_manager_quote: Option<String>,
    pub improvements: Option<Vec<String>>,
}

/// Fully-defaulted analysis. Everything downstream of `ingest` can lean on
/// these fields being present.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoastAnalysis {
    pub grade: String,
    pub headline: String,
    pub rejection: String,
    pub recruiter_notes: Vec<RecruiterNote>,
    pub skill_gap_heatmap: Vec<SkillGapEntry>,
    pub priorities: Vec<Priority>,
    pub competition: Competition,
    pub bullet_rewrite: Option<BulletRewrite>,
    pub ats: AtsReport,
    pub hiring_manager_quote: String,
    pub improvements: Vec<String>,
    /// Flat list derived from the heatmap (non-strong skills), kept for
    /// shareable summaries.
    pub skill_gaps: Vec<String>,
}

impl RoastAnalysis {
    pub fn ingest(raw: RawAnalysis) -> Result<RoastAnalysis, IngestError> {
        let grade = repair_grade(raw.grade.as_deref());
        let headline = required(raw.headline, "headline")?;
        let rejection = required(raw.rejection, "rejection")?;
        let hiring_manager_quote = required(raw.hiring_manager_quote, "hiringManagerQuote")?;

        let skill_gap_heatmap = raw.skill_gap_heatmap.unwrap_or_default();
        let skill_gaps = skill_gap_heatmap
            .iter()
            .filter(|entry| entry.status != SkillStatus::Strong)
            .map(|entry| entry.skill.clone())
            .collect();

        let mut ats = raw.ats_score.unwrap_or_default();
        ats.score = ats.score.min(100);
        let mut competition = raw.competition.unwrap_or_default();
        competition.percentile = competition.percentile.min(100);

        Ok(RoastAnalysis {
            grade,
            headline,
            rejection,
            recruiter_notes: raw.recruiter_notes.unwrap_or_default(),
            skill_gap_heatmap,
            priorities: raw.priorities.unwrap_or_default(),
            competition,
            bullet_rewrite: raw.bullet_rewrite,
            ats,
            hiring_manager_quote,
            improvements: raw.improvements.unwrap_or_default(),
            skill_gaps,
        })
    }

    /// Extended fields stored as one JSONB document on the result row.
    pub fn details(&self) -> serde_json::Value {
        json!({
            "recruiterNotes": self.recruiter_notes,
            "skillGapHeatmap": self.skill_gap_heatmap,
            "priorities": self.priorities,
            "competition": self.competition,
            "bulletRewrite": self.bullet_rewrite,
        })
    }
}

fn required(field: Option<String>, name: &'static str) -> Result<String, IngestError> {
    match field {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(IngestError::MissingField(name)),
    }
}

/// Letter grade with optional +/- modifier. Anything else collapses to a
/// neutral C rather than leaking model noise into shared pages.
fn repair_grade(grade: Option<&str>) -> String {
    let Some(grade) = grade else {
        return "C".to_string();
    };
    let grade = grade.trim().to_uppercase();
    let mut chars = grade.chars();
    let valid = matches!(chars.next(), Some('A'..='F'))
        && matches!(chars.next(), None | Some('+') | Some('-'))
        && chars.next().is_none();
    if valid {
        grade
    } else {
        "C".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_raw() -> RawAnalysis {
        RawAnalysis {
            grade: Some("B+".to_string()),
            headline: Some("Close, but the JD wanted a unicorn".to_string()),
            rejection: Some("Three paragraphs of gentle devastation.".to_string()),
            hiring_manager_quote: Some("Next.".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ingest_applies_collection_defaults() {
        let analysis = RoastAnalysis::ingest(minimal_raw()).unwrap();
        assert!(analysis.recruiter_notes.is_empty());
        assert!(analysis.priorities.is_empty());
        assert!(analysis.improvements.is_empty());
        assert!(analysis.skill_gaps.is_empty());
        assert!(analysis.bullet_rewrite.is_none());
    }

    #[test]
    fn test_ingest_applies_neutral_fallback_blocks() {
        let analysis = RoastAnalysis::ingest(minimal_raw()).unwrap();
        assert_eq!(analysis.ats.score, 50);
        assert_eq!(analysis.competition.estimated_applicants, 150);
        assert_eq!(analysis.competition.estimated_rank, 75);
        assert_eq!(analysis.competition.percentile, 50);
        assert_eq!(
            analysis.competition.competition_level,
            CompetitionLevel::Medium
        );
    }

    #[test]
    fn test_ingest_rejects_missing_narrative_fields() {
        let mut raw = minimal_raw();
        raw.rejection = None;
        assert_eq!(
            RoastAnalysis::ingest(raw),
            Err(IngestError::MissingField("rejection"))
        );

        let mut raw = minimal_raw();
        raw.headline = Some("   ".to_string());
        assert_eq!(
            RoastAnalysis::ingest(raw),
            Err(IngestError::MissingField("headline"))
        );
    }

    #[test]
    fn test_skill_gaps_derived_from_non_strong_heatmap_rows() {
        let mut raw = minimal_raw();
        raw.skill_gap_heatmap = Some(vec![
            SkillGapEntry {
                skill: "Kubernetes".to_string(),
                status: SkillStatus::Missing,
                jd_mention: true,
                resume_mention: false,
            },
            SkillGapEntry {
                skill: "Rust".to_string(),
                status: SkillStatus::Strong,
                jd_mention: true,
                resume_mention: true,
            },
            SkillGapEntry {
                skill: "GraphQL".to_string(),
                status: SkillStatus::Weak,
                jd_mention: true,
                resume_mention: true,
            },
        ]);
        let analysis = RoastAnalysis::ingest(raw).unwrap();
        assert_eq!(analysis.skill_gaps, vec!["Kubernetes", "GraphQL"]);
    }

    #[test]
    fn test_grade_repair() {
        assert_eq!(repair_grade(Some("a+")), "A+");
        assert_eq!(repair_grade(Some(" B- ")), "B-");
        assert_eq!(repair_grade(Some("F")), "F");
        assert_eq!(repair_grade(Some("Z")), "C");
        assert_eq!(repair_grade(Some("A++")), "C");
        assert_eq!(repair_grade(Some("excellent")), "C");
        assert_eq!(repair_grade(None), "C");
    }

    #[test]
    fn test_scores_clamped_to_100() {
        let mut raw = minimal_raw();
        raw.ats_score = Some(AtsReport {
            score: 250,
            ..Default::default()
        });
        raw.competition = Some(Competition {
            percentile: 9000,
            ..Default::default()
        });
        let analysis = RoastAnalysis::ingest(raw).unwrap();
        assert_eq!(analysis.ats.score, 100);
        assert_eq!(analysis.competition.percentile, 100);
    }

    #[test]
    fn test_raw_analysis_accepts_llm_casing() {
        let json = r#"{
            "grade": "D",
            "headline": "The resume and the JD have never met",
            "rejection": "It was over at the first bullet point.",
            "hiringManagerQuote": "Who forwarded this?",
            "skillGapHeatmap": [
                {"skill": "Terraform", "status": "missing", "jdMention": true, "resumeMention": false}
            ],
            "atsScore": {"score": 32, "issues": [], "missingKeywords": ["Terraform"], "tips": []},
            "improvements": ["Quantify something. Anything."]
        }"#;
        let raw: RawAnalysis = serde_json::from_str(json).unwrap();
        let analysis = RoastAnalysis::ingest(raw).unwrap();
        assert_eq!(analysis.grade, "D");
        assert_eq!(analysis.ats.score, 32);
        assert_eq!(analysis.skill_gaps, vec!["Terraform"]);
        assert_eq!(analysis.improvements.len(), 1);
    }

    #[test]
    fn test_partial_blocks_filled_from_defaults() {
        let json = r#"{
            "grade": "C",
            "headline": "Fine, in the way lukewarm coffee is fine",
            "rejection": "Nothing disqualifying. Nothing memorable either.",
            "hiringManagerQuote": "Who?",
            "atsScore": {"score": 70},
            "competition": {"competitionLevel": "Extreme"}
        }"#;
        let raw: RawAnalysis = serde_json::from_str(json).unwrap();
        let analysis = RoastAnalysis::ingest(raw).unwrap();
        assert_eq!(analysis.ats.score, 70);
        assert!(analysis.ats.issues.is_empty());
        assert_eq!(
            analysis.competition.competition_level,
            CompetitionLevel::Extreme
        );
        assert_eq!(analysis.competition.estimated_applicants, 150);
    }

    #[test]
    fn test_details_document_shape() {
        let analysis = RoastAnalysis::ingest(minimal_raw()).unwrap();
        let details = analysis.details();
        assert!(details.get("recruiterNotes").is_some());
        assert!(details.get("skillGapHeatmap").is_some());
        assert!(details.get("competition").is_some());
        assert!(details["bulletRewrite"].is_null());
    }
}
