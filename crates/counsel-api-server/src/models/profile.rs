use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProfileStatus {
    Draft,
    Active,
    Archived,
}

impl ProfileStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProfileStatus::Draft => "draft",
            ProfileStatus::Active => "active",
            ProfileStatus::Archived => "archived",
        }
    }

    /// Draft -> Active -> Archived, with Archived -> Draft as the restore path.
    pub fn can_transition_to(self, next: ProfileStatus) -> bool {
        use ProfileStatus::*;
        matches!(
            (self, next),
            (Draft, Active) | (Draft, Archived) | (Active, Archived) | (Archived, Draft)
        ) || self == next
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub grade_level: Option<String>,
    pub gpa: Option<f32>,
    pub intended_majors: Vec<String>,
    pub interests: Vec<String>,
    pub extracurriculars: Vec<String>,
    pub target_schools: Vec<String>,
    pub notes: Option<String>,
    pub status: ProfileStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudentProfile {
    /// Render populated fields as prompt lines. Empty fields are skipped.
    pub fn context_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("- Name: {}", self.name)];

        if let Some(grade) = non_blank(&self.grade_level) {
            lines.push(format!("- Grade level: {}", grade));
        }
        if let Some(gpa) = self.gpa {
            lines.push(format!("- GPA: {:.2}", gpa));
        }
        push_list(&mut lines, "Intended majors", &self.intended_majors);
        push_list(&mut lines, "Interests", &self.interests);
        push_list(&mut lines, "Extracurriculars", &self.extracurriculars);
        push_list(&mut lines, "Target schools", &self.target_schools);
        if let Some(notes) = non_blank(&self.notes) {
            lines.push(format!("- Notes: {}", notes));
        }

        lines
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn push_list(lines: &mut Vec<String>, label: &str, values: &[String]) {
    let values: Vec<&str> = values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if !values.is_empty() {
        lines.push(format!("- {}: {}", label, values.join(", ")));
    }
}

// ===== REQUEST MODELS =====

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProfileRequest {
    #[validate(
        length(min = 1, max = 120, message = "name must be 1-120 characters"),
        custom(function = "crate::models::not_blank")
    )]
    pub name: String,
    #[validate(email(message = "email is not valid"))]
    pub email: Option<String>,
    pub grade_level: Option<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "gpa must be between 0.0 and 5.0"))]
    pub gpa: Option<f32>,
    #[serde(default)]
    pub intended_majors: Vec<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub extracurriculars: Vec<String>,
    #[serde(default)]
    pub target_schools: Vec<String>,
    pub notes: Option<String>,
    /// Archived is not accepted on create.
    pub status: Option<ProfileStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(
        length(min = 1, max = 120, message = "name must be 1-120 characters"),
        custom(function = "crate::models::not_blank")
    )]
    pub name: Option<String>,
    #[validate(email(message = "email is not valid"))]
    pub email: Option<String>,
    pub grade_level: Option<String>,
    #[validate(range(min = 0.0, max = 5.0, message = "gpa must be between 0.0 and 5.0"))]
    pub gpa: Option<f32>,
    pub intended_majors: Option<Vec<String>>,
    pub interests: Option<Vec<String>>,
    pub extracurriculars: Option<Vec<String>>,
    pub target_schools: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChangeRequest {
    pub status: ProfileStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileListQuery {
    pub status: Option<ProfileStatus>,
}

#[derive(Debug, Serialize)]
pub struct ProfileListResponse {
    pub profiles: Vec<StudentProfile>,
    pub total: usize,
}
