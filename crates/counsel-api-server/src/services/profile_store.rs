use chrono::Utc;
use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::profile::{
    CreateProfileRequest, ProfileStatus, StudentProfile, UpdateProfileRequest,
};
use crate::utils::error::ApiError;

/// Process-local profile collection. Contents are lost on restart.
#[derive(Default)]
pub struct ProfileStore {
    profiles: RwLock<Vec<StudentProfile>>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, request: CreateProfileRequest) -> Result<StudentProfile, ApiError> {
        request.validate()?;

        let status = request.status.unwrap_or(ProfileStatus::Draft);
        if status == ProfileStatus::Archived {
            return Err(ApiError::BadRequest(
                "A profile cannot be created in archived status".to_string(),
            ));
        }

        let now = Utc::now();
        let profile = StudentProfile {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            email: request.email.map(|e| e.trim().to_string()),
            grade_level: request.grade_level,
            gpa: request.gpa,
            intended_majors: request.intended_majors,
            interests: request.interests,
            extracurriculars: request.extracurriculars,
            target_schools: request.target_schools,
            notes: request.notes,
            status,
            created_at: now,
            updated_at: now,
        };

        self.profiles.write().push(profile.clone());
        info!("Created profile {} ({})", profile.id, profile.status.as_str());
        Ok(profile)
    }

    pub fn get(&self, id: Uuid) -> Result<StudentProfile, ApiError> {
        self.profiles
            .read()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    /// Profile to inject into a chat turn. Archived profiles are refused.
    pub fn get_for_chat(&self, id: Uuid) -> Result<StudentProfile, ApiError> {
        let profile = self.get(id)?;
        if profile.status == ProfileStatus::Archived {
            return Err(ApiError::Conflict(format!(
                "Profile {} is archived and cannot be used in chat",
                id
            )));
        }
        Ok(profile)
    }

    /// Insertion order, which is creation order.
    pub fn list(&self, status: Option<ProfileStatus>) -> Vec<StudentProfile> {
        self.profiles
            .read()
            .iter()
            .filter(|p| status.is_none_or(|s| p.status == s))
            .cloned()
            .collect()
    }

    pub fn update(&self, id: Uuid, patch: UpdateProfileRequest) -> Result<StudentProfile, ApiError> {
        patch.validate()?;

        let mut profiles = self.profiles.write();
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;

        if profile.status == ProfileStatus::Archived {
            return Err(ApiError::Conflict(format!(
                "Profile {} is archived; restore it before editing",
                id
            )));
        }

        if let Some(name) = patch.name {
            profile.name = name.trim().to_string();
        }
        if let Some(email) = patch.email {
            profile.email = Some(email.trim().to_string());
        }
        if let Some(grade_level) = patch.grade_level {
            profile.grade_level = Some(grade_level);
        }
        if let Some(gpa) = patch.gpa {
            profile.gpa = Some(gpa);
        }
        if let Some(majors) = patch.intended_majors {
            profile.intended_majors = majors;
        }
        if let Some(interests) = patch.interests {
            profile.interests = interests;
        }
        if let Some(extracurriculars) = patch.extracurriculars {
            profile.extracurriculars = extracurriculars;
        }
        if let Some(schools) = patch.target_schools {
            profile.target_schools = schools;
        }
        if let Some(notes) = patch.notes {
            profile.notes = Some(notes);
        }
        profile.updated_at = Utc::now();

        Ok(profile.clone())
    }

    pub fn set_status(&self, id: Uuid, next: ProfileStatus) -> Result<StudentProfile, ApiError> {
        let mut profiles = self.profiles.write();
        let profile = profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| not_found(id))?;

        if profile.status == next {
            return Ok(profile.clone());
        }
        if !profile.status.can_transition_to(next) {
            return Err(ApiError::Conflict(format!(
                "Cannot move profile from {} to {}",
                profile.status.as_str(),
                next.as_str()
            )));
        }

        info!(
            "Profile {} status {} -> {}",
            id,
            profile.status.as_str(),
            next.as_str()
        );
        profile.status = next;
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    pub fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let mut profiles = self.profiles.write();
        let before = profiles.len();
        profiles.retain(|p| p.id != id);
        if profiles.len() == before {
            return Err(not_found(id));
        }
        info!("Deleted profile {}", id);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("Profile {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> CreateProfileRequest {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "email": "student@example.com",
            "gpa": 3.5,
            "intended_majors": ["History"]
        }))
        .unwrap()
    }

    #[test]
    fn test_create_defaults_to_draft() {
        let store = ProfileStore::new();
        let profile = store.create(request("  Ana  ")).unwrap();
        assert_eq!(profile.status, ProfileStatus::Draft);
        assert_eq!(profile.name, "Ana");
        assert_eq!(store.get(profile.id).unwrap().id, profile.id);
    }

    #[test]
    fn test_create_rejects_invalid_and_archived() {
        let store = ProfileStore::new();
        assert!(matches!(store.create(request("")), Err(ApiError::Validation(_))));

        let mut archived = request("Ben");
        archived.status = Some(ProfileStatus::Archived);
        assert!(matches!(store.create(archived), Err(ApiError::BadRequest(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_whitespace_only_name_is_rejected() {
        let store = ProfileStore::new();
        assert!(matches!(store.create(request("    ")), Err(ApiError::Validation(_))));
        assert!(store.is_empty());

        let profile = store.create(request("Dana")).unwrap();
        let patch = UpdateProfileRequest { name: Some(" \t ".to_string()), ..UpdateProfileRequest::default() };
        assert!(matches!(store.update(profile.id, patch), Err(ApiError::Validation(_))));
        assert_eq!(store.get(profile.id).unwrap().name, "Dana");
    }

    #[test]
    fn test_list_filters_by_status_in_creation_order() {
        let store = ProfileStore::new();
        let a = store.create(request("A")).unwrap();
        let b = store.create(request("B")).unwrap();
        let c = store.create(request("C")).unwrap();
        store.set_status(b.id, ProfileStatus::Active).unwrap();

        let all: Vec<Uuid> = store.list(None).iter().map(|p| p.id).collect();
        assert_eq!(all, vec![a.id, b.id, c.id]);

        let drafts: Vec<Uuid> = store
            .list(Some(ProfileStatus::Draft))
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(drafts, vec![a.id, c.id]);
    }

    #[test]
    fn test_update_patches_fields() {
        let store = ProfileStore::new();
        let profile = store.create(request("Cara")).unwrap();

        let updated = store
            .update(
                profile.id,
                UpdateProfileRequest {
                    gpa: Some(3.9),
                    interests: Some(vec!["Robotics".to_string()]),
                    ..UpdateProfileRequest::default()
                },
            )
            .unwrap();

        assert_eq!(updated.gpa, Some(3.9));
        assert_eq!(updated.interests, vec!["Robotics".to_string()]);
        assert_eq!(updated.intended_majors, vec!["History".to_string()]);
        assert!(updated.updated_at >= profile.updated_at);
    }

    #[test]
    fn test_archived_profile_is_read_only() {
        let store = ProfileStore::new();
        let profile = store.create(request("Dev")).unwrap();
        store.set_status(profile.id, ProfileStatus::Archived).unwrap();

        let patch = UpdateProfileRequest { notes: Some("x".into()), ..Default::default() };
        assert!(matches!(store.update(profile.id, patch), Err(ApiError::Conflict(_))));
        assert!(matches!(store.get_for_chat(profile.id), Err(ApiError::Conflict(_))));

        let restored = store.set_status(profile.id, ProfileStatus::Draft).unwrap();
        assert_eq!(restored.status, ProfileStatus::Draft);
        assert!(store.get_for_chat(profile.id).is_ok());
    }

    #[test]
    fn test_invalid_transition() {
        let store = ProfileStore::new();
        let profile = store.create(request("Eli")).unwrap();
        store.set_status(profile.id, ProfileStatus::Active).unwrap();
        assert!(matches!(
            store.set_status(profile.id, ProfileStatus::Draft),
            Err(ApiError::Conflict(_))
        ));
    }

    #[test]
    fn test_delete() {
        let store = ProfileStore::new();
        let profile = store.create(request("Fay")).unwrap();
        store.delete(profile.id).unwrap();
        assert!(matches!(store.delete(profile.id), Err(ApiError::NotFound(_))));
        assert!(matches!(store.get(profile.id), Err(ApiError::NotFound(_))));
    }
}
