use crate::handlers::extract::{AppJson, AppPath, AppQuery};
use crate::models::profile::{
    CreateProfileRequest, ProfileListQuery, ProfileListResponse, StatusChangeRequest,
    StudentProfile, UpdateProfileRequest,
};
use crate::services::ProfileStore;
use crate::utils::error::ApiError;
use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

pub async fn create_profile_handler(
    State(profiles): State<Arc<ProfileStore>>,
    AppJson(request): AppJson<CreateProfileRequest>,
) -> Result<(StatusCode, Json<StudentProfile>), ApiError> {
    let profile = profiles.create(request)?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn list_profiles_handler(
    State(profiles): State<Arc<ProfileStore>>,
    AppQuery(query): AppQuery<ProfileListQuery>,
) -> Json<ProfileListResponse> {
    let profiles = profiles.list(query.status);
    let total = profiles.len();
    Json(ProfileListResponse { profiles, total })
}

pub async fn get_profile_handler(
    State(profiles): State<Arc<ProfileStore>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<StudentProfile>, ApiError> {
    Ok(Json(profiles.get(id)?))
}

pub async fn update_profile_handler(
    State(profiles): State<Arc<ProfileStore>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(patch): AppJson<UpdateProfileRequest>,
) -> Result<Json<StudentProfile>, ApiError> {
    Ok(Json(profiles.update(id, patch)?))
}

pub async fn change_status_handler(
    State(profiles): State<Arc<ProfileStore>>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<StatusChangeRequest>,
) -> Result<Json<StudentProfile>, ApiError> {
    Ok(Json(profiles.set_status(id, request.status)?))
}

pub async fn delete_profile_handler(
    State(profiles): State<Arc<ProfileStore>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    profiles.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}
