use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::app::moderation::{InfractionUpdate, NewTemporaryInfraction, OwnedInfraction};
use crate::domain::moderation::{
    Infraction, InfractionId, InfractionKind, TemporaryInfractionKind,
};
use crate::domain::user::{Member, UserRecord};
use crate::http::{AdminToken, AppError};
use crate::AppState;

const MAX_DESCRIPTION_LEN: usize = 1024;
const MAX_ADDITIONAL_INFO_LEN: usize = 2048;
const MAX_TEMPORARY_SECONDS: i64 = 5 * 365 * 24 * 60 * 60;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn default_notify() -> bool {
    true
}

fn validate_text(
    description: &str,
    additional_info: Option<&str>,
) -> Result<(), AppError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(AppError::bad_request(
            "description must be at most 1024 characters",
        ));
    }
    if additional_info.map_or(0, |info| info.chars().count()) > MAX_ADDITIONAL_INFO_LEN {
        return Err(AppError::bad_request(
            "additional_info must be at most 2048 characters",
        ));
    }
    Ok(())
}

fn member(user_id: u64, display_name: Option<String>) -> Member {
    Member::new(
        user_id,
        display_name.unwrap_or_else(|| user_id.to_string()),
    )
}

pub async fn get_user(
    _admin: AdminToken,
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<UserRecord>, AppError> {
    state
        .moderation
        .get_user(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("user has no moderation record"))
}

#[derive(Deserialize)]
pub struct AddInfractionRequest {
    pub kind: InfractionKind,
    pub moderator_id: u64,
    #[serde(default)]
    pub description: String,
    pub additional_info: Option<String>,
    pub display_name: Option<String>,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

pub async fn add_infraction(
    _admin: AdminToken,
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Json(payload): Json<AddInfractionRequest>,
) -> Result<(StatusCode, Json<Infraction>), AppError> {
    if payload.kind.is_temporary() {
        return Err(AppError::bad_request(
            "temporary kinds must be added through /temporary-infractions",
        ));
    }
    validate_text(&payload.description, payload.additional_info.as_deref())?;

    let infraction_id = state
        .moderation
        .request_infraction_id()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = id, "failed to reserve infraction id");
            AppError::internal("failed to reserve infraction id")
        })?;
    let mut infraction = Infraction::new(infraction_id, payload.kind, payload.moderator_id)
        .with_description(payload.description);
    if let Some(info) = payload.additional_info {
        infraction = infraction.with_additional_info(info);
    }

    let result = if payload.notify {
        state
            .moderation
            .add_infraction(&member(id, payload.display_name), infraction.clone())
            .await
    } else {
        state
            .moderation
            .add_infraction_for(id, infraction.clone())
            .await
    };
    result.map_err(|err| {
        tracing::error!(error = ?err, user_id = id, infraction_id, "failed to add infraction");
        AppError::internal("failed to add infraction")
    })?;

    Ok((StatusCode::CREATED, Json(infraction)))
}

#[derive(Serialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

pub async fn clear_infractions(
    _admin: AdminToken,
    Path(id): Path<u64>,
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, AppError> {
    let cleared = state
        .moderation
        .clear_infractions(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = id, "failed to clear infractions");
            AppError::internal("failed to clear infractions")
        })?;

    Ok(Json(ClearResponse { cleared }))
}

#[derive(Deserialize)]
pub struct AddTemporaryInfractionRequest {
    pub kind: TemporaryInfractionKind,
    pub moderator_id: u64,
    pub duration_seconds: i64,
    #[serde(default)]
    pub reason: String,
    pub additional_info: Option<String>,
    pub display_name: Option<String>,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

pub async fn add_temporary_infraction(
    _admin: AdminToken,
    Path(id): Path<u64>,
    State(state): State<AppState>,
    Json(payload): Json<AddTemporaryInfractionRequest>,
) -> Result<(StatusCode, Json<Infraction>), AppError> {
    if !(1..=MAX_TEMPORARY_SECONDS).contains(&payload.duration_seconds) {
        return Err(AppError::bad_request(
            "duration_seconds must be between 1 and 157680000",
        ));
    }
    validate_text(&payload.reason, payload.additional_info.as_deref())?;

    let request = NewTemporaryInfraction {
        kind: payload.kind,
        moderator_id: payload.moderator_id,
        duration: Duration::seconds(payload.duration_seconds),
        reason: payload.reason,
        additional_info: payload.additional_info.unwrap_or_default(),
    };

    let result = if payload.notify {
        state
            .moderation
            .add_temporary_infraction(&member(id, payload.display_name), request)
            .await
    } else {
        state
            .moderation
            .add_temporary_infraction_for(id, request)
            .await
    };
    let infraction = result.map_err(|err| {
        tracing::error!(error = ?err, user_id = id, "failed to add temporary infraction");
        AppError::internal("failed to add temporary infraction")
    })?;

    Ok((StatusCode::CREATED, Json(infraction)))
}

pub async fn clear_temporary_infraction(
    _admin: AdminToken,
    Path((id, kind)): Path<(u64, TemporaryInfractionKind)>,
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, AppError> {
    let cleared = state
        .moderation
        .clear_temporary_infraction(kind, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = id, kind = ?kind, "failed to clear temporary infraction");
            AppError::internal("failed to clear temporary infraction")
        })?;

    Ok(Json(ClearResponse { cleared }))
}

pub async fn list_temporary_infractions(
    _admin: AdminToken,
    State(state): State<AppState>,
) -> Json<Vec<UserRecord>> {
    Json(state.moderation.users_with_temporary_infractions().await)
}

pub async fn get_infraction(
    _admin: AdminToken,
    Path(id): Path<InfractionId>,
    State(state): State<AppState>,
) -> Result<Json<OwnedInfraction>, AppError> {
    state
        .moderation
        .try_get_infraction(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found("infraction not found"))
}

#[derive(Deserialize)]
pub struct UpdateInfractionRequest {
    pub description: String,
}

pub async fn update_infraction(
    _admin: AdminToken,
    Path(id): Path<InfractionId>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateInfractionRequest>,
) -> Result<Json<InfractionUpdate>, AppError> {
    validate_text(&payload.description, None)?;

    let update = state
        .moderation
        .try_update_infraction(id, payload.description)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, infraction_id = id, "failed to update infraction");
            AppError::internal("failed to update infraction")
        })?;

    update
        .map(Json)
        .ok_or_else(|| AppError::not_found("infraction not found"))
}

pub async fn delete_infraction(
    _admin: AdminToken,
    Path(id): Path<InfractionId>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let removed = state
        .moderation
        .delete_infraction(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, infraction_id = id, "failed to delete infraction");
            AppError::internal("failed to delete infraction")
        })?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("infraction not found"))
    }
}
