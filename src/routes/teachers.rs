use axum::{
    extract::{Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{auth::require_admin, rate_limit::check_rate_limit},
    models::auth::AuthenticatedUser,
    models::request::UpdateRequestStatusBody,
    routes::{ok, real_ip},
    services::requests::TeacherRequestService,
    AppState,
};

pub async fn create_teacher_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let ip = real_ip(&headers);
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:signup:teacher:{ip}"), 5, 3600).await?;

    let request = TeacherRequestService::signup(&state.db, &state.files, multipart).await?;

    if let Some(email_svc) = &state.email {
        let svc = email_svc.clone();
        let name = request.full_name.clone();
        let email = request.email.clone();
        tokio::spawn(async move {
            if let Err(e) = svc
                .send_new_request_notification("enseignant", &name, &email)
                .await
            {
                tracing::warn!("notification admin (enseignant {email}) échouée : {e}");
            }
        });
    }

    Ok((StatusCode::CREATED, ok(request)))
}

pub async fn list_teacher_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let requests = TeacherRequestService::list(&state.db).await?;
    Ok(ok(requests))
}

pub async fn get_teacher_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let request = TeacherRequestService::get(&state.db, id).await?;
    Ok(ok(request))
}

pub async fn update_teacher_request_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRequestStatusBody>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let request = TeacherRequestService::set_status(&state.db, id, body.status).await?;

    if let Some(email_svc) = &state.email {
        let svc = email_svc.clone();
        let to = request.email.clone();
        let name = request.full_name.clone();
        let approved = request.status == "approved";
        tokio::spawn(async move {
            if let Err(e) = svc.send_decision_email(&to, &name, approved).await {
                tracing::warn!("email de décision ({to}) échoué : {e}");
            }
        });
    }

    Ok(ok(request))
}

pub async fn delete_teacher_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    TeacherRequestService::delete(&state.db, &state.files, id).await?;
    Ok(ok("Candidature supprimée"))
}

/// Téléchargement du CV joint à une candidature (admin).
pub async fn download_teacher_cv(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_admin(&user)?;
    let request = TeacherRequestService::get(&state.db, id).await?;

    let (cv_path, cv_filename) = match (request.cv_path, request.cv_filename) {
        (Some(path), Some(filename)) => (path, filename),
        _ => return Err(AppError::not_found("Aucun CV joint à cette candidature")),
    };

    let bytes = state.files.read(&cv_path).await?;
    let content_type = mime_guess::from_path(&cv_filename)
        .first_raw()
        .unwrap_or("application/octet-stream");

    let headers = [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", cv_filename.replace('"', "")),
        ),
    ];
    Ok((headers, bytes))
}
