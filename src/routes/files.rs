use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::auth::AuthenticatedUser,
    routes::ok,
    services::files::CourseFileService,
    AppState,
};

pub async fn upload_course_file(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(appointment_id): Path<Uuid>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let file =
        CourseFileService::upload(&state.db, &state.files, appointment_id, &user, multipart)
            .await?;
    Ok((StatusCode::CREATED, ok(file)))
}

pub async fn list_course_files(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let files = CourseFileService::list(&state.db, appointment_id, &user).await?;
    Ok(ok(files))
}

pub async fn download_course_file(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(file_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (file, bytes) =
        CourseFileService::download(&state.db, &state.files, file_id, &user).await?;

    let headers = [
        (header::CONTENT_TYPE, file.content_type.clone()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                file.original_filename.replace('"', "")
            ),
        ),
    ];
    Ok((headers, bytes))
}

pub async fn delete_course_file(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(file_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    CourseFileService::delete(&state.db, &state.files, file_id, &user).await?;
    Ok(ok("Fichier supprimé"))
}
