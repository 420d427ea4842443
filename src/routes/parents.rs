use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{auth::require_admin, rate_limit::check_rate_limit},
    models::auth::AuthenticatedUser,
    models::request::{CreateParentRequest, UpdateRequestStatusBody},
    routes::{ok, real_ip},
    services::requests::ParentRequestService,
    AppState,
};

pub async fn create_parent_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateParentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    // 5 inscriptions/heure par IP sur l'endpoint public.
    let ip = real_ip(&headers);
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &format!("rate:signup:parent:{ip}"), 5, 3600).await?;

    let request = ParentRequestService::signup(&state.db, &body).await?;

    // Notification admin en tâche de fond — n'échoue jamais l'inscription.
    if let Some(email_svc) = &state.email {
        let svc = email_svc.clone();
        let name = request.parent_name.clone();
        let email = request.email.clone();
        tokio::spawn(async move {
            if let Err(e) = svc
                .send_new_request_notification("parent", &name, &email)
                .await
            {
                tracing::warn!("notification admin (parent {email}) échouée : {e}");
            }
        });
    }

    Ok((StatusCode::CREATED, ok(request)))
}

pub async fn list_parent_requests(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let requests = ParentRequestService::list(&state.db).await?;
    Ok(ok(requests))
}

pub async fn get_parent_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let request = ParentRequestService::get(&state.db, id).await?;
    Ok(ok(request))
}

pub async fn update_parent_request_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRequestStatusBody>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let request = ParentRequestService::set_status(&state.db, id, body.status).await?;

    if let Some(email_svc) = &state.email {
        let svc = email_svc.clone();
        let to = request.email.clone();
        let name = request.parent_name.clone();
        let approved = request.status == "approved";
        tokio::spawn(async move {
            if let Err(e) = svc.send_decision_email(&to, &name, approved).await {
                tracing::warn!("email de décision ({to}) échoué : {e}");
            }
        });
    }

    Ok(ok(request))
}

pub async fn delete_parent_request(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    ParentRequestService::delete(&state.db, id).await?;
    Ok(ok("Demande supprimée"))
}
