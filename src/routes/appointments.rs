use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::require_admin,
    models::appointment::{
        AssignTeacherRequest, CreateAppointmentRequest, UpdateAppointmentStatusBody,
    },
    models::auth::{AuthenticatedUser, Role},
    routes::{ok, ok_message},
    services::appointments::AppointmentService,
    services::assignment::AssignmentService,
    services::files::authorize_party,
    services::pricing::{PricingService, TrialPolicy},
    services::video::room_id_for,
    AppState,
};

pub async fn create_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    if user.role != Role::Parent {
        return Err(AppError::forbidden());
    }
    let policy = TrialPolicy::from_config(state.config.trial_counts_cancelled);
    let appointment = AppointmentService::create(&state.db, &user, &body, policy).await?;
    Ok((StatusCode::CREATED, ok(appointment)))
}

pub async fn list_appointments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let appointments = AppointmentService::list(&state.db).await?;
    Ok(ok(appointments))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::get(&state.db, id).await?;
    authorize_party(&appointment, &user)?;
    Ok(ok(appointment))
}

pub async fn list_parent_appointments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(parent_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Admin && user.user_id != parent_id {
        return Err(AppError::forbidden());
    }
    let appointments = AppointmentService::list_for_parent(&state.db, parent_id).await?;
    Ok(ok(appointments))
}

pub async fn list_teacher_appointments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(teacher_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Admin && user.user_id != teacher_id {
        return Err(AppError::forbidden());
    }
    let appointments = AppointmentService::list_for_teacher(&state.db, teacher_id).await?;
    Ok(ok(appointments))
}

/// Ce parent a-t-il déjà consommé son cours d'essai ?
pub async fn check_trial(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(parent_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    if user.role != Role::Admin && user.user_id != parent_id {
        return Err(AppError::forbidden());
    }
    let policy = TrialPolicy::from_config(state.config.trial_counts_cancelled);
    let has_used_trial = PricingService::has_used_trial(&state.db, parent_id, policy).await?;
    Ok(ok(json!({ "has_used_trial": has_used_trial })))
}

/// Enseignants approuvés compatibles avec la matière du rendez-vous.
/// Un résultat vide n'est pas une erreur : le rendez-vous reste en attente.
pub async fn suitable_teachers(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let (appointment, teachers) = AssignmentService::suitable_for(&state.db, id).await?;

    if teachers.is_empty() {
        let message = format!(
            "Aucun enseignant disponible pour la matière {}",
            appointment.subject
        );
        return Ok(ok_message(teachers, &message));
    }
    Ok(ok(teachers))
}

pub async fn assign_teacher(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<AssignTeacherRequest>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    let appointment = AssignmentService::assign(&state.db, id, &body).await?;

    if let Some(email_svc) = &state.email {
        let svc = email_svc.clone();
        let parent_email = appointment.parent_email.clone();
        let parent_name = appointment.parent_name.clone();
        let teacher_name = body.teacher_name.trim().to_string();
        let subject = appointment.subject.clone();
        tokio::spawn(async move {
            if let Err(e) = svc
                .send_assignment_notification(&parent_email, &parent_name, &teacher_name, &subject)
                .await
            {
                tracing::warn!("email d'assignation ({parent_email}) échoué : {e}");
            }
        });
    }

    Ok(ok(appointment))
}

pub async fn update_appointment_status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAppointmentStatusBody>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::set_status(&state.db, id, &body, &user).await?;
    Ok(ok(appointment))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_admin(&user)?;
    AppointmentService::delete(&state.db, id).await?;
    Ok(ok("Rendez-vous supprimé"))
}

/// Accès à la salle de visioconférence du rendez-vous. Réservé aux parties
/// prenantes, une fois l'enseignant assigné (statut assigned ou confirmed).
pub async fn video_room(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let appointment = AppointmentService::get(&state.db, id).await?;
    authorize_party(&appointment, &user)?;

    if appointment.status != "assigned" && appointment.status != "confirmed" {
        return Err(AppError::validation(
            "La salle n'est disponible qu'une fois l'enseignant assigné",
        ));
    }

    let room_id = room_id_for(appointment.id);
    let token = state
        .rooms
        .create_room_token(&room_id, &user.user_id.to_string(), &user.name)
        .map_err(AppError::Internal)?;

    Ok(ok(json!({ "room_id": room_id, "token": token })))
}
