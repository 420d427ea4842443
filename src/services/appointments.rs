use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::appointment::{
    Appointment, AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentStatusBody,
};
use crate::models::auth::{AuthenticatedUser, Role};
use crate::models::request::ParentRequest;
use crate::services::pricing::{self, PricingService, TrialPolicy};

/// Explicit column list for Appointment — casts enum columns to TEXT.
pub(crate) const APPT_COLS: &str =
    "id, parent_id, parent_name, parent_email, parent_phone, student_name, subject, level,
     preferred_date, preferred_time, duration, location::TEXT as location, notes,
     price_per_hour, total_amount, is_trial_course,
     assigned_teacher_id, assigned_teacher_name, status::TEXT as status,
     created_at, updated_at";

pub struct AppointmentService;

impl AppointmentService {
    /// Crée un rendez-vous au statut `pending`. La tarification est calculée
    /// ici (§ politique d'essai) — les prix envoyés par le client sont ignorés
    /// par construction.
    pub async fn create(
        pool: &PgPool,
        parent: &AuthenticatedUser,
        req: &CreateAppointmentRequest,
        policy: TrialPolicy,
    ) -> Result<Appointment, AppError> {
        let mut missing = Vec::new();
        if req.student_name.trim().is_empty() {
            missing.push("student_name");
        }
        if req.subject.trim().is_empty() {
            missing.push("subject");
        }
        if req.level.trim().is_empty() {
            missing.push("level");
        }
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "Champs obligatoires manquants : {}",
                missing.join(", ")
            )));
        }
        pricing::validate_duration(req.duration)?;

        // Instantané du contact parent, pris sur la demande approuvée.
        let parent_row = sqlx::query_as::<_, ParentRequest>(
            "SELECT id, parent_name, email, phone, address, password_hash, children, message,
                    status::TEXT as status, created_at, updated_at
             FROM parent_requests WHERE id = $1",
        )
        .bind(parent.user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Parent introuvable"))?;

        let has_used_trial =
            PricingService::has_used_trial(pool, parent.user_id, policy).await?;
        let quote = pricing::quote(has_used_trial, req.location, req.duration)?;

        let inserted = sqlx::query_as::<_, Appointment>(&format!(
            "INSERT INTO appointments
             (parent_id, parent_name, parent_email, parent_phone, student_name, subject, level,
              preferred_date, preferred_time, duration, location, notes,
              price_per_hour, total_amount, is_trial_course)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::course_location, $12, $13, $14, $15)
             RETURNING {APPT_COLS}"
        ))
        .bind(parent_row.id)
        .bind(&parent_row.parent_name)
        .bind(&parent_row.email)
        .bind(&parent_row.phone)
        .bind(req.student_name.trim())
        .bind(req.subject.trim())
        .bind(req.level.trim())
        .bind(req.preferred_date)
        .bind(req.preferred_time)
        .bind(req.duration)
        .bind(req.location.to_string())
        .bind(&req.notes)
        .bind(quote.price_per_hour)
        .bind(quote.total_amount)
        .bind(quote.is_trial_course)
        .fetch_one(pool)
        .await;

        match inserted {
            Ok(appointment) => Ok(appointment),
            // L'index partiel sur les essais non annulés sérialise les
            // réservations d'essai concurrentes.
            Err(sqlx::Error::Database(e))
                if e.constraint() == Some("appointments_one_trial_per_parent") =>
            {
                Err(AppError::Conflict("Cours d'essai déjà utilisé".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<Appointment, AppError> {
        sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPT_COLS} FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Rendez-vous non trouvé"))
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<Appointment>, AppError> {
        let rows = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPT_COLS} FROM appointments ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_parent(pool: &PgPool, parent_id: Uuid) -> Result<Vec<Appointment>, AppError> {
        let rows = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPT_COLS} FROM appointments
             WHERE parent_id = $1 ORDER BY created_at DESC"
        ))
        .bind(parent_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn list_for_teacher(pool: &PgPool, teacher_id: Uuid) -> Result<Vec<Appointment>, AppError> {
        let rows = sqlx::query_as::<_, Appointment>(&format!(
            "SELECT {APPT_COLS} FROM appointments
             WHERE assigned_teacher_id = $1 ORDER BY created_at DESC"
        ))
        .bind(teacher_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Applique une transition de statut. Chaque transition est une mise à
    /// jour conditionnelle d'une seule ligne, gardée sur le statut courant :
    /// un écrivain concurrent perd le compare-and-swap et reçoit un conflit.
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        body: &UpdateAppointmentStatusBody,
        actor: &AuthenticatedUser,
    ) -> Result<Appointment, AppError> {
        let requested = body.status;
        if requested == AppointmentStatus::Assigned {
            return Err(AppError::validation(
                "L'assignation passe par PUT /appointments/{id}/assign",
            ));
        }

        let appointment = Self::get(pool, id).await?;
        let current: AppointmentStatus = appointment.status.parse()?;

        Self::authorize_transition(&appointment, requested, actor)?;

        if !current.can_transition(requested) {
            return Err(AppError::invalid_transition(
                current.to_string(),
                requested.to_string(),
            ));
        }

        let updated = sqlx::query_as::<_, Appointment>(&format!(
            "UPDATE appointments SET status = $1::appointment_status
             WHERE id = $2 AND status = $3::appointment_status
             RETURNING {APPT_COLS}"
        ))
        .bind(requested.to_string())
        .bind(id)
        .bind(current.to_string())
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(appointment) => {
                tracing::info!("rendez-vous {id} : {current} → {requested}");
                Ok(appointment)
            }
            None => {
                // Perdu la course : relire le statut réel pour le message.
                let now = Self::get(pool, id).await?;
                Err(AppError::invalid_transition(now.status, requested.to_string()))
            }
        }
    }

    fn authorize_transition(
        appointment: &Appointment,
        requested: AppointmentStatus,
        actor: &AuthenticatedUser,
    ) -> Result<(), AppError> {
        if actor.role == Role::Admin {
            return Ok(());
        }
        let is_assigned_teacher = actor.role == Role::Teacher
            && appointment.assigned_teacher_id == Some(actor.user_id);
        let is_owner_parent =
            actor.role == Role::Parent && appointment.parent_id == actor.user_id;

        let allowed = match requested {
            // confirmation et clôture : à l'initiative de l'enseignant assigné
            AppointmentStatus::Confirmed | AppointmentStatus::Completed => is_assigned_teacher,
            // annulation : l'une ou l'autre des parties
            AppointmentStatus::Cancelled => is_assigned_teacher || is_owner_parent,
            _ => false,
        };

        if allowed {
            Ok(())
        } else {
            Err(AppError::forbidden())
        }
    }

    /// Suppression définitive (admin). L'annulation reste la sortie normale
    /// du cycle de vie.
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Rendez-vous non trouvé"));
        }
        Ok(())
    }
}
