use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::appointment::{Appointment, AssignTeacherRequest, TeacherSummary};
use crate::services::appointments::{AppointmentService, APPT_COLS};

/// Filtre les enseignants approuvés dont l'ensemble de matières contient la
/// matière demandée. Correspondance exacte, sensible à la casse ; l'ordre
/// d'entrée est préservé. Fonction pure.
pub fn list_suitable_teachers<'a>(
    subject: &str,
    teachers: &'a [TeacherSummary],
) -> Vec<&'a TeacherSummary> {
    teachers
        .iter()
        .filter(|t| t.subjects.iter().any(|s| s == subject))
        .collect()
}

pub struct AssignmentService;

impl AssignmentService {
    /// Catalogue des enseignants approuvés, dans l'ordre de candidature.
    pub async fn approved_teachers(pool: &PgPool) -> Result<Vec<TeacherSummary>, AppError> {
        let rows: Vec<(Uuid, String, Json<Vec<String>>)> = sqlx::query_as(
            "SELECT id, full_name, subjects FROM teacher_requests
             WHERE status = 'approved' ORDER BY created_at",
        )
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, full_name, subjects)| TeacherSummary {
                id,
                full_name,
                subjects: subjects.0,
            })
            .collect())
    }

    /// Enseignants compatibles avec un rendez-vous. Un résultat vide n'est
    /// pas une erreur : le rendez-vous reste `pending` et l'appelant signale
    /// qu'aucun enseignant n'est disponible pour la matière.
    pub async fn suitable_for(
        pool: &PgPool,
        appointment_id: Uuid,
    ) -> Result<(Appointment, Vec<TeacherSummary>), AppError> {
        let appointment = AppointmentService::get(pool, appointment_id).await?;
        let teachers = Self::approved_teachers(pool).await?;
        let suitable = list_suitable_teachers(&appointment.subject, &teachers)
            .into_iter()
            .cloned()
            .collect();
        Ok((appointment, suitable))
    }

    /// Assigne un enseignant à un rendez-vous en attente. La mise à jour est
    /// conditionnée sur `status = 'pending'` : de deux assignations
    /// concurrentes, une seule gagne, l'autre reçoit un conflit nommant les
    /// deux états.
    pub async fn assign(
        pool: &PgPool,
        appointment_id: Uuid,
        req: &AssignTeacherRequest,
    ) -> Result<Appointment, AppError> {
        if req.teacher_name.trim().is_empty() {
            return Err(AppError::validation("teacher_name est requis"));
        }

        let approved: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM teacher_requests
              WHERE id = $1 AND status = 'approved')",
        )
        .bind(req.teacher_id)
        .fetch_one(pool)
        .await?;
        if !approved {
            return Err(AppError::not_found(
                "Enseignant introuvable ou non approuvé",
            ));
        }

        let updated = sqlx::query_as::<_, Appointment>(&format!(
            "UPDATE appointments
             SET assigned_teacher_id = $1, assigned_teacher_name = $2, status = 'assigned'
             WHERE id = $3 AND status = 'pending'
             RETURNING {APPT_COLS}"
        ))
        .bind(req.teacher_id)
        .bind(req.teacher_name.trim())
        .bind(appointment_id)
        .fetch_optional(pool)
        .await?;

        match updated {
            Some(appointment) => {
                tracing::info!(
                    "enseignant {} assigné au rendez-vous {appointment_id}",
                    req.teacher_name.trim()
                );
                Ok(appointment)
            }
            None => {
                let current = AppointmentService::get(pool, appointment_id).await?;
                Err(AppError::invalid_transition(current.status, "assigned"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn teacher(name: &str, subjects: &[&str]) -> TeacherSummary {
        TeacherSummary {
            id: Uuid::new_v4(),
            full_name: name.to_string(),
            subjects: subjects.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn filtre_par_matiere_en_preservant_l_ordre() {
        let pool = vec![
            teacher("T1", &["Math"]),
            teacher("T2", &["Math", "French"]),
        ];

        let math: Vec<_> = list_suitable_teachers("Math", &pool)
            .iter()
            .map(|t| t.full_name.as_str())
            .collect();
        assert_eq!(math, ["T1", "T2"]);

        let french: Vec<_> = list_suitable_teachers("French", &pool)
            .iter()
            .map(|t| t.full_name.as_str())
            .collect();
        assert_eq!(french, ["T2"]);
    }

    #[test]
    fn correspondance_exacte_sensible_a_la_casse() {
        let pool = vec![teacher("T1", &["Math"])];
        assert!(list_suitable_teachers("math", &pool).is_empty());
        assert!(list_suitable_teachers("Mathématiques", &pool).is_empty());
    }

    #[test]
    fn aucun_enseignant_disponible() {
        let pool = vec![teacher("T1", &["Math"])];
        assert!(list_suitable_teachers("Physique", &pool).is_empty());
        assert!(list_suitable_teachers("Math", &[]).is_empty());
    }
}
