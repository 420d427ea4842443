use axum::extract::Multipart;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::appointment::Appointment;
use crate::models::auth::{AuthenticatedUser, Role};
use crate::models::course_file::{CourseFile, FileCategory};
use crate::services::appointments::AppointmentService;
use crate::services::storage::FileStore;

/// Taille maximale d'un fichier de cours : 20 Mio.
pub const MAX_FILE_BYTES: usize = 20 * 1024 * 1024;

const FILE_COLS: &str =
    "id, appointment_id, uploader_id, uploader_role::TEXT as uploader_role, uploader_name,
     original_filename, content_type, category::TEXT as category, size_bytes, description,
     storage_path, created_at";

/// Catégorie associée à un type MIME autorisé. `None` : type refusé.
pub fn category_for(content_type: &str) -> Option<FileCategory> {
    match content_type {
        "application/pdf" => Some(FileCategory::Pdf),
        "image/jpeg" | "image/png" | "image/gif" | "image/webp" => Some(FileCategory::Image),
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            Some(FileCategory::Word)
        }
        "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
            Some(FileCategory::Excel)
        }
        "text/plain" | "text/csv" => Some(FileCategory::Other),
        _ => None,
    }
}

/// Validation complète d'un envoi, avant toute écriture disque : type dans la
/// liste blanche et taille ≤ 20 Mio.
pub fn validate_upload(content_type: &str, size: usize) -> Result<FileCategory, AppError> {
    let category = category_for(content_type).ok_or_else(|| {
        AppError::validation(format!("Type de fichier non autorisé : {content_type}"))
    })?;
    if size > MAX_FILE_BYTES {
        return Err(AppError::validation(
            "Fichier trop volumineux (maximum 20 Mio)",
        ));
    }
    Ok(category)
}

/// L'utilisateur est-il partie prenante du rendez-vous ?
pub(crate) fn authorize_party(
    appointment: &Appointment,
    user: &AuthenticatedUser,
) -> Result<(), AppError> {
    let allowed = match user.role {
        Role::Admin => true,
        Role::Parent => appointment.parent_id == user.user_id,
        Role::Teacher => appointment.assigned_teacher_id == Some(user.user_id),
    };
    if allowed {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

pub struct CourseFileService;

impl CourseFileService {
    pub async fn upload(
        pool: &PgPool,
        store: &FileStore,
        appointment_id: Uuid,
        uploader: &AuthenticatedUser,
        mut multipart: Multipart,
    ) -> Result<CourseFile, AppError> {
        let appointment = AppointmentService::get(pool, appointment_id).await?;
        authorize_party(&appointment, uploader)?;

        let mut file_data: Option<(Vec<u8>, String, String)> = None;
        let mut description: Option<String> = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "file" => {
                    let filename = field.file_name().unwrap_or("document").to_string();
                    let content_type = field
                        .content_type()
                        .map(|ct| ct.to_string())
                        .unwrap_or_else(|| {
                            mime_guess::from_path(&filename)
                                .first_raw()
                                .unwrap_or("application/octet-stream")
                                .to_string()
                        });
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(e.to_string()))?
                        .to_vec();
                    file_data = Some((bytes, filename, content_type));
                }
                "description" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|e| AppError::validation(e.to_string()))?;
                    description = Some(text).filter(|s| !s.trim().is_empty());
                }
                _ => {}
            }
        }

        let (bytes, original_filename, content_type) =
            file_data.ok_or_else(|| AppError::validation("Aucun fichier dans l'envoi"))?;

        // Validation avant toute écriture : pas de résidu sur disque en cas
        // de refus.
        let category = validate_upload(&content_type, bytes.len())?;

        let storage_path = store.save("courses", &original_filename, &bytes).await?;

        let row = sqlx::query_as::<_, CourseFile>(&format!(
            "INSERT INTO course_files
             (appointment_id, uploader_id, uploader_role, uploader_name, original_filename,
              content_type, category, size_bytes, description, storage_path)
             VALUES ($1, $2, $3::uploader_role, $4, $5, $6, $7::file_category, $8, $9, $10)
             RETURNING {FILE_COLS}"
        ))
        .bind(appointment_id)
        .bind(uploader.user_id)
        .bind(uploader.role.to_string())
        .bind(&uploader.name)
        .bind(&original_filename)
        .bind(&content_type)
        .bind(category.to_string())
        .bind(bytes.len() as i64)
        .bind(&description)
        .bind(&storage_path)
        .fetch_one(pool)
        .await?;

        tracing::info!(
            "fichier {} ({} octets) ajouté au rendez-vous {appointment_id}",
            row.original_filename,
            row.size_bytes
        );
        Ok(row)
    }

    pub async fn list(
        pool: &PgPool,
        appointment_id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<Vec<CourseFile>, AppError> {
        let appointment = AppointmentService::get(pool, appointment_id).await?;
        authorize_party(&appointment, user)?;

        let rows = sqlx::query_as::<_, CourseFile>(&format!(
            "SELECT {FILE_COLS} FROM course_files
             WHERE appointment_id = $1 ORDER BY created_at DESC"
        ))
        .bind(appointment_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Retourne la fiche et le contenu, octet pour octet.
    pub async fn download(
        pool: &PgPool,
        store: &FileStore,
        file_id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<(CourseFile, Vec<u8>), AppError> {
        let file = Self::get(pool, file_id).await?;
        let appointment = AppointmentService::get(pool, file.appointment_id).await?;
        authorize_party(&appointment, user)?;

        let bytes = store.read(&file.storage_path).await?;
        Ok((file, bytes))
    }

    /// Suppression : réservée à l'utilisateur qui a déposé le fichier, ou à
    /// l'admin. La règle est la même quel que soit le rôle appelant.
    pub async fn delete(
        pool: &PgPool,
        store: &FileStore,
        file_id: Uuid,
        user: &AuthenticatedUser,
    ) -> Result<(), AppError> {
        let file = Self::get(pool, file_id).await?;
        if user.role != Role::Admin && file.uploader_id != user.user_id {
            return Err(AppError::forbidden());
        }

        sqlx::query("DELETE FROM course_files WHERE id = $1")
            .bind(file_id)
            .execute(pool)
            .await?;
        store.delete(&file.storage_path).await;
        Ok(())
    }

    async fn get(pool: &PgPool, file_id: Uuid) -> Result<CourseFile, AppError> {
        sqlx::query_as::<_, CourseFile>(&format!(
            "SELECT {FILE_COLS} FROM course_files WHERE id = $1"
        ))
        .bind(file_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Fichier non trouvé"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn liste_blanche_des_types() {
        assert_eq!(category_for("application/pdf"), Some(FileCategory::Pdf));
        assert_eq!(category_for("image/png"), Some(FileCategory::Image));
        assert_eq!(
            category_for("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
            Some(FileCategory::Word)
        );
        assert_eq!(
            category_for("application/vnd.ms-excel"),
            Some(FileCategory::Excel)
        );
        assert_eq!(category_for("text/plain"), Some(FileCategory::Other));

        assert_eq!(category_for("application/zip"), None);
        assert_eq!(category_for("video/mp4"), None);
        assert_eq!(category_for("application/octet-stream"), None);
    }

    #[test]
    fn limite_de_taille_a_la_frontiere() {
        // exactement 20 Mio : accepté
        assert!(validate_upload("application/pdf", MAX_FILE_BYTES).is_ok());
        // un octet de plus : refusé avant toute écriture
        assert!(matches!(
            validate_upload("application/pdf", MAX_FILE_BYTES + 1),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn type_refuse_meme_petit() {
        assert!(matches!(
            validate_upload("application/zip", 10),
            Err(AppError::Validation(_))
        ));
    }
}
