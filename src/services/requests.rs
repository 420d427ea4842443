use axum::extract::Multipart;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::request::{
    CreateParentRequest, ParentRequest, RequestStatus, TeacherRequest, TeacherSignupFields,
};
use crate::services::files;
use crate::services::storage::FileStore;

const PARENT_COLS: &str =
    "id, parent_name, email, phone, address, password_hash, children, message,
     status::TEXT as status, created_at, updated_at";

const TEACHER_COLS: &str =
    "id, full_name, email, phone, password_hash, qualification, experience, subjects,
     availability, motivation, cv_filename, cv_path, status::TEXT as status,
     created_at, updated_at";

const BCRYPT_COST: u32 = 12;

async fn email_taken(pool: &PgPool, table: &str, email: &str) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar(&format!(
        "SELECT EXISTS(SELECT 1 FROM {table} WHERE LOWER(email) = LOWER($1))"
    ))
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(exists)
}

pub struct ParentRequestService;

impl ParentRequestService {
    pub async fn signup(
        pool: &PgPool,
        req: &CreateParentRequest,
    ) -> Result<ParentRequest, AppError> {
        let mut missing = Vec::new();
        if req.parent_name.trim().is_empty() {
            missing.push("parent_name");
        }
        if !req.email.contains('@') {
            missing.push("email");
        }
        if req.phone.trim().is_empty() {
            missing.push("phone");
        }
        if req.children.is_empty() {
            missing.push("children");
        }
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "Champs obligatoires manquants : {}",
                missing.join(", ")
            )));
        }
        for child in &req.children {
            if child.name.trim().is_empty() || child.subjects.is_empty() {
                return Err(AppError::validation(
                    "Chaque enfant doit avoir un nom et au moins une matière",
                ));
            }
        }
        if req.password.len() < 8 {
            return Err(AppError::validation(
                "Le mot de passe doit contenir au moins 8 caractères",
            ));
        }

        if email_taken(pool, "parent_requests", &req.email).await? {
            return Err(AppError::Conflict(
                "Une demande avec cet email existe déjà".into(),
            ));
        }

        let password_hash = bcrypt::hash(&req.password, BCRYPT_COST)
            .map_err(|e| AppError::Internal(e.into()))?;

        let row = sqlx::query_as::<_, ParentRequest>(&format!(
            "INSERT INTO parent_requests
             (parent_name, email, phone, address, password_hash, children, message)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {PARENT_COLS}"
        ))
        .bind(req.parent_name.trim())
        .bind(req.email.to_lowercase())
        .bind(req.phone.trim())
        .bind(&req.address)
        .bind(&password_hash)
        .bind(Json(&req.children))
        .bind(&req.message)
        .fetch_one(pool)
        .await?;

        tracing::info!("demande parent créée : {}", row.id);
        Ok(row)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<ParentRequest>, AppError> {
        let rows = sqlx::query_as::<_, ParentRequest>(&format!(
            "SELECT {PARENT_COLS} FROM parent_requests ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<ParentRequest, AppError> {
        sqlx::query_as::<_, ParentRequest>(&format!(
            "SELECT {PARENT_COLS} FROM parent_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Demande non trouvée"))
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        requested: RequestStatus,
    ) -> Result<ParentRequest, AppError> {
        set_request_status::<ParentRequest>(pool, "parent_requests", PARENT_COLS, id, requested)
            .await
    }

    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM parent_requests WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Demande non trouvée"));
        }
        Ok(())
    }
}

pub struct TeacherRequestService;

impl TeacherRequestService {
    /// La candidature enseignant arrive en multipart : champs texte + CV
    /// optionnel. Le CV passe par la même liste blanche que les fichiers de
    /// cours et n'est écrit qu'après validation complète.
    pub async fn signup(
        pool: &PgPool,
        store: &FileStore,
        mut multipart: Multipart,
    ) -> Result<TeacherRequest, AppError> {
        let mut fields = TeacherSignupFields::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::validation(e.to_string()))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "cv" => {
                    let filename = field.file_name().unwrap_or("cv.pdf").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::validation(e.to_string()))?
                        .to_vec();
                    files::validate_upload(&content_type, bytes.len())?;
                    fields.cv = Some((bytes, filename));
                }
                "subjects" => {
                    let raw = field.text().await.map_err(|e| AppError::validation(e.to_string()))?;
                    fields.subjects = serde_json::from_str(&raw)
                        .map_err(|_| AppError::validation("subjects doit être un tableau JSON"))?;
                }
                other => {
                    let value = field.text().await.map_err(|e| AppError::validation(e.to_string()))?;
                    match other {
                        "full_name" => fields.full_name = value,
                        "email" => fields.email = value,
                        "phone" => fields.phone = value,
                        "password" => fields.password = value,
                        "qualification" => fields.qualification = value,
                        "experience" => fields.experience = value,
                        "availability" => fields.availability = value,
                        "motivation" => fields.motivation = value,
                        _ => {}
                    }
                }
            }
        }

        let mut missing = Vec::new();
        if fields.full_name.trim().is_empty() {
            missing.push("full_name");
        }
        if !fields.email.contains('@') {
            missing.push("email");
        }
        if fields.phone.trim().is_empty() {
            missing.push("phone");
        }
        if fields.qualification.trim().is_empty() {
            missing.push("qualification");
        }
        if fields.experience.trim().is_empty() {
            missing.push("experience");
        }
        if fields.subjects.is_empty() {
            missing.push("subjects");
        }
        if fields.motivation.trim().is_empty() {
            missing.push("motivation");
        }
        if !missing.is_empty() {
            return Err(AppError::validation(format!(
                "Champs obligatoires manquants : {}",
                missing.join(", ")
            )));
        }
        if fields.password.len() < 8 {
            return Err(AppError::validation(
                "Le mot de passe doit contenir au moins 8 caractères",
            ));
        }

        if email_taken(pool, "teacher_requests", &fields.email).await? {
            return Err(AppError::Conflict(
                "Une candidature avec cet email existe déjà".into(),
            ));
        }

        let (cv_filename, cv_path) = match &fields.cv {
            Some((bytes, filename)) => {
                let path = store.save("cvs", filename, bytes).await?;
                (Some(filename.clone()), Some(path))
            }
            None => (None, None),
        };

        let password_hash = bcrypt::hash(&fields.password, BCRYPT_COST)
            .map_err(|e| AppError::Internal(e.into()))?;

        let inserted = sqlx::query_as::<_, TeacherRequest>(&format!(
            "INSERT INTO teacher_requests
             (full_name, email, phone, password_hash, qualification, experience,
              subjects, availability, motivation, cv_filename, cv_path)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {TEACHER_COLS}"
        ))
        .bind(fields.full_name.trim())
        .bind(fields.email.to_lowercase())
        .bind(fields.phone.trim())
        .bind(&password_hash)
        .bind(fields.qualification.trim())
        .bind(fields.experience.trim())
        .bind(Json(&fields.subjects))
        .bind(&fields.availability)
        .bind(&fields.motivation)
        .bind(&cv_filename)
        .bind(&cv_path)
        .fetch_one(pool)
        .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) => {
                // Le CV déjà écrit ne doit pas rester orphelin sur disque.
                discard_cv(store, &cv_path).await;
                return Err(match e {
                    // Deux candidatures concurrentes avec le même email :
                    // la seconde perd sur la contrainte d'unicité.
                    sqlx::Error::Database(db)
                        if db.constraint() == Some("teacher_requests_email_key") =>
                    {
                        AppError::Conflict("Une candidature avec cet email existe déjà".into())
                    }
                    other => other.into(),
                });
            }
        };

        tracing::info!("candidature enseignant créée : {}", row.id);
        Ok(row)
    }

    pub async fn list(pool: &PgPool) -> Result<Vec<TeacherRequest>, AppError> {
        let rows = sqlx::query_as::<_, TeacherRequest>(&format!(
            "SELECT {TEACHER_COLS} FROM teacher_requests ORDER BY created_at DESC"
        ))
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn get(pool: &PgPool, id: Uuid) -> Result<TeacherRequest, AppError> {
        sqlx::query_as::<_, TeacherRequest>(&format!(
            "SELECT {TEACHER_COLS} FROM teacher_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Candidature non trouvée"))
    }

    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        requested: RequestStatus,
    ) -> Result<TeacherRequest, AppError> {
        set_request_status::<TeacherRequest>(pool, "teacher_requests", TEACHER_COLS, id, requested)
            .await
    }

    pub async fn delete(pool: &PgPool, store: &FileStore, id: Uuid) -> Result<(), AppError> {
        let row = Self::get(pool, id).await?;
        sqlx::query("DELETE FROM teacher_requests WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if let Some(cv_path) = row.cv_path {
            store.delete(&cv_path).await;
        }
        Ok(())
    }
}

/// Retire du stockage le CV d'une candidature qui n'a pas abouti.
async fn discard_cv(store: &FileStore, cv_path: &Option<String>) {
    if let Some(path) = cv_path {
        store.delete(path).await;
    }
}

/// Transition commune aux deux types de demande : pending → approved|rejected.
/// Répéter le statut courant est un no-op idempotent, signalé comme redondant.
/// La mise à jour est gardée sur le statut courant (compare-and-swap).
async fn set_request_status<R>(
    pool: &PgPool,
    table: &str,
    cols: &str,
    id: Uuid,
    requested: RequestStatus,
) -> Result<R, AppError>
where
    R: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    let current_str: String = sqlx::query_scalar(&format!(
        "SELECT status::TEXT FROM {table} WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("Demande non trouvée"))?;
    let current: RequestStatus = current_str.parse()?;

    if current == requested {
        tracing::warn!("{table} {id} : transition redondante vers {requested}");
        let row = sqlx::query_as::<_, R>(&format!("SELECT {cols} FROM {table} WHERE id = $1"))
            .bind(id)
            .fetch_one(pool)
            .await?;
        return Ok(row);
    }

    if !current.can_transition(requested) {
        return Err(AppError::invalid_transition(
            current.to_string(),
            requested.to_string(),
        ));
    }

    let updated = sqlx::query_as::<_, R>(&format!(
        "UPDATE {table} SET status = $1::request_status
         WHERE id = $2 AND status = $3::request_status
         RETURNING {cols}"
    ))
    .bind(requested.to_string())
    .bind(id)
    .bind(current.to_string())
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(row) => {
            tracing::info!("{table} {id} : {current} → {requested}");
            Ok(row)
        }
        None => {
            let now: String = sqlx::query_scalar(&format!(
                "SELECT status::TEXT FROM {table} WHERE id = $1"
            ))
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::not_found("Demande non trouvée"))?;
            Err(AppError::invalid_transition(now, requested.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cv_retire_si_la_candidature_echoue() {
        let dir = std::env::temp_dir().join(format!("cv-test-{}", Uuid::new_v4()));
        let store = FileStore::new(dir);
        let path = store.save("cvs", "cv.pdf", b"contenu du cv").await.unwrap();

        // insertion échouée : le CV déjà écrit est retiré du stockage
        discard_cv(&store, &Some(path.clone())).await;
        assert!(store.read(&path).await.is_err());

        // candidature sans CV : rien à retirer
        discard_cv(&store, &None).await;
    }
}
