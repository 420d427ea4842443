use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::auth::{AuthProfile, Claims, LoginRequest, LoginResponse, Role};
use crate::models::request::RequestStatus;

pub struct AuthService;

impl AuthService {
    /// Connexion par rôle. Les parents et enseignants se connectent sur leur
    /// demande d'inscription : seule une demande approuvée ouvre l'accès.
    pub async fn login(
        pool: &PgPool,
        req: &LoginRequest,
        jwt_secret: &str,
        expiry_seconds: u64,
    ) -> Result<LoginResponse, AppError> {
        let (id, name, password_hash, status) = match req.role {
            Role::Admin => {
                let row: Option<(Uuid, String, String)> = sqlx::query_as(
                    "SELECT id, full_name, password_hash FROM admin_accounts
                     WHERE LOWER(email) = LOWER($1)",
                )
                .bind(&req.email)
                .fetch_optional(pool)
                .await?;
                let (id, name, hash) = row.ok_or_else(invalid_credentials)?;
                (id, name, hash, None)
            }
            Role::Parent => {
                let row: Option<(Uuid, String, String, String)> = sqlx::query_as(
                    "SELECT id, parent_name, password_hash, status::TEXT
                     FROM parent_requests WHERE LOWER(email) = LOWER($1)",
                )
                .bind(&req.email)
                .fetch_optional(pool)
                .await?;
                let (id, name, hash, status) = row.ok_or_else(invalid_credentials)?;
                (id, name, hash, Some(status))
            }
            Role::Teacher => {
                let row: Option<(Uuid, String, String, String)> = sqlx::query_as(
                    "SELECT id, full_name, password_hash, status::TEXT
                     FROM teacher_requests WHERE LOWER(email) = LOWER($1)",
                )
                .bind(&req.email)
                .fetch_optional(pool)
                .await?;
                let (id, name, hash, status) = row.ok_or_else(invalid_credentials)?;
                (id, name, hash, Some(status))
            }
        };

        let valid = bcrypt::verify(&req.password, &password_hash)
            .map_err(|_| invalid_credentials())?;
        if !valid {
            return Err(invalid_credentials());
        }

        // Le mot de passe d'abord : ne pas révéler le statut d'une demande à
        // qui ne le connaît pas.
        if let Some(status) = status {
            let status: RequestStatus = status.parse()?;
            if status != RequestStatus::Approved {
                return Err(AppError::Forbidden(
                    "Votre demande n'a pas encore été approuvée".into(),
                ));
            }
        }

        let access_token =
            generate_access_token(id, &name, req.role, jwt_secret, expiry_seconds)?;

        tracing::info!("connexion {} réussie : {}", req.role, req.email);

        Ok(LoginResponse {
            access_token,
            user: AuthProfile {
                id,
                name,
                email: req.email.to_lowercase(),
                role: req.role,
            },
        })
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Email ou mot de passe incorrect".into())
}

pub fn generate_access_token(
    user_id: Uuid,
    name: &str,
    role: Role,
    secret: &str,
    expiry_seconds: u64,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        name: name.to_string(),
        role,
        iat: now,
        exp: now + expiry_seconds as usize,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.into()))
}
