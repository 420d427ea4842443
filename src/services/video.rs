use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Convention de nommage des salles : une salle par rendez-vous.
pub fn room_id_for(appointment_id: Uuid) -> String {
    format!("course_{appointment_id}")
}

/// Frontière avec le fournisseur de visioconférence. Le cœur du workflow ne
/// connaît que l'émission d'un jeton d'accès ; le cycle de vie de la salle et
/// le média sont entièrement externes.
pub trait RoomProvider: Send + Sync {
    fn create_room_token(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
    ) -> anyhow::Result<String>;
}

#[derive(Debug, Serialize, Deserialize)]
struct RoomClaims {
    sub: String,
    room: String,
    name: String,
    exp: usize,
    iat: usize,
}

const ROOM_TOKEN_TTL_SECS: usize = 2 * 3600;

/// Fournisseur par défaut : jeton HS256 signé localement, que la passerelle
/// visio vérifie avec le même secret.
pub struct JwtRoomProvider {
    secret: String,
}

impl JwtRoomProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl RoomProvider for JwtRoomProvider {
    fn create_room_token(
        &self,
        room_id: &str,
        user_id: &str,
        user_name: &str,
    ) -> anyhow::Result<String> {
        let now = Utc::now().timestamp() as usize;
        let claims = RoomClaims {
            sub: user_id.to_string(),
            room: room_id.to_string(),
            name: user_name.to_string(),
            iat: now,
            exp: now + ROOM_TOKEN_TTL_SECS,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    #[test]
    fn convention_de_salle() {
        let id = Uuid::nil();
        assert_eq!(
            room_id_for(id),
            "course_00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn jeton_verifiable_avec_le_meme_secret() {
        let provider = JwtRoomProvider::new("secret-de-test");
        let token = provider
            .create_room_token("course_abc", "user-1", "Mme Dupont")
            .unwrap();

        let data = decode::<RoomClaims>(
            &token,
            &DecodingKey::from_secret(b"secret-de-test"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(data.claims.room, "course_abc");
        assert_eq!(data.claims.name, "Mme Dupont");
    }
}
