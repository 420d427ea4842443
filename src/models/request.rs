use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Cycle de vie des demandes d'inscription (parents et enseignants) :
/// pending → approved | rejected, rien d'autre hormis la suppression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl RequestStatus {
    pub fn can_transition(self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Approved)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "approved" => Ok(RequestStatus::Approved),
            "rejected" => Ok(RequestStatus::Rejected),
            _ => Err(anyhow::anyhow!("Unknown request status: {s}")),
        }
    }
}

/// Sous-fiche enfant d'une demande parent, stockée en JSONB dans l'ordre
/// de saisie.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Child {
    pub name: String,
    pub school_level: String,
    pub subjects: Vec<String>,
    #[serde(default)]
    pub course_formula: String,
    #[serde(default)]
    pub preferred_days: Vec<String>,
    #[serde(default)]
    pub preferred_slots: Vec<String>,
    #[serde(default)]
    pub objectives: String,
    #[serde(default)]
    pub special_needs: String,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub mindset: Vec<String>,
}

/// DB row struct — status is fetched as TEXT to avoid enum OID mismatch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ParentRequest {
    pub id: Uuid,
    pub parent_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub children: Json<Vec<Child>>,
    pub message: String,
    /// Stored as TEXT in queries (status::TEXT).
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TeacherRequest {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub qualification: String,
    pub experience: String,
    pub subjects: Json<Vec<String>>,
    pub availability: String,
    pub motivation: String,
    pub cv_filename: Option<String>,
    #[serde(skip_serializing)]
    pub cv_path: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Request/Response DTOs

#[derive(Debug, Deserialize)]
pub struct CreateParentRequest {
    pub parent_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub password: String,
    pub children: Vec<Child>,
    #[serde(default)]
    pub message: String,
}

/// Teacher signup arrives as multipart (fields + optional CV file);
/// this is the decoded field set.
#[derive(Debug, Default)]
pub struct TeacherSignupFields {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub qualification: String,
    pub experience: String,
    pub subjects: Vec<String>,
    pub availability: String,
    pub motivation: String,
    pub cv: Option<(Vec<u8>, String)>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequestStatusBody {
    pub status: RequestStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_approved_or_rejected() {
        assert!(RequestStatus::Pending.can_transition(RequestStatus::Approved));
        assert!(RequestStatus::Pending.can_transition(RequestStatus::Rejected));
    }

    #[test]
    fn approved_and_rejected_are_terminal() {
        for from in [RequestStatus::Approved, RequestStatus::Rejected] {
            for to in [
                RequestStatus::Pending,
                RequestStatus::Approved,
                RequestStatus::Rejected,
            ] {
                assert!(!from.can_transition(to), "{from} → {to} devrait être refusé");
            }
        }
    }
}
