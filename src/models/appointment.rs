use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Cycle de vie d'un rendez-vous. La table de transitions est la seule
/// source de vérité — toute mutation de statut passe par `can_transition`.
///
/// pending → assigned (assignation uniquement)
/// assigned → confirmed | completed | cancelled
/// confirmed → completed | cancelled
/// pending → cancelled
/// completed / cancelled : terminaux
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Assigned,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn can_transition(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        match (self, next) {
            (Pending, Assigned) => true,
            (Assigned, Confirmed) => true,
            (Assigned, Completed) | (Confirmed, Completed) => true,
            (Pending, Cancelled) | (Assigned, Cancelled) | (Confirmed, Cancelled) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

impl std::fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Assigned => "assigned",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AppointmentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AppointmentStatus::Pending),
            "assigned" => Ok(AppointmentStatus::Assigned),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Unknown appointment status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Online,
    Home,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Location::Online => "online",
            Location::Home => "home",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Location {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(Location::Online),
            "home" => Ok(Location::Home),
            _ => Err(anyhow::anyhow!("Unknown location: {s}")),
        }
    }
}

/// DB row struct — enum columns are fetched as TEXT (status::TEXT,
/// location::TEXT) to bypass the SQLx enum OID mismatch.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub parent_name: String,
    pub parent_email: String,
    pub parent_phone: String,
    pub student_name: String,
    pub subject: String,
    pub level: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub duration: f64,
    pub location: String,
    pub notes: String,
    pub price_per_hour: f64,
    pub total_amount: f64,
    pub is_trial_course: bool,
    pub assigned_teacher_id: Option<Uuid>,
    pub assigned_teacher_name: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Request/Response DTOs

/// Création d'un rendez-vous. L'identité du parent vient du token et la
/// tarification est calculée côté serveur — le client n'envoie jamais de prix.
#[derive(Debug, Deserialize)]
pub struct CreateAppointmentRequest {
    pub student_name: String,
    pub subject: String,
    pub level: String,
    pub preferred_date: NaiveDate,
    pub preferred_time: NaiveTime,
    pub duration: f64,
    pub location: Location,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignTeacherRequest {
    pub teacher_id: Uuid,
    pub teacher_name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentStatusBody {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PriceQuote {
    pub price_per_hour: f64,
    pub total_amount: f64,
    pub is_trial_course: bool,
}

/// Vue réduite d'un enseignant approuvé, pour la sélection d'assignation.
#[derive(Debug, Clone, Serialize)]
pub struct TeacherSummary {
    pub id: Uuid,
    pub full_name: String,
    pub subjects: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::AppointmentStatus::*;

    const ALL: [super::AppointmentStatus; 5] = [Pending, Assigned, Confirmed, Completed, Cancelled];

    #[test]
    fn table_des_transitions() {
        assert!(Pending.can_transition(Assigned));
        assert!(Pending.can_transition(Cancelled));
        assert!(Assigned.can_transition(Confirmed));
        assert!(Assigned.can_transition(Completed));
        assert!(Assigned.can_transition(Cancelled));
        assert!(Confirmed.can_transition(Completed));
        assert!(Confirmed.can_transition(Cancelled));
    }

    #[test]
    fn etats_terminaux_sans_sortie() {
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            for to in ALL {
                assert!(!from.can_transition(to), "{from} → {to} devrait être refusé");
            }
        }
    }

    #[test]
    fn transitions_refusees() {
        assert!(!Completed.can_transition(Assigned));
        assert!(!Pending.can_transition(Confirmed));
        assert!(!Pending.can_transition(Completed));
        assert!(!Confirmed.can_transition(Assigned));
        // pas de retour en arrière ni d'auto-transition
        for s in ALL {
            assert!(!s.can_transition(Pending));
            assert!(!s.can_transition(s));
        }
    }
}
