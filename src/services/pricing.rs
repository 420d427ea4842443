use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::appointment::{AppointmentStatus, Location, PriceQuote};

/// Tarif horaire en euros selon le lieu du cours.
pub const ONLINE_RATE: f64 = 35.0;
pub const HOME_RATE: f64 = 45.0;

/// Durées de cours acceptées, en heures.
pub const ALLOWED_DURATIONS: [f64; 5] = [1.0, 1.5, 2.0, 2.5, 3.0];

/// Un cours d'essai annulé compte-t-il comme « essai utilisé » ?
/// `CountCancelled` reproduit le comportement historique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialPolicy {
    CountCancelled,
    IgnoreCancelled,
}

impl TrialPolicy {
    pub fn from_config(counts_cancelled: bool) -> Self {
        if counts_cancelled {
            TrialPolicy::CountCancelled
        } else {
            TrialPolicy::IgnoreCancelled
        }
    }
}

/// Un rendez-vous d'essai dans cet état consomme-t-il l'essai du parent ?
pub fn trial_counts(status: AppointmentStatus, policy: TrialPolicy) -> bool {
    match policy {
        TrialPolicy::CountCancelled => true,
        TrialPolicy::IgnoreCancelled => status != AppointmentStatus::Cancelled,
    }
}

/// Éligibilité sur l'ensemble des essais existants du parent.
pub fn any_trial_counts(statuses: &[AppointmentStatus], policy: TrialPolicy) -> bool {
    statuses.iter().any(|s| trial_counts(*s, policy))
}

pub fn validate_duration(duration: f64) -> Result<(), AppError> {
    if ALLOWED_DURATIONS.contains(&duration) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Durée invalide : {duration}. Valeurs acceptées : 1, 1.5, 2, 2.5, 3 heures"
        )))
    }
}

/// Calcule la tarification d'un prochain rendez-vous. Premier rendez-vous
/// (essai non utilisé) : gratuit. Sinon 35 €/h en ligne, 45 €/h à domicile ;
/// le montant garde la durée fractionnaire (1.5 h en ligne → 52.5).
pub fn quote(
    has_used_trial: bool,
    location: Location,
    duration: f64,
) -> Result<PriceQuote, AppError> {
    validate_duration(duration)?;

    if !has_used_trial {
        return Ok(PriceQuote {
            price_per_hour: 0.0,
            total_amount: 0.0,
            is_trial_course: true,
        });
    }

    let price_per_hour = match location {
        Location::Online => ONLINE_RATE,
        Location::Home => HOME_RATE,
    };

    Ok(PriceQuote {
        price_per_hour,
        total_amount: price_per_hour * duration,
        is_trial_course: false,
    })
}

pub struct PricingService;

impl PricingService {
    /// Vrai si un rendez-vous d'essai du parent consomme l'essai selon la
    /// politique en vigueur.
    pub async fn has_used_trial(
        pool: &PgPool,
        parent_id: Uuid,
        policy: TrialPolicy,
    ) -> Result<bool, AppError> {
        let statuses: Vec<String> = sqlx::query_scalar(
            "SELECT status::TEXT FROM appointments
             WHERE parent_id = $1 AND is_trial_course",
        )
        .bind(parent_id)
        .fetch_all(pool)
        .await?;

        let statuses: Vec<AppointmentStatus> = statuses
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect();
        Ok(any_trial_counts(&statuses, policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::appointment::AppointmentStatus::*;

    #[test]
    fn premier_rendez_vous_gratuit() {
        let q = quote(false, Location::Home, 2.0).unwrap();
        assert!(q.is_trial_course);
        assert_eq!(q.price_per_hour, 0.0);
        assert_eq!(q.total_amount, 0.0);
    }

    #[test]
    fn tarif_en_ligne_apres_essai() {
        // scénario : A1 essai gratuit, puis A2 en ligne d'une heure
        let q = quote(true, Location::Online, 1.0).unwrap();
        assert!(!q.is_trial_course);
        assert_eq!(q.price_per_hour, 35.0);
        assert_eq!(q.total_amount, 35.0);
    }

    #[test]
    fn montant_garde_la_duree_fractionnaire() {
        let q = quote(true, Location::Online, 1.5).unwrap();
        assert_eq!(q.total_amount, 52.5);

        let q = quote(true, Location::Home, 2.5).unwrap();
        assert_eq!(q.price_per_hour, 45.0);
        assert_eq!(q.total_amount, 112.5);
    }

    #[test]
    fn duree_hors_liste_refusee() {
        for d in [0.5, 1.25, 3.5, 0.0, -1.0] {
            assert!(matches!(
                quote(true, Location::Online, d),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn essai_annule_puis_nouvelle_reservation() {
        // seul essai existant du parent : annulé
        let statuses = [Cancelled];

        // politique historique : l'essai reste consommé, le prochain cours
        // est payant
        assert!(any_trial_counts(&statuses, TrialPolicy::CountCancelled));
        let q = quote(true, Location::Online, 1.0).unwrap();
        assert!(!q.is_trial_course);
        assert_eq!(q.total_amount, 35.0);

        // politique alternative : le parent redevient éligible et obtient
        // un nouvel essai gratuit (l'essai annulé est sorti de l'index
        // partiel, l'insertion ne peut plus entrer en conflit)
        assert!(!any_trial_counts(&statuses, TrialPolicy::IgnoreCancelled));
        let q = quote(false, Location::Online, 1.0).unwrap();
        assert!(q.is_trial_course);
        assert_eq!(q.price_per_hour, 0.0);
        assert_eq!(q.total_amount, 0.0);
    }

    #[test]
    fn essai_annule_selon_la_politique() {
        // comportement historique : l'essai annulé reste consommé
        assert!(trial_counts(Cancelled, TrialPolicy::CountCancelled));
        // politique alternative : un essai annulé redevient disponible
        assert!(!trial_counts(Cancelled, TrialPolicy::IgnoreCancelled));
        // un essai vivant ou terminé compte dans les deux cas
        for s in [Pending, Assigned, Confirmed, Completed] {
            assert!(trial_counts(s, TrialPolicy::CountCancelled));
            assert!(trial_counts(s, TrialPolicy::IgnoreCancelled));
        }
    }
}
