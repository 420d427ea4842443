//! Jeu de données de démonstration
//!
//! Remplit la base avec des données francophones réalistes :
//! - 1 compte admin
//! - 2 demandes parent approuvées (avec enfants)
//! - 3 candidatures enseignant approuvées + 1 en attente
//! - 3 rendez-vous (essai gratuit, assigné, confirmé)
//!
//! Usage :
//!   DATABASE_URL=... ./seed-demo --password Demo2024!

use anyhow::{Context, Result};
use chrono::{Duration, NaiveTime, Utc};
use clap::Parser;
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

#[derive(Parser)]
#[command(about = "Remplit la base avec des données de démonstration")]
struct Args {
    /// Mot de passe commun à tous les comptes de démonstration
    #[arg(long, default_value = "Demo2024!")]
    password: String,

    /// Vide les tables avant de les remplir
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;

    println!("=== Seed démo ===");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    if args.reset {
        println!("Nettoyage des tables...");
        for table in [
            "course_files",
            "appointments",
            "teacher_requests",
            "parent_requests",
            "admin_accounts",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&pool)
                .await
                .with_context(|| format!("Failed to clean {table}"))?;
        }
    }

    // coût 10 pour la vitesse du seed
    let password_hash = bcrypt::hash(&args.password, 10).context("Failed to hash password")?;

    // 1. Compte admin
    println!("Compte admin...");
    sqlx::query(
        "INSERT INTO admin_accounts (email, password_hash, full_name)
         VALUES ($1, $2, $3)
         ON CONFLICT (email) DO UPDATE SET password_hash = EXCLUDED.password_hash",
    )
    .bind("admin@demo.tutorat.fr")
    .bind(&password_hash)
    .bind("Claire Admin")
    .execute(&pool)
    .await
    .context("Failed to insert admin")?;

    // 2. Demandes parent approuvées
    println!("Demandes parent...");
    let parent1_id = Uuid::new_v4();
    let parent2_id = Uuid::new_v4();

    let parents = [
        (
            parent1_id,
            "Sophie Martin",
            "sophie@demo.tutorat.fr",
            "06 12 34 56 78",
            json!([{
                "name": "Lucas",
                "school_level": "4ème",
                "subjects": ["Mathématiques", "Physique-Chimie"],
                "course_formula": "hebdomadaire",
                "objectives": "Remonter la moyenne en maths"
            }]),
        ),
        (
            parent2_id,
            "Karim Benali",
            "karim@demo.tutorat.fr",
            "06 98 76 54 32",
            json!([{
                "name": "Lina",
                "school_level": "Terminale",
                "subjects": ["Mathématiques", "Anglais"],
                "course_formula": "intensif",
                "objectives": "Préparation au bac"
            }]),
        ),
    ];

    for (id, name, email, phone, children) in &parents {
        sqlx::query(
            "INSERT INTO parent_requests
             (id, parent_name, email, phone, password_hash, children, status)
             VALUES ($1, $2, $3, $4, $5, $6, 'approved')
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(&password_hash)
        .bind(children)
        .execute(&pool)
        .await
        .with_context(|| format!("Failed to insert parent {email}"))?;
    }

    // 3. Candidatures enseignant
    println!("Candidatures enseignant...");
    let teacher1_id = Uuid::new_v4();
    let teacher2_id = Uuid::new_v4();

    let teachers = [
        (
            teacher1_id,
            "Paul Durand",
            "paul@demo.tutorat.fr",
            "Agrégé de mathématiques",
            "10 ans en lycée",
            json!(["Mathématiques", "Physique-Chimie"]),
            "approved",
        ),
        (
            teacher2_id,
            "Amina Kebe",
            "amina@demo.tutorat.fr",
            "Master MEEF anglais",
            "5 ans de cours particuliers",
            json!(["Anglais"]),
            "approved",
        ),
        (
            Uuid::new_v4(),
            "Julien Moreau",
            "julien@demo.tutorat.fr",
            "Licence de lettres modernes",
            "3 ans de soutien scolaire",
            json!(["Français", "Mathématiques"]),
            "approved",
        ),
        (
            Uuid::new_v4(),
            "Eva Lambert",
            "eva@demo.tutorat.fr",
            "Doctorante en physique",
            "Première candidature",
            json!(["Physique-Chimie"]),
            "pending",
        ),
    ];

    for (id, name, email, qualification, experience, subjects, status) in &teachers {
        sqlx::query(
            "INSERT INTO teacher_requests
             (id, full_name, email, phone, password_hash, qualification, experience,
              subjects, motivation, status)
             VALUES ($1, $2, $3, '06 00 00 00 00', $4, $5, $6, $7,
                     'Transmettre le goût d''apprendre', $8::request_status)
             ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(&password_hash)
        .bind(qualification)
        .bind(experience)
        .bind(subjects)
        .bind(status)
        .execute(&pool)
        .await
        .with_context(|| format!("Failed to insert teacher {email}"))?;
    }

    // 4. Rendez-vous
    println!("Rendez-vous...");
    let today = Utc::now().date_naive();
    let afternoon = NaiveTime::from_hms_opt(17, 0, 0).context("invalid time")?;

    // Essai gratuit de Sophie, encore en attente d'assignation.
    sqlx::query(
        "INSERT INTO appointments
         (parent_id, parent_name, parent_email, parent_phone, student_name, subject, level,
          preferred_date, preferred_time, duration, location,
          price_per_hour, total_amount, is_trial_course)
         VALUES ($1, 'Sophie Martin', 'sophie@demo.tutorat.fr', '06 12 34 56 78',
                 'Lucas', 'Mathématiques', '4ème',
                 $2, $3, 1.0, 'online', 0, 0, TRUE)",
    )
    .bind(parent1_id)
    .bind(today + Duration::days(3))
    .bind(afternoon)
    .execute(&pool)
    .await
    .context("Failed to insert trial appointment")?;

    // Rendez-vous de Karim, déjà assigné à Paul.
    sqlx::query(
        "INSERT INTO appointments
         (parent_id, parent_name, parent_email, parent_phone, student_name, subject, level,
          preferred_date, preferred_time, duration, location,
          price_per_hour, total_amount, is_trial_course,
          assigned_teacher_id, assigned_teacher_name, status)
         VALUES ($1, 'Karim Benali', 'karim@demo.tutorat.fr', '06 98 76 54 32',
                 'Lina', 'Mathématiques', 'Terminale',
                 $2, $3, 2.0, 'home',
                 45, 90, FALSE, $4, 'Paul Durand', 'assigned')",
    )
    .bind(parent2_id)
    .bind(today + Duration::days(5))
    .bind(afternoon)
    .bind(teacher1_id)
    .execute(&pool)
    .await
    .context("Failed to insert assigned appointment")?;

    // Cours d'anglais confirmé par Amina.
    sqlx::query(
        "INSERT INTO appointments
         (parent_id, parent_name, parent_email, parent_phone, student_name, subject, level,
          preferred_date, preferred_time, duration, location,
          price_per_hour, total_amount, is_trial_course,
          assigned_teacher_id, assigned_teacher_name, status)
         VALUES ($1, 'Karim Benali', 'karim@demo.tutorat.fr', '06 98 76 54 32',
                 'Lina', 'Anglais', 'Terminale',
                 $2, $3, 1.5, 'online',
                 35, 52.5, FALSE, $4, 'Amina Kebe', 'confirmed')",
    )
    .bind(parent2_id)
    .bind(today + Duration::days(7))
    .bind(afternoon)
    .bind(teacher2_id)
    .execute(&pool)
    .await
    .context("Failed to insert confirmed appointment")?;

    println!();
    println!("=== Démo prête ===");
    println!("  Admin       : admin@demo.tutorat.fr");
    println!("  Parents     : sophie@demo.tutorat.fr, karim@demo.tutorat.fr");
    println!("  Enseignants : paul@, amina@, julien@ (approuvés), eva@ (en attente)");
    println!("  Mot de passe : {}", args.password);

    Ok(())
}
