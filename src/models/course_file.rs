use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Pdf,
    Image,
    Word,
    Excel,
    Other,
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileCategory::Pdf => "pdf",
            FileCategory::Image => "image",
            FileCategory::Word => "word",
            FileCategory::Excel => "excel",
            FileCategory::Other => "other",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for FileCategory {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf" => Ok(FileCategory::Pdf),
            "image" => Ok(FileCategory::Image),
            "word" => Ok(FileCategory::Word),
            "excel" => Ok(FileCategory::Excel),
            "other" => Ok(FileCategory::Other),
            _ => Err(anyhow::anyhow!("Unknown file category: {s}")),
        }
    }
}

/// Document partagé sur un rendez-vous (CV exclus — ils vivent sur la
/// demande enseignant). Enum columns fetched as TEXT.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseFile {
    pub id: Uuid,
    pub appointment_id: Uuid,
    pub uploader_id: Uuid,
    pub uploader_role: String,
    pub uploader_name: String,
    pub original_filename: String,
    pub content_type: String,
    pub category: String,
    pub size_bytes: i64,
    pub description: Option<String>,
    #[serde(skip_serializing)]
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
}
