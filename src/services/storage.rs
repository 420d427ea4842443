use std::path::{Path, PathBuf};
use std::time::Duration;

use uuid::Uuid;

use crate::error::AppError;

/// Délai maximal pour une opération disque.
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Stockage binaire local. Les fichiers sont nommés par uuid (l'extension
/// d'origine est conservée) — le nom d'origine ne touche jamais le disque.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn full_path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    /// Écrit `bytes` sous `subdir/` et retourne le chemin relatif stocké en
    /// base. Une tentative est rejouée après un premier échec d'E/S.
    pub async fn save(
        &self,
        subdir: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<String, AppError> {
        let dir = self.root.join(subdir);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let relative = format!("{subdir}/{}.{ext}", Uuid::new_v4());
        let full = self.root.join(&relative);

        if let Err(first) = write_with_timeout(&full, bytes).await {
            tracing::warn!("écriture de {relative} échouée ({first}), nouvelle tentative");
            write_with_timeout(&full, bytes)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;
        }

        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> Result<Vec<u8>, AppError> {
        let full = self.root.join(relative);
        match read_with_timeout(&full).await {
            Ok(bytes) => Ok(bytes),
            Err(first) => {
                tracing::warn!("lecture de {relative} échouée ({first}), nouvelle tentative");
                read_with_timeout(&full)
                    .await
                    .map_err(|e| AppError::Storage(e.to_string()))
            }
        }
    }

    /// Suppression silencieuse : un fichier déjà absent n'est pas une erreur.
    pub async fn delete(&self, relative: &str) {
        let _ = tokio::fs::remove_file(self.root.join(relative)).await;
    }
}

async fn write_with_timeout(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    tokio::time::timeout(IO_TIMEOUT, tokio::fs::write(path, bytes))
        .await
        .map_err(|_| anyhow::anyhow!("délai d'écriture dépassé"))??;
    Ok(())
}

async fn read_with_timeout(path: &Path) -> anyhow::Result<Vec<u8>> {
    let bytes = tokio::time::timeout(IO_TIMEOUT, tokio::fs::read(path))
        .await
        .map_err(|_| anyhow::anyhow!("délai de lecture dépassé"))??;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> FileStore {
        let dir = std::env::temp_dir().join(format!("filestore-test-{}", Uuid::new_v4()));
        FileStore::new(dir)
    }

    #[tokio::test]
    async fn save_then_read_round_trip() {
        let store = temp_store();
        let payload = b"contenu du document de cours".to_vec();

        let path = store.save("courses", "exercices.pdf", &payload).await.unwrap();
        assert!(path.starts_with("courses/"));
        assert!(path.ends_with(".pdf"));

        let back = store.read(&path).await.unwrap();
        assert_eq!(back, payload);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = temp_store();
        let path = store.save("courses", "note.txt", b"x").await.unwrap();
        store.delete(&path).await;
        store.delete(&path).await;
        assert!(store.read(&path).await.is_err());
    }
}
