use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::db::DrawStore;
use crate::models::Draw;

/// Historique stocké dans un fichier `draws.json` (tableau trié par concours).
pub struct JsonDrawStore {
    path: PathBuf,
}

impl JsonDrawStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Fichier `draws.json` dans `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("draws.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<Draw>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let json = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Impossible de lire {:?}", self.path))?;
        if json.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut draws: Vec<Draw> = serde_json::from_str(&json)
            .with_context(|| format!("JSON invalide dans {:?}", self.path))?;
        draws.sort_by_key(|d| d.contest_number);
        Ok(draws)
    }

    pub fn write_all(&self, draws: &[Draw]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
        }
        let mut sorted = draws.to_vec();
        sorted.sort_by_key(|d| d.contest_number);
        let json = serde_json::to_string_pretty(&sorted)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Impossible d'écrire {:?}", self.path))?;
        debug!("{} tirages écrits dans {:?}", sorted.len(), self.path);
        Ok(())
    }
}

impl DrawStore for JsonDrawStore {
    fn save(&self, draw: &Draw) -> Result<bool> {
        let mut draws = self.read_all()?;
        if draws.iter().any(|d| d.contest_number == draw.contest_number) {
            return Ok(false);
        }
        draws.push(draw.clone());
        self.write_all(&draws)?;
        Ok(true)
    }

    fn load_history(&self) -> Result<Vec<Draw>> {
        self.read_all()
    }

    fn find_by_contest(&self, contest_number: u32) -> Result<Option<Draw>> {
        Ok(self
            .read_all()?
            .into_iter()
            .find(|d| d.contest_number == contest_number))
    }

    fn count(&self) -> Result<u32> {
        Ok(self.read_all()?.len() as u32)
    }

    fn save_all(&self, draws: &[Draw]) -> Result<(u32, u32)> {
        let mut stored = self.read_all()?;
        let mut inserted = 0;
        let mut skipped = 0;
        for draw in draws {
            if stored.iter().any(|d| d.contest_number == draw.contest_number) {
                skipped += 1;
            } else {
                stored.push(draw.clone());
                inserted += 1;
            }
        }
        if inserted > 0 {
            self.write_all(&stored)?;
        }
        Ok((inserted, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_draw;

    fn temp_store(name: &str) -> JsonDrawStore {
        let dir = std::env::temp_dir().join(format!("lotofacil-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        JsonDrawStore::in_dir(&dir)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let store = temp_store("missing");
        assert_eq!(store.count().unwrap(), 0);
        assert!(store.load_history().unwrap().is_empty());
    }

    #[test]
    fn test_save_sorts_and_skips_duplicates() {
        let store = temp_store("save");
        let numbers: Vec<u8> = (1..=15).collect();

        assert!(store.save(&test_draw(5, &numbers)).unwrap());
        assert!(store.save(&test_draw(2, &numbers)).unwrap());
        assert!(!store.save(&test_draw(5, &numbers)).unwrap());

        let contests: Vec<u32> = store
            .load_history()
            .unwrap()
            .iter()
            .map(|d| d.contest_number)
            .collect();
        assert_eq!(contests, vec![2, 5]);
        assert!(store.find_by_contest(2).unwrap().is_some());
        assert!(store.find_by_contest(3).unwrap().is_none());

        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }

    #[test]
    fn test_save_all_writes_once() {
        let store = temp_store("batch");
        let numbers: Vec<u8> = (1..=15).collect();
        let draws = vec![test_draw(3, &numbers), test_draw(1, &numbers), test_draw(3, &numbers)];

        assert_eq!(store.save_all(&draws).unwrap(), (2, 1));
        let history = store.load_history().unwrap();
        assert_eq!(history[0].contest_number, 1);
        assert_eq!(history[1].contest_number, 3);

        let _ = std::fs::remove_dir_all(store.path().parent().unwrap());
    }
}
