use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Backend de persistance de l'historique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Sqlite,
    Json,
}

/// Paramètres de la sélection gloutonne.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub frequency_weight: f64,
    pub recency_weight: f64,
    /// Dépassement toléré sur chacune des quatre cibles pair/impair/bas/haut.
    pub slack: usize,
    /// Longueur des listes "plus fréquents" et "plus en retard".
    pub top_count: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            frequency_weight: 0.6,
            recency_weight: 0.4,
            slack: 2,
            top_count: 10,
        }
    }
}

impl SelectionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {:?}", path))?;
        let config: SelectionConfig = serde_json::from_str(&json)
            .with_context(|| format!("Configuration invalide : {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.frequency_weight < 0.0 || self.recency_weight < 0.0 {
            bail!("Les poids doivent être positifs");
        }
        if (self.frequency_weight + self.recency_weight - 1.0).abs() > 1e-9 {
            bail!(
                "Les poids doivent totaliser 1.0 (fréquence {} + retard {})",
                self.frequency_weight,
                self.recency_weight
            );
        }
        Ok(())
    }
}
