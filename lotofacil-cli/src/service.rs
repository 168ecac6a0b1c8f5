use std::path::Path;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use tracing::info;

use lotofacil_db::db::{migrate, open_db, DrawStore};
use lotofacil_db::json_store::JsonDrawStore;
use lotofacil_db::models::{Draw, NumberSet};

use crate::config::StoreKind;

pub fn open_store(kind: StoreKind, path: &Path) -> Result<Box<dyn DrawStore>> {
    match kind {
        StoreKind::Sqlite => {
            let conn = open_db(path)?;
            migrate(&conn)?;
            Ok(Box::new(conn))
        }
        StoreKind::Json => Ok(Box::new(JsonDrawStore::new(path))),
    }
}

/// Enregistre un nouveau tirage ; un numéro de concours déjà présent est une erreur.
pub fn save_draw(
    store: &dyn DrawStore,
    contest_number: u32,
    date: NaiveDate,
    numbers: &[u8],
) -> Result<Draw> {
    if store.find_by_contest(contest_number)?.is_some() {
        bail!("Le concours {} est déjà enregistré", contest_number);
    }

    let numbers = NumberSet::new(numbers)?;
    let draw = Draw::new(contest_number, date, numbers);
    store.save(&draw)?;
    info!("Concours {} enregistré", contest_number);
    Ok(draw)
}
