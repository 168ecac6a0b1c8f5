use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::debug;

use crate::models::{Draw, NumberSet};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    contest_number  INTEGER PRIMARY KEY,
    draw_id         TEXT NOT NULL,
    date            TEXT NOT NULL,
    numbers         TEXT NOT NULL
);
";

/// Source de l'historique des tirages, quel que soit le support de stockage.
pub trait DrawStore {
    /// Retourne `false` si le concours existe déjà (la ligne existante est conservée).
    fn save(&self, draw: &Draw) -> Result<bool>;
    /// Historique complet, ordre chronologique (le plus ancien en premier).
    fn load_history(&self) -> Result<Vec<Draw>>;
    fn find_by_contest(&self, contest_number: u32) -> Result<Option<Draw>>;
    fn count(&self) -> Result<u32>;

    /// Enregistre un lot de tirages ; retourne (insérés, doublons ignorés).
    fn save_all(&self, draws: &[Draw]) -> Result<(u32, u32)> {
        let mut inserted = 0;
        let mut skipped = 0;
        for draw in draws {
            if self.save(draw)? {
                inserted += 1;
            } else {
                skipped += 1;
            }
        }
        Ok((inserted, skipped))
    }
}

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("lotofacil.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer le répertoire {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Impossible d'ouvrir la base {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Échec de la migration")?;
    debug!("Schéma SQLite à jour");
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (contest_number, draw_id, date, numbers)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            draw.contest_number,
            draw.id,
            draw.date,
            draw.numbers.to_string(),
        ],
    ).context("Échec de l'insertion")?;
    Ok(changed > 0)
}

fn draw_from_row(row: &Row<'_>) -> rusqlite::Result<Draw> {
    let raw_numbers: String = row.get(3)?;
    let numbers = raw_numbers
        .parse::<NumberSet>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    Ok(Draw {
        contest_number: row.get(0)?,
        id: row.get(1)?,
        date: row.get(2)?,
        numbers,
    })
}

pub fn fetch_all_draws(conn: &Connection) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(
        "SELECT contest_number, draw_id, date, numbers
         FROM draws ORDER BY contest_number ASC"
    )?;
    let draws = stmt
        .query_map([], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()
        .context("Lecture de l'historique impossible")?;
    Ok(draws)
}

pub fn find_draw(conn: &Connection, contest_number: u32) -> Result<Option<Draw>> {
    let draw = conn
        .query_row(
            "SELECT contest_number, draw_id, date, numbers FROM draws WHERE contest_number = ?1",
            [contest_number],
            draw_from_row,
        )
        .optional()?;
    Ok(draw)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}

impl DrawStore for Connection {
    fn save(&self, draw: &Draw) -> Result<bool> {
        insert_draw(self, draw)
    }

    fn load_history(&self) -> Result<Vec<Draw>> {
        fetch_all_draws(self)
    }

    fn find_by_contest(&self, contest_number: u32) -> Result<Option<Draw>> {
        find_draw(self, contest_number)
    }

    fn count(&self) -> Result<u32> {
        count_draws(self)
    }

    fn save_all(&self, draws: &[Draw]) -> Result<(u32, u32)> {
        let tx = self.unchecked_transaction()
            .context("Impossible de démarrer la transaction")?;
        let mut inserted = 0;
        let mut skipped = 0;
        for draw in draws {
            if insert_draw(&tx, draw)? {
                inserted += 1;
            } else {
                skipped += 1;
            }
        }
        tx.commit().context("Échec du commit")?;
        Ok((inserted, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_draw;

    fn first_fifteen() -> Vec<u8> {
        (1..=15).collect()
    }

    #[test]
    fn test_insert_and_count() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 0);

        insert_draw(&conn, &test_draw(1, &first_fifteen())).unwrap();
        assert_eq!(count_draws(&conn).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_ignored() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        let inserted = insert_draw(&conn, &test_draw(1, &first_fifteen())).unwrap();
        assert!(inserted);
        let other: Vec<u8> = (2..=16).collect();
        let inserted = insert_draw(&conn, &test_draw(1, &other)).unwrap();
        assert!(!inserted);
        assert_eq!(count_draws(&conn).unwrap(), 1);
        let kept = find_draw(&conn, 1).unwrap().unwrap();
        assert_eq!(kept.numbers.as_slice()[0], 1);
    }

    #[test]
    fn test_fetch_chronological_order() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();

        insert_draw(&conn, &test_draw(3, &first_fifteen())).unwrap();
        insert_draw(&conn, &test_draw(1, &first_fifteen())).unwrap();
        insert_draw(&conn, &test_draw(2, &first_fifteen())).unwrap();

        let draws = fetch_all_draws(&conn).unwrap();
        let contests: Vec<u32> = draws.iter().map(|d| d.contest_number).collect();
        assert_eq!(contests, vec![1, 2, 3]);
    }

    #[test]
    fn test_round_trip_through_store() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let store: &dyn DrawStore = &conn;

        let draw = test_draw(7, &[1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 24, 25, 16]);
        assert!(store.save(&draw).unwrap());
        assert_eq!(store.find_by_contest(7).unwrap(), Some(draw));
        assert_eq!(store.find_by_contest(8).unwrap(), None);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_save_all_in_transaction() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let draws = vec![
            test_draw(1, &first_fifteen()),
            test_draw(2, &first_fifteen()),
            test_draw(1, &first_fifteen()),
        ];
        assert_eq!(conn.save_all(&draws).unwrap(), (2, 1));
        assert_eq!(count_draws(&conn).unwrap(), 2);
    }

    #[test]
    fn test_corrupted_numbers_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO draws (contest_number, draw_id, date, numbers) VALUES (1, 'draw-1', '2024-01-01', '1 2 3')",
            [],
        )
        .unwrap();
        assert!(fetch_all_draws(&conn).is_err());
    }
}
