use anyhow::{Context, Result, bail};
use std::path::Path;
use tracing::warn;

use lotofacil_db::db::DrawStore;
use lotofacil_db::json_store::JsonDrawStore;
use lotofacil_db::models::{parse_draw_date, Draw, NumberSet, PICK_COUNT};

/// Colonne du premier numéro dans l'export Caixa (Concurso;Data Sorteio;Bola1..Bola15).
const FIRST_BALL_COLUMN: usize = 2;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub total_records: u32,
    pub inserted: u32,
    pub skipped: u32,
    pub errors: u32,
}

fn field(record: &csv::StringRecord, idx: usize) -> Result<&str> {
    record
        .get(idx)
        .map(str::trim)
        .with_context(|| format!("Champ manquant à l'index {}", idx))
}

fn parse_record(record: &csv::StringRecord) -> Result<Draw> {
    let get = |idx: usize| field(record, idx);

    let contest_raw = get(0)?;
    let contest_number: u32 = contest_raw
        .parse()
        .with_context(|| format!("Numéro de concours invalide : '{}'", contest_raw))?;
    let date = parse_draw_date(get(1)?)?;

    let numbers = (FIRST_BALL_COLUMN..FIRST_BALL_COLUMN + PICK_COUNT)
        .map(|idx| {
            let s = get(idx)?;
            s.parse::<u8>()
                .with_context(|| format!("Impossible de parser '{}' (index {})", s, idx))
        })
        .collect::<Result<Vec<_>>>()?;
    let numbers = NumberSet::new(&numbers)
        .with_context(|| format!("Concours {}", contest_number))?;

    Ok(Draw::new(contest_number, date, numbers))
}

fn detect_delimiter(content: &str) -> u8 {
    let header = content.lines().next().unwrap_or_default();
    if header.contains(';') { b';' } else { b',' }
}

/// Analyse un CSV ; les lignes invalides sont comptées et journalisées, jamais bloquantes.
pub fn parse_csv(content: &str) -> (Vec<Draw>, ImportResult) {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(content))
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut result = ImportResult::default();
    let mut draws = Vec::new();

    for record_result in reader.records() {
        result.total_records += 1;
        match record_result {
            Ok(record) => match parse_record(&record) {
                Ok(draw) => draws.push(draw),
                Err(e) => {
                    warn!("Erreur parsing ligne {} : {:#}", result.total_records, e);
                    result.errors += 1;
                }
            },
            Err(e) => {
                warn!("Erreur lecture ligne {} : {}", result.total_records, e);
                result.errors += 1;
            }
        }
    }

    (draws, result)
}

pub fn import_csv(store: &dyn DrawStore, path: &Path) -> Result<ImportResult> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible d'ouvrir {:?}", path))?;
    let (draws, mut result) = parse_csv(&content);
    let (inserted, skipped) = store.save_all(&draws)?;
    result.inserted = inserted;
    result.skipped = skipped;
    Ok(result)
}

pub fn import_json(store: &dyn DrawStore, path: &Path) -> Result<ImportResult> {
    if !path.exists() {
        bail!("Fichier introuvable : {:?}", path);
    }
    let draws = JsonDrawStore::new(path).load_history()?;
    let (inserted, skipped) = store.save_all(&draws)?;
    Ok(ImportResult {
        total_records: draws.len() as u32,
        inserted,
        skipped,
        errors: 0,
    })
}

/// Choisit le format d'après l'extension (`.json`, sinon CSV).
pub fn import_file(store: &dyn DrawStore, path: &Path) -> Result<ImportResult> {
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        import_json(store, path)
    } else {
        import_csv(store, path)
    }
}

pub fn export_json(store: &dyn DrawStore, path: &Path) -> Result<usize> {
    let draws = store.load_history()?;
    JsonDrawStore::new(path).write_all(&draws)?;
    Ok(draws.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lotofacil_db::db::migrate;
    use lotofacil_db::rusqlite::Connection;

    const CSV: &str = "\
Concurso;Data Sorteio;Bola1;Bola2;Bola3;Bola4;Bola5;Bola6;Bola7;Bola8;Bola9;Bola10;Bola11;Bola12;Bola13;Bola14;Bola15
1;29/09/2003;18;20;25;23;10;11;24;14;06;02;13;09;05;16;03
2;06/10/2003;23;15;05;04;12;16;20;06;11;19;24;01;09;13;07
3;13/10/2003;20;23;12;08;06;01;07;11;14;04;16;10;09;17;17
";

    #[test]
    fn test_parse_csv() {
        let (draws, result) = parse_csv(CSV);
        assert_eq!(result.total_records, 3);
        assert_eq!(result.errors, 1);
        assert_eq!(draws.len(), 2);
        assert_eq!(draws[0].contest_number, 1);
        assert_eq!(draws[0].date, chrono::NaiveDate::from_ymd_opt(2003, 9, 29).unwrap());
        assert_eq!(draws[0].numbers.as_slice()[0], 2);
    }

    #[test]
    fn test_parse_csv_comma_delimited() {
        let content = "Concurso,Data,B1,B2,B3,B4,B5,B6,B7,B8,B9,B10,B11,B12,B13,B14,B15\n\
                       10,2024-03-01,1,2,3,4,5,6,7,8,9,10,11,12,13,14,15\n";
        let (draws, result) = parse_csv(content);
        assert_eq!(result.errors, 0);
        assert_eq!(draws[0].contest_number, 10);
    }

    #[test]
    fn test_parse_csv_missing_columns() {
        let content = "Concurso;Data\n1;29/09/2003;1;2;3\n";
        let (draws, result) = parse_csv(content);
        assert!(draws.is_empty());
        assert_eq!(result.errors, 1);
    }

    #[test]
    fn test_import_and_export_json() {
        let dir = std::env::temp_dir().join(format!("lotofacil-import-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let csv_path = dir.join("draws.csv");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&csv_path, CSV).unwrap();

        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let result = import_file(&conn, &csv_path).unwrap();
        assert_eq!(result.inserted, 2);

        let json_path = dir.join("export.json");
        assert_eq!(export_json(&conn, &json_path).unwrap(), 2);

        let other = Connection::open_in_memory().unwrap();
        migrate(&other).unwrap();
        let result = import_file(&other, &json_path).unwrap();
        assert_eq!(result, ImportResult { total_records: 2, inserted: 2, skipped: 0, errors: 0 });
        assert_eq!(other.load_history().unwrap(), conn.load_history().unwrap());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
