use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use lotofacil_cli::analysis::selector::{suggest_with, SuggestError};
use lotofacil_cli::analysis::HistoryStatistics;
use lotofacil_cli::config::{SelectionConfig, StoreKind};
use lotofacil_cli::display::{display_draws, display_import_summary, display_stats, display_suggestion};
use lotofacil_cli::fetch::CaixaClient;
use lotofacil_cli::import::{export_json, import_file, ImportResult};
use lotofacil_cli::service::{open_store, save_draw};
use lotofacil_db::db::{db_path, DrawStore};
use lotofacil_db::models::{parse_draw_date, Draw, NumberSet};

#[derive(Parser)]
#[command(name = "lotofacil", about = "Analyseur statistique Lotofácil")]
struct Cli {
    /// Base SQLite ou fichier JSON de l'historique
    #[arg(long, global = true, env = "LOTOFACIL_DB")]
    db: Option<PathBuf>,

    /// Backend de stockage
    #[arg(long, global = true, env = "LOTOFACIL_STORE", default_value = "sqlite")]
    store: StoreKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Importer des tirages depuis un fichier CSV ou JSON
    Import {
        /// Chemin vers le fichier (.csv ou .json)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Exporter l'historique au format JSON
    Export {
        #[arg(short, long, default_value = "draws.json")]
        file: PathBuf,
    },

    /// Afficher le chemin de la base de données
    DbPath,

    /// Lister les derniers tirages
    List {
        /// Nombre de tirages à afficher
        #[arg(short, long, default_value = "10")]
        last: usize,
    },

    /// Afficher les statistiques (fréquences, retards, paires, répartition)
    Stats {
        /// Longueur des classements
        #[arg(short, long, default_value = "10")]
        top: usize,
    },

    /// Suggérer une grille équilibrée
    Suggest {
        /// Sortie JSON
        #[arg(long)]
        json: bool,

        /// Fichier JSON de paramètres de sélection
        #[arg(short, long, env = "LOTOFACIL_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Ajouter un tirage (demandé interactivement si les options manquent)
    Add {
        /// Numéro du concours
        #[arg(long)]
        contest: Option<u32>,

        /// Date (JJ/MM/AAAA)
        #[arg(long)]
        date: Option<String>,

        /// 15 numéros séparés par des espaces ou des virgules
        #[arg(long)]
        numbers: Option<String>,
    },

    /// Récupérer les derniers concours depuis l'API Caixa
    Sync {
        /// Nombre de concours à récupérer (1-1000)
        #[arg(short, long, default_value = "50")]
        count: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let path = cli.db.clone().unwrap_or_else(|| default_path(cli.store));
    let store = open_store(cli.store, &path)?;

    match cli.command {
        Command::Import { file } => cmd_import(store.as_ref(), &file),
        Command::Export { file } => cmd_export(store.as_ref(), &file),
        Command::DbPath => {
            println!("{}", path.display());
            Ok(())
        }
        Command::List { last } => cmd_list(store.as_ref(), last),
        Command::Stats { top } => cmd_stats(store.as_ref(), top),
        Command::Suggest { json, config } => cmd_suggest(store.as_ref(), json, config.as_deref()),
        Command::Add { contest, date, numbers } => cmd_add(store.as_ref(), contest, date, numbers),
        Command::Sync { count } => cmd_sync(store.as_ref(), count),
    }
}

fn default_path(kind: StoreKind) -> PathBuf {
    match kind {
        StoreKind::Sqlite => db_path(),
        StoreKind::Json => db_path().with_file_name("draws.json"),
    }
}

fn load_non_empty(store: &dyn DrawStore) -> Result<Option<Vec<Draw>>> {
    let draws = store.load_history()?;
    if draws.is_empty() {
        println!("Historique vide. Lancez d'abord : lotofacil import ou lotofacil sync");
        return Ok(None);
    }
    Ok(Some(draws))
}

fn cmd_import(store: &dyn DrawStore, file: &Path) -> Result<()> {
    let result = import_file(store, file)?;
    display_import_summary(&result, store.count()?);
    Ok(())
}

fn cmd_export(store: &dyn DrawStore, file: &Path) -> Result<()> {
    let count = export_json(store, file)?;
    println!("{} tirages exportés vers {}", count, file.display());
    Ok(())
}

fn cmd_list(store: &dyn DrawStore, last: usize) -> Result<()> {
    let Some(draws) = load_non_empty(store)? else {
        return Ok(());
    };
    let recent: Vec<_> = draws.into_iter().rev().take(last).collect();
    display_draws(&recent);
    Ok(())
}

fn cmd_stats(store: &dyn DrawStore, top: usize) -> Result<()> {
    let Some(draws) = load_non_empty(store)? else {
        return Ok(());
    };
    let stats = HistoryStatistics::compute(&draws);
    display_stats(&stats, draws.len(), top);
    Ok(())
}

fn cmd_suggest(store: &dyn DrawStore, json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => SelectionConfig::load(path)?,
        None => SelectionConfig::default(),
    };

    let draws = store.load_history()?;
    let bet = match suggest_with(&draws, &config) {
        Ok(bet) => bet,
        Err(SuggestError::EmptyHistory) => {
            println!("Historique vide. Lancez d'abord : lotofacil import ou lotofacil sync");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&bet)?);
    } else {
        display_suggestion(&bet);
    }
    Ok(())
}

fn cmd_add(
    store: &dyn DrawStore,
    contest: Option<u32>,
    date: Option<String>,
    numbers: Option<String>,
) -> Result<()> {
    let contest = match contest {
        Some(c) => c,
        None => prompt("Numéro du concours (ex: 3000) : ")?
            .parse::<u32>()
            .context("Numéro de concours invalide")?,
    };
    let raw_date = match date {
        Some(d) => d,
        None => prompt("Date (JJ/MM/AAAA) : ")?,
    };
    let date = parse_draw_date(&raw_date)?;
    let numbers: NumberSet = match numbers {
        Some(n) => n.parse()?,
        None => prompt_numbers()?,
    };

    let draw = save_draw(store, contest, date, numbers.as_slice())?;
    display_draws(&[draw]);
    println!("Tirage inséré avec succès.");
    Ok(())
}

fn cmd_sync(store: &dyn DrawStore, count: u32) -> Result<()> {
    let client = CaixaClient::new()?;
    let fetched = client.last_n(count)?;
    info!("{} concours récupérés", fetched.len());

    let mut draws = Vec::with_capacity(fetched.len());
    let mut errors = 0u32;
    for api_draw in fetched {
        match api_draw.into_draw() {
            Ok(draw) => draws.push(draw),
            Err(e) => {
                warn!("{:#}", e);
                errors += 1;
            }
        }
    }

    let (inserted, skipped) = store.save_all(&draws)?;
    let result = ImportResult {
        total_records: draws.len() as u32 + errors,
        inserted,
        skipped,
        errors,
    };
    display_import_summary(&result, store.count()?);
    Ok(())
}

fn prompt(msg: &str) -> Result<String> {
    print!("{}", msg);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Erreur de lecture")?;
    Ok(input.trim().to_string())
}

fn prompt_numbers() -> Result<NumberSet> {
    loop {
        let input = prompt("15 numéros (séparés par des espaces, 1-25) : ")?;
        match input.parse::<NumberSet>() {
            Ok(numbers) => return Ok(numbers),
            Err(e) => println!("{}. Réessayez.", e),
        }
    }
}
