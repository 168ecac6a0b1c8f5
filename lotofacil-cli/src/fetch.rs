use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use lotofacil_db::models::{parse_draw_date, Draw, NumberSet};

pub const CAIXA_API_URL: &str = "https://servicebus2.caixa.gov.br/portaldeloterias/api/lotofacil";
pub const MAX_FETCH_COUNT: u32 = 1000;

const REQUEST_TIMEOUT_SECS: u64 = 10;
const REQUEST_PAUSE: Duration = Duration::from_millis(300);

/// Résultat d'un concours tel que renvoyé par l'API Caixa.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDraw {
    pub numero: u32,
    pub data_apuracao: String,
    pub lista_dezenas: Vec<String>,
}

impl ApiDraw {
    pub fn into_draw(self) -> Result<Draw> {
        let numbers = self
            .lista_dezenas
            .iter()
            .map(|s| {
                s.trim()
                    .parse::<u8>()
                    .with_context(|| format!("Dezena invalide : '{}'", s))
            })
            .collect::<Result<Vec<_>>>()?;
        let numbers = NumberSet::new(&numbers)
            .with_context(|| format!("Concours {}", self.numero))?;
        let date = parse_draw_date(&self.data_apuracao)?;
        Ok(Draw::new(self.numero, date, numbers))
    }
}

pub fn parse_api_draw(raw: &str) -> Result<ApiDraw> {
    serde_json::from_str(raw.trim()).context("Réponse JSON invalide")
}

pub struct CaixaClient {
    client: Client,
    base_url: String,
}

impl CaixaClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(CAIXA_API_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("Impossible de créer le client HTTP")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get(&self, url: &str) -> Result<ApiDraw> {
        debug!("GET {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .with_context(|| format!("Requête échouée : {}", url))?
            .text()?;
        parse_api_draw(&body)
    }

    pub fn latest(&self) -> Result<ApiDraw> {
        self.get(&self.base_url)
            .context("Impossible de récupérer le dernier concours")
    }

    pub fn by_contest(&self, contest_number: u32) -> Result<ApiDraw> {
        self.get(&format!("{}/{}", self.base_url, contest_number))
            .with_context(|| format!("Impossible de récupérer le concours {}", contest_number))
    }

    /// Récupère les `count` derniers concours ; un concours en échec est journalisé et ignoré.
    pub fn last_n(&self, count: u32) -> Result<Vec<ApiDraw>> {
        if count == 0 || count > MAX_FETCH_COUNT {
            bail!("Le nombre de concours doit être compris entre 1 et {}", MAX_FETCH_COUNT);
        }

        let latest = self.latest()?;
        let range = contest_range(latest.numero, count);

        let pb = ProgressBar::new(range.clone().count() as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
                .progress_chars("=> "),
        );

        let mut draws = Vec::new();
        for contest_number in range {
            if contest_number == latest.numero {
                draws.push(latest.clone());
            } else {
                match self.by_contest(contest_number) {
                    Ok(draw) => draws.push(draw),
                    Err(e) => warn!("{:#}", e),
                }
                std::thread::sleep(REQUEST_PAUSE);
            }
            pb.set_message(format!("concours {}", contest_number));
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(draws)
    }
}

/// `count` concours se terminant par `latest`, sans descendre sous 1.
pub fn contest_range(latest: u32, count: u32) -> std::ops::RangeInclusive<u32> {
    let start = latest.saturating_sub(count.saturating_sub(1)).max(1);
    start..=latest
}
