use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use lotofacil_db::models::{is_even, is_low, Draw, NumberSet, NumberSetError, PICK_COUNT, POOL_SIZE};

use super::{top_by_value, EvenOddRatio, FrequencyTable, HistoryStatistics, LowHighRatio, RecencyTable};
use crate::config::SelectionConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SuggestError {
    #[error("Aucun tirage dans l'historique : impossible de suggérer une grille")]
    EmptyHistory,
    #[error("Sélection invalide : {0}")]
    InvalidSelection(#[from] NumberSetError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub number: u8,
    pub score: f64,
}

/// Nombre visé de numéros pairs/impairs et bas/hauts dans la grille.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceTargets {
    pub even: usize,
    pub odd: usize,
    pub low: usize,
    pub high: usize,
}

/// Répartition effective d'un ensemble de numéros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Balance {
    pub even: usize,
    pub odd: usize,
    pub low: usize,
    pub high: usize,
}

impl Balance {
    pub fn of(numbers: &[u8]) -> Self {
        let mut balance = Self::default();
        for &n in numbers {
            balance.add(n);
        }
        balance
    }

    fn add(&mut self, number: u8) {
        if is_even(number) {
            self.even += 1;
        } else {
            self.odd += 1;
        }
        if is_low(number) {
            self.low += 1;
        } else {
            self.high += 1;
        }
    }

    /// Refuse le numéro si sa classe de parité ou de grandeur a déjà atteint cible + slack.
    fn accepts(&self, number: u8, targets: &BalanceTargets, slack: usize) -> bool {
        let parity_ok = if is_even(number) {
            self.even < targets.even + slack
        } else {
            self.odd < targets.odd + slack
        };
        let magnitude_ok = if is_low(number) {
            self.low < targets.low + slack
        } else {
            self.high < targets.high + slack
        };
        parity_ok && magnitude_ok
    }
}

impl fmt::Display for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pairs : {}, Impairs : {}, Bas (1-13) : {}, Hauts (14-25) : {}",
            self.even, self.odd, self.low, self.high
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Ordre d'acceptation.
    pub numbers: Vec<u8>,
    /// Vrai si la passe sans contrainte a dû compléter la grille.
    pub relaxed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BetAnalysis {
    pub total_draws_analyzed: usize,
    pub frequency_based: Vec<u8>,
    pub delayed_numbers: Vec<u8>,
    pub balance: Balance,
    pub balanced_selection: String,
    pub targets: BalanceTargets,
    pub relaxed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestedBet {
    pub id: String,
    pub numbers: NumberSet,
    pub generated_at: DateTime<Utc>,
    pub statistics: HistoryStatistics,
    pub analysis: BetAnalysis,
}

/// score(n) = w_f * freq/max_freq + w_r * retard/max_retard, trié par score
/// décroissant puis numéro croissant. Un maximum nul annule son terme.
pub fn score_candidates(
    frequency: &FrequencyTable,
    recency: &RecencyTable,
    config: &SelectionConfig,
) -> Vec<ScoredCandidate> {
    let max_frequency = frequency.max();
    let max_recency = recency.max();

    let mut candidates: Vec<ScoredCandidate> = (1..=POOL_SIZE as u8)
        .map(|number| {
            let frequency_score = if max_frequency > 0 {
                config.frequency_weight * (frequency.get(number) as f64 / max_frequency as f64)
            } else {
                0.0
            };
            let recency_score = if max_recency > 0 {
                config.recency_weight * (recency.get(number) as f64 / max_recency as f64)
            } else {
                0.0
            };
            ScoredCandidate {
                number,
                score: frequency_score + recency_score,
            }
        })
        .collect();

    // Tri stable : les ex aequo restent par numéro croissant.
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    candidates
}

pub fn balance_targets(even_odd: &EvenOddRatio, low_high: &LowHighRatio) -> BalanceTargets {
    let even = ((PICK_COUNT as f64 * even_odd.even).round() as usize).min(PICK_COUNT);
    let low = ((PICK_COUNT as f64 * low_high.low).round() as usize).min(PICK_COUNT);
    BalanceTargets {
        even,
        odd: PICK_COUNT - even,
        low,
        high: PICK_COUNT - low,
    }
}

/// Passe gloutonne sous contraintes, puis complétion sans contrainte si elle
/// s'arrête avant 15 numéros.
pub fn select_balanced(
    candidates: &[ScoredCandidate],
    targets: &BalanceTargets,
    slack: usize,
) -> Selection {
    let mut numbers = Vec::with_capacity(PICK_COUNT);
    let mut balance = Balance::default();

    for candidate in candidates {
        if numbers.len() >= PICK_COUNT {
            break;
        }
        if !balance.accepts(candidate.number, targets, slack) {
            continue;
        }
        numbers.push(candidate.number);
        balance.add(candidate.number);
    }

    let relaxed = numbers.len() < PICK_COUNT;
    if relaxed {
        debug!(
            "Contraintes épuisées après {} numéros, complétion sans contrainte",
            numbers.len()
        );
        for candidate in candidates {
            if numbers.len() >= PICK_COUNT {
                break;
            }
            if !numbers.contains(&candidate.number) {
                numbers.push(candidate.number);
            }
        }
    }

    Selection { numbers, relaxed }
}

pub fn suggest(draws: &[Draw]) -> Result<SuggestedBet, SuggestError> {
    suggest_with(draws, &SelectionConfig::default())
}

pub fn suggest_with(draws: &[Draw], config: &SelectionConfig) -> Result<SuggestedBet, SuggestError> {
    if draws.is_empty() {
        return Err(SuggestError::EmptyHistory);
    }

    let statistics = HistoryStatistics::compute(draws);
    let candidates = score_candidates(&statistics.frequency, &statistics.recency, config);
    let targets = balance_targets(&statistics.even_odd_ratio, &statistics.low_high_ratio);
    debug!(
        "Cibles : {} pairs / {} impairs, {} bas / {} hauts (slack {})",
        targets.even, targets.odd, targets.low, targets.high, config.slack
    );

    let selection = select_balanced(&candidates, &targets, config.slack);
    let numbers = NumberSet::new(&selection.numbers)?;
    let balance = Balance::of(numbers.as_slice());

    let generated_at = Utc::now();
    let analysis = BetAnalysis {
        total_draws_analyzed: draws.len(),
        frequency_based: top_by_value(&statistics.frequency, config.top_count),
        delayed_numbers: top_by_value(&statistics.recency, config.top_count),
        balance,
        balanced_selection: balance.to_string(),
        targets,
        relaxed: selection.relaxed,
    };

    Ok(SuggestedBet {
        id: format!("bet-{}", generated_at.timestamp_millis()),
        numbers,
        generated_at,
        statistics,
        analysis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{compute_frequency, compute_recency, four_draws, make_draws, three_draws};

    fn flat_candidates() -> Vec<ScoredCandidate> {
        (1..=25u8)
            .map(|number| ScoredCandidate { number, score: 0.5 })
            .collect()
    }

    #[test]
    fn test_suggest_empty_history() {
        assert_eq!(suggest(&[]).unwrap_err(), SuggestError::EmptyHistory);
    }

    #[test]
    fn test_suggest_four_draws() {
        let bet = suggest(&four_draws()).unwrap();
        assert_eq!(
            bet.numbers.as_slice(),
            &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 21]
        );
        assert_eq!(bet.analysis.total_draws_analyzed, 4);
        assert_eq!(bet.analysis.frequency_based.len(), 10);
        assert_eq!(bet.analysis.delayed_numbers, vec![5, 7, 9, 11, 13, 15, 17, 19, 21, 23]);
        assert_eq!(
            bet.analysis.targets,
            BalanceTargets { even: 7, odd: 8, low: 10, high: 5 }
        );
        assert!(!bet.analysis.relaxed);
    }

    #[test]
    fn test_suggest_balance_summary() {
        let bet = suggest(&four_draws()).unwrap();
        let balance = bet.analysis.balance;
        assert_eq!(balance.even + balance.odd, 15);
        assert_eq!(balance.low + balance.high, 15);
        assert_eq!(balance, Balance { even: 5, odd: 10, low: 11, high: 4 });
        assert!(bet.analysis.balanced_selection.contains("Pairs : 5"));
        assert!(bet.analysis.balanced_selection.contains("Impairs : 10"));
    }

    #[test]
    fn test_suggest_valid_numbers() {
        let draws = make_draws(&[
            &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
            &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
        ]);
        let bet = suggest(&draws).unwrap();
        let numbers = bet.numbers.as_slice();
        assert_eq!(numbers.len(), 15);
        assert!(numbers.windows(2).all(|w| w[0] < w[1]));
        assert!(numbers.iter().all(|&n| (1..=25).contains(&n)));
    }

    #[test]
    fn test_suggest_deterministic() {
        let draws = three_draws();
        let first = suggest(&draws).unwrap();
        let second = suggest(&draws).unwrap();
        assert_eq!(first.numbers, second.numbers);
        assert_eq!(first.analysis, second.analysis);
        assert_eq!(first.statistics, second.statistics);
    }

    #[test]
    fn test_id_from_timestamp() {
        let bet = suggest(&three_draws()).unwrap();
        assert_eq!(bet.id, format!("bet-{}", bet.generated_at.timestamp_millis()));
    }

    #[test]
    fn test_score_candidates_order() {
        let draws = four_draws();
        let candidates = score_candidates(
            &compute_frequency(&draws),
            &compute_recency(&draws),
            &SelectionConfig::default(),
        );
        assert_eq!(candidates.len(), 25);
        let head: Vec<u8> = candidates.iter().take(7).map(|c| c.number).collect();
        assert_eq!(head, vec![5, 7, 9, 11, 13, 15, 3]);
        assert!((candidates[0].score - 0.85).abs() < 1e-12);
        assert!(candidates.iter().all(|c| (0.0..=1.0).contains(&c.score)));
        assert!(candidates.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_score_candidates_zero_maxima() {
        let zero = FrequencyTable::default();
        let candidates = score_candidates(&zero, &zero, &SelectionConfig::default());
        assert!(candidates.iter().all(|c| c.score == 0.0));
        let order: Vec<u8> = candidates.iter().map(|c| c.number).collect();
        assert_eq!(order, (1..=25).collect::<Vec<u8>>());
    }

    #[test]
    fn test_balance_targets_rounding() {
        let targets = balance_targets(
            &EvenOddRatio { even: 17.0 / 45.0, odd: 28.0 / 45.0 },
            &LowHighRatio { low: 32.0 / 45.0, high: 13.0 / 45.0 },
        );
        assert_eq!(targets, BalanceTargets { even: 6, odd: 9, low: 11, high: 4 });
    }

    #[test]
    fn test_select_respects_slack() {
        let targets = BalanceTargets { even: 7, odd: 8, low: 8, high: 7 };
        let selection = select_balanced(&flat_candidates(), &targets, 0);
        assert!(!selection.relaxed);
        let balance = Balance::of(&selection.numbers);
        assert_eq!(balance, Balance { even: 7, odd: 8, low: 8, high: 7 });
    }

    #[test]
    fn test_select_fallback_when_constraints_exhausted() {
        let targets = BalanceTargets { even: 0, odd: 15, low: 15, high: 0 };
        let selection = select_balanced(&flat_candidates(), &targets, 0);
        assert!(selection.relaxed);
        assert_eq!(&selection.numbers[..7], &[1, 3, 5, 7, 9, 11, 13]);

        let mut sorted = selection.numbers.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=15).collect::<Vec<u8>>());
    }

    #[test]
    fn test_custom_config_changes_ranking() {
        let draws = four_draws();
        let config = SelectionConfig {
            frequency_weight: 1.0,
            recency_weight: 0.0,
            ..SelectionConfig::default()
        };
        let candidates = score_candidates(
            &compute_frequency(&draws),
            &compute_recency(&draws),
            &config,
        );
        assert_eq!(candidates[0].number, 3);
        let bet = suggest_with(&draws, &config).unwrap();
        assert_eq!(bet.numbers.as_slice().len(), 15);
    }

    #[test]
    fn test_suggested_bet_json() {
        let bet = suggest(&four_draws()).unwrap();
        let json = serde_json::to_value(&bet).unwrap();
        assert_eq!(json["numbers"].as_array().unwrap().len(), 15);
        assert_eq!(json["analysis"]["total_draws_analyzed"], 4);
        assert_eq!(json["statistics"]["pair_frequency"]["3-5"], 3);
    }
}
