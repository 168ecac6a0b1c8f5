pub mod selector;

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use lotofacil_db::models::{is_even, is_low, Draw, NumberPair, POOL_SIZE};

/// Une valeur par numéro de 1 à 25 (index = numéro - 1), jamais creuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NumberTable([u32; POOL_SIZE]);

/// Nombre de tirages contenant chaque numéro.
pub type FrequencyTable = NumberTable;
/// Nombre de tirages écoulés depuis la dernière sortie de chaque numéro.
pub type RecencyTable = NumberTable;
/// Co-occurrences par paire, uniquement pour les paires déjà sorties ensemble.
pub type PairFrequencyTable = BTreeMap<NumberPair, u32>;

impl NumberTable {
    pub fn filled(value: u32) -> Self {
        Self([value; POOL_SIZE])
    }

    /// `number` doit être dans 1..=25.
    pub fn get(&self, number: u8) -> u32 {
        self.0[(number - 1) as usize]
    }

    fn slot_mut(&mut self, number: u8) -> &mut u32 {
        &mut self.0[(number - 1) as usize]
    }

    /// Paires (numéro, valeur) par numéro croissant.
    pub fn iter(&self) -> impl Iterator<Item = (u8, u32)> + '_ {
        self.0.iter().enumerate().map(|(i, &v)| (i as u8 + 1, v))
    }

    pub fn max(&self) -> u32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }
}

impl Serialize for NumberTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(POOL_SIZE))?;
        for (number, value) in self.iter() {
            map.serialize_entry(&number, &value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EvenOddRatio {
    pub even: f64,
    pub odd: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LowHighRatio {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberStats {
    pub number: u8,
    pub frequency: u32,
    pub recency: u32,
}

/// Toutes les statistiques dérivées d'un historique, recalculées à chaque appel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryStatistics {
    pub frequency: FrequencyTable,
    pub recency: RecencyTable,
    pub pair_frequency: PairFrequencyTable,
    pub even_odd_ratio: EvenOddRatio,
    pub low_high_ratio: LowHighRatio,
}

impl HistoryStatistics {
    pub fn compute(draws: &[Draw]) -> Self {
        Self {
            frequency: compute_frequency(draws),
            recency: compute_recency(draws),
            pair_frequency: compute_pair_frequency(draws),
            even_odd_ratio: compute_even_odd_ratio(draws),
            low_high_ratio: compute_low_high_ratio(draws),
        }
    }

    pub fn number_stats(&self) -> Vec<NumberStats> {
        self.frequency
            .iter()
            .map(|(number, frequency)| NumberStats {
                number,
                frequency,
                recency: self.recency.get(number),
            })
            .collect()
    }
}

pub fn compute_frequency(draws: &[Draw]) -> FrequencyTable {
    let mut frequency = NumberTable::default();
    for draw in draws {
        for n in draw.numbers.iter() {
            *frequency.slot_mut(n) += 1;
        }
    }
    frequency
}

/// Tirages supposés chronologiques (le plus ancien d'abord) : 0 = sorti au
/// dernier tirage. Un numéro jamais sorti vaut `draws.len()`, donc 0 partout
/// sur un historique vide.
pub fn compute_recency(draws: &[Draw]) -> RecencyTable {
    let mut recency = NumberTable::filled(draws.len() as u32);
    let mut seen = [false; POOL_SIZE];

    for (distance, draw) in draws.iter().rev().enumerate() {
        for n in draw.numbers.iter() {
            let idx = (n - 1) as usize;
            if !seen[idx] {
                seen[idx] = true;
                *recency.slot_mut(n) = distance as u32;
            }
        }
    }

    recency
}

pub fn compute_pair_frequency(draws: &[Draw]) -> PairFrequencyTable {
    let mut pairs = PairFrequencyTable::new();
    for draw in draws {
        let numbers = draw.numbers.as_slice();
        for (i, &a) in numbers.iter().enumerate() {
            for &b in &numbers[i + 1..] {
                if let Some(pair) = NumberPair::new(a, b) {
                    *pairs.entry(pair).or_insert(0) += 1;
                }
            }
        }
    }
    pairs
}

/// Proportions sur toutes les occurrences (15 par tirage). {0, 0} si l'historique est vide.
pub fn compute_even_odd_ratio(draws: &[Draw]) -> EvenOddRatio {
    let (even, total) = count_occurrences(draws, is_even);
    if total == 0 {
        return EvenOddRatio::default();
    }
    EvenOddRatio {
        even: even as f64 / total as f64,
        odd: (total - even) as f64 / total as f64,
    }
}

/// Bas = 1-13, hauts = 14-25. {0, 0} si l'historique est vide.
pub fn compute_low_high_ratio(draws: &[Draw]) -> LowHighRatio {
    let (low, total) = count_occurrences(draws, is_low);
    if total == 0 {
        return LowHighRatio::default();
    }
    LowHighRatio {
        low: low as f64 / total as f64,
        high: (total - low) as f64 / total as f64,
    }
}

fn count_occurrences(draws: &[Draw], class: fn(u8) -> bool) -> (usize, usize) {
    let mut matching = 0;
    let mut total = 0;
    for draw in draws {
        for n in draw.numbers.iter() {
            total += 1;
            if class(n) {
                matching += 1;
            }
        }
    }
    (matching, total)
}

/// Les `count` numéros de plus forte valeur, à égalité le plus petit numéro d'abord.
pub fn top_by_value(table: &NumberTable, count: usize) -> Vec<u8> {
    let mut entries: Vec<(u8, u32)> = table.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.into_iter().take(count).map(|(n, _)| n).collect()
}

pub fn top_pairs(pairs: &PairFrequencyTable, count: usize) -> Vec<(NumberPair, u32)> {
    let mut entries: Vec<(NumberPair, u32)> = pairs.iter().map(|(&p, &c)| (p, c)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries.truncate(count);
    entries
}

#[cfg(test)]
pub(crate) fn make_draws(sets: &[&[u8]]) -> Vec<Draw> {
    use chrono::NaiveDate;
    use lotofacil_db::models::NumberSet;

    sets.iter()
        .enumerate()
        .map(|(i, numbers)| {
            let date = NaiveDate::from_ymd_opt(2024, 1, 1 + i as u32).unwrap();
            Draw::new(i as u32 + 1, date, NumberSet::new(numbers).unwrap())
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn three_draws() -> Vec<Draw> {
    make_draws(&[
        &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
        &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
        &[1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 24, 25, 16],
    ])
}

#[cfg(test)]
pub(crate) fn four_draws() -> Vec<Draw> {
    make_draws(&[
        &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
        &[2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16],
        &[1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23, 24, 25, 16],
        &[2, 4, 6, 8, 10, 12, 14, 16, 18, 20, 22, 24, 25, 1, 3],
    ])
}
