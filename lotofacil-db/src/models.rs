use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Taille de l'univers des numéros (1-25).
pub const POOL_SIZE: usize = 25;
/// Nombre de numéros par tirage et par grille.
pub const PICK_COUNT: usize = 15;
/// Plus grand numéro de la moitié basse (1-13).
pub const LOW_MAX: u8 = 13;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumberSetError {
    #[error("une grille doit contenir exactement 15 numéros (reçu {0})")]
    WrongCount(usize),
    #[error("numéro {0} hors limites (1-25)")]
    OutOfRange(u8),
    #[error("numéro en double : {0}")]
    Duplicate(u8),
    #[error("numéro illisible : '{0}'")]
    Unparsable(String),
}

/// 15 numéros distincts de 1 à 25, toujours triés par ordre croissant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "Vec<u8>")]
pub struct NumberSet([u8; PICK_COUNT]);

impl NumberSet {
    pub fn new(numbers: &[u8]) -> Result<Self, NumberSetError> {
        if numbers.len() != PICK_COUNT {
            return Err(NumberSetError::WrongCount(numbers.len()));
        }

        let mut seen = [false; POOL_SIZE];
        for &n in numbers {
            if !(1..=POOL_SIZE as u8).contains(&n) {
                return Err(NumberSetError::OutOfRange(n));
            }
            let idx = (n - 1) as usize;
            if seen[idx] {
                return Err(NumberSetError::Duplicate(n));
            }
            seen[idx] = true;
        }

        let mut sorted = [0u8; PICK_COUNT];
        sorted.copy_from_slice(numbers);
        sorted.sort_unstable();
        Ok(Self(sorted))
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, number: u8) -> bool {
        self.0.binary_search(&number).is_ok()
    }

    pub fn even_count(&self) -> usize {
        self.0.iter().filter(|&&n| is_even(n)).count()
    }

    pub fn low_count(&self) -> usize {
        self.0.iter().filter(|&&n| is_low(n)).count()
    }
}

impl TryFrom<Vec<u8>> for NumberSet {
    type Error = NumberSetError;

    fn try_from(numbers: Vec<u8>) -> Result<Self, Self::Error> {
        NumberSet::new(&numbers)
    }
}

impl From<NumberSet> for Vec<u8> {
    fn from(set: NumberSet) -> Self {
        set.0.to_vec()
    }
}

impl FromStr for NumberSet {
    type Err = NumberSetError;

    /// Accepte les séparateurs espace, virgule, point-virgule et tiret.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numbers = s
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '-'))
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<u8>()
                    .map_err(|_| NumberSetError::Unparsable(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        NumberSet::new(&numbers)
    }
}

impl fmt::Display for NumberSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        write!(f, "{joined}")
    }
}

pub fn is_even(number: u8) -> bool {
    number % 2 == 0
}

pub fn is_low(number: u8) -> bool {
    number <= LOW_MAX
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    pub id: String,
    pub contest_number: u32,
    #[serde(deserialize_with = "deserialize_date")]
    pub date: NaiveDate,
    pub numbers: NumberSet,
}

impl Draw {
    pub fn new(contest_number: u32, date: NaiveDate, numbers: NumberSet) -> Self {
        Self {
            id: format!("draw-{contest_number}"),
            contest_number,
            date,
            numbers,
        }
    }
}

/// Paire non ordonnée de deux numéros distincts, stockée (plus petit, plus grand).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumberPair {
    first: u8,
    second: u8,
}

impl NumberPair {
    /// `None` si les deux numéros sont égaux.
    pub fn new(a: u8, b: u8) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> u8 {
        self.first
    }

    pub fn second(&self) -> u8 {
        self.second
    }
}

impl fmt::Display for NumberPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

impl Serialize for NumberPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Lit une date au format JJ/MM/AAAA (format Caixa) ou AAAA-MM-JJ.
/// Un horodatage ISO complet est tronqué à sa partie date.
pub fn parse_draw_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if raw.contains('/') {
        return NaiveDate::parse_from_str(raw, "%d/%m/%Y")
            .with_context(|| format!("Date invalide : '{}'", raw));
    }
    let Some(day_part) = raw.get(..10) else {
        bail!("Format de date invalide : '{}'", raw);
    };
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d")
        .with_context(|| format!("Date invalide : '{}'", raw))
}

fn deserialize_date<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse_draw_date(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
pub fn test_draw(contest_number: u32, numbers: &[u8]) -> Draw {
    let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(contest_number as u64);
    Draw::new(contest_number, date, NumberSet::new(numbers).unwrap())
}
