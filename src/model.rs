use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const MAX_STAT: u8 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NeedKind {
    Energy,
    Fun,
    Social,
    Hygiene,
    Hunger,
}

impl NeedKind {
    pub const ALL: [NeedKind; 5] = [
        NeedKind::Energy,
        NeedKind::Fun,
        NeedKind::Social,
        NeedKind::Hygiene,
        NeedKind::Hunger,
    ];

    pub fn name(self) -> &'static str {
        match self {
            NeedKind::Energy => "energy",
            NeedKind::Fun => "fun",
            NeedKind::Social => "social",
            NeedKind::Hygiene => "hygiene",
            NeedKind::Hunger => "hunger",
        }
    }

    /// Inclusive range a fresh pet's value is drawn from.
    pub fn initial_range(self) -> (u8, u8) {
        match self {
            NeedKind::Energy => (75, MAX_STAT),
            NeedKind::Fun => (50, 80),
            NeedKind::Social => (10, 75),
            NeedKind::Hygiene => (0, MAX_STAT),
            NeedKind::Hunger => (40, 90),
        }
    }
}

impl fmt::Display for NeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The five counters. Every write goes through `set`, which keeps each value
/// inside `[0, MAX_STAT]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Needs {
    energy: u8,
    fun: u8,
    social: u8,
    hygiene: u8,
    hunger: u8,
}

impl Needs {
    pub fn get(&self, kind: NeedKind) -> u8 {
        match kind {
            NeedKind::Energy => self.energy,
            NeedKind::Fun => self.fun,
            NeedKind::Social => self.social,
            NeedKind::Hygiene => self.hygiene,
            NeedKind::Hunger => self.hunger,
        }
    }

    pub fn set(&mut self, kind: NeedKind, value: u8) {
        let value = value.min(MAX_STAT);
        match kind {
            NeedKind::Energy => self.energy = value,
            NeedKind::Fun => self.fun = value,
            NeedKind::Social => self.social = value,
            NeedKind::Hygiene => self.hygiene = value,
            NeedKind::Hunger => self.hunger = value,
        }
    }

    /// Signed change, clamped to `[0, MAX_STAT]`. Returns the new value.
    pub fn adjust(&mut self, kind: NeedKind, delta: i32) -> u8 {
        let next = (self.get(kind) as i32 + delta).clamp(0, MAX_STAT as i32);
        self.set(kind, next as u8);
        next as u8
    }

    pub fn iter(&self) -> impl Iterator<Item = (NeedKind, u8)> + '_ {
        NeedKind::ALL.into_iter().map(move |k| (k, self.get(k)))
    }
}

#[derive(Clone, Debug, Default)]
pub struct Favorites {
    pub foods: BTreeSet<String>,
    pub games: BTreeSet<String>,
}

#[derive(Clone, Debug)]
pub struct Pet {
    pub name: String,
    pub species: String,
    pub(crate) alive: bool,
    pub needs: Needs,
    pub vocab: Vec<String>,
    pub favorites: Favorites,
    pub decay_interval_secs: f64,
    pub last_decay_at: DateTime<Utc>,
}

impl Pet {
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn latest_word(&self) -> Option<&str> {
        self.vocab.last().map(String::as_str)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Rules {
    pub decay_amount: (u8, u8),
    /// While hunger is above this, energy is never picked for decay.
    pub energy_guard_hunger: u8,
    pub train_cost: (u8, u8),
    pub train_roll: (u8, u8),
    pub train_success_below: u8,
    pub default_satiety: u8,
    pub max_catchup_steps: u64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            decay_amount: (3, 7),
            energy_guard_hunger: 25,
            train_cost: (5, 10),
            train_roll: (1, 100),
            train_success_below: 75,
            default_satiety: 5,
            max_catchup_steps: 336, // a week at the default cadence
        }
    }
}

/// Known foods and how much hunger each one restores.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Pantry(BTreeMap<String, u8>);

impl Pantry {
    pub fn satiety(&self, food: &str) -> Option<u8> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(food))
            .map(|(_, v)| *v)
    }

    pub fn insert(&mut self, food: impl Into<String>, satiety: u8) {
        self.0.insert(food.into(), satiety);
    }
}

impl Default for Pantry {
    fn default() -> Self {
        let mut foods = BTreeMap::new();
        foods.insert("apples".to_string(), 10);
        Self(foods)
    }
}
