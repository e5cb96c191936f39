use crate::model::{Favorites, NeedKind, Needs, Pantry, Pet, Rules, MAX_STAT};
use crate::view::PetView;
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum IntervalError {
    #[error("not a number")]
    NotANumber,
    #[error("must be a finite number above zero")]
    NotPositive,
}

/// Seconds between decay steps. Always finite and strictly positive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecayInterval(f64);

impl DecayInterval {
    pub const DEFAULT: DecayInterval = DecayInterval(1800.0);

    pub fn new(secs: f64) -> Result<Self, IntervalError> {
        if secs.is_finite() && secs > 0.0 {
            Ok(Self(secs))
        } else {
            Err(IntervalError::NotPositive)
        }
    }

    pub fn secs(self) -> f64 {
        self.0
    }
}

impl FromStr for DecayInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs: f64 = s.trim().parse().map_err(|_| IntervalError::NotANumber)?;
        Self::new(secs)
    }
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub pet_name: String,
    pub species: String,
    pub decay_interval: DecayInterval,
    pub rules: Rules,
    pub pantry: Pantry,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pet_name: "Hong Lu".to_string(),
            species: "Dragon".to_string(),
            decay_interval: DecayInterval::DEFAULT,
            rules: Rules::default(),
            pantry: Pantry::default(),
        }
    }
}

/// One running simulation: the pet plus everything that mutates it.
pub struct Session {
    pet: Pet,
    rules: Rules,
    pantry: Pantry,
    rng: StdRng,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        seed: u64,
        now: DateTime<Utc>,
        view: &mut dyn PetView,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut needs = Needs::default();
        for kind in NeedKind::ALL {
            needs.set(kind, roll(&mut rng, kind.initial_range()));
        }

        let pet = Pet {
            name: config.pet_name,
            species: config.species,
            alive: true,
            needs,
            vocab: Vec::new(),
            favorites: Favorites::default(),
            decay_interval_secs: config.decay_interval.secs(),
            last_decay_at: now,
        };
        info!(name = %pet.name, seed, "pet created");

        for (kind, value) in pet.needs.iter() {
            view.display_need(kind, value, MAX_STAT);
        }

        Self {
            pet,
            rules: config.rules,
            pantry: config.pantry,
            rng,
        }
    }

    pub fn pet(&self) -> &Pet {
        &self.pet
    }

    /// Sets one need directly and reports it. Ignored once the pet is dead.
    pub fn set_need(&mut self, kind: NeedKind, value: u8, view: &mut dyn PetView) {
        if !self.pet.alive {
            return;
        }
        self.pet.needs.set(kind, value);
        let value = self.pet.needs.get(kind);
        debug!(need = %kind, value, "need set");
        view.display_need(kind, value, MAX_STAT);
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn is_alive(&self) -> bool {
        self.pet.alive
    }

    /// Whole decay intervals between the last decay and `now`.
    fn due_steps(&self, now: DateTime<Utc>) -> u64 {
        let elapsed_ms = (now - self.pet.last_decay_at).num_milliseconds();
        if elapsed_ms <= 0 {
            return 0;
        }
        let elapsed = elapsed_ms as f64 / 1000.0;
        (elapsed / self.pet.decay_interval_secs).floor() as u64
    }

    /// Applies every decay step that is due at `now`. Returns how many needs
    /// were decreased.
    ///
    /// Each step stamps `last_decay_at = now`, so a single call consumes all
    /// time accumulated so far no matter how many steps it runs.
    pub fn advance(&mut self, now: DateTime<Utc>, view: &mut dyn PetView) -> u64 {
        if !self.pet.alive {
            return 0;
        }

        let mut steps = self.due_steps(now);
        if steps > self.rules.max_catchup_steps {
            warn!(
                due = steps,
                cap = self.rules.max_catchup_steps,
                "capping decay catch-up"
            );
            steps = self.rules.max_catchup_steps;
            if steps == 0 {
                // nothing may run, but the due time is still consumed
                self.pet.last_decay_at = now;
                return 0;
            }
        }

        let mut applied = 0;
        for _ in 0..steps {
            self.pet.last_decay_at = now;
            if self.decay_step(view).is_none() {
                break;
            }
            applied += 1;
        }
        applied
    }

    /// Needs that a decay step may pick right now.
    pub fn decay_candidates(&self) -> Vec<NeedKind> {
        let guard_energy =
            self.pet.needs.get(NeedKind::Hunger) > self.rules.energy_guard_hunger;
        NeedKind::ALL
            .into_iter()
            .filter(|&k| self.pet.needs.get(k) > 0)
            .filter(|&k| !(guard_energy && k == NeedKind::Energy))
            .collect()
    }

    fn decay_step(&mut self, view: &mut dyn PetView) -> Option<NeedKind> {
        let candidates = self.decay_candidates();
        let Some(&kind) = candidates.choose(&mut self.rng) else {
            self.pet.alive = false;
            info!(name = %self.pet.name, "pet died");
            view.display_message(&format!("{} has died...", self.pet.name));
            return None;
        };

        let amount = roll(&mut self.rng, self.rules.decay_amount);
        let value = self.pet.needs.adjust(kind, -(amount as i32));
        debug!(need = %kind, amount, value, "need decayed");

        view.display_need(kind, value, MAX_STAT);
        view.display_message(&format!("{kind} decreased to {value}"));
        Some(kind)
    }

    pub fn feed(&mut self, food: Option<&str>, view: &mut dyn PetView) {
        if !self.pet.alive {
            return;
        }

        let satiety = food
            .and_then(|f| self.pantry.satiety(f))
            .unwrap_or(self.rules.default_satiety);
        let hunger = self.pet.needs.get(NeedKind::Hunger);
        let delta = satiety.min(MAX_STAT - hunger);
        let value = self.pet.needs.adjust(NeedKind::Hunger, delta as i32);
        debug!(food = ?food, satiety, delta, value, "fed");

        let message = match food {
            Some(f) if self.pet.favorites.foods.contains(f) => {
                format!("{} loves {}! OMNOMNOM", self.pet.name, f)
            }
            _ => format!("{} ate some food!", self.pet.name),
        };
        view.display_message(&message);
        view.display_need(NeedKind::Hunger, value, MAX_STAT);
    }

    pub fn train(&mut self, word: &str, view: &mut dyn PetView) {
        if !self.pet.alive {
            return;
        }
        let cost = roll(&mut self.rng, self.rules.train_cost);
        let outcome = roll(&mut self.rng, self.rules.train_roll);
        self.train_with(word, cost, outcome, view);
    }

    /// Training with the energy cost and success roll already drawn.
    pub fn train_with(&mut self, word: &str, cost: u8, outcome: u8, view: &mut dyn PetView) {
        if !self.pet.alive {
            return;
        }

        let energy = self.pet.needs.adjust(NeedKind::Energy, -(cost as i32));
        let learned = outcome < self.rules.train_success_below;
        debug!(word, cost, outcome, learned, "training");

        let message = if learned {
            self.pet.vocab.push(word.to_string());
            format!(
                "{} learned the word \"{}\"! (-{} energy)",
                self.pet.name, word, cost
            )
        } else {
            format!(
                "{} struggled hard, but couldn't quite learn the word... (-{} energy)",
                self.pet.name, cost
            )
        };
        view.display_message(&message);
        view.display_need(NeedKind::Energy, energy, MAX_STAT);
    }

    /// New cadence starts counting from `now`; time elapsed under the old one
    /// is dropped.
    pub fn set_decay_interval(&mut self, interval: DecayInterval, now: DateTime<Utc>) {
        info!(secs = interval.secs(), "decay interval changed");
        self.pet.decay_interval_secs = interval.secs();
        self.pet.last_decay_at = now;
    }

    pub fn render(&self, view: &mut dyn PetView) {
        view.render(&self.pet);
    }
}

/// Uniform draw from an inclusive range given as a pair in either order.
fn roll(rng: &mut StdRng, (a, b): (u8, u8)) -> u8 {
    rng.gen_range(a.min(b)..=a.max(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Transcript;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn session(seed: u64) -> (Session, Transcript) {
        let mut view = Transcript::new();
        let s = Session::new(SessionConfig::default(), seed, t0(), &mut view);
        (s, view)
    }

    fn set_all(s: &mut Session, value: u8) {
        for kind in NeedKind::ALL {
            s.pet.needs.set(kind, value);
        }
    }

    #[test]
    fn new_session_reports_each_need_once() {
        let (_, view) = session(1);
        let kinds: Vec<_> = view.need_updates.iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, NeedKind::ALL.to_vec());
        assert!(view.messages.is_empty());
    }

    #[test]
    fn initial_needs_fall_inside_their_ranges() {
        for seed in 0..200 {
            let (s, _) = session(seed);
            for (kind, value) in s.pet().needs.iter() {
                let (lo, hi) = kind.initial_range();
                assert!((lo..=hi).contains(&value), "{kind}={value} seed={seed}");
            }
            assert!(s.is_alive());
            assert!(s.pet().vocab.is_empty());
            assert_eq!(s.pet().decay_interval_secs, 1800.0);
        }
    }

    #[test]
    fn same_seed_same_pet() {
        let (a, _) = session(42);
        let (b, _) = session(42);
        assert_eq!(a.pet().needs, b.pet().needs);
    }

    #[test]
    fn advance_before_first_interval_does_nothing() {
        let (mut s, mut view) = session(3);
        view.clear();
        let before = s.pet().needs;
        assert_eq!(s.advance(t0() + Duration::seconds(1799), &mut view), 0);
        assert_eq!(s.pet().needs, before);
        assert!(view.messages.is_empty());
    }

    #[test]
    fn advance_backwards_in_time_does_nothing() {
        let (mut s, mut view) = session(3);
        assert_eq!(s.advance(t0() - Duration::hours(5), &mut view), 0);
        assert_eq!(s.pet().last_decay_at, t0());
    }

    #[test]
    fn one_interval_decreases_one_need() {
        let (mut s, mut view) = session(4);
        view.clear();
        let before = s.pet().needs;
        let now = t0() + Duration::seconds(1800);
        assert_eq!(s.advance(now, &mut view), 1);
        assert_eq!(s.pet().last_decay_at, now);

        assert_eq!(view.need_updates.len(), 1);
        let (kind, value) = view.need_updates[0];
        let dropped = before.get(kind) - value;
        assert!((3..=7).contains(&dropped) || value == 0);
        assert_eq!(view.messages, vec![format!("{kind} decreased to {value}")]);
    }

    #[test]
    fn changed_interval_counts_from_reconfiguration() {
        let (mut s, mut view) = session(5);
        let t = t0() + Duration::seconds(900);
        s.set_decay_interval(DecayInterval::new(60.0).unwrap(), t);
        view.clear();

        assert_eq!(s.advance(t + Duration::seconds(125), &mut view), 2);
        assert_eq!(view.messages.len(), 2);
        assert!(view.messages.iter().all(|m| m.contains("decreased")));
    }

    #[test]
    fn one_call_consumes_all_elapsed_time() {
        let (mut s, mut view) = session(6);
        s.set_decay_interval(DecayInterval::new(10.0).unwrap(), t0());
        let now = t0() + Duration::seconds(35);
        assert_eq!(s.advance(now, &mut view), 3);
        assert_eq!(s.advance(now, &mut view), 0);
        assert_eq!(s.advance(now + Duration::seconds(9), &mut view), 0);
        assert_eq!(s.advance(now + Duration::seconds(10), &mut view), 1);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut view = Transcript::new();
        let mut config = SessionConfig::default();
        config.rules.max_catchup_steps = 5;
        config.decay_interval = DecayInterval::new(1.0).unwrap();
        let mut s = Session::new(config, 7, t0(), &mut view);

        let applied = s.advance(t0() + Duration::days(30), &mut view);
        assert_eq!(applied, 5);
        assert!(s.is_alive());
    }

    #[test]
    fn zero_catch_up_cap_consumes_time_without_decay() {
        let mut view = Transcript::new();
        let mut config = SessionConfig::default();
        config.rules.max_catchup_steps = 0;
        config.decay_interval = DecayInterval::new(1.0).unwrap();
        let mut s = Session::new(config, 7, t0(), &mut view);
        let before = s.pet().needs;
        view.clear();

        let now = t0() + Duration::seconds(30);
        assert_eq!(s.advance(now, &mut view), 0);
        assert_eq!(s.pet().last_decay_at, now);
        // the same frame again has nothing due, so the cap is not hit twice
        assert_eq!(s.due_steps(now), 0);
        assert_eq!(s.advance(now, &mut view), 0);
        assert_eq!(s.pet().needs, before);
        assert!(view.messages.is_empty());
    }

    #[test]
    fn set_need_clamps_and_reports() {
        let (mut s, mut view) = session(21);
        view.clear();
        s.set_need(NeedKind::Fun, 250, &mut view);
        s.set_need(NeedKind::Social, 12, &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Fun), MAX_STAT);
        assert_eq!(s.pet().needs.get(NeedKind::Social), 12);
        assert_eq!(
            view.need_updates,
            vec![(NeedKind::Fun, MAX_STAT), (NeedKind::Social, 12)]
        );
    }

    #[test]
    fn set_need_cannot_revive_a_dead_pet() {
        let (mut s, mut view) = session(22);
        for kind in NeedKind::ALL {
            s.set_need(kind, 0, &mut view);
        }
        s.set_decay_interval(DecayInterval::new(1.0).unwrap(), t0());
        s.advance(t0() + Duration::seconds(1), &mut view);
        assert!(!s.is_alive());

        view.clear();
        s.set_need(NeedKind::Fun, 50, &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Fun), 0);
        assert!(view.need_updates.is_empty());
        assert_eq!(s.advance(t0() + Duration::seconds(60), &mut view), 0);
        assert!(!s.is_alive());
        assert!(!s.pet().is_alive());
        assert!(view.messages.is_empty());
    }

    #[test]
    fn energy_is_protected_while_hunger_is_high() {
        for seed in 0..300 {
            let (mut s, mut view) = session(seed);
            s.pet.needs.set(NeedKind::Hunger, 100);
            s.set_decay_interval(DecayInterval::new(1.0).unwrap(), t0());
            view.clear();

            s.advance(t0() + Duration::seconds(1), &mut view);
            assert_eq!(view.need_updates.len(), 1);
            assert_ne!(view.need_updates[0].0, NeedKind::Energy, "seed={seed}");
        }
    }

    #[test]
    fn candidates_follow_hunger_guard() {
        let (mut s, _) = session(8);
        set_all(&mut s, 0);
        s.pet.needs.set(NeedKind::Energy, 50);
        s.pet.needs.set(NeedKind::Hunger, 26);
        assert_eq!(s.decay_candidates(), vec![NeedKind::Hunger]);

        s.pet.needs.set(NeedKind::Hunger, 25);
        assert_eq!(
            s.decay_candidates(),
            vec![NeedKind::Energy, NeedKind::Hunger]
        );
    }

    #[test]
    fn pet_dies_when_nothing_can_decay() {
        let (mut s, mut view) = session(9);
        set_all(&mut s, 0);
        s.set_decay_interval(DecayInterval::new(1.0).unwrap(), t0());
        view.clear();

        assert_eq!(s.advance(t0() + Duration::seconds(10), &mut view), 0);
        assert!(!s.is_alive());
        assert_eq!(view.messages, vec!["Hong Lu has died...".to_string()]);
    }

    #[test]
    fn dead_pet_is_inert() {
        let (mut s, mut view) = session(10);
        set_all(&mut s, 0);
        s.pet.needs.set(NeedKind::Energy, 40);
        s.set_decay_interval(DecayInterval::new(1.0).unwrap(), t0());
        // energy decays until it hits zero, then the pet dies
        s.advance(t0() + Duration::seconds(1000), &mut view);
        assert!(!s.is_alive());

        let frozen = s.pet().needs;
        view.clear();
        s.advance(t0() + Duration::days(3), &mut view);
        s.feed(Some("apples"), &mut view);
        s.train("sit", &mut view);
        s.train_with("sit", 5, 1, &mut view);

        assert!(!s.is_alive());
        assert_eq!(s.pet().needs, frozen);
        assert!(s.pet().vocab.is_empty());
        assert!(view.messages.is_empty());
        assert!(view.need_updates.is_empty());
    }

    #[test]
    fn feeding_apples_caps_hunger() {
        let (mut s, mut view) = session(11);
        s.pet.needs.set(NeedKind::Hunger, 98);
        view.clear();

        s.feed(Some("apples"), &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Hunger), 100);
        assert_eq!(view.messages, vec!["Hong Lu ate some food!".to_string()]);
        assert_eq!(view.need_updates, vec![(NeedKind::Hunger, 100)]);
    }

    #[test]
    fn unknown_food_uses_default_satiety() {
        let (mut s, mut view) = session(12);
        s.pet.needs.set(NeedKind::Hunger, 50);
        s.feed(Some("pebbles"), &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Hunger), 55);
        s.feed(None, &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Hunger), 60);
        s.feed(Some("apples"), &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Hunger), 70);
    }

    #[test]
    fn configured_foods_are_used() {
        let mut view = Transcript::new();
        let mut config = SessionConfig::default();
        config.pantry.insert("fish", 30);
        let mut s = Session::new(config, 13, t0(), &mut view);
        s.pet.needs.set(NeedKind::Hunger, 10);
        s.feed(Some("fish"), &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Hunger), 40);
    }

    #[test]
    fn favorite_food_gets_its_own_message() {
        let (mut s, mut view) = session(14);
        s.pet.favorites.foods.insert("apples".to_string());
        view.clear();
        s.feed(Some("apples"), &mut view);
        assert_eq!(
            view.last_message(),
            Some("Hong Lu loves apples! OMNOMNOM")
        );
    }

    #[test]
    fn successful_training_adds_word_and_costs_energy() {
        let (mut s, mut view) = session(15);
        s.pet.needs.set(NeedKind::Energy, 80);
        view.clear();

        s.train_with("sit", 7, 74, &mut view);
        assert_eq!(s.pet().vocab, vec!["sit".to_string()]);
        assert_eq!(s.pet().needs.get(NeedKind::Energy), 73);
        assert_eq!(
            view.messages,
            vec!["Hong Lu learned the word \"sit\"! (-7 energy)".to_string()]
        );
        assert_eq!(view.need_updates, vec![(NeedKind::Energy, 73)]);
    }

    #[test]
    fn failed_training_still_costs_energy() {
        let (mut s, mut view) = session(16);
        s.pet.needs.set(NeedKind::Energy, 80);
        view.clear();

        s.train_with("sit", 5, 75, &mut view);
        assert!(s.pet().vocab.is_empty());
        assert_eq!(s.pet().needs.get(NeedKind::Energy), 75);
        assert_eq!(
            view.last_message(),
            Some("Hong Lu struggled hard, but couldn't quite learn the word... (-5 energy)")
        );
    }

    #[test]
    fn every_roll_from_75_up_fails() {
        let (mut s, mut view) = session(16);
        s.pet.needs.set(NeedKind::Energy, MAX_STAT);
        view.clear();

        for outcome in 75..=100u8 {
            let before = s.pet().needs.get(NeedKind::Energy);
            s.train_with("sit", 1, outcome, &mut view);
            assert!(s.pet().vocab.is_empty(), "roll {outcome}");
            assert_eq!(s.pet().needs.get(NeedKind::Energy), before - 1);
            assert!(
                view.last_message().unwrap_or_default().contains("struggled hard"),
                "roll {outcome}"
            );
        }
        assert_eq!(view.need_updates.len(), 26);
    }

    #[test]
    fn every_successful_roll_adds_exactly_one_word() {
        let (mut s, mut view) = session(17);
        for i in 0..10_000u32 {
            s.train_with("paw", 5, (i % 74) as u8 + 1, &mut view);
            assert_eq!(s.pet().vocab.len(), i as usize + 1);
        }
        assert_eq!(s.pet().needs.get(NeedKind::Energy), 0);
    }

    #[test]
    fn vocab_keeps_duplicates_in_order() {
        let (mut s, mut view) = session(18);
        for word in ["sit", "stay", "sit"] {
            s.train_with(word, 5, 1, &mut view);
        }
        assert_eq!(s.pet().vocab, vec!["sit", "stay", "sit"]);
        assert_eq!(s.pet().latest_word(), Some("sit"));
    }

    #[test]
    fn training_cannot_push_energy_negative() {
        let (mut s, mut view) = session(19);
        s.pet.needs.set(NeedKind::Energy, 3);
        s.train_with("roll", 10, 90, &mut view);
        assert_eq!(s.pet().needs.get(NeedKind::Energy), 0);
    }

    #[test]
    fn random_training_stays_in_bounds() {
        let (mut s, mut view) = session(20);
        for _ in 0..500 {
            s.train("fetch", &mut view);
        }
        let energy = s.pet().needs.get(NeedKind::Energy);
        assert_eq!(energy, 0);
        // roughly three quarters of rolls land under 75
        let learned = s.pet().vocab.len();
        assert!((300..=440).contains(&learned), "learned {learned}");
    }

    #[test]
    fn interval_parsing_rejects_garbage() {
        assert_eq!("60".parse::<DecayInterval>(), Ok(DecayInterval(60.0)));
        assert_eq!(" 0.5 ".parse::<DecayInterval>(), Ok(DecayInterval(0.5)));
        assert_eq!("abc".parse::<DecayInterval>(), Err(IntervalError::NotANumber));
        assert_eq!("0".parse::<DecayInterval>(), Err(IntervalError::NotPositive));
        assert_eq!("-5".parse::<DecayInterval>(), Err(IntervalError::NotPositive));
        assert_eq!("NaN".parse::<DecayInterval>(), Err(IntervalError::NotPositive));
        assert_eq!("inf".parse::<DecayInterval>(), Err(IntervalError::NotPositive));
    }
}
