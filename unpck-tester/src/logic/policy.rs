use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Serialize, Serializer};
use unpck_game::{Decision, DecisionSource, TripItem};

/// Move returned by a [`PlayerPolicy`] for the item on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyMove {
    pub decision: Decision,
    pub source: DecisionSource,
    /// Reaction time measured from the moment the item appeared.
    pub delay: Duration,
}

impl PolicyMove {
    #[must_use]
    pub const fn new(decision: Decision, source: DecisionSource, delay: Duration) -> Self {
        Self {
            decision,
            source,
            delay,
        }
    }
}

/// Policy interface for automated play strategies.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// React to `item`, given `window` seconds before the countdown expires.
    /// `None` means the player never answers.
    fn react(&mut self, item: &TripItem, window: Duration) -> Option<PolicyMove>;
}

/// Built-in player strategies for automated rounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlayerStrategy {
    Perfect,
    Contrarian,
    CoinFlip,
    Idle,
    Hesitant,
}

impl PlayerStrategy {
    pub const ALL: [Self; 5] = [
        Self::Perfect,
        Self::Contrarian,
        Self::CoinFlip,
        Self::Idle,
        Self::Hesitant,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Perfect => "perfect",
            Self::Contrarian => "contrarian",
            Self::CoinFlip => "coin-flip",
            Self::Idle => "idle",
            Self::Hesitant => "hesitant",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect",
            Self::Contrarian => "Contrarian",
            Self::CoinFlip => "Coin Flip",
            Self::Idle => "Idle",
            Self::Hesitant => "Hesitant",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Perfect => "Always answers correctly, well inside the window",
            Self::Contrarian => "Always answers wrong, well inside the window",
            Self::CoinFlip => "Answers at random with random reaction times",
            Self::Idle => "Never answers; every item times out",
            Self::Hesitant => "Answers correctly but sometimes misses the window",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Perfect => Box::new(PerfectPolicy),
            Self::Contrarian => Box::new(ContrarianPolicy),
            Self::CoinFlip => Box::new(CoinFlipPolicy::new(seed)),
            Self::Idle => Box::new(IdlePolicy),
            Self::Hesitant => Box::new(HesitantPolicy::new(seed)),
        }
    }
}

impl fmt::Display for PlayerStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for PlayerStrategy {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.key())
    }
}

impl FromStr for PlayerStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.key() == needle)
            .ok_or_else(|| format!("unknown strategy '{s}'"))
    }
}

fn quarter(window: Duration) -> Duration {
    window / 4
}

struct PerfectPolicy;
struct ContrarianPolicy;
struct IdlePolicy;

struct CoinFlipPolicy {
    rng: ChaCha20Rng,
}

impl CoinFlipPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

struct HesitantPolicy {
    rng: ChaCha20Rng,
    miss_chance: f64,
}

impl HesitantPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed ^ 0x4845_5349),
            miss_chance: 0.3,
        }
    }
}

impl PlayerPolicy for PerfectPolicy {
    fn name(&self) -> &'static str {
        "Perfect"
    }

    fn react(&mut self, item: &TripItem, window: Duration) -> Option<PolicyMove> {
        Some(PolicyMove::new(
            Decision::expected_for(item),
            DecisionSource::Manual,
            quarter(window),
        ))
    }
}

impl PlayerPolicy for ContrarianPolicy {
    fn name(&self) -> &'static str {
        "Contrarian"
    }

    fn react(&mut self, item: &TripItem, window: Duration) -> Option<PolicyMove> {
        Some(PolicyMove::new(
            Decision::expected_for(item).opposite(),
            DecisionSource::Gesture,
            quarter(window),
        ))
    }
}

impl PlayerPolicy for IdlePolicy {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn react(&mut self, _item: &TripItem, _window: Duration) -> Option<PolicyMove> {
        None
    }
}

impl PlayerPolicy for CoinFlipPolicy {
    fn name(&self) -> &'static str {
        "Coin Flip"
    }

    fn react(&mut self, _item: &TripItem, window: Duration) -> Option<PolicyMove> {
        let decision = if self.rng.gen_bool(0.5) {
            Decision::Pack
        } else {
            Decision::Reject
        };
        let source = if self.rng.gen_bool(0.5) {
            DecisionSource::Manual
        } else {
            DecisionSource::Gesture
        };
        let delay = window.mul_f64(self.rng.gen_range(0.05..0.95));
        Some(PolicyMove::new(decision, source, delay))
    }
}

impl PlayerPolicy for HesitantPolicy {
    fn name(&self) -> &'static str {
        "Hesitant"
    }

    fn react(&mut self, item: &TripItem, window: Duration) -> Option<PolicyMove> {
        let delay = if self.rng.gen_bool(self.miss_chance) {
            window.mul_f64(self.rng.gen_range(1.1..1.5))
        } else {
            window.mul_f64(self.rng.gen_range(0.3..0.9))
        };
        Some(PolicyMove::new(
            Decision::expected_for(item),
            DecisionSource::Manual,
            delay,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use unpck_game::ItemTag;

    const WINDOW: Duration = Duration::from_secs(4);

    #[test]
    fn strategies_parse_from_keys() {
        for strategy in PlayerStrategy::ALL {
            assert_eq!(strategy.key().parse::<PlayerStrategy>(), Ok(strategy));
        }
        assert_eq!(" Perfect ".parse::<PlayerStrategy>(), Ok(PlayerStrategy::Perfect));
        assert!("reckless".parse::<PlayerStrategy>().is_err());
    }

    #[test]
    fn perfect_and_contrarian_disagree() {
        let item = TripItem::new("Snow boots", ItemTag::Trap);
        let mut perfect = PlayerStrategy::Perfect.create_policy(1);
        let mut contrarian = PlayerStrategy::Contrarian.create_policy(1);
        let right = perfect.react(&item, WINDOW).unwrap();
        let wrong = contrarian.react(&item, WINDOW).unwrap();
        assert_eq!(right.decision, Decision::Reject);
        assert_eq!(wrong.decision, Decision::Pack);
        assert!(right.delay < WINDOW);
        assert_eq!(perfect.name(), "Perfect");
    }

    #[test]
    fn idle_never_answers() {
        let mut idle = PlayerStrategy::Idle.create_policy(3);
        assert!(idle.react(&TripItem::new("Map", ItemTag::Essential), WINDOW).is_none());
    }

    #[test]
    fn coin_flip_stays_inside_window_and_is_seeded() {
        let item = TripItem::new("Towel", ItemTag::Useful);
        let mut first = PlayerStrategy::CoinFlip.create_policy(77);
        let mut second = PlayerStrategy::CoinFlip.create_policy(77);
        for _ in 0..32 {
            let a = first.react(&item, WINDOW).unwrap();
            let b = second.react(&item, WINDOW).unwrap();
            assert_eq!(a, b);
            assert!(a.delay < WINDOW);
        }
    }

    #[test]
    fn hesitant_is_always_right_and_sometimes_late() {
        let item = TripItem::new("Passport", ItemTag::Essential);
        let mut hesitant = PlayerStrategy::Hesitant.create_policy(5);
        let moves: Vec<PolicyMove> = (0..200)
            .filter_map(|_| hesitant.react(&item, WINDOW))
            .collect();
        assert!(moves.iter().all(|m| m.decision == Decision::Pack));
        assert!(moves.iter().any(|m| m.delay > WINDOW));
        assert!(moves.iter().any(|m| m.delay < WINDOW));
    }
}
