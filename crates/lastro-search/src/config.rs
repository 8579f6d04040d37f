//! Engine configuration and candidate tables.
//!
//! The candidate tables are static data borrowed by [`SamplerConfig`]; no
//! selection state is shared between requests.

use std::env;
use std::str::FromStr;

use lastro_core::{defaults, Attribute};

/// A direct suggestion candidate: share one attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectOption {
    pub attribute: Attribute,
    /// Relative selection weight.
    pub weight: u32,
}

/// A disruptive suggestion candidate: match one attribute, exclude another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DisruptiveOption {
    pub match_attribute: Attribute,
    pub exclude_attribute: Attribute,
}

const fn direct(attribute: Attribute, weight: u32) -> DirectOption {
    DirectOption { attribute, weight }
}

const fn disruptive(match_attribute: Attribute, exclude_attribute: Attribute) -> DisruptiveOption {
    DisruptiveOption {
        match_attribute,
        exclude_attribute,
    }
}

/// Direct candidates with their weights.
pub static DIRECT_OPTIONS: [DirectOption; 13] = [
    direct(Attribute::Title, 80),
    direct(Attribute::Author, 90),
    direct(Attribute::Category, 75),
    direct(Attribute::Date, 90),
    direct(Attribute::Direction, 25),
    direct(Attribute::Sound, 5),
    direct(Attribute::Production, 5),
    direct(Attribute::Support, 5),
    direct(Attribute::Assistance, 2),
    direct(Attribute::Research, 2),
    direct(Attribute::Location, 90),
    direct(Attribute::Instruments, 80),
    direct(Attribute::Keywords, 50),
];

/// Disruptive candidates, all equally likely.
pub static DISRUPTIVE_OPTIONS: [DisruptiveOption; 14] = [
    disruptive(Attribute::Author, Attribute::Category),
    disruptive(Attribute::Author, Attribute::Location),
    disruptive(Attribute::Author, Attribute::Instruments),
    disruptive(Attribute::Category, Attribute::Author),
    disruptive(Attribute::Category, Attribute::Location),
    disruptive(Attribute::Category, Attribute::Instruments),
    disruptive(Attribute::Location, Attribute::Author),
    disruptive(Attribute::Location, Attribute::Category),
    disruptive(Attribute::Location, Attribute::Instruments),
    disruptive(Attribute::Instruments, Attribute::Author),
    disruptive(Attribute::Instruments, Attribute::Location),
    disruptive(Attribute::Instruments, Attribute::Category),
    disruptive(Attribute::Author, Attribute::Date),
    disruptive(Attribute::Date, Attribute::Author),
];

/// Fallback policy configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackConfig {
    /// Size of the final random sample.
    pub random_limit: i64,
    /// Maximum number of words in the split-word keyword query.
    pub split_words_max: usize,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            random_limit: defaults::FALLBACK_RANDOM_LIMIT,
            split_words_max: defaults::SPLIT_WORDS_MAX,
        }
    }
}

impl FallbackConfig {
    /// Constructs the configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LASTRO_RANDOM_LIMIT` (default: 100)
    /// - `LASTRO_SPLIT_WORDS_MAX` (default: 5)
    ///
    /// Missing, unparsable, or non-positive values fall back to the default.
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            random_limit: parse_positive_env("LASTRO_RANDOM_LIMIT", base.random_limit),
            split_words_max: parse_positive_env("LASTRO_SPLIT_WORDS_MAX", base.split_words_max),
        }
    }

    pub fn with_random_limit(mut self, limit: i64) -> Self {
        self.random_limit = limit;
        self
    }

    pub fn with_split_words_max(mut self, max: usize) -> Self {
        self.split_words_max = max;
        self
    }
}

/// Suggestion sampler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Number of direct suggestions returned.
    pub direct_count: usize,
    /// Number of disruptive suggestions returned.
    pub disruptive_count: usize,
    /// Direct candidates evaluated, as a multiple of `direct_count`.
    pub direct_pool_factor: usize,
    /// Disruptive candidates evaluated, as a multiple of `disruptive_count`.
    pub disruptive_pool_factor: usize,
    pub direct_options: &'static [DirectOption],
    pub disruptive_options: &'static [DisruptiveOption],
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            direct_count: defaults::DIRECT_COUNT,
            disruptive_count: defaults::DISRUPTIVE_COUNT,
            direct_pool_factor: defaults::DIRECT_POOL_FACTOR,
            disruptive_pool_factor: defaults::DISRUPTIVE_POOL_FACTOR,
            direct_options: &DIRECT_OPTIONS,
            disruptive_options: &DISRUPTIVE_OPTIONS,
        }
    }
}

impl SamplerConfig {
    /// Constructs the configuration from environment variables.
    ///
    /// Environment variables:
    /// - `LASTRO_DIRECT_COUNT` (default: 3)
    /// - `LASTRO_DISRUPTIVE_COUNT` (default: 2)
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            direct_count: parse_positive_env("LASTRO_DIRECT_COUNT", base.direct_count),
            disruptive_count: parse_positive_env(
                "LASTRO_DISRUPTIVE_COUNT",
                base.disruptive_count,
            ),
            ..base
        }
    }

    pub fn with_direct_count(mut self, count: usize) -> Self {
        self.direct_count = count;
        self
    }

    pub fn with_disruptive_count(mut self, count: usize) -> Self {
        self.disruptive_count = count;
        self
    }

    pub fn with_direct_options(mut self, options: &'static [DirectOption]) -> Self {
        self.direct_options = options;
        self
    }

    pub fn with_disruptive_options(mut self, options: &'static [DisruptiveOption]) -> Self {
        self.disruptive_options = options;
        self
    }

    /// Number of direct candidates evaluated per request.
    pub fn direct_pool_size(&self) -> usize {
        self.direct_count.saturating_mul(self.direct_pool_factor)
    }

    /// Number of disruptive candidates evaluated per request.
    pub fn disruptive_pool_size(&self) -> usize {
        self.disruptive_count
            .saturating_mul(self.disruptive_pool_factor)
    }

    /// Weight declared for `attribute`, zero when it is not a direct option.
    pub fn weight_of(&self, attribute: Attribute) -> u32 {
        self.direct_options
            .iter()
            .find(|o| o.attribute == attribute)
            .map_or(0, |o| o.weight)
    }
}

/// Parses a positive number from an environment variable with a default fallback.
fn parse_positive_env<T>(key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default,
{
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<T>().ok())
        .filter(|val| *val > T::default())
        .unwrap_or(default)
}
