use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const FRONT_TOKEN: &str = "_FRONT_";
const RANK_TOKEN: &str = "_RANK_";

/// Rule deciding when a continuous series moves to the next expiry.
///
/// The set is closed: every series kind the warehouse understands is a
/// variant here, so matches over it are checked for exhaustiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum RollStrategy {
    /// Fixed offset before expiry, e.g. `calendar-2d`.
    Calendar { days_before_expiry: Option<u32> },
    /// Roll on volume crossover.
    Volume,
    /// Roll on open-interest crossover.
    OpenInterest,
}

impl RollStrategy {
    /// Parse a slug such as `calendar-2d`, `volume`, `open-interest` or the
    /// upper-snake token form (`CALENDAR_2D`).
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = input
            .trim()
            .to_ascii_lowercase()
            .replace(['_', ' '], "-");
        let unknown = || ValidationError::UnknownRollStrategy {
            value: input.to_owned(),
        };

        match normalized.as_str() {
            "volume" => Ok(Self::Volume),
            "open-interest" => Ok(Self::OpenInterest),
            "calendar" => Ok(Self::Calendar {
                days_before_expiry: None,
            }),
            other => {
                let days = other
                    .strip_prefix("calendar-")
                    .and_then(|rest| rest.strip_suffix('d'))
                    .ok_or_else(unknown)?;
                let days = days.parse::<u32>().map_err(|_| unknown())?;
                Ok(Self::Calendar {
                    days_before_expiry: Some(days),
                })
            }
        }
    }

    pub fn slug(self) -> String {
        match self {
            Self::Calendar {
                days_before_expiry: None,
            } => String::from("calendar"),
            Self::Calendar {
                days_before_expiry: Some(days),
            } => format!("calendar-{days}d"),
            Self::Volume => String::from("volume"),
            Self::OpenInterest => String::from("open-interest"),
        }
    }

    /// Upper-snake token embedded in contract series ids.
    pub fn token(self) -> String {
        self.slug().replace('-', "_").to_ascii_uppercase()
    }

    /// Provider continuous-symbol code (`ES.c.0`, `ES.v.0`, `ES.o.0`).
    pub const fn roll_code(self) -> char {
        match self {
            Self::Calendar { .. } => 'c',
            Self::Volume => 'v',
            Self::OpenInterest => 'o',
        }
    }
}

impl Display for RollStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.slug())
    }
}

impl FromStr for RollStrategy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RollStrategy {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RollStrategy> for String {
    fn from(value: RollStrategy) -> Self {
        value.slug()
    }
}

/// One continuous series: a root, a rank from the front month and a roll rule.
///
/// `(root, rank, roll_strategy)` maps to exactly one id and the id maps back.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractSeries {
    pub root: String,
    pub rank: u32,
    pub roll_strategy: RollStrategy,
}

impl ContractSeries {
    pub fn new(
        root: &str,
        roll_strategy: RollStrategy,
        rank: u32,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            root: normalize_root(root)?,
            rank,
            roll_strategy,
        })
    }

    pub fn id(&self) -> String {
        make_series_id(&self.root, self.roll_strategy, self.rank)
    }

    /// Recover root, rank and strategy from an id built by [`make_series_id`].
    pub fn parse(id: &str) -> Result<Self, ValidationError> {
        let unrecognized = || ValidationError::UnrecognizedSeriesId {
            value: id.to_owned(),
        };

        let (root, rank, token) = if let Some((root, token)) = id.split_once(FRONT_TOKEN) {
            (root, 0, token)
        } else if let Some((root, rest)) = id.split_once(RANK_TOKEN) {
            let (digits, token) = rest.split_once('_').ok_or_else(unrecognized)?;
            let rank = digits.parse::<u32>().map_err(|_| unrecognized())?;
            (root, rank, token)
        } else {
            return Err(unrecognized());
        };

        Ok(Self {
            root: normalize_root(root)?,
            rank,
            roll_strategy: RollStrategy::parse(token)?,
        })
    }
}

impl Display for ContractSeries {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.id())
    }
}

/// Build the canonical id, e.g. `ES_FRONT_CALENDAR_2D` or `SR3_RANK_2_VOLUME`.
pub fn make_series_id(root: &str, roll_strategy: RollStrategy, rank: u32) -> String {
    let position = if rank == 0 {
        String::from("FRONT")
    } else {
        format!("RANK_{rank}")
    };
    format!(
        "{}_{position}_{}",
        root.trim().to_ascii_uppercase(),
        roll_strategy.token()
    )
}

/// Rank encoded in a series id: `_FRONT_` is 0, `RANK_N` is N.
pub fn parse_series_rank(id: &str) -> Option<u32> {
    if id.contains(FRONT_TOKEN) {
        return Some(0);
    }
    let (_, rest) = id.split_once(RANK_TOKEN)?;
    let digits: String = rest.chars().take_while(|ch| ch.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Provider continuous symbol such as `ES.c.0` (root, roll code, rank).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuousSymbol {
    pub root: String,
    pub roll_code: char,
    pub rank: u32,
}

impl ContinuousSymbol {
    pub fn parse(symbol: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidContinuousSymbol {
            value: symbol.to_owned(),
        };
        let mut parts = symbol.trim().split('.');
        let (Some(root), Some(code), Some(rank), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let roll_code = match code {
            "c" | "v" | "o" => code.chars().next().ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        Ok(Self {
            root: normalize_root(root)?,
            roll_code,
            rank: rank.parse().map_err(|_| invalid())?,
        })
    }

    /// The roll rule family named by the roll code, without a calendar offset.
    pub const fn family(&self) -> RollStrategy {
        match self.roll_code {
            'v' => RollStrategy::Volume,
            'o' => RollStrategy::OpenInterest,
            _ => RollStrategy::Calendar {
                days_before_expiry: None,
            },
        }
    }

    /// Bind this symbol to a concrete roll rule. The rule must belong to the
    /// same family as the symbol's roll code.
    pub fn to_series(&self, roll_strategy: RollStrategy) -> Result<ContractSeries, ValidationError> {
        if roll_strategy.roll_code() != self.roll_code {
            return Err(ValidationError::UnknownRollStrategy {
                value: format!("{roll_strategy} does not match roll code '{}'", self.roll_code),
            });
        }
        ContractSeries::new(&self.root, roll_strategy, self.rank)
    }
}

pub(crate) fn normalize_root(root: &str) -> Result<String, ValidationError> {
    let trimmed = root.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyRoot);
    }
    for (index, ch) in trimmed.chars().enumerate() {
        if !ch.is_ascii_alphanumeric() {
            return Err(ValidationError::RootInvalidChar { ch, index });
        }
    }
    Ok(trimmed.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar_2d() -> RollStrategy {
        RollStrategy::Calendar {
            days_before_expiry: Some(2),
        }
    }

    #[test]
    fn builds_front_and_ranked_ids() {
        assert_eq!(make_series_id("ES", calendar_2d(), 0), "ES_FRONT_CALENDAR_2D");
        assert_eq!(
            make_series_id("sr3", RollStrategy::OpenInterest, 2),
            "SR3_RANK_2_OPEN_INTEREST"
        );
    }

    #[test]
    fn id_round_trips_through_parse() {
        let series = ContractSeries::new("SR3", RollStrategy::Volume, 3).expect("series");
        let parsed = ContractSeries::parse(&series.id()).expect("parse");
        assert_eq!(parsed, series);
    }

    #[test]
    fn rank_is_recoverable_from_id() {
        assert_eq!(parse_series_rank("ES_FRONT_CALENDAR_2D"), Some(0));
        assert_eq!(parse_series_rank("SR3_RANK_12_VOLUME"), Some(12));
        assert_eq!(parse_series_rank("ES_BACK_VOLUME"), None);
    }

    #[test]
    fn roll_strategy_slugs_and_tokens() {
        let strategy = RollStrategy::parse("calendar-2d").expect("parse");
        assert_eq!(strategy, calendar_2d());
        assert_eq!(strategy.token(), "CALENDAR_2D");
        assert_eq!(
            RollStrategy::parse("OPEN_INTEREST").expect("parse"),
            RollStrategy::OpenInterest
        );
        assert!(RollStrategy::parse("liquidity").is_err());
        assert!(RollStrategy::parse("calendar-xd").is_err());
    }

    #[test]
    fn continuous_symbol_binds_to_matching_family_only() {
        let symbol = ContinuousSymbol::parse("ES.c.1").expect("parse");
        assert_eq!(symbol.rank, 1);
        let series = symbol.to_series(calendar_2d()).expect("series");
        assert_eq!(series.id(), "ES_RANK_1_CALENDAR_2D");
        assert!(symbol.to_series(RollStrategy::Volume).is_err());
        assert_eq!(
            symbol.to_series(symbol.family()).expect("series").id(),
            "ES_RANK_1_CALENDAR"
        );
        assert_eq!(
            ContinuousSymbol::parse("NQ.o.0").expect("parse").family(),
            RollStrategy::OpenInterest
        );
        assert!(ContinuousSymbol::parse("ES.x.0").is_err());
        assert!(ContinuousSymbol::parse("ESH6").is_err());
    }
}
