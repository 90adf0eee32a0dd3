//! Turns command line flags into a [`SamplingPolicy`].

use crate::sampler::{PolicyError, SamplingPolicy, TimeUnit};

#[derive(clap::Args, Debug, Default, Clone)]
pub struct SamplingArgs {
    /// Extract every Nth frame
    #[arg(long, value_name = "N")]
    pub interval: Option<u64>,

    /// Extract this many frames per time unit [default: 1]
    #[arg(long, value_name = "N")]
    pub frames_per_unit: Option<u64>,

    /// The time unit of --frames-per-unit [default: second]
    #[arg(long, value_enum)]
    pub time_unit: Option<TimeUnit>,

    /// Extract random frames instead, requires --random-count
    #[arg(long)]
    pub random: bool,

    /// How many random frames to extract from each video
    #[arg(long, value_name = "N")]
    pub random_count: Option<u64>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--random needs --random-count")]
    RandomWithoutCount,
    #[error("--random-count needs --random")]
    CountWithoutRandom,
    #[error("--random can't be combined with the --interval or rate options")]
    RandomAndStride,
    #[error("--interval can't be combined with --frames-per-unit or --time-unit")]
    IntervalAndRate,
    #[error("invalid sampling policy")]
    InvalidPolicy(#[from] PolicyError),
}

impl SamplingArgs {
    /// Without any flags this is one frame per second.
    pub fn to_policy(&self) -> Result<SamplingPolicy, ConfigError> {
        let rate_given = self.frames_per_unit.is_some() || self.time_unit.is_some();

        let policy = match (self.random, self.random_count) {
            (true, None) => return Err(ConfigError::RandomWithoutCount),
            (false, Some(_)) => return Err(ConfigError::CountWithoutRandom),
            (true, Some(_)) if self.interval.is_some() || rate_given => {
                return Err(ConfigError::RandomAndStride)
            }
            (true, Some(count)) => SamplingPolicy::Random { count },
            (false, None) => match self.interval {
                Some(_) if rate_given => return Err(ConfigError::IntervalAndRate),
                Some(interval) => SamplingPolicy::FixedStride { interval },
                None => SamplingPolicy::RateBased {
                    frames_per_unit: self.frames_per_unit.unwrap_or(1),
                    time_unit: self.time_unit.unwrap_or(TimeUnit::Second),
                },
            },
        };

        policy.validate()?;
        Ok(policy)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn args() -> SamplingArgs {
        SamplingArgs::default()
    }

    #[test]
    fn default_is_one_per_second() {
        assert_eq!(
            Ok(SamplingPolicy::RateBased {
                frames_per_unit: 1,
                time_unit: TimeUnit::Second
            }),
            args().to_policy()
        );
    }

    #[test]
    fn rate_halves_default() {
        let only_unit = SamplingArgs {
            time_unit: Some(TimeUnit::Minute),
            ..args()
        };
        assert_eq!(
            Ok(SamplingPolicy::RateBased {
                frames_per_unit: 1,
                time_unit: TimeUnit::Minute
            }),
            only_unit.to_policy()
        );

        let only_count = SamplingArgs {
            frames_per_unit: Some(4),
            ..args()
        };
        assert_eq!(
            Ok(SamplingPolicy::RateBased {
                frames_per_unit: 4,
                time_unit: TimeUnit::Second
            }),
            only_count.to_policy()
        );
    }

    #[test]
    fn fixed_and_random() {
        let fixed = SamplingArgs {
            interval: Some(12),
            ..args()
        };
        assert_eq!(Ok(SamplingPolicy::FixedStride { interval: 12 }), fixed.to_policy());

        let random = SamplingArgs {
            random: true,
            random_count: Some(3),
            ..args()
        };
        assert_eq!(Ok(SamplingPolicy::Random { count: 3 }), random.to_policy());
    }

    #[test]
    fn random_flags_must_come_together() {
        let flag_only = SamplingArgs {
            random: true,
            ..args()
        };
        assert_eq!(Err(ConfigError::RandomWithoutCount), flag_only.to_policy());

        let count_only = SamplingArgs {
            random_count: Some(3),
            ..args()
        };
        assert_eq!(Err(ConfigError::CountWithoutRandom), count_only.to_policy());
    }

    #[test]
    fn policies_are_exclusive() {
        let random_and_interval = SamplingArgs {
            random: true,
            random_count: Some(3),
            interval: Some(2),
            ..args()
        };
        assert_eq!(Err(ConfigError::RandomAndStride), random_and_interval.to_policy());

        let interval_and_rate = SamplingArgs {
            interval: Some(2),
            frames_per_unit: Some(1),
            ..args()
        };
        assert_eq!(Err(ConfigError::IntervalAndRate), interval_and_rate.to_policy());
    }

    #[test]
    fn zeroes_are_invalid() {
        let zero_interval = SamplingArgs {
            interval: Some(0),
            ..args()
        };
        assert_eq!(
            Err(ConfigError::InvalidPolicy(PolicyError::ZeroInterval)),
            zero_interval.to_policy()
        );

        let zero_count = SamplingArgs {
            random: true,
            random_count: Some(0),
            ..args()
        };
        assert_eq!(
            Err(ConfigError::InvalidPolicy(PolicyError::ZeroCount)),
            zero_count.to_policy()
        );
    }
}
