//! Decides which frames of a video to extract.
//!
//! Everything here is pure arithmetic on the frame rate and frame count of a video, the
//! only outside input is the random number generator for [`SamplingPolicy::Random`].

use std::{fmt, iter::StepBy, ops::Range};

use rand::Rng;

/// How long one "unit" is in [`SamplingPolicy::RateBased`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    pub fn seconds(self) -> u32 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3600,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TimeUnit::Second => "second",
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
        };
        write!(f, "{name}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplingPolicy {
    /// Every `interval`th frame, starting with the first.
    FixedStride { interval: u64 },
    /// `frames_per_unit` frames per `time_unit` of video, evenly spaced.
    RateBased {
        frames_per_unit: u64,
        time_unit: TimeUnit,
    },
    /// `count` distinct frames chosen uniformly at random.
    Random { count: u64 },
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum PolicyError {
    #[error("the frame interval must be at least 1")]
    ZeroInterval,
    #[error("the number of frames per {0} must be at least 1")]
    ZeroFramesPerUnit(TimeUnit),
    #[error("the number of random frames must be at least 1")]
    ZeroCount,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum SampleError {
    #[error("unreadable stream (frame rate {frame_rate}, frame count {frame_count})")]
    UnreadableStream { frame_rate: f64, frame_count: i64 },
    #[error("invalid sampling policy")]
    InvalidPolicy(#[from] PolicyError),
}

impl SamplingPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        match *self {
            SamplingPolicy::FixedStride { interval: 0 } => Err(PolicyError::ZeroInterval),
            SamplingPolicy::RateBased {
                frames_per_unit: 0,
                time_unit,
            } => Err(PolicyError::ZeroFramesPerUnit(time_unit)),
            SamplingPolicy::Random { count: 0 } => Err(PolicyError::ZeroCount),
            _ => Ok(()),
        }
    }

    /// The stride this policy results in for a video with the given frame rate. Random
    /// sampling has no stride.
    pub fn effective_interval(&self, frame_rate: f64) -> Option<u64> {
        match *self {
            SamplingPolicy::FixedStride { interval } => Some(interval.max(1)),
            SamplingPolicy::RateBased {
                frames_per_unit,
                time_unit,
            } => Some(rate_interval(frame_rate, frames_per_unit, time_unit)),
            SamplingPolicy::Random { .. } => None,
        }
    }
}

impl fmt::Display for SamplingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SamplingPolicy::FixedStride { interval } => {
                write!(f, "every {interval} frame(s)")
            }
            SamplingPolicy::RateBased {
                frames_per_unit,
                time_unit,
            } => write!(f, "{frames_per_unit} frame(s) per {time_unit}"),
            SamplingPolicy::Random { count } => write!(f, "{count} random frame(s)"),
        }
    }
}

/// Rounded, not truncated, to keep the long run rate close to the requested one. Never
/// less than 1.
fn rate_interval(frame_rate: f64, frames_per_unit: u64, time_unit: TimeUnit) -> u64 {
    let frames_in_unit = frame_rate * f64::from(time_unit.seconds());
    let raw = frames_in_unit / frames_per_unit.max(1) as f64;
    let rounded = raw.round();
    if rounded.is_finite() && rounded >= 1.0 {
        // NOTE: saturates for absurdly large values
        rounded as u64
    } else {
        1
    }
}

/// Strictly increasing frame indices, all less than the frame count they were sampled
/// from. Strided indices are produced on the fly, since the frame count comes from
/// container metadata and can be arbitrarily large.
#[derive(Clone, Debug)]
pub struct FrameIndexSet(Indices);

#[derive(Clone, Debug)]
enum Indices {
    Strided { frame_count: u64, interval: u64 },
    Listed(Vec<u64>),
}

impl FrameIndexSet {
    fn strided(frame_count: u64, interval: u64) -> Self {
        Self(Indices::Strided {
            frame_count,
            interval: interval.max(1),
        })
    }

    fn from_sorted(indices: Vec<u64>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        Self(Indices::Listed(indices))
    }

    pub fn len(&self) -> u64 {
        match &self.0 {
            Indices::Strided {
                frame_count,
                interval,
            } => frame_count.div_ceil(*interval),
            Indices::Listed(indices) => indices.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for FrameIndexSet {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Indices::Listed(a), Indices::Listed(b)) => a == b,
            (
                Indices::Strided {
                    frame_count: count_a,
                    interval: interval_a,
                },
                Indices::Strided {
                    frame_count: count_b,
                    interval: interval_b,
                },
            ) if count_a == count_b && interval_a == interval_b => true,
            _ => {
                self.len() == other.len()
                    && self.clone().into_iter().eq(other.clone().into_iter())
            }
        }
    }
}

impl Eq for FrameIndexSet {}

/// Iterator over a [`FrameIndexSet`].
pub struct FrameIndices(IndicesIter);

enum IndicesIter {
    Strided(StepBy<Range<u64>>),
    Listed(std::vec::IntoIter<u64>),
}

impl Iterator for FrameIndices {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        match &mut self.0 {
            IndicesIter::Strided(it) => it.next(),
            IndicesIter::Listed(it) => it.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.0 {
            IndicesIter::Strided(it) => it.size_hint(),
            IndicesIter::Listed(it) => it.size_hint(),
        }
    }
}

impl IntoIterator for FrameIndexSet {
    type Item = u64;
    type IntoIter = FrameIndices;

    fn into_iter(self) -> FrameIndices {
        FrameIndices(match self.0 {
            Indices::Strided {
                frame_count,
                interval,
            } => {
                let step = usize::try_from(interval).unwrap_or(usize::MAX);
                IndicesIter::Strided((0..frame_count).step_by(step))
            }
            Indices::Listed(indices) => IndicesIter::Listed(indices.into_iter()),
        })
    }
}

/// A random count larger than the number of frames, lowered to what exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CountClamped {
    pub requested: u64,
    pub granted: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sample {
    pub indices: FrameIndexSet,
    pub clamped: Option<CountClamped>,
}

pub fn compute_indices<R: Rng + ?Sized>(
    frame_rate: f64,
    frame_count: i64,
    policy: &SamplingPolicy,
    rng: &mut R,
) -> Result<Sample, SampleError> {
    policy.validate()?;

    if !frame_rate.is_finite() || frame_rate <= 0.0 || frame_count <= 0 {
        return Err(SampleError::UnreadableStream {
            frame_rate,
            frame_count,
        });
    }
    let frame_count = frame_count.unsigned_abs();

    let sample = match *policy {
        SamplingPolicy::FixedStride { .. } | SamplingPolicy::RateBased { .. } => {
            let interval = policy
                .effective_interval(frame_rate)
                .expect("strided policies have an interval");
            Sample {
                indices: FrameIndexSet::strided(frame_count, interval),
                clamped: None,
            }
        }
        SamplingPolicy::Random { count } => {
            let clamped = (count > frame_count).then_some(CountClamped {
                requested: count,
                granted: frame_count,
            });
            Sample {
                indices: random(frame_count, count.min(frame_count), rng),
                clamped,
            }
        }
    };

    Ok(sample)
}

fn random<R: Rng + ?Sized>(frame_count: u64, count: u64, rng: &mut R) -> FrameIndexSet {
    // NOTE: rand samples indices as usize, frame counts never come close to that limit
    let length = usize::try_from(frame_count).unwrap_or(usize::MAX);
    let amount = usize::try_from(count).unwrap_or(usize::MAX).min(length);

    let mut indices: Vec<u64> = rand::seq::index::sample(rng, length, amount)
        .into_iter()
        .map(|i| i as u64)
        .collect();
    indices.sort_unstable();
    FrameIndexSet::from_sorted(indices)
}
