//! Bucket and partition value types
//!
//! A bucket is an inclusive range of internal row identifiers. A partition is
//! an ordered run of contiguous buckets drained by a single worker.
//!
//! Bounds are u64 in memory and decimal strings on the wire, so that no
//! remote side ever reinterprets the high half of the domain as negative.

use serde::{Deserialize, Serialize};

/// The addressable range of internal row identifiers (inclusive).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdentifierDomain {
    lower: u64,
    upper: u64,
}

impl IdentifierDomain {
    /// Every unsigned 64-bit row identifier.
    pub const FULL: IdentifierDomain = IdentifierDomain {
        lower: 0,
        upper: u64::MAX,
    };

    /// Creates a domain `[lower, upper]`. Returns `None` when `lower > upper`.
    pub fn new(lower: u64, upper: u64) -> Option<Self> {
        if lower > upper {
            return None;
        }
        Some(Self { lower, upper })
    }

    #[inline]
    pub fn lower(&self) -> u64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> u64 {
        self.upper
    }

    /// Number of identifiers in the domain. `2^64` for the full domain.
    #[inline]
    pub fn width(&self) -> u128 {
        (self.upper - self.lower) as u128 + 1
    }
}

impl Default for IdentifierDomain {
    fn default() -> Self {
        Self::FULL
    }
}

/// Inclusive row-id range filtering one sub-query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawBucket")]
pub struct Bucket {
    #[serde(rename = "lowerBound", with = "u64_string")]
    lower_bound: u64,
    #[serde(rename = "upperBound", with = "u64_string")]
    upper_bound: u64,
}

impl Bucket {
    /// Creates a bucket. Returns `None` when `lower_bound > upper_bound`.
    pub fn new(lower_bound: u64, upper_bound: u64) -> Option<Self> {
        if lower_bound > upper_bound {
            return None;
        }
        Some(Self {
            lower_bound,
            upper_bound,
        })
    }

    #[inline]
    pub fn lower_bound(&self) -> u64 {
        self.lower_bound
    }

    #[inline]
    pub fn upper_bound(&self) -> u64 {
        self.upper_bound
    }

    /// Lower bound as the decimal string sent to the remote side.
    pub fn lower_bound_param(&self) -> String {
        self.lower_bound.to_string()
    }

    /// Upper bound as the decimal string sent to the remote side.
    pub fn upper_bound_param(&self) -> String {
        self.upper_bound.to_string()
    }

    /// Returns true if `row_id` falls inside this bucket.
    #[inline]
    pub fn contains(&self, row_id: u64) -> bool {
        self.lower_bound <= row_id && row_id <= self.upper_bound
    }

    /// Returns true if `next` starts exactly one past this bucket's end.
    pub fn is_followed_by(&self, next: &Bucket) -> bool {
        self.upper_bound.checked_add(1) == Some(next.lower_bound)
    }
}

/// Unchecked wire form of a [`Bucket`]
#[derive(Deserialize)]
struct RawBucket {
    #[serde(rename = "lowerBound", with = "u64_string")]
    lower_bound: u64,
    #[serde(rename = "upperBound", with = "u64_string")]
    upper_bound: u64,
}

impl TryFrom<RawBucket> for Bucket {
    type Error = String;

    fn try_from(raw: RawBucket) -> Result<Self, Self::Error> {
        Bucket::new(raw.lower_bound, raw.upper_bound).ok_or_else(|| {
            format!(
                "bucket lower bound {} exceeds upper bound {}",
                raw.lower_bound, raw.upper_bound
            )
        })
    }
}

/// Ordered, non-empty run of contiguous buckets drained by one worker.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPartition")]
pub struct Partition {
    index: usize,
    buckets: Vec<Bucket>,
}

impl Partition {
    /// Creates a partition. Returns `None` if `buckets` is empty or not contiguous.
    pub fn new(index: usize, buckets: Vec<Bucket>) -> Option<Self> {
        if buckets.is_empty() {
            return None;
        }
        if !buckets.windows(2).all(|w| w[0].is_followed_by(&w[1])) {
            return None;
        }
        Some(Self { index, buckets })
    }

    /// Position of this partition within its analysis.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// First row id covered by this partition.
    pub fn lower_bound(&self) -> u64 {
        self.buckets[0].lower_bound()
    }

    /// Last row id covered by this partition.
    pub fn upper_bound(&self) -> u64 {
        self.buckets[self.buckets.len() - 1].upper_bound()
    }
}

/// Unchecked wire form of a [`Partition`]
#[derive(Deserialize)]
struct RawPartition {
    index: usize,
    buckets: Vec<Bucket>,
}

impl TryFrom<RawPartition> for Partition {
    type Error = String;

    fn try_from(raw: RawPartition) -> Result<Self, Self::Error> {
        let index = raw.index;
        Partition::new(index, raw.buckets)
            .ok_or_else(|| format!("partition {} buckets are empty or not contiguous", index))
    }
}

mod u64_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<u64>().map_err(serde::de::Error::custom)
    }
}
