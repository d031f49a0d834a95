//! Bucket range division
//!
//! Splits an identifier domain into `partition_count * batch_size` contiguous,
//! non-overlapping buckets of as-equal-as-possible width.
//!
//! With `total` buckets over a domain of `width` identifiers:
//! - `size = width / total`, `remainder = width % total`
//! - the first `remainder` buckets are `size + 1` wide, the rest `size`
//!
//! Arithmetic is done in u128 because the full domain is `2^64` wide.

use super::bucket::{Bucket, IdentifierDomain};
use super::errors::{PlannerError, PlannerResult};

/// Upper limit on `partition_count * batch_size` for one read
pub const MAX_BUCKETS: usize = 1 << 20;

/// Pure, deterministic domain divider.
pub struct BucketRangeDivider;

impl BucketRangeDivider {
    /// Divides `domain` into exactly `partition_count * batch_size` buckets.
    ///
    /// The returned buckets are ordered; the first starts at `domain.lower()`,
    /// the last ends at `domain.upper()`, and each bucket starts one past the
    /// end of the previous one.
    pub fn divide(
        domain: IdentifierDomain,
        partition_count: usize,
        batch_size: usize,
    ) -> PlannerResult<Vec<Bucket>> {
        if partition_count < 1 {
            return Err(PlannerError::invalid_argument(
                "partition count must be at least 1",
            ));
        }
        if batch_size < 1 {
            return Err(PlannerError::invalid_argument(
                "batch size must be at least 1",
            ));
        }

        let total = partition_count.checked_mul(batch_size).ok_or_else(|| {
            PlannerError::invalid_argument(format!(
                "partition count {} times batch size {} overflows",
                partition_count, batch_size
            ))
        })?;
        if total > MAX_BUCKETS {
            return Err(PlannerError::invalid_argument(format!(
                "partition count {} times batch size {} exceeds the limit of {} buckets",
                partition_count, batch_size, MAX_BUCKETS
            )));
        }

        let width = domain.width();
        if total as u128 > width {
            return Err(PlannerError::invalid_argument(format!(
                "{} buckets requested but the domain only holds {} identifiers",
                total, width
            )));
        }

        let size = width / total as u128;
        let remainder = width % total as u128;

        let mut buckets = Vec::with_capacity(total);
        let mut lower = domain.lower() as u128;
        for i in 0..total as u128 {
            let span = if i < remainder { size + 1 } else { size };
            let upper = lower + span - 1;
            let bucket = Bucket::new(lower as u64, upper as u64).ok_or_else(|| {
                PlannerError::invalid_argument(format!(
                    "bucket {} has inverted bounds {}..{}",
                    i, lower, upper
                ))
            })?;
            buckets.push(bucket);
            lower = upper + 1;
        }

        Ok(buckets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(domain: IdentifierDomain, buckets: &[Bucket]) {
        assert_eq!(buckets[0].lower_bound(), domain.lower());
        assert_eq!(buckets[buckets.len() - 1].upper_bound(), domain.upper());
        for pair in buckets.windows(2) {
            assert!(
                pair[0].is_followed_by(&pair[1]),
                "gap or overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_single_bucket_is_whole_domain() {
        let buckets = BucketRangeDivider::divide(IdentifierDomain::FULL, 1, 1).unwrap();
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].lower_bound(), 0);
        assert_eq!(buckets[0].upper_bound(), u64::MAX);
    }

    #[test]
    fn test_full_domain_coverage() {
        for (p, b) in [(1, 2), (2, 1), (2, 2), (3, 7), (16, 16)] {
            let buckets = BucketRangeDivider::divide(IdentifierDomain::FULL, p, b).unwrap();
            assert_eq!(buckets.len(), p * b);
            assert_covers(IdentifierDomain::FULL, &buckets);
        }
    }

    #[test]
    fn test_remainder_goes_to_leading_buckets() {
        // 10 identifiers into 3 buckets: widths 4, 3, 3
        let domain = IdentifierDomain::new(0, 9).unwrap();
        let buckets = BucketRangeDivider::divide(domain, 3, 1).unwrap();

        let widths: Vec<u64> = buckets
            .iter()
            .map(|b| b.upper_bound() - b.lower_bound() + 1)
            .collect();
        assert_eq!(widths, vec![4, 3, 3]);
        assert_covers(domain, &buckets);
    }

    #[test]
    fn test_width_skew_at_most_one() {
        let buckets = BucketRangeDivider::divide(IdentifierDomain::FULL, 7, 3).unwrap();
        let widths: Vec<u128> = buckets
            .iter()
            .map(|b| (b.upper_bound() - b.lower_bound()) as u128 + 1)
            .collect();
        let min = widths.iter().min().unwrap();
        let max = widths.iter().max().unwrap();
        assert!(max - min <= 1);
        assert_eq!(widths.iter().sum::<u128>(), 1u128 << 64);
    }

    #[test]
    fn test_offset_domain() {
        let domain = IdentifierDomain::new(100, 199).unwrap();
        let buckets = BucketRangeDivider::divide(domain, 4, 2).unwrap();
        assert_eq!(buckets.len(), 8);
        assert_covers(domain, &buckets);
    }

    #[test]
    fn test_deterministic() {
        let a = BucketRangeDivider::divide(IdentifierDomain::FULL, 5, 3).unwrap();
        let b = BucketRangeDivider::divide(IdentifierDomain::FULL, 5, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_counts_rejected() {
        let err = BucketRangeDivider::divide(IdentifierDomain::FULL, 0, 1).unwrap_err();
        assert_eq!(err.code().code(), "AERO_READ_INVALID_ARGUMENT");

        let err = BucketRangeDivider::divide(IdentifierDomain::FULL, 1, 0).unwrap_err();
        assert_eq!(err.code().code(), "AERO_READ_INVALID_ARGUMENT");
    }

    #[test]
    fn test_more_buckets_than_identifiers_rejected() {
        let domain = IdentifierDomain::new(0, 2).unwrap();
        assert!(BucketRangeDivider::divide(domain, 2, 2).is_err());
        assert_eq!(BucketRangeDivider::divide(domain, 3, 1).unwrap().len(), 3);
    }

    #[test]
    fn test_overflowing_product_rejected() {
        let err = BucketRangeDivider::divide(IdentifierDomain::FULL, usize::MAX, 2).unwrap_err();
        assert!(err.message().contains("overflows"));
    }

    #[test]
    fn test_bucket_limit_enforced() {
        let err = BucketRangeDivider::divide(IdentifierDomain::FULL, 1_000_000_000, 1_000_000_000)
            .unwrap_err();
        assert_eq!(err.code().code(), "AERO_READ_INVALID_ARGUMENT");
        assert!(err.message().contains("exceeds the limit"));

        assert!(BucketRangeDivider::divide(IdentifierDomain::FULL, MAX_BUCKETS + 1, 1).is_err());
        let buckets = BucketRangeDivider::divide(IdentifierDomain::FULL, 1024, 1024).unwrap();
        assert_eq!(buckets.len(), MAX_BUCKETS);
        assert_covers(IdentifierDomain::FULL, &buckets);
    }
}
