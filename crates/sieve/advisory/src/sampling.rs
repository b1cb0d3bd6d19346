//! Whether a request consults the advisor at all.

use sieve_policy::{AdvisoryConfig, AdvisoryMode};
use sieve_types::{RequestId, RouteDepth};

use crate::state::SkipReason;

/// Deterministic point in `[0, 1]` for a request.
///
/// The first four bytes of `blake3(salt | request_id)` read as a big-endian
/// `u32`, scaled by `u32::MAX`.
pub fn sample_point(salt: &str, request_id: &RequestId) -> f64 {
    let token = format!("{salt}|{}", request_id.as_str());
    let digest = blake3::hash(token.as_bytes());
    let bytes = digest.as_bytes();
    let bucket = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    f64::from(bucket) / f64::from(u32::MAX)
}

/// `rate >= 1.0` samples every request, `rate <= 0.0` none.
pub fn is_sampled(salt: &str, request_id: &RequestId, rate: f64) -> bool {
    if rate >= 1.0 {
        return true;
    }
    rate > 0.0 && sample_point(salt, request_id) < rate
}

/// Reason to skip the advisor, checked in order: depth, mode,
/// availability, sampling. `None` means invoke.
pub fn skip_reason(
    depth: RouteDepth,
    available: bool,
    request_id: &RequestId,
    config: &AdvisoryConfig,
) -> Option<SkipReason> {
    if depth == RouteDepth::Minimal {
        return Some(SkipReason::MinimalDepth);
    }
    if config.mode == AdvisoryMode::Never {
        return Some(SkipReason::ModeNever);
    }
    if !available {
        return Some(SkipReason::Unavailable);
    }
    if config.mode == AdvisoryMode::Sampled && !is_sampled(&config.salt, request_id, config.sample_rate) {
        return Some(SkipReason::NotSampled);
    }
    None
}
