//! Plan limit checks run before a backup row is created.
//!
//! Each check is a pure decision over values the caller has already read
//! from the store. The reads are not isolated from concurrent inserts, so two
//! simultaneous uploads from one user can both pass and jointly exceed a limit.

use axum::http::StatusCode;
use thiserror::Error;

use crate::constants::BYTES_PER_GB;
use crate::models::Subscription;

/// A plan limit an upload would break
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuotaViolation {
    #[error("Backup size ({size_gb:.2} GB) exceeds plan limit ({limit_gb} GB)")]
    BackupTooLarge { size_gb: f64, limit_gb: f64 },

    #[error("Maximum backup limit reached ({limit}). Delete old backups first.")]
    BackupCountReached { limit: i32, current: i64 },

    #[error("Total storage would exceed limit ({total_gb:.2} GB / {limit_gb} GB)")]
    StorageExceeded { total_gb: f64, limit_gb: f64 },

    #[error("Upload exceeds declared size ({attempted} bytes / {declared} bytes)")]
    ExceedsDeclaredSize { attempted: u64, declared: u64 },
}

impl QuotaViolation {
    pub fn status(&self) -> StatusCode {
        match self {
            QuotaViolation::BackupCountReached { .. } => StatusCode::TOO_MANY_REQUESTS,
            QuotaViolation::BackupTooLarge { .. }
            | QuotaViolation::StorageExceeded { .. }
            | QuotaViolation::ExceedsDeclaredSize { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }
}

pub fn bytes_to_gb(bytes: i64) -> f64 {
    bytes as f64 / BYTES_PER_GB
}

pub fn gb_to_bytes(gb: f64) -> i64 {
    (gb * BYTES_PER_GB) as i64
}

/// Reject when the active backup count is already at the plan maximum
pub fn check_backup_count(
    subscription: &Subscription,
    active_count: i64,
) -> Result<(), QuotaViolation> {
    if subscription.has_unlimited_backups() {
        return Ok(());
    }

    if active_count >= i64::from(subscription.max_backups) {
        return Err(QuotaViolation::BackupCountReached {
            limit: subscription.max_backups,
            current: active_count,
        });
    }

    Ok(())
}

/// Reject a single backup larger than the plan allows
pub fn check_backup_size(subscription: &Subscription, size_bytes: i64) -> Result<(), QuotaViolation> {
    let size_gb = bytes_to_gb(size_bytes);
    if size_gb > subscription.max_backup_size_gb {
        return Err(QuotaViolation::BackupTooLarge {
            size_gb,
            limit_gb: subscription.max_backup_size_gb,
        });
    }

    Ok(())
}

/// Reject when existing usage plus the new backup exceeds total storage
pub fn check_total_storage(
    subscription: &Subscription,
    used_bytes: i64,
    size_bytes: i64,
) -> Result<(), QuotaViolation> {
    let total_gb = bytes_to_gb(used_bytes) + bytes_to_gb(size_bytes);
    if total_gb > subscription.max_storage_gb {
        return Err(QuotaViolation::StorageExceeded {
            total_gb,
            limit_gb: subscription.max_storage_gb,
        });
    }

    Ok(())
}

/// Reject a chunk that would grow the object past the size quota was
/// checked against at init
pub fn check_chunk_within_declared(
    declared_bytes: i64,
    offset: u64,
    chunk_len: usize,
) -> Result<(), QuotaViolation> {
    let declared = u64::try_from(declared_bytes).unwrap_or(0);
    let attempted = offset.saturating_add(chunk_len as u64);
    if attempted > declared {
        return Err(QuotaViolation::ExceedsDeclaredSize { attempted, declared });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Plan;
    use chrono::Utc;
    use uuid::Uuid;

    fn subscription(plan: Plan) -> Subscription {
        Subscription::for_plan(Uuid::new_v4(), plan, Utc::now())
    }

    #[test]
    fn test_size_limit() {
        let sub = subscription(Plan::Free);
        assert!(check_backup_size(&sub, gb_to_bytes(1.0)).is_ok());

        let err = check_backup_size(&sub, gb_to_bytes(1.5)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Backup size (1.50 GB) exceeds plan limit (1 GB)"
        );
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_count_limit_free_plan() {
        let sub = subscription(Plan::Free);
        assert!(check_backup_count(&sub, 2).is_ok());

        let err = check_backup_count(&sub, 3).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Maximum backup limit reached (3)"));
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_business_plan_has_no_count_limit() {
        let sub = subscription(Plan::Business);
        assert!(check_backup_count(&sub, 10_000).is_ok());
    }

    #[test]
    fn test_storage_limit_reports_projected_usage() {
        let sub = subscription(Plan::Pro);
        let err = check_total_storage(&sub, gb_to_bytes(4.9), gb_to_bytes(0.2)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Total storage would exceed limit (5.10 GB / 5 GB)"
        );

        assert!(check_total_storage(&sub, gb_to_bytes(4.0), gb_to_bytes(1.0)).is_ok());
    }

    #[test]
    fn test_chunk_bound_by_declared_size() {
        assert!(check_chunk_within_declared(6, 0, 6).is_ok());
        assert!(check_chunk_within_declared(6, 3, 3).is_ok());

        let err = check_chunk_within_declared(1, 0, 20).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Upload exceeds declared size (20 bytes / 1 bytes)"
        );
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);

        assert!(check_chunk_within_declared(6, u64::MAX, 1).is_err());
    }
}
