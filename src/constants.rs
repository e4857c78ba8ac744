/// Bytes per gigabyte as used by plan limits (binary gigabyte)
pub const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Backups returned by the list endpoints for non-admin callers
pub const DEFAULT_BACKUP_LIST_LIMIT: i64 = 10;

/// Webhook log rows returned per webhook
pub const WEBHOOK_LOG_LIMIT: i64 = 50;

/// Audit rows returned by the backup log endpoint
pub const BACKUP_LOG_LIMIT: i64 = 50;

/// `max_backups` value meaning "no limit"
pub const UNLIMITED_BACKUPS: i32 = -1;

/// Prefix of every generated API key
pub const API_KEY_PREFIX: &str = "hsb_";

/// Random characters following the API key prefix
pub const API_KEY_RANDOM_LEN: usize = 32;

/// User agent sent with every webhook delivery
pub const WEBHOOK_USER_AGENT: &str = "HomeSafe-Webhook/1.0";

/// Maximum age of a Stripe signature timestamp in seconds (5 minutes)
pub const STRIPE_SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Key prefix for replicated objects in S3
pub const S3_REPLICATION_PREFIX: &str = "homesafe-backups";

/// Folder for replicated files in Dropbox
pub const DROPBOX_REPLICATION_FOLDER: &str = "/HomeSafe-Backups";

/// Default region when an S3 integration does not set one
pub const DEFAULT_S3_REGION: &str = "us-east-1";

/// Default branch for GitHub config sync
pub const DEFAULT_GITHUB_BRANCH: &str = "main";

/// Content type of stored backup archives
pub const BACKUP_CONTENT_TYPE: &str = "application/x-tar";

// =============================================================================
// Contact form limits
// =============================================================================

pub const CONTACT_NAME_MAX: usize = 100;
pub const CONTACT_EMAIL_MAX: usize = 255;
pub const CONTACT_SUBJECT_MAX: usize = 200;
pub const CONTACT_MESSAGE_MAX: usize = 2000;

// =============================================================================
// Error Messages
// =============================================================================

pub const ERR_MISSING_API_KEY: &str = "Missing API key";

pub const ERR_INVALID_API_KEY: &str = "Invalid or revoked API key";

pub const ERR_MISSING_AUTHORIZATION: &str = "Missing authorization header";

pub const ERR_UNAUTHORIZED: &str = "Unauthorized";

pub const ERR_SUBSCRIPTION_NOT_FOUND: &str = "Subscription not found";

pub const ERR_BACKUP_NOT_FOUND: &str = "Backup not found";

pub const ERR_WEBHOOK_NOT_FOUND: &str = "Webhook not found";

pub const ERR_API_KEY_NOT_FOUND: &str = "API key not found";

pub const ERR_NO_REPLICATION_SETTINGS: &str = "No replication settings configured";
