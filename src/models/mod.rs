pub mod api_key;
pub mod backup;
pub mod backup_log;
pub mod settings;
pub mod subscription;
pub mod webhook;

pub use api_key::ApiKey;
pub use backup::{Backup, BackupStatus, BackupTrigger, StatusUpdate};
pub use backup_log::{BackupLog, LogAction, LogStatus};
pub use settings::UserSettings;
pub use subscription::{Plan, PlanLimits, PlanUpdate, Subscription};
pub use webhook::{DeliveryStatus, WebhookConfig, WebhookEvent, WebhookLog};
