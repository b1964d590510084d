//! Google Drive integration: OAuth login and the Drive file source.

pub mod google_drive;
pub mod oauth;

pub use google_drive::GoogleDriveSource;
pub use oauth::{DriveSession, OAuthClient, DRIVE_SCOPE};
