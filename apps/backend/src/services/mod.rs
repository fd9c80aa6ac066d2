//! Application services for the SongHub backend.

pub mod archive;
pub mod auth;
pub mod notifications;
pub mod storage;
pub mod track_requests;

pub use archive::{ArchiveBuilder, SongArchive};
pub use auth::{AuthService, Claims};
pub use notifications::{DbNotifier, NotificationEvent, Notifier};
pub use storage::{AudioUpload, StorageClient, StorageError};
pub use track_requests::TrackRequestService;
