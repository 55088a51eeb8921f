use std::future::Future;

use crate::config::ConnectionConfig;
use crate::SessionError;

/// Async boundary to the native backend.
///
/// Both operations may fail; failures carry the backend's raw value inside
/// [`SessionError::Backend`] so the controller can normalize them
/// uniformly. Callers serialize the pair per logical connect action:
/// `set_active_config` is issued (and awaited) before `list_videos`.
pub trait RemoteListing: Send + Sync {
    /// Tell the backend which credentials subsequent calls should use.
    fn set_active_config(
        &self,
        config: &ConnectionConfig,
    ) -> impl Future<Output = Result<(), SessionError>> + Send;

    /// Enumerate playable files under `folder`, in server listing order.
    /// An empty list is a valid, non-error result.
    fn list_videos(
        &self,
        config: &ConnectionConfig,
        folder: &str,
    ) -> impl Future<Output = Result<Vec<String>, SessionError>> + Send;
}
