use std::fmt::{Display, Formatter};

pub type Error = anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Attached to an error when the remote backend reports that it is not ready, e.g. because the
/// drive is disabled for this account. This is an expected condition, callers check for it with
/// `is_unavailable` and present it as a status.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct RemoteUnavailable;

impl Display for RemoteUnavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Remote storage is not available")
    }
}

impl std::error::Error for RemoteUnavailable {}

/// Returns `true` if `error`, or anything in its context chain, is `RemoteUnavailable`.
pub fn is_unavailable(error: &Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<RemoteUnavailable>().is_some())
}
