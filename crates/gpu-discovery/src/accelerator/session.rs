use std::ops::Deref;

use super::ManagementLibrary;
use super::ManagementSession;
use super::SdkResult;

/// Management library session released on drop.
///
/// The session is shut down exactly once, whether the owner returns early
/// with an error, finishes normally or unwinds.
pub struct ScopedSession<S: ManagementSession> {
    inner: Option<S>,
}

impl<S: ManagementSession> ScopedSession<S> {
    /// Initialize `library` and wrap the resulting session.
    pub fn open<L>(library: &L) -> SdkResult<Self>
    where
        L: ManagementLibrary<Session = S>,
    {
        let session = library.init()?;
        tracing::debug!("Management library session opened");
        Ok(Self {
            inner: Some(session),
        })
    }
}

impl<S: ManagementSession> Deref for ScopedSession<S> {
    type Target = S;

    fn deref(&self) -> &S {
        // only taken by drop
        self.inner.as_ref().expect("session already released")
    }
}

impl<S: ManagementSession> Drop for ScopedSession<S> {
    fn drop(&mut self) {
        let Some(session) = self.inner.take() else {
            return;
        };
        match session.shutdown() {
            Ok(()) => tracing::debug!("Management library session closed"),
            Err(err) => tracing::warn!("failed to shut down management library: {err:#}"),
        }
    }
}
