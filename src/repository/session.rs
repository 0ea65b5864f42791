use std::ops::{Deref, DerefMut};

use super::Session;

/// Owns a session for the length of one run and logs it out exactly once,
/// either through `release` or when dropped on an error path.
pub struct ScopedSession {
    inner: Option<Box<dyn Session>>,
}

impl ScopedSession {
    pub fn new(session: Box<dyn Session>) -> Self {
        Self {
            inner: Some(session),
        }
    }

    pub fn release(mut self) {
        self.logout();
    }

    fn logout(&mut self) {
        if let Some(mut session) = self.inner.take() {
            log::debug!("logging out of workspace {}", session.workspace());
            session.logout();
        }
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        self.logout();
    }
}

impl Deref for ScopedSession {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        match self.inner.as_deref() {
            Some(session) => session,
            None => unreachable!("session is only taken on release or drop"),
        }
    }
}

impl DerefMut for ScopedSession {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.inner.as_deref_mut() {
            Some(session) => session,
            None => unreachable!("session is only taken on release or drop"),
        }
    }
}
