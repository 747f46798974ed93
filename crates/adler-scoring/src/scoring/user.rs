use super::domain::{ScoreError, UserId};

/// Source of a fallback user when a caller does not name one.
pub trait CurrentUser {
    fn current_user(&self) -> Option<UserId>;
}

impl CurrentUser for Option<UserId> {
    fn current_user(&self) -> Option<UserId> {
        *self
    }
}

/// Prefer the explicitly requested user, else ask the session.
pub fn resolve_user<S>(explicit: Option<UserId>, session: &S) -> Result<UserId, ScoreError>
where
    S: CurrentUser + ?Sized,
{
    explicit
        .or_else(|| session.current_user())
        .ok_or(ScoreError::NoCurrentUser)
}
