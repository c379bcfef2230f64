use tracing::{info, warn};

use crate::domain::PersonSelection;
use crate::sharepoint::ListApi;

/// Resolves people picker selections to site user ids.
pub struct IdentityResolver<'a, A: ListApi + ?Sized> {
    api: &'a A,
    list_url: &'a str,
}

impl<'a, A: ListApi + ?Sized> IdentityResolver<'a, A> {
    /// `list_url` selects the web the user is ensured on.
    pub fn new(api: &'a A, list_url: &'a str) -> Self {
        Self { api, list_url }
    }

    /// User id for `email`, or `None` when the lookup fails for any reason.
    ///
    /// Failures are logged and swallowed; callers submit without an advisor.
    pub async fn resolve_email(&self, email: &str) -> Option<i64> {
        let email = email.trim();
        if email.is_empty() {
            warn!("advisor selection has no email; submitting without advisor");
            return None;
        }
        match self.api.ensure_user(self.list_url, email).await {
            Ok(user) => {
                info!(user_id = user.id, "advisor resolved");
                Some(user.id)
            }
            Err(err) => {
                warn!(%err, email, "advisor could not be resolved; submitting without advisor");
                None
            }
        }
    }

    /// Resolves the first selected person by their secondary (email) text.
    pub async fn resolve_selection(&self, selection: &[PersonSelection]) -> Option<i64> {
        match selection.first() {
            Some(person) => self.resolve_email(&person.secondary_text).await,
            None => None,
        }
    }
}
