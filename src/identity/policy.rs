//! UI affordances to hide while a remote identity is in effect

use serde::Serialize;
use std::collections::BTreeSet;

/// Authentication-related UI entry points the host may render.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiAffordance {
    Login,
    Logout,
    CreateAccount,
    LinkAccounts,
    UnlinkAccounts,
    ChangeCredentials,
    RemoveCredentials,
    ChangePassword,
    ResetPassword,
    ChangeEmail,
    ChangeRealName,
    /// Editing of a preference whose value is forced
    Preference(String),
}

/// Inputs to [`PostReconciliationPolicy::suppressed`].
#[derive(Debug, Clone, Default)]
pub struct PolicyInputs {
    pub switch_user_allowed: bool,
    pub remove_auth_pages_and_links: bool,
    /// Profile attributes re-applied on every request
    pub forced_fields: BTreeSet<String>,
}

impl PolicyInputs {
    pub fn has_forced_profile_fields(&self) -> bool {
        !self.forced_fields.is_empty()
    }
}

/// Decides which affordances the host hides once a session was selected.
pub struct PostReconciliationPolicy;

impl PostReconciliationPolicy {
    /// Affordances to suppress.
    ///
    /// Logout is always hidden: it would yield an anonymous session, which the
    /// provider immediately replaces.
    pub fn suppressed(inputs: &PolicyInputs) -> BTreeSet<UiAffordance> {
        let mut hidden = BTreeSet::from([UiAffordance::Logout]);

        if inputs.remove_auth_pages_and_links {
            // Credentials are managed by the asserting layer
            hidden.extend([
                UiAffordance::ChangeCredentials,
                UiAffordance::RemoveCredentials,
                UiAffordance::ChangePassword,
                UiAffordance::ResetPassword,
            ]);
            if !inputs.switch_user_allowed {
                hidden.extend([
                    UiAffordance::Login,
                    UiAffordance::CreateAccount,
                    UiAffordance::LinkAccounts,
                    UiAffordance::UnlinkAccounts,
                ]);
            }
        }

        for field in &inputs.forced_fields {
            hidden.insert(match field.as_str() {
                super::profile::EMAIL => UiAffordance::ChangeEmail,
                super::profile::REAL_NAME => UiAffordance::ChangeRealName,
                other => UiAffordance::Preference(other.to_string()),
            });
        }

        hidden
    }
}
