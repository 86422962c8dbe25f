//! Membership check for mutating commands.

use command_tree::HandlerError;
use std::collections::HashSet;

pub const PERMISSION_DENIED: &str =
    "You do not seem to have the necessary permissions to perform this action.";

/// Users allowed to change cloud resources.
#[derive(Debug, Clone, Default)]
pub struct Admins {
    user_ids: HashSet<String>,
}

impl Admins {
    pub fn new<I, S>(user_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            user_ids: user_ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.user_ids.contains(user_id)
    }

    pub fn check(&self, user_id: &str) -> Result<(), HandlerError> {
        if self.contains(user_id) {
            Ok(())
        } else {
            Err(HandlerError::PermissionDenied(PERMISSION_DENIED.into()))
        }
    }
}
