use serde::{Deserialize, Serialize};

use crate::utils::{cmp_ignore_case, contains_ignore_case};

/// A member of the association, as shown in the directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl Member {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Directory search: case-insensitive match on name, role, or email
    pub fn matches(&self, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        contains_ignore_case(&self.full_name(), query)
            || self.role.as_deref().is_some_and(|r| contains_ignore_case(r, query))
            || self.email.as_deref().is_some_and(|e| contains_ignore_case(e, query))
    }
}

/// Order the directory by last name, then first name, ignoring case
pub fn sort_directory(members: &mut [Member]) {
    members.sort_by(|a, b| {
        cmp_ignore_case(&a.last_name, &b.last_name)
            .then_with(|| cmp_ignore_case(&a.first_name, &b.first_name))
    });
}
