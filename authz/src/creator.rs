//! Deployment-wide creator policy for organization creation.
//!
//! Organization creation is never derived from existing ownership: it is
//! gated solely by this policy. A non-empty allow-list makes creation
//! allow-list-only and wins over the disable flag; with both lists empty the
//! disable flag is the sole gate.

/// Allow-lists and the disable flag gating `CreateOrganization`.
#[derive(Debug, Clone, Default)]
pub struct CreatorPolicy {
    /// When set, creation is refused unless an allow-list matches.
    pub disable_creation: bool,
    /// Emails allowed to create organizations.
    pub users: Vec<String>,
    /// Role-claim values allowed to create organizations.
    pub roles: Vec<String>,
}

impl CreatorPolicy {
    /// Returns whether the caller may create organizations.
    ///
    /// Matching is case-insensitive on both emails and roles.
    #[must_use]
    pub fn allows(&self, email: &str, roles: &[String]) -> bool {
        if !self.users.is_empty() || !self.roles.is_empty() {
            let user_match = self
                .users
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(email));
            let role_match = roles.iter().any(|role| {
                self.roles
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(role))
            });
            return user_match || role_match;
        }
        !self.disable_creation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_allow_list_gates_creation() {
        let policy = CreatorPolicy {
            disable_creation: false,
            users: vec!["alice@example.com".to_string()],
            roles: Vec::new(),
        };
        assert!(policy.allows("alice@example.com", &[]));
        assert!(policy.allows("ALICE@example.COM", &[]));
        assert!(!policy.allows("bob@example.com", &[]));
    }

    #[test]
    fn test_role_allow_list() {
        let policy = CreatorPolicy {
            disable_creation: false,
            users: Vec::new(),
            roles: vec!["platform-admins".to_string()],
        };
        assert!(policy.allows("bob@example.com", &roles(&["Platform-Admins"])));
        assert!(!policy.allows("bob@example.com", &roles(&["eng"])));
        assert!(!policy.allows("bob@example.com", &[]));
    }

    #[test]
    fn test_allow_list_wins_over_disable_flag() {
        let policy = CreatorPolicy {
            disable_creation: true,
            users: vec!["alice@example.com".to_string()],
            roles: Vec::new(),
        };
        assert!(policy.allows("alice@example.com", &[]));
        assert!(!policy.allows("bob@example.com", &[]));
    }

    #[test]
    fn test_empty_lists_follow_disable_flag() {
        let open = CreatorPolicy::default();
        assert!(open.allows("anyone@example.com", &[]));

        let closed = CreatorPolicy {
            disable_creation: true,
            ..CreatorPolicy::default()
        };
        assert!(!closed.allows("anyone@example.com", &[]));
    }
}
