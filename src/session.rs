//! §4.4 Session filter: runs before the WebAC filter and attaches a
//! [`Session`] to the request context.

use crate::model::{Instant, Session};
use crate::services::AgentService;

/// Build the session for this request. `principal` is the authenticated
/// principal name extracted from e.g. a `Basic` `Authorization` header by
/// the host HTTP layer — `None` when the request carried no credentials.
pub fn attach_session(principal: Option<&str>, agents: &dyn AgentService, admin_role: &str, now: Instant) -> Session {
    let Some(principal) = principal else {
        return Session::anonymous(now);
    };
    if principal == admin_role {
        return Session::admin(now);
    }
    let agent = agents.as_agent(principal);
    Session { agent, created_at: now }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ADMIN_AGENT, ANONYMOUS_AGENT};

    struct StubAgents;
    impl AgentService for StubAgents {
        fn as_agent(&self, principal_name: &str) -> String {
            format!("http://host/agents/{principal_name}")
        }
    }

    #[test]
    fn no_principal_is_anonymous() {
        let now = chrono::Utc::now();
        let session = attach_session(None, &StubAgents, "admin", now);
        assert_eq!(session.agent, ANONYMOUS_AGENT);
    }

    #[test]
    fn admin_role_principal_is_admin() {
        let now = chrono::Utc::now();
        let session = attach_session(Some("admin"), &StubAgents, "admin", now);
        assert_eq!(session.agent, ADMIN_AGENT);
    }

    #[test]
    fn other_principal_resolves_through_agent_service() {
        let now = chrono::Utc::now();
        let session = attach_session(Some("alice"), &StubAgents, "admin", now);
        assert_eq!(session.agent, "http://host/agents/alice");
    }
}
