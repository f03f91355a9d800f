//! Per-agent session state and the signup/login bootstrap shared by both
//! agent types.

use crate::credentials::Credentials;
use crate::envelope;
use crate::payload::{self, LOGIN_PATH, SIGNUP_PATH};
use crate::transport::{ApiReply, ApiRequest, Ticket, Transport};

/// What happens to the rest of the workflow when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnFailure {
    /// Record the failure and run the next step
    Continue,
    /// Record the failure and skip every remaining step of this agent
    Halt,
}

/// Result of running one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Passed,
    Failed,
    /// Failed and stopped the agent
    Halted,
    /// Not attempted: the agent was halted or a precondition was missing
    Skipped,
}

/// Why a step failed. `ticket` is `None` when the request never produced a
/// response (the transport has already counted it).
#[derive(Debug, Clone)]
pub struct StepFailure {
    pub ticket: Option<Ticket>,
    pub reason: String,
}

impl StepFailure {
    pub fn on(reply: &ApiReply, reason: impl Into<String>) -> Self {
        Self {
            ticket: Some(reply.ticket),
            reason: reason.into(),
        }
    }
}

/// Send `request` and require a 2xx answer.
pub async fn expect_success<T: Transport + ?Sized>(
    transport: &mut T,
    request: ApiRequest,
    context: &str,
) -> Result<ApiReply, StepFailure> {
    let reply = transport
        .send(request)
        .await
        .map_err(|e| StepFailure {
            ticket: None,
            reason: e.to_string(),
        })?;
    if reply.is_success() {
        Ok(reply)
    } else {
        let reason = format!("{context}: HTTP {} {}", reply.status, reply.body);
        Err(StepFailure::on(&reply, reason))
    }
}

/// One simulated user: identity, auth state and workflow state `S`.
#[derive(Debug, Clone)]
pub struct Agent<S> {
    pub credentials: Credentials,
    pub token: Option<String>,
    pub state: S,
    signed_up: bool,
    halted: Option<String>,
}

impl<S> Agent<S> {
    pub fn new(credentials: Credentials, state: S) -> Self {
        Self {
            credentials,
            token: None,
            state,
            signed_up: false,
            halted: None,
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn is_signed_up(&self) -> bool {
        self.signed_up
    }

    /// Request metric name, e.g. `Owner: Create Menu`
    pub fn request_name(&self, step: &str) -> String {
        format!("{}: {}", self.credentials.role.label(), step)
    }

    /// Turn a step's result into its status, reporting the failure to the
    /// transport and applying the step's policy.
    pub fn settle<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        policy: OnFailure,
        result: Result<(), StepFailure>,
    ) -> StepStatus {
        let Err(failure) = result else {
            return StepStatus::Passed;
        };
        if let Some(ticket) = failure.ticket {
            transport.fail(ticket, &failure.reason);
        }
        match policy {
            OnFailure::Continue => {
                log::warn!("{}: {}", self.credentials.username, failure.reason);
                StepStatus::Failed
            }
            OnFailure::Halt => {
                log::warn!(
                    "{}: {}; stopping agent",
                    self.credentials.username,
                    failure.reason
                );
                self.halted = Some(failure.reason);
                StepStatus::Halted
            }
        }
    }

    /// Stop the agent without a failed request behind it.
    pub fn halt(&mut self, reason: impl Into<String>) -> StepStatus {
        let reason = reason.into();
        log::warn!("{}: {reason}; stopping agent", self.credentials.username);
        self.halted = Some(reason);
        StepStatus::Halted
    }
}

// ============================================================================
// Bootstrap
// ============================================================================

pub const SIGNUP_POLICY: OnFailure = OnFailure::Continue;
pub const LOGIN_POLICY: OnFailure = OnFailure::Halt;

/// Create the account. The response is not inspected: an existing or
/// rejected account shows up as a login failure.
pub async fn signup<S, T: Transport + ?Sized>(transport: &mut T, agent: &mut Agent<S>) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    let request = ApiRequest::post(
        SIGNUP_PATH,
        agent.request_name("Signup"),
        payload::signup(&agent.credentials),
    );
    let result = transport.send(request).await.map(|_| ()).map_err(|e| StepFailure {
        ticket: None,
        reason: e.to_string(),
    });
    agent.signed_up = true;
    agent.settle(transport, SIGNUP_POLICY, result)
}

/// Log in with the signup credentials and attach the bearer token. Any
/// failure halts the agent.
pub async fn login<S, T: Transport + ?Sized>(transport: &mut T, agent: &mut Agent<S>) -> StepStatus {
    if agent.is_halted() {
        return StepStatus::Skipped;
    }
    if !agent.signed_up {
        return agent.halt("login attempted before signup");
    }

    let name = agent.request_name("Login");
    let username = agent.credentials.username.clone();
    let request = ApiRequest::post(LOGIN_PATH, name, payload::login(&agent.credentials));
    let result = match expect_success(transport, request, &format!("login failed for {username}")).await {
        Ok(reply) => match envelope::access_token(&reply.body) {
            Some(token) => {
                transport.set_bearer(&token);
                agent.token = Some(token);
                Ok(())
            }
            None => Err(StepFailure::on(
                &reply,
                format!("login succeeded but no accessToken found for {username}"),
            )),
        },
        Err(failure) => Err(failure),
    };
    agent.settle(transport, LOGIN_POLICY, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Role;
    use crate::error::TransportError;
    use async_trait::async_trait;

    /// Replays canned replies and remembers what was sent.
    struct Scripted {
        replies: Vec<(u16, String)>,
        sent: Vec<String>,
        failed: Vec<(usize, String)>,
        bearer: Option<String>,
    }

    impl Scripted {
        fn new(replies: Vec<(u16, &str)>) -> Self {
            Self {
                replies: replies.into_iter().map(|(s, b)| (s, b.to_string())).rev().collect(),
                sent: Vec::new(),
                failed: Vec::new(),
                bearer: None,
            }
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&mut self, request: ApiRequest) -> Result<ApiReply, TransportError> {
            let ticket = Ticket(self.sent.len());
            self.sent.push(request.path);
            let (status, body) = self.replies.pop().ok_or_else(|| TransportError::Network {
                name: request.name,
                detail: "connection refused".into(),
            })?;
            Ok(ApiReply { ticket, status, body })
        }

        fn fail(&mut self, ticket: Ticket, reason: &str) {
            self.failed.push((ticket.0, reason.to_string()));
        }

        fn set_bearer(&mut self, token: &str) {
            self.bearer = Some(token.to_string());
        }
    }

    fn owner() -> Agent<()> {
        Agent::new(Credentials::for_username(Role::Owner, "owner_x"), ())
    }

    #[tokio::test]
    async fn login_before_signup_sends_nothing() {
        let mut transport = Scripted::new(vec![]);
        let mut agent = owner();
        assert_eq!(login(&mut transport, &mut agent).await, StepStatus::Halted);
        assert!(transport.sent.is_empty());
        assert_eq!(agent.halt_reason(), Some("login attempted before signup"));
    }

    #[tokio::test]
    async fn login_attaches_token() {
        let mut transport = Scripted::new(vec![
            (409, "duplicate"),
            (200, r#"{"result": {"accessToken": "T"}}"#),
        ]);
        let mut agent = owner();
        assert_eq!(signup(&mut transport, &mut agent).await, StepStatus::Passed);
        assert_eq!(login(&mut transport, &mut agent).await, StepStatus::Passed);
        assert_eq!(transport.sent, vec![SIGNUP_PATH, LOGIN_PATH]);
        assert_eq!(agent.token.as_deref(), Some("T"));
        assert_eq!(transport.bearer.as_deref(), Some("T"));
        assert!(transport.failed.is_empty());
    }

    #[tokio::test]
    async fn login_without_token_halts_and_marks_request() {
        let mut transport = Scripted::new(vec![(200, "{}"), (200, r#"{"result": {}}"#)]);
        let mut agent = owner();
        signup(&mut transport, &mut agent).await;
        assert_eq!(login(&mut transport, &mut agent).await, StepStatus::Halted);
        assert!(agent.is_halted());
        assert_eq!(transport.failed.len(), 1);
        assert_eq!(transport.failed[0].0, 1);
        assert!(transport.failed[0].1.contains("no accessToken"));
    }

    #[tokio::test]
    async fn signup_errors_do_not_stop_the_agent() {
        let mut transport = Scripted::new(vec![]);
        let mut agent = owner();
        assert_eq!(signup(&mut transport, &mut agent).await, StepStatus::Failed);
        assert!(!agent.is_halted());
        assert!(agent.is_signed_up());
    }

    #[test]
    fn request_names_carry_role() {
        assert_eq!(owner().request_name("Create Store"), "Owner: Create Store");
    }
}
