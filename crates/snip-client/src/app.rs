use crate::AppView;
use session_auth::{AuthResult, AuthStatus, IdentityProvider, SessionController, User};
use shorten_workflow::{ShortenEndpoint, ShortenRequestWorkflow, ShortenResult};
use std::sync::Arc;
use tracing::debug;

/// Session-gated URL shortener.
pub struct ShortenerApp {
    controller: Arc<SessionController>,
    workflow: Arc<ShortenRequestWorkflow>,
}

impl ShortenerApp {
    pub fn new(provider: Arc<dyn IdentityProvider>, endpoint: Arc<dyn ShortenEndpoint>) -> Self {
        let controller = Arc::new(SessionController::new(provider));
        let workflow = Arc::new(ShortenRequestWorkflow::new(endpoint));

        let target = Arc::downgrade(&workflow);
        controller.set_invalidation_hook(Box::new(move || {
            if let Some(workflow) = target.upgrade() {
                debug!("Session changed, resetting shortening request");
                workflow.reset();
            }
        }));

        Self {
            controller,
            workflow,
        }
    }

    pub fn controller(&self) -> &Arc<SessionController> {
        &self.controller
    }

    pub fn workflow(&self) -> &Arc<ShortenRequestWorkflow> {
        &self.workflow
    }

    /// Subscribe to the provider and load the current session.
    pub async fn start(&self) {
        self.controller.initialize().await;
    }

    pub fn shutdown(&self) {
        self.controller.teardown();
    }

    pub async fn login(&self, email: &str, password: &str) -> AuthResult<User> {
        self.controller.sign_in(email, password).await
    }

    pub async fn signup(&self, email: &str, password: &str) -> AuthResult<User> {
        self.controller.sign_up(email, password).await
    }

    pub async fn logout(&self) {
        self.controller.sign_out().await;
    }

    /// Shorten `url` with whatever session is current right now.
    pub async fn submit_url(&self, url: &str) -> ShortenResult<String> {
        let session = self.controller.current_session();
        self.workflow.submit(url, session.as_ref()).await
    }

    pub fn view(&self) -> AppView {
        let auth = self.controller.view_state();
        let request = self.workflow.snapshot();

        let workflow_error = request.status.error().map(str::to_string);
        let error = if auth.is_authenticated() {
            workflow_error
        } else {
            self.controller.last_error().or(workflow_error)
        };
        let busy = auth.status() == AuthStatus::Authenticating || request.status.is_pending();

        AppView {
            error,
            short_url: request.status.short_url().map(str::to_string),
            status: request.status,
            busy,
            auth,
        }
    }
}
