use std::sync::Arc;

use crate::controllers::post::PostController;
use crate::controllers::token::TokenController;
use crate::controllers::user::UserController;
use crate::core::config::{Args, parse_admins};
use crate::core::error::ConfigError;
use crate::token::clock::{Clock, SystemClock};
use crate::token::signer::TokenSigner;
use crate::token::store::MemoryTokenStore;

/// Everything a request handler needs. Cloning is cheap; all clones share
/// the same registries.
#[derive(Clone, Debug)]
pub struct AppState {
    pub(crate) user_controller: UserController,
    pub(crate) token_controller: TokenController,
    pub(crate) post_controller: PostController,
    pub(crate) clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(args: &Args) -> Result<Self, ConfigError> {
        Self::with_clock(args, Arc::new(SystemClock))
    }

    pub fn with_clock(args: &Args, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        args.validate()?;

        let user_controller = UserController::seed(&args.users, &args.admins, args.bcrypt_cost)?;

        let token_controller = TokenController::new(
            MemoryTokenStore::new(),
            TokenSigner::new(&args.secret).map_err(|_| ConfigError::SigningKey)?,
            args.token_ttl()?,
        )
        .with_clock(clock.clone());

        let author = parse_admins(&args.admins)
            .into_iter()
            .next()
            .unwrap_or_else(|| "admin".into());

        Ok(AppState {
            user_controller,
            token_controller,
            post_controller: PostController::seeded(&author, clock.now()),
            clock,
        })
    }

    pub fn tokens(&self) -> &TokenController {
        &self.token_controller
    }

    /// Forgets every active token.
    pub fn shutdown(&self) {
        let active = self.token_controller.active_count();
        self.token_controller.clear();

        tracing::info!(active, "cleared token registry");
    }
}
