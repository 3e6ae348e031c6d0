//! Cooperative cancellation and process signals.
//!
//! A token from [`install_signal_handlers`] has SIGINT and SIGTERM
//! registered against its flag, so either signal cancels it the same way
//! [`CancelToken::cancel`] does.

use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{AppError, AppResult};

/// Cloneable stop request, checked by the loop at tick boundaries.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Route SIGINT and SIGTERM to a fresh, uncancelled token.
pub fn install_signal_handlers() -> AppResult<CancelToken> {
    let token = CancelToken::new();
    for (signum, signal) in [(SIGINT, "SIGINT"), (SIGTERM, "SIGTERM")] {
        signal_hook::flag::register(signum, Arc::clone(&token.flag))
            .map_err(|source| AppError::Signal { signal, source })?;
    }
    tracing::debug!("signal handlers installed");
    Ok(token)
}
