//! Cooperative cancellation and scoped SIGINT/SIGTERM registration.
//!
//! A [`CancellationToken`] is owned by the caller of a solve and polled by
//! the solver. [`SignalGuard::install`] routes SIGINT and SIGTERM to one
//! token for as long as the guard lives; the process-wide handler itself is
//! installed once and only ever flips the token currently registered.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use log::{info, warn};
use parking_lot::{const_mutex, Mutex};

/// A shared cancellation flag.
///
/// # Examples
///
/// ```
/// use u_cptp::signals::CancellationToken;
///
/// let token = CancellationToken::new();
/// let observer = token.clone();
/// assert!(!observer.is_cancelled());
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

static ACTIVE_TOKEN: Mutex<Option<CancellationToken>> = const_mutex(None);
static HANDLER_INSTALLED: OnceLock<bool> = OnceLock::new();

fn install_handler_once() -> bool {
    *HANDLER_INSTALLED.get_or_init(|| {
        match ctrlc::set_handler(|| {
            if let Some(token) = ACTIVE_TOKEN.lock().as_ref() {
                info!("received termination signal, stopping the solver");
                token.cancel();
            }
        }) {
            Ok(()) => true,
            Err(err) => {
                warn!("signals: failed to install termination handler: {err}");
                false
            }
        }
    })
}

/// Routes SIGINT/SIGTERM to a token until dropped.
///
/// Guards do not nest: installing a second guard replaces the registered
/// token, and dropping either one clears it.
#[derive(Debug)]
pub struct SignalGuard {
    _private: (),
}

impl SignalGuard {
    pub fn install(token: &CancellationToken) -> Self {
        if install_handler_once() {
            *ACTIVE_TOKEN.lock() = Some(token.clone());
        }
        Self { _private: () }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        ACTIVE_TOKEN.lock().take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_does_not_cancel() {
        let token = CancellationToken::new();
        {
            let _guard = SignalGuard::install(&token);
        }
        assert!(!token.is_cancelled());
        token.cancel();
        assert!(token.is_cancelled());
    }
}
