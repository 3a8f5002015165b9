//! Fire-and-forget service worker registration.

use crate::result::StorefrontResult;

/// Host capability to register a service worker (`navigator.serviceWorker`)
pub trait ServiceWorkerRegistrar {
    /// Register the script at `script_path`; returns the registration scope
    fn register(&mut self, script_path: &str) -> StorefrontResult<String>;
}

/// Register `script_path` once, logging the outcome
///
/// Failures are never surfaced to the page and never retried.
pub fn register_quietly(registrar: &mut dyn ServiceWorkerRegistrar, script_path: &str) -> bool {
    match registrar.register(script_path) {
        Ok(scope) => {
            tracing::info!(script = script_path, scope = %scope, "service worker registered");
            true
        }
        Err(error) => {
            tracing::info!(script = script_path, error = %error, "service worker registration failed");
            false
        }
    }
}
