//! Reconnect by asking the user for another target.

use std::sync::Arc;

use crate::client::session::{ClientSession, SessionError, Target};
use crate::client::sink::MessageSink;
use crate::config::ChatConfig;

/// Supplies a new server to try after a failed connection attempt.
pub trait TargetPrompt {
    /// `None` gives up and returns `failure` to the caller.
    fn next_target(&mut self, failure: &SessionError) -> Option<Target>;
}

impl<F> TargetPrompt for F
where
    F: FnMut(&SessionError) -> Option<Target>,
{
    fn next_target(&mut self, failure: &SessionError) -> Option<Target> {
        self(failure)
    }
}

/// Connect, re-prompting for a target after every connect failure.
///
/// Errors that a different server would not fix (bad display name, a write
/// failing after the handshake) are returned immediately.
pub async fn connect_with_retry<P>(
    initial: Target,
    display_name: &str,
    config: &ChatConfig,
    sink: Arc<dyn MessageSink>,
    prompt: &mut P,
) -> Result<ClientSession, SessionError>
where
    P: TargetPrompt + ?Sized,
{
    let mut target = initial;
    let mut attempt = 1u32;

    loop {
        match ClientSession::connect(&target, display_name, config, Arc::clone(&sink)).await {
            Ok(session) => return Ok(session),
            Err(e) if e.is_connect_failure() => {
                tracing::warn!(server = %target, attempt, error = %e, "Connection attempt failed");
                match prompt.next_target(&e) {
                    Some(next) => target = next,
                    None => return Err(e),
                }
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
