use std::time::Duration;

use fieldnote_client::{ApiClient, SessionStatus};
use serde_json::json;

/// Poll a session until it leaves the `created` state
///
/// The first poll is immediate, later ones wait `interval`. Lookup errors
/// are logged as warnings and count as an attempt. Returns
/// [`SessionStatus::Unknown`] when `attempts` polls pass without progress.
pub async fn poll_status(api: &ApiClient, session_id: &str, attempts: u32, interval: Duration) -> SessionStatus {
    let logger = api.http().logger();

    for attempt in 1..=attempts {
        if attempt > 1 {
            tokio::time::sleep(interval).await;
        }

        match api.get_session(session_id).await {
            Ok(session) => match session.status() {
                SessionStatus::Created | SessionStatus::Unknown => {
                    tracing::debug!(session_id, attempt, "session not yet processing");
                }
                status => {
                    logger.info(
                        format!("session {session_id} is {status}"),
                        Some(json!({ "session_id": session_id, "status": status.as_str(), "attempt": attempt })),
                    );
                    return status;
                }
            },
            Err(e) => {
                logger.warn(
                    format!("status poll {attempt}/{attempts} for session {session_id} failed: {e}"),
                    Some(json!({ "session_id": session_id, "attempt": attempt })),
                );
            }
        }
    }

    if attempts > 0 {
        logger.warn(
            format!("session {session_id} status unknown after {attempts} polls"),
            Some(json!({ "session_id": session_id, "attempts": attempts })),
        );
    }

    SessionStatus::Unknown
}
