use crate::error::CliError;
use model::run::TriggerPayload;
use reqwest::header::CONTENT_TYPE;
use tracing::{error, info, warn};

/// Hands the continuation to the next run: POSTs it to `CONTINUATION_URL`
/// when configured, otherwise prints it for manual re-invocation.
pub async fn start_next_run(payload: &TriggerPayload) -> Result<(), CliError> {
    let body = serde_json::to_string(payload).map_err(CliError::JsonSerialize)?;

    let Ok(url) = std::env::var("CONTINUATION_URL") else {
        info!(
            payload = %body,
            "CONTINUATION_URL not set; run again with this payload to continue"
        );
        return Ok(());
    };

    info!("Starting the next import run");
    let client = reqwest::Client::new();
    let response = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .body(body.clone())
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => Ok(()),
        Ok(resp) => {
            warn!(
                status = %resp.status(),
                payload = %body,
                "Continuation endpoint rejected the payload; continue manually"
            );
            Ok(())
        }
        Err(err) => {
            warn!(
                error = %err,
                payload = %body,
                "Failed to reach the continuation endpoint; continue manually"
            );
            Ok(())
        }
    }
}

/// Operator-facing diagnostics for a fatal failure, including the payload
/// needed to resume by hand.
pub fn notify_failure(message: &str, processed: u64, resume: &TriggerPayload) {
    error!("Encountered error \"{message}\"");
    error!("Processed {processed} users");
    if let Ok(payload) = serde_json::to_string(resume) {
        error!(payload = %payload, "Use this payload to continue processing the file");
    }
}
