use std::sync::Arc;

use tokio::sync::mpsc;

use crate::api::{GenerationClient, GenerationError};

/// Resolution of one generation request, tagged with the token captured when
/// the request was issued.
pub type GenerationResolution = (Result<String, GenerationError>, u64);

pub struct RequestParams {
    pub client: Arc<dyn GenerationClient>,
    pub persona: String,
    pub user_text: String,
    pub token: u64,
}

/// Spawns generation requests and reports their resolutions over a channel.
///
/// The engine enforces single-flight, so at most one request is outstanding
/// per session; the token lets the engine discard a resolution that outlived
/// the conversation it was issued for.
#[derive(Clone)]
pub struct GenerationService {
    tx: mpsc::UnboundedSender<GenerationResolution>,
}

impl GenerationService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<GenerationResolution>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_request(&self, params: RequestParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let RequestParams {
                client,
                persona,
                user_text,
                token,
            } = params;

            let outcome = client.generate(Some(&persona), &user_text).await;
            // The receiver may be gone during shutdown; nothing to do then.
            let _ = tx.send((outcome, token));
        });
    }
}
