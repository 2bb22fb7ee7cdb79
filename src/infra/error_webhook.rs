// Best-effort error reporting to a Discord webhook. Configured via the
// ERROR_WEBHOOK_URL environment variable; without it every report is a
// no-op so local runs need no setup.

use serde_json::json;
use tracing::warn;

pub struct ErrorWebhook {
    client: reqwest::Client,
    url: Option<String>,
}

impl ErrorWebhook {
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: std::env::var("ERROR_WEBHOOK_URL").ok(),
        }
    }

    /// Push one error to the webhook. Failures are logged and dropped; error
    /// reporting must never take the bot down with it.
    pub async fn report(&self, context: &str, detail: &str) {
        let Some(url) = &self.url else {
            return;
        };

        let mut detail = detail.to_string();
        // Discord caps embed descriptions at 4096 characters.
        detail.truncate(4000);

        let payload = json!({
            "embeds": [{
                "title": context,
                "description": detail,
                "color": 0xED4245
            }]
        });

        if let Err(e) = self.client.post(url).json(&payload).send().await {
            warn!("failed to deliver error webhook: {e}");
        }
    }
}
