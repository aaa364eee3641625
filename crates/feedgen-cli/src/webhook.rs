//! Completion notification sent after a feed is uploaded.

use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadHook<'a> {
    success: bool,
    merchant_name: &'a str,
    merchant_id: &'a str,
}

pub(crate) struct Webhook {
    client: reqwest::Client,
    url: String,
}

impl Webhook {
    pub(crate) fn new(url: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// POSTs `{success, merchantName, merchantId}`.
    pub(crate) async fn send_upload_hook(
        &self,
        merchant_name: &str,
        merchant_id: &str,
    ) -> Result<(), reqwest::Error> {
        let payload = UploadHook {
            success: true,
            merchant_name,
            merchant_id,
        };
        self.client
            .post(&self.url)
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
