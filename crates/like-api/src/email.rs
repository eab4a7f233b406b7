use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tracing::info;

const SENDGRID_SEND_URL: &str = "https://api.sendgrid.com/v3/mail/send";

/// Upper bound on one dispatch attempt; a slow provider must not hold
/// the caller's connection open indefinitely.
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum MailError {
    #[error("email dispatch failed")]
    Transport(#[from] reqwest::Error),
    #[error("email provider returned status {0}")]
    Provider(reqwest::StatusCode),
}

/// Outbound email collaborator. `Log` is for local/dev configurations:
/// the login link is printed instead of sent.
pub enum Mailer {
    Log,
    Sendgrid {
        client: reqwest::Client,
        api_key: String,
        from: String,
    },
}

impl Mailer {
    pub fn sendgrid(api_key: String, from: String) -> Result<Self, MailError> {
        let client = reqwest::Client::builder().timeout(SEND_TIMEOUT).build()?;
        Ok(Self::Sendgrid {
            client,
            api_key,
            from,
        })
    }

    /// Exactly one outbound email per call. Failure is reported to the
    /// caller rather than folded into the success path.
    pub async fn send_login_link(&self, to: &str, link: &str) -> Result<(), MailError> {
        match self {
            Mailer::Log => {
                info!("email dispatch disabled; login link for {to}: {link}");
                Ok(())
            }
            Mailer::Sendgrid {
                client,
                api_key,
                from,
            } => {
                let body = json!({
                    "personalizations": [{"to": [{"email": to}]}],
                    "from": {"email": from},
                    "subject": "Like app login",
                    "content": [{
                        "type": "text/html",
                        "value": format!("Click here to log in: <a href='{link}'>{link}</a>"),
                    }],
                });

                let response = client
                    .post(SENDGRID_SEND_URL)
                    .bearer_auth(api_key)
                    .json(&body)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(MailError::Provider(response.status()));
                }
                Ok(())
            }
        }
    }
}
