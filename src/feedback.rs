// Feedback intake - validation and a single-attempt notification
use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

pub const RECEIVED_MESSAGE: &str = "Feedback received. Thank you for your input!";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub analysis_id: Option<String>,
    /// 1 to 5
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

impl Feedback {
    pub fn validate(&self) -> Result<(), String> {
        if !(1..=5).contains(&self.rating) {
            return Err(format!("Rating must be between 1 and 5, got {}", self.rating));
        }
        Ok(())
    }
}

/// What gets delivered to the sink.
#[derive(Debug, Clone, Serialize)]
pub struct FeedbackMessage {
    pub subject: String,
    pub analysis_id: String,
    pub rating: i64,
    pub comment: String,
    pub timestamp: String,
}

impl FeedbackMessage {
    pub fn new(feedback: &Feedback) -> Self {
        let now = Utc::now();
        Self {
            subject: format!("SkillLens Feedback - {}", now.format("%Y-%m-%d %H:%M")),
            analysis_id: feedback.analysis_id.clone().unwrap_or_else(|| "N/A".to_string()),
            rating: feedback.rating,
            comment: feedback
                .comment
                .clone()
                .unwrap_or_else(|| "No comment provided".to_string()),
            timestamp: now.to_rfc3339(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "{}\nAnalysis ID: {}\nRating: {} / 5\nComment: {}\nTimestamp: {}",
            self.subject, self.analysis_id, self.rating, self.comment, self.timestamp
        )
    }
}

/// Where feedback goes. Without a webhook it is only logged.
#[derive(Debug, Clone)]
pub enum Notifier {
    Log,
    Webhook { client: reqwest::Client, url: String },
}

impl Notifier {
    pub fn new(client: reqwest::Client, webhook: Option<String>) -> Self {
        match webhook {
            Some(url) => Notifier::Webhook { client, url },
            None => Notifier::Log,
        }
    }

    /// Deliver once; no retries.
    pub async fn send(&self, message: &FeedbackMessage) -> Result<()> {
        match self {
            Notifier::Log => {
                info!("Feedback (development mode):\n{}", message.render());
                Ok(())
            }
            Notifier::Webhook { client, url } => {
                client
                    .post(url)
                    .json(message)
                    .send()
                    .await
                    .context("webhook unreachable")?
                    .error_for_status()
                    .context("webhook rejected the notification")?;
                info!("Feedback delivered to webhook");
                Ok(())
            }
        }
    }
}
