use anyhow::{Context, Result};
use log::{error, info};
use slack_morphism::prelude::*;

use crate::config::SlackConfig;
use crate::pipeline::{Outcome, RunReport};

pub struct SlackNotifier {
    client: SlackClient<SlackClientHyperHttpsConnector>,
    token: SlackApiToken,
    channel_id: SlackChannelId,
}

impl SlackNotifier {
    pub fn new(config: &SlackConfig) -> Result<Self> {
        info!("Initialisation du notifieur Slack");

        let client = SlackClient::new(SlackClientHyperHttpsConnector::new()?);
        let token = SlackApiToken::new(config.bot_token.clone().into());
        let channel_id = SlackChannelId::new(config.channel_id.clone());

        Ok(SlackNotifier {
            client,
            token,
            channel_id,
        })
    }

    pub async fn send_message(&self, text: &str) -> Result<()> {
        let post_chat_req = SlackApiChatPostMessageRequest::new(
            self.channel_id.clone(),
            SlackMessageContent::new().with_text(text.to_string()),
        );

        let session = self.client.open_session(&self.token);

        match session.chat_post_message(&post_chat_req).await {
            Ok(response) => {
                info!("✅ Message Slack envoyé avec succès: {:?}", response.ts);
                Ok(())
            }
            Err(e) => {
                error!("❌ Erreur lors de l'envoi du message Slack: {}", e);
                Err(anyhow::anyhow!("Impossible d'envoyer le message Slack: {}", e))
            }
        }
    }

    /// Envoie le bilan d'un passage, avec le détail des emails en erreur.
    pub async fn notify_run_report(&self, report: &RunReport) -> Result<()> {
        self.send_message(&format_run_report(report))
            .await
            .context("Impossible d'envoyer le bilan Slack")
    }

    /// Envoie une notification d'erreur bloquante
    pub async fn notify_error(&self, error_message: &str) -> Result<()> {
        let message_text = format!(
            "❌ *Traitement QuadraFlow interrompu*\n\n\
             • Erreur: ```{}```",
            error_message
        );

        self.send_message(&message_text)
            .await
            .context("Impossible d'envoyer le message d'erreur Slack")
    }
}

fn format_run_report(report: &RunReport) -> String {
    let mut text = format!("📬 *Traitement QuadraFlow terminé*\n\n• {}\n", report);

    for (message_id, outcome) in &report.outcomes {
        match outcome {
            Outcome::Failed { reason } => {
                text.push_str(&format!("• Email `{}` en erreur: {}\n", message_id, reason));
            }
            Outcome::SkippedNoFolder { case } | Outcome::SkippedNoTask { case, .. } => {
                text.push_str(&format!("• Dossier {} {}\n", case, outcome.label()));
            }
            _ => {}
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_run_report_lists_problems() {
        let report = RunReport {
            outcomes: vec![
                (
                    1,
                    Outcome::Filed {
                        case: "12345".to_string(),
                        folder: PathBuf::from("/drive/DOSSIER_12345"),
                        files: vec![],
                        task: "1201".to_string(),
                    },
                ),
                (2, Outcome::SkippedNoFolder { case: "67890".to_string() }),
                (3, Outcome::Failed { reason: "Asana a répondu 500: boom".to_string() }),
            ],
            expunged: 1,
            dry_run: false,
        };

        let text = format_run_report(&report);
        assert!(text.contains("3 email(s) examiné(s)"));
        assert!(text.contains("Dossier 67890 sans dossier sur le Drive"));
        assert!(text.contains("Email `3` en erreur: Asana a répondu 500: boom"));
        assert!(!text.contains("12345"));
    }
}
