use async_trait::async_trait;
use log::{debug, info};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::model::{CustomFieldUpdate, DataEnvelope, ErrorEnvelope, TaskDetails, TaskSummary};
use super::{TaskTracker, TrackerError};
use crate::config::AsanaConfig;

/// Taille de page maximale acceptée par l'API.
const PAGE_LIMIT: u32 = 100;

/// Client REST minimal pour l'API Asana (token personnel).
pub struct AsanaClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl AsanaClient {
    pub fn new(config: &AsanaConfig) -> Self {
        info!("Initialisation du client Asana ({})", config.base_url);

        AsanaClient {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<DataEnvelope<T>, TrackerError> {
        let response = request
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let body = Self::check_status(response).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_status(response: Response) -> Result<String, TrackerError> {
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            return Ok(body);
        }

        Err(TrackerError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

/// Messages d'erreur `{"errors": [{"message": ...}]}`, ou le corps brut.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) if !envelope.errors.is_empty() => envelope
            .errors
            .into_iter()
            .map(|e| e.message)
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.trim().to_string(),
    }
}

#[async_trait]
impl TaskTracker for AsanaClient {
    async fn list_project_tasks(&self, project_gid: &str) -> Result<Vec<TaskSummary>, TrackerError> {
        let url = self.url(&format!("projects/{}/tasks", project_gid));
        let limit = PAGE_LIMIT.to_string();
        let mut tasks = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut query: Vec<(&str, &str)> = vec![("opt_fields", "name"), ("limit", limit.as_str())];
            if let Some(offset) = offset.as_deref() {
                query.push(("offset", offset));
            }

            let page: DataEnvelope<Vec<TaskSummary>> =
                self.send(self.client.get(&url).query(&query)).await?;
            tasks.extend(page.data);

            match page.next_page {
                Some(next) => offset = Some(next.offset),
                None => break,
            }
        }

        debug!("{} tâche(s) dans le projet {}", tasks.len(), project_gid);
        Ok(tasks)
    }

    async fn get_task(&self, task_gid: &str) -> Result<TaskDetails, TrackerError> {
        let url = self.url(&format!("tasks/{}", task_gid));
        let envelope: DataEnvelope<TaskDetails> = self
            .send(
                self.client
                    .get(&url)
                    .query(&[("opt_fields", "custom_fields,custom_fields.multi_enum_values,projects")]),
            )
            .await?;
        Ok(envelope.data)
    }

    async fn update_custom_fields(
        &self,
        task_gid: &str,
        update: &CustomFieldUpdate,
    ) -> Result<(), TrackerError> {
        debug!("Mise à jour des champs de la tâche {}: {:?}", task_gid, update);

        let url = self.url(&format!("tasks/{}", task_gid));
        let body = json!({ "data": { "custom_fields": update } });
        let _: DataEnvelope<serde_json::Value> = self.send(self.client.put(&url).json(&body)).await?;
        Ok(())
    }

    async fn add_task_to_section(&self, section_gid: &str, task_gid: &str) -> Result<(), TrackerError> {
        debug!("Ajout de la tâche {} à la section {}", task_gid, section_gid);

        let url = self.url(&format!("sections/{}/addTask", section_gid));
        let body = json!({ "data": { "task": task_gid } });
        let _: DataEnvelope<serde_json::Value> = self.send(self.client.post(&url).json(&body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> AsanaConfig {
        AsanaConfig {
            base_url: base_url.to_string(),
            token: "token".to_string(),
            project_demandes: "p-demandes".to_string(),
            project_quitus: "p-quitus".to_string(),
            section_demandes: "s-demandes".to_string(),
            section_quitus: "s-quitus".to_string(),
            field_docs_manquants: "f-docs".to_string(),
            field_docs_manquants_quitus: "f-docs-quitus".to_string(),
            option_demande_immat: "o-immat".to_string(),
            option_mandat: "o-mandat".to_string(),
            option_mandat_quitus: "o-mandat-quitus".to_string(),
        }
    }

    #[test]
    fn test_url_building() {
        let client = AsanaClient::new(&config("https://app.asana.com/api/1.0/"));
        assert_eq!(
            client.url("/sections/s-1/addTask"),
            "https://app.asana.com/api/1.0/sections/s-1/addTask"
        );
        assert_eq!(client.url("tasks/42"), "https://app.asana.com/api/1.0/tasks/42");
    }

    #[test]
    fn test_error_message_extraction() {
        let body = r#"{"errors":[{"message":"task: Not a recognized ID: 42","help":"..."}]}"#;
        assert_eq!(error_message(body), "task: Not a recognized ID: 42");
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(r#"{"errors":[]}"#), r#"{"errors":[]}"#);
    }
}
