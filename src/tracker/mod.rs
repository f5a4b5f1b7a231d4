pub mod asana;
pub mod model;

use async_trait::async_trait;
use log::warn;
use thiserror::Error;

pub use asana::AsanaClient;
pub use model::{CustomField, CustomFieldUpdate, EnumOption, ProjectRef, TaskDetails, TaskSummary};

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Requête Asana impossible: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Asana a répondu {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Réponse Asana illisible: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Gestionnaire de tâches (Asana) consulté et mis à jour pour chaque dossier.
#[async_trait]
pub trait TaskTracker: Send + Sync {
    /// Toutes les tâches du projet (nom + identifiant).
    async fn list_project_tasks(&self, project_gid: &str) -> Result<Vec<TaskSummary>, TrackerError>;

    /// Champs personnalisés et projets d'une tâche.
    async fn get_task(&self, task_gid: &str) -> Result<TaskDetails, TrackerError>;

    /// Remplace les options des champs multi-valeurs indiqués, en une seule requête.
    async fn update_custom_fields(
        &self,
        task_gid: &str,
        update: &CustomFieldUpdate,
    ) -> Result<(), TrackerError>;

    /// Déplace la tâche dans une section.
    async fn add_task_to_section(&self, section_gid: &str, task_gid: &str) -> Result<(), TrackerError>;
}

/// Première tâche du projet dont le nom contient le numéro de dossier.
pub async fn find_task_by_case_number<T: TaskTracker + ?Sized>(
    tracker: &T,
    project_gid: &str,
    case_number: &str,
) -> Result<Option<TaskSummary>, TrackerError> {
    let tasks = tracker.list_project_tasks(project_gid).await?;
    let mut matches = tasks.into_iter().filter(|task| task.name.contains(case_number));

    let first = matches.next();
    let others: Vec<String> = matches.map(|task| task.name).collect();
    if let Some(task) = &first {
        if !others.is_empty() {
            warn!(
                "Plusieurs tâches contiennent {} : {:?} retenue, ignorées {:?}",
                case_number, task.name, others
            );
        }
    }

    Ok(first)
}
