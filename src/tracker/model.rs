use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tâche telle que listée dans un projet (nom + identifiant).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskSummary {
    pub gid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnumOption {
    pub gid: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CustomField {
    pub gid: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub multi_enum_values: Option<Vec<EnumOption>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProjectRef {
    pub gid: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Détail d'une tâche : champs personnalisés et projets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskDetails {
    pub gid: String,
    #[serde(default)]
    pub custom_fields: Vec<CustomField>,
    #[serde(default)]
    pub projects: Vec<ProjectRef>,
}

impl TaskDetails {
    /// Options sélectionnées d'un champ multi-valeurs (vide si absent).
    pub fn multi_enum_values(&self, field_gid: &str) -> &[EnumOption] {
        self.custom_fields
            .iter()
            .find(|field| field.gid == field_gid)
            .and_then(|field| field.multi_enum_values.as_deref())
            .unwrap_or(&[])
    }

    pub fn is_in_project(&self, project_gid: &str) -> bool {
        self.projects.iter().any(|project| project.gid == project_gid)
    }
}

/// Nouvelles valeurs des champs multi-valeurs, par identifiant de champ.
pub type CustomFieldUpdate = BTreeMap<String, Vec<String>>;

/// Enveloppe `{"data": ...}` des requêtes et réponses de l'API.
#[derive(Debug, Serialize, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
    #[serde(default, skip_serializing)]
    pub next_page: Option<NextPage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextPage {
    pub offset: String,
}

#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    #[serde(default)]
    pub errors: Vec<ApiErrorMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorMessage {
    pub message: String,
}
