//! Mise à jour de la tâche Asana d'un dossier dont les pièces viennent d'arriver.

use log::debug;

use crate::config::AsanaConfig;
use crate::console::Console;
use crate::tracker::{CustomFieldUpdate, TaskDetails, TaskTracker, TrackerError};

/// Identifiants des champs, options, projet et sections concernés.
#[derive(Debug, Clone)]
pub struct ReconcileRules {
    pub field_docs: String,
    pub field_docs_quitus: String,
    pub removable_docs: Vec<String>,
    pub removable_docs_quitus: String,
    pub project_quitus: String,
    pub section_demandes: String,
    pub section_quitus: String,
}

impl From<&AsanaConfig> for ReconcileRules {
    fn from(config: &AsanaConfig) -> Self {
        ReconcileRules {
            field_docs: config.field_docs_manquants.clone(),
            field_docs_quitus: config.field_docs_manquants_quitus.clone(),
            removable_docs: vec![config.option_demande_immat.clone(), config.option_mandat.clone()],
            removable_docs_quitus: config.option_mandat_quitus.clone(),
            project_quitus: config.project_quitus.clone(),
            section_demandes: config.section_demandes.clone(),
            section_quitus: config.section_quitus.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocsField {
    General,
    Quitus,
}

impl DocsField {
    pub fn label(self) -> &'static str {
        match self {
            DocsField::General => "Docs manquants",
            DocsField::Quitus => "Docs manquants QUITUS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedTag {
    pub field: DocsField,
    pub gid: String,
    pub name: String,
}

/// Modifications à appliquer à une tâche.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub update: CustomFieldUpdate,
    pub removed: Vec<RemovedTag>,
    pub in_quitus: bool,
    /// Sections cibles, dans l'ordre de déplacement.
    pub sections: Vec<String>,
}

impl ReconcilePlan {
    /// Calcule les nouvelles valeurs des champs et les sections cibles.
    ///
    /// Le champ général est toujours envoyé, privé des options retirables.
    /// Le champ QUITUS et la section QUITUS ne sont concernés que si la
    /// tâche appartient au projet QUITUS.
    pub fn for_task(task: &TaskDetails, rules: &ReconcileRules) -> Self {
        let mut update = CustomFieldUpdate::new();
        let mut removed = Vec::new();

        let docs = retain_options(
            task,
            &rules.field_docs,
            |gid| rules.removable_docs.iter().any(|tag| tag == gid),
            DocsField::General,
            &mut removed,
        );
        update.insert(rules.field_docs.clone(), docs);

        let mut sections = vec![rules.section_demandes.clone()];

        let in_quitus = task.is_in_project(&rules.project_quitus);
        if in_quitus {
            let docs_quitus = retain_options(
                task,
                &rules.field_docs_quitus,
                |gid| gid == rules.removable_docs_quitus,
                DocsField::Quitus,
                &mut removed,
            );
            update.insert(rules.field_docs_quitus.clone(), docs_quitus);
            sections.push(rules.section_quitus.clone());
        }

        ReconcilePlan {
            update,
            removed,
            in_quitus,
            sections,
        }
    }
}

fn retain_options<F>(
    task: &TaskDetails,
    field_gid: &str,
    is_removable: F,
    field: DocsField,
    removed: &mut Vec<RemovedTag>,
) -> Vec<String>
where
    F: Fn(&str) -> bool,
{
    let mut kept = Vec::new();
    for option in task.multi_enum_values(field_gid) {
        if is_removable(&option.gid) {
            removed.push(RemovedTag {
                field,
                gid: option.gid.clone(),
                name: option.name.clone(),
            });
        } else {
            kept.push(option.gid.clone());
        }
    }
    kept
}

/// Lit la tâche, retire les options satisfaites et la déplace dans ses sections.
///
/// En dry-run, seul le plan est journalisé.
pub async fn reconcile_task<T: TaskTracker + ?Sized>(
    tracker: &T,
    rules: &ReconcileRules,
    task_gid: &str,
    console: &mut dyn Console,
    dry_run: bool,
) -> Result<ReconcilePlan, TrackerError> {
    let task = tracker.get_task(task_gid).await?;
    let plan = ReconcilePlan::for_task(&task, rules);
    debug!("Plan pour la tâche {}: {:?}", task_gid, plan);

    for tag in plan.removed.iter().filter(|t| t.field == DocsField::General) {
        console.info(&format!("🧹 Retrait : ❌ {} ({})", tag.name, tag.field.label()));
    }
    if plan.in_quitus {
        console.info("📌 Projet QUITUS détecté ✅");
        for tag in plan.removed.iter().filter(|t| t.field == DocsField::Quitus) {
            console.info(&format!("🧹 Retrait : ❌ {} ({})", tag.name, tag.field.label()));
        }
    }

    if dry_run {
        console.info(&format!(
            "🧪 [dry-run] Champs non modifiés, sections prévues : {}",
            plan.sections.join(", ")
        ));
        return Ok(plan);
    }

    tracker.update_custom_fields(task_gid, &plan.update).await?;
    console.info("✅ Champs personnalisés mis à jour.");

    tracker.add_task_to_section(&rules.section_demandes, task_gid).await?;
    console.info("📦 Tâche déplacée dans ENREGISTREMENT (DEMANDES)");

    if plan.in_quitus {
        tracker.add_task_to_section(&rules.section_quitus, task_gid).await?;
        console.info("📦 Tâche déplacée dans CERFA QUITUS A FAIRE (QUITUS)");
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::{CustomField, EnumOption, ProjectRef};

    fn rules() -> ReconcileRules {
        ReconcileRules {
            field_docs: "f-docs".to_string(),
            field_docs_quitus: "f-docs-quitus".to_string(),
            removable_docs: vec!["o-immat".to_string(), "o-mandat".to_string()],
            removable_docs_quitus: "o-mandat-quitus".to_string(),
            project_quitus: "p-quitus".to_string(),
            section_demandes: "s-demandes".to_string(),
            section_quitus: "s-quitus".to_string(),
        }
    }

    fn option(gid: &str, name: &str) -> EnumOption {
        EnumOption {
            gid: gid.to_string(),
            name: name.to_string(),
        }
    }

    fn task(docs: Vec<EnumOption>, docs_quitus: Vec<EnumOption>, projects: &[&str]) -> TaskDetails {
        TaskDetails {
            gid: "1201".to_string(),
            custom_fields: vec![
                CustomField {
                    gid: "f-docs".to_string(),
                    name: Some("Docs manquants".to_string()),
                    multi_enum_values: Some(docs),
                },
                CustomField {
                    gid: "f-docs-quitus".to_string(),
                    name: Some("Docs manquants QUITUS".to_string()),
                    multi_enum_values: Some(docs_quitus),
                },
            ],
            projects: projects
                .iter()
                .map(|gid| ProjectRef {
                    gid: gid.to_string(),
                    name: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_plan_outside_quitus_updates_general_field_only() {
        let task = task(
            vec![option("o-immat", "Demande d'immatriculation"), option("o-cni", "CNI")],
            vec![option("o-mandat-quitus", "Mandat QUITUS")],
            &["p-demandes"],
        );

        let plan = ReconcilePlan::for_task(&task, &rules());

        assert!(!plan.in_quitus);
        assert_eq!(plan.update.len(), 1);
        assert_eq!(plan.update["f-docs"], vec!["o-cni".to_string()]);
        assert_eq!(plan.sections, vec!["s-demandes".to_string()]);
        assert_eq!(plan.removed.len(), 1);
        assert_eq!(plan.removed[0].name, "Demande d'immatriculation");
    }

    #[test]
    fn test_plan_in_quitus_updates_both_fields_and_sections() {
        let task = task(
            vec![option("o-mandat", "Mandat"), option("o-immat", "Demande d'immatriculation")],
            vec![option("o-mandat-quitus", "Mandat QUITUS"), option("o-cerfa", "Cerfa")],
            &["p-demandes", "p-quitus"],
        );

        let plan = ReconcilePlan::for_task(&task, &rules());

        assert!(plan.in_quitus);
        assert!(plan.update["f-docs"].is_empty());
        assert_eq!(plan.update["f-docs-quitus"], vec!["o-cerfa".to_string()]);
        assert_eq!(plan.sections, vec!["s-demandes".to_string(), "s-quitus".to_string()]);
        assert_eq!(plan.removed.len(), 3);
        assert_eq!(plan.removed[2].field, DocsField::Quitus);
    }

    #[test]
    fn test_quitus_tag_in_general_field_is_kept() {
        let task = task(vec![option("o-mandat-quitus", "Mandat QUITUS")], vec![], &[]);

        let plan = ReconcilePlan::for_task(&task, &rules());

        assert_eq!(plan.update["f-docs"], vec!["o-mandat-quitus".to_string()]);
        assert!(plan.removed.is_empty());
    }

    #[test]
    fn test_task_without_fields_clears_general_field() {
        let task = TaskDetails {
            gid: "1".to_string(),
            custom_fields: vec![],
            projects: vec![],
        };

        let plan = ReconcilePlan::for_task(&task, &rules());
        assert_eq!(plan.update.get("f-docs"), Some(&Vec::new()));
        assert_eq!(plan.sections.len(), 1);
    }
}
