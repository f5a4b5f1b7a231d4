use anyhow::{Context, Result};
use log::{debug, info};
use std::fmt;
use std::path::PathBuf;

use crate::case_number::extract_case_number;
use crate::config::Config;
use crate::console::Console;
use crate::drive::{safe_file_name, Drive};
use crate::mail::{ImapClient, MailSource, ParsedEmail};
use crate::reconcile::{reconcile_task, ReconcileRules};
use crate::tracker::{find_task_by_case_number, AsanaClient, TaskTracker};

/// Issue du traitement d'un email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Pièces classées et tâche mise à jour.
    Filed {
        case: String,
        folder: PathBuf,
        files: Vec<PathBuf>,
        task: String,
    },
    SkippedNoCase,
    SkippedNoFolder {
        case: String,
    },
    /// Pièces classées mais aucune tâche ne correspond.
    SkippedNoTask {
        case: String,
        files: Vec<PathBuf>,
    },
    SkippedNoAttachment {
        case: String,
    },
    Failed {
        reason: String,
    },
}

impl Outcome {
    /// Seuls les emails classés et ceux sans pièce jointe quittent la boîte.
    pub fn deletes_message(&self) -> bool {
        matches!(self, Outcome::Filed { .. } | Outcome::SkippedNoAttachment { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Filed { .. } => "classé",
            Outcome::SkippedNoCase => "sans numéro de dossier",
            Outcome::SkippedNoFolder { .. } => "sans dossier sur le Drive",
            Outcome::SkippedNoTask { .. } => "sans tâche Asana",
            Outcome::SkippedNoAttachment { .. } => "sans pièce jointe",
            Outcome::Failed { .. } => "en erreur",
        }
    }
}

/// Bilan d'un passage sur la boîte mail.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<(u32, Outcome)>,
    pub expunged: usize,
    pub dry_run: bool,
}

impl RunReport {
    pub fn count<F: Fn(&Outcome) -> bool>(&self, predicate: F) -> usize {
        self.outcomes.iter().filter(|(_, o)| predicate(o)).count()
    }

    pub fn filed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Filed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn deleted(&self) -> usize {
        self.count(Outcome::deletes_message)
    }

    pub fn left_in_mailbox(&self) -> usize {
        self.outcomes.len() - self.deleted()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let deleted = if self.dry_run { "à supprimer" } else { "supprimé(s)" };
        write!(
            f,
            "{} email(s) examiné(s) : {} classé(s), {} {}, {} laissé(s) dans la boîte, {} en erreur",
            self.outcomes.len(),
            self.filed(),
            self.deleted(),
            deleted,
            self.left_in_mailbox(),
            self.failed()
        )?;
        if self.dry_run {
            write!(f, " (dry-run)")?;
        }
        Ok(())
    }
}

/// Rapproche chaque email de son dossier sur le Drive et de sa tâche Asana.
pub struct CaseProcessor<T: TaskTracker> {
    drive: Drive,
    tracker: T,
    rules: ReconcileRules,
    project_demandes: String,
    dry_run: bool,
}

impl CaseProcessor<AsanaClient> {
    pub fn from_config(config: &Config, dry_run: bool) -> Self {
        CaseProcessor::new(
            Drive::new(config.drive.base_path.clone()),
            AsanaClient::new(&config.asana),
            ReconcileRules::from(&config.asana),
            config.asana.project_demandes.clone(),
            dry_run,
        )
    }
}

impl<T: TaskTracker> CaseProcessor<T> {
    pub fn new(
        drive: Drive,
        tracker: T,
        rules: ReconcileRules,
        project_demandes: String,
        dry_run: bool,
    ) -> Self {
        CaseProcessor {
            drive,
            tracker,
            rules,
            project_demandes,
            dry_run,
        }
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Traite tous les emails du dossier IMAP, un par un, puis purge ceux marqués.
    ///
    /// Les erreurs propres à un email donnent `Outcome::Failed` et le
    /// traitement continue. Les erreurs de la boîte mail (recherche,
    /// marquage, purge) interrompent le passage.
    pub async fn process_mailbox<M: MailSource + ?Sized>(
        &self,
        mail: &mut M,
        console: &mut dyn Console,
        limit: Option<usize>,
    ) -> Result<RunReport> {
        let mut message_ids = mail
            .list_messages()
            .await
            .context("Erreur lors de la recherche d'emails")?;

        if let Some(limit) = limit {
            message_ids.truncate(limit);
        }

        let mut report = RunReport {
            dry_run: self.dry_run,
            ..RunReport::default()
        };

        if message_ids.is_empty() {
            console.info("📭 Aucun email à traiter.");
        }

        for message_id in message_ids {
            let outcome = match mail.fetch_raw(message_id).await {
                Ok(raw) => self.process_message(&raw, console).await,
                Err(e) => {
                    console.error(&format!("❌ Impossible de récupérer l'email {} : {:#}", message_id, e));
                    Outcome::Failed {
                        reason: format!("{:#}", e),
                    }
                }
            };
            debug!("Email {} : {}", message_id, outcome.label());

            if outcome.deletes_message() {
                if self.dry_run {
                    console.info("🧪 [dry-run] Mail conservé.");
                } else {
                    mail.flag_deleted(message_id)
                        .await
                        .with_context(|| format!("Impossible de marquer l'email {} comme supprimé", message_id))?;
                    if matches!(outcome, Outcome::Filed { .. }) {
                        console.info("🗑️ Mail supprimé.");
                    }
                }
            }

            report.outcomes.push((message_id, outcome));
        }

        if !self.dry_run {
            report.expunged = mail.expunge().await?;
        }

        info!("{}", report);
        console.info("\n🎉 Script terminé avec succès.");
        Ok(report)
    }

    /// Traite un email brut et retourne son issue.
    pub async fn process_message(&self, raw_email: &[u8], console: &mut dyn Console) -> Outcome {
        let email = match ParsedEmail::parse(raw_email) {
            Ok(email) => email,
            Err(e) => {
                console.error(&format!("❌ Email illisible : {:#}", e));
                return Outcome::Failed {
                    reason: format!("{:#}", e),
                };
            }
        };

        console.info(&format!("\n📨 Objet : {}", email.subject));

        let Some(case) = extract_case_number(&email.subject) else {
            console.error("❌ Aucun numéro de dossier trouvé.");
            return Outcome::SkippedNoCase;
        };
        console.info(&format!("📁 Numéro de dossier : {}", case));

        if !email.has_attachments() {
            console.warn("⚠️ Aucun fichier joint détecté, mail supprimé.");
            return Outcome::SkippedNoAttachment { case };
        }

        let Some(folder) = self.drive.find_case_folder(&case) else {
            console.error("❌ Aucun dossier trouvé dans le Drive.");
            return Outcome::SkippedNoFolder { case };
        };

        let mut files = Vec::with_capacity(email.attachments.len());
        for attachment in &email.attachments {
            let Some(name) = safe_file_name(&attachment.filename) else {
                console.warn(&format!(
                    "⚠️ Pièce jointe ignorée (nom inutilisable) : {:?}",
                    attachment.filename
                ));
                continue;
            };

            if self.dry_run {
                let target = folder.join(name);
                console.info(&format!("🧪 [dry-run] Pièce jointe non enregistrée : {}", target.display()));
                files.push(target);
                continue;
            }

            match Drive::save_attachment(&folder, attachment) {
                Ok(path) => {
                    console.info(&format!("📎 Pièce jointe enregistrée dans : {}", path.display()));
                    files.push(path);
                }
                Err(e) => {
                    console.error(&format!("❌ Échec de l'enregistrement : {:#}", e));
                    return Outcome::Failed {
                        reason: format!("{:#}", e),
                    };
                }
            }
        }

        if files.is_empty() {
            console.error("❌ Aucune pièce jointe enregistrable, mail conservé.");
            return Outcome::Failed {
                reason: "aucun nom de pièce jointe utilisable".to_string(),
            };
        }

        let task = match find_task_by_case_number(&self.tracker, &self.project_demandes, &case).await {
            Ok(Some(task)) => {
                console.info(&format!("✅ Tâche trouvée : {} (GID : {})", task.name, task.gid));
                task
            }
            Ok(None) => {
                console.error("❌ Aucune tâche trouvée pour ce dossier.");
                return Outcome::SkippedNoTask { case, files };
            }
            Err(e) => {
                console.error(&format!("❌ Erreur Asana : {}", e));
                return Outcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if let Err(e) = reconcile_task(&self.tracker, &self.rules, &task.gid, console, self.dry_run).await {
            console.error(&format!("❌ Erreur Asana : {}", e));
            return Outcome::Failed {
                reason: e.to_string(),
            };
        }

        Outcome::Filed {
            case,
            folder,
            files,
            task: task.gid,
        }
    }
}

/// Passage complet : connexion IMAP, traitement, purge, déconnexion.
pub async fn run(
    config: &Config,
    console: &mut dyn Console,
    dry_run: bool,
    limit: Option<usize>,
) -> Result<RunReport> {
    let processor = CaseProcessor::from_config(config, dry_run);

    let mut imap = ImapClient::connect(&config.imap)
        .await
        .context("Impossible de se connecter au serveur IMAP")?;

    let report = processor.process_mailbox(&mut imap, console, limit).await?;

    imap.logout().await?;
    Ok(report)
}
