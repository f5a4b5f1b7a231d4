use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_ASANA_BASE_URL: &str = "https://app.asana.com/api/1.0";

/// Variables sans valeur par défaut : le traitement ne démarre pas sans elles.
const REQUIRED_VARS: [&str; 14] = [
    "EMAIL_ACCOUNT",
    "EMAIL_PASSWORD",
    "IMAP_SERVER",
    "IMAP_FOLDER",
    "CARINGTON_DRIVE",
    "ASANA_TOKEN",
    "PROJECT_ID_DEMANDES",
    "SECTION_ID_DEMANDES",
    "SECTION_ID_QUITUS",
    "FIELD_DOCS_MANQUANTS",
    "FIELD_DOCS_MANQUANTS_QUITUS",
    "OPTION_DEMANDE_IMMAT",
    "OPTION_MANDAT",
    "OPTION_MANDAT_QUITUS",
];

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub imap: ImapConfig,
    pub drive: DriveConfig,
    pub asana: AsanaConfig,
    pub scheduler: SchedulerConfig,
    pub slack: Option<SlackConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImapConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub folder: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DriveConfig {
    pub base_path: PathBuf,
}

/// Identifiants Asana : projet, sections, champs personnalisés et options à retirer.
#[derive(Debug, Deserialize, Clone)]
pub struct AsanaConfig {
    pub base_url: String,
    pub token: String,
    pub project_demandes: String,
    pub project_quitus: String,
    pub section_demandes: String,
    pub section_quitus: String,
    pub field_docs_manquants: String,
    pub field_docs_manquants_quitus: String,
    pub option_demande_immat: String,
    pub option_mandat: String,
    pub option_mandat_quitus: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub schedule_times: Vec<String>, // Format: "HH:MM" (e.g., ["08:00", "14:00"])
}

#[derive(Debug, Deserialize, Clone)]
pub struct SlackConfig {
    pub bot_token: String,
    pub channel_id: String,
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Construit la configuration à partir d'une fonction de lecture des variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::check_required_vars(&lookup)?;

        let required = |name: &str| -> Result<String> {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{} doit être défini", name))
        };

        let port = match lookup("IMAP_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("IMAP_PORT invalide: {}", raw))?,
            None => DEFAULT_IMAP_PORT,
        };

        let section_quitus = required("SECTION_ID_QUITUS")?;
        // Sans projet QUITUS explicite, l'appartenance est testée contre l'identifiant de section
        let project_quitus = lookup("PROJECT_ID_QUITUS")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| section_quitus.clone());

        Ok(Config {
            imap: ImapConfig {
                server: required("IMAP_SERVER")?,
                port,
                username: required("EMAIL_ACCOUNT")?,
                password: required("EMAIL_PASSWORD")?,
                folder: required("IMAP_FOLDER")?,
            },
            drive: DriveConfig {
                base_path: expand_home(&required("CARINGTON_DRIVE")?),
            },
            asana: AsanaConfig {
                base_url: lookup("ASANA_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_ASANA_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                token: required("ASANA_TOKEN")?,
                project_demandes: required("PROJECT_ID_DEMANDES")?,
                project_quitus,
                section_demandes: required("SECTION_ID_DEMANDES")?,
                section_quitus,
                field_docs_manquants: required("FIELD_DOCS_MANQUANTS")?,
                field_docs_manquants_quitus: required("FIELD_DOCS_MANQUANTS_QUITUS")?,
                option_demande_immat: required("OPTION_DEMANDE_IMMAT")?,
                option_mandat: required("OPTION_MANDAT")?,
                option_mandat_quitus: required("OPTION_MANDAT_QUITUS")?,
            },
            scheduler: SchedulerConfig {
                enabled: lookup("SCHEDULER_ENABLED")
                    .map(|v| v.trim().eq_ignore_ascii_case("true"))
                    .unwrap_or(false),
                schedule_times: lookup("SCHEDULER_TIMES")
                    .unwrap_or_else(|| "08:00".to_string())
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            slack: match (lookup("SLACK_BOT_TOKEN"), lookup("SLACK_CHANNEL_ID")) {
                (Some(bot_token), Some(channel_id)) => Some(SlackConfig {
                    bot_token,
                    channel_id,
                }),
                _ => {
                    log::debug!("SLACK_BOT_TOKEN ou SLACK_CHANNEL_ID non défini - notifications Slack désactivées");
                    None
                }
            },
        })
    }

    fn check_required_vars<F>(lookup: &F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let missing_vars: Vec<&str> = REQUIRED_VARS
            .iter()
            .copied()
            .filter(|var| lookup(var).map_or(true, |v| v.trim().is_empty()))
            .collect();

        if !missing_vars.is_empty() {
            anyhow::bail!(
                "Variables d'environnement manquantes: {}\n\
                 \n\
                 💡 Solutions :\n\
                 1. Créer un fichier .env à côté de l'exécutable avec ces variables\n\
                 2. Ou les exporter manuellement avant de lancer quadraflow --check-config",
                missing_vars.join(", ")
            );
        }

        Ok(())
    }
}

/// Remplace un `~` initial par le répertoire personnel de l'utilisateur.
fn expand_home(raw: &str) -> PathBuf {
    let raw = raw.trim();
    if raw == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}
