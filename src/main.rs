use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};

use quadraflow::config::Config;
use quadraflow::console::LogConsole;
use quadraflow::pipeline::{self, RunReport};
use quadraflow::slack_notifier::SlackNotifier;

#[derive(Parser)]
#[command(name = "quadraflow")]
#[command(about = "Classe les pièces jointes des emails de dossiers et met à jour les tâches Asana")]
#[command(version = "0.1.0")]
struct Args {
    /// Mode dry-run : analyse les emails sans écrire sur le Drive, ni modifier Asana, ni supprimer de mail
    #[arg(short, long)]
    dry_run: bool,

    /// Mode daemon : lance le traitement aux horaires SCHEDULER_TIMES
    #[arg(long)]
    daemon: bool,

    /// Limite du nombre d'emails à traiter (par défaut: illimité)
    #[arg(short = 'l', long)]
    limit: Option<usize>,

    /// Vérifier la configuration sans se connecter
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Charger le fichier .env s'il existe
    dotenv::dotenv().ok();

    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if args.dry_run {
        info!("🧪 Démarrage de QuadraFlow en mode DRY-RUN");
    } else {
        info!("🚀 Démarrage de QuadraFlow");
    }

    let config = Config::new()?;

    if args.check_config {
        println!("✅ Configuration valide !");
        println!("📧 IMAP: {}@{}:{} (dossier {})",
                 config.imap.username, config.imap.server, config.imap.port, config.imap.folder);
        println!("📁 Drive: {}", config.drive.base_path.display());
        println!("📋 Asana: projet {} ({})", config.asana.project_demandes, config.asana.base_url);
        println!("📌 Projet QUITUS: {}", config.asana.project_quitus);
        println!("💬 Slack: {}", if config.slack.is_some() { "activé" } else { "désactivé" });
        return Ok(());
    }

    if args.daemon {
        info!("🔄 Démarrage en mode daemon");
        return run_daemon_mode(config, args).await;
    }

    run_and_notify(&config, args.dry_run, args.limit).await?;
    Ok(())
}

/// Un passage complet, suivi du bilan Slack si configuré.
async fn run_and_notify(config: &Config, dry_run: bool, limit: Option<usize>) -> Result<RunReport> {
    let slack = match &config.slack {
        Some(slack_config) if !dry_run => match SlackNotifier::new(slack_config) {
            Ok(notifier) => Some(notifier),
            Err(e) => {
                warn!("⚠️  Impossible d'initialiser Slack: {} - notifications désactivées", e);
                None
            }
        },
        _ => None,
    };

    let mut console = LogConsole;
    match pipeline::run(config, &mut console, dry_run, limit).await {
        Ok(report) => {
            info!("✅ {}", report);
            if let Some(slack) = &slack {
                if let Err(e) = slack.notify_run_report(&report).await {
                    warn!("Bilan Slack non envoyé: {}", e);
                }
            }
            Ok(report)
        }
        Err(e) => {
            error!("❌ Erreur lors du traitement des emails: {:#}", e);
            if let Some(slack) = &slack {
                let _ = slack.notify_error(&format!("{:#}", e)).await;
            }
            Err(e)
        }
    }
}

async fn run_daemon_mode(config: Config, args: Args) -> Result<()> {
    use chrono::{Local, Timelike};
    use tokio_cron_scheduler::{Job, JobScheduler};

    if !config.scheduler.enabled {
        error!("❌ Le mode daemon nécessite SCHEDULER_ENABLED=true dans la configuration");
        anyhow::bail!("Scheduler non activé dans la configuration");
    }

    if config.scheduler.schedule_times.is_empty() {
        error!("❌ Aucun horaire de scheduling défini (SCHEDULER_TIMES)");
        anyhow::bail!("Aucun horaire de scheduling défini");
    }

    info!("📅 Horaires de traitement configurés : {:?}", config.scheduler.schedule_times);

    let scheduler = JobScheduler::new().await?;

    for schedule_time in &config.scheduler.schedule_times {
        let Some((hour, minute)) = schedule_time.split_once(':') else {
            error!("❌ Format d'horaire invalide: {}. Utilisez le format HH:MM", schedule_time);
            continue;
        };

        // Format cron: "0 minute hour * * *" (tous les jours)
        let cron_expr = format!("0 {} {} * * *", minute.trim(), hour.trim());
        info!("📆 Ajout du job planifié : {} (cron: {})", schedule_time, cron_expr);

        let config_clone = config.clone();
        let dry_run = args.dry_run;
        let limit = args.limit;
        let schedule_time_clone = schedule_time.clone();

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let config = config_clone.clone();
            let schedule_time = schedule_time_clone.clone();

            Box::pin(async move {
                info!("⏰ Exécution planifiée à {} - traitement de la boîte mail...", schedule_time);
                if let Err(e) = run_and_notify(&config, dry_run, limit).await {
                    error!("❌ Erreur lors du traitement planifié à {}: {:#}", schedule_time, e);
                }
            })
        })?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;

    info!("✅ Mode daemon démarré. En attente des horaires planifiés...");
    info!("⏸️  Appuyez sur Ctrl+C pour arrêter le daemon");

    loop {
        tokio::time::sleep(tokio::time::Duration::from_secs(60)).await;

        // Log périodique pour montrer que le daemon est actif
        let now = Local::now();
        if now.minute() == 0 {
            info!("💓 Daemon actif - {}", now.format("%Y-%m-%d %H:%M"));
        }
    }
}
