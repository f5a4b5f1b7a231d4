use anyhow::{Context, Result};
use async_imap::Session;
use async_trait::async_trait;
use futures::stream::StreamExt;
use log::{debug, info};
use tokio::net::TcpStream;
use tokio_native_tls::{native_tls, TlsConnector, TlsStream};

use super::MailSource;
use crate::config::ImapConfig;

pub struct ImapClient {
    session: Session<TlsStream<TcpStream>>,
    folder: String,
}

impl ImapClient {
    /// Ouvre la connexion IMAPS, s'authentifie et sélectionne le dossier configuré.
    pub async fn connect(config: &ImapConfig) -> Result<Self> {
        info!("Connexion au serveur IMAP {}:{}", config.server, config.port);

        let tcp_stream = TcpStream::connect((config.server.as_str(), config.port))
            .await
            .context("Impossible de se connecter au serveur IMAP")?;

        let tls = TlsConnector::from(
            native_tls::TlsConnector::new().context("Impossible d'initialiser TLS")?,
        );
        let tls_stream = tls
            .connect(&config.server, tcp_stream)
            .await
            .context("Impossible d'établir la connexion TLS")?;

        let mut client = async_imap::Client::new(tls_stream);
        let _greeting = client
            .read_response()
            .await
            .context("Connexion IMAP fermée avant le message d'accueil")?
            .context("Message d'accueil IMAP illisible")?;

        let mut session = client
            .login(&config.username, &config.password)
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Erreur d'authentification IMAP: {:?}", e))?;

        let mailbox = session
            .select(&config.folder)
            .await
            .with_context(|| format!("Impossible de sélectionner le dossier {}", config.folder))?;

        info!(
            "Connexion IMAP établie, dossier {} sélectionné ({} message(s))",
            config.folder, mailbox.exists
        );

        Ok(ImapClient {
            session,
            folder: config.folder.clone(),
        })
    }

    pub async fn logout(mut self) -> Result<()> {
        info!("Déconnexion du serveur IMAP");
        self.session
            .logout()
            .await
            .context("Erreur lors de la déconnexion IMAP")?;
        Ok(())
    }
}

#[async_trait]
impl MailSource for ImapClient {
    async fn list_messages(&mut self) -> Result<Vec<u32>> {
        let ids = self
            .session
            .search("ALL")
            .await
            .with_context(|| format!("Erreur lors de la recherche des emails dans {}", self.folder))?;

        let mut ids: Vec<u32> = ids.into_iter().collect();
        ids.sort_unstable();
        info!("Trouvé {} email(s) dans {}", ids.len(), self.folder);

        Ok(ids)
    }

    async fn fetch_raw(&mut self, message_id: u32) -> Result<Vec<u8>> {
        debug!("Récupération complète de l'email ID: {}", message_id);

        let messages: Vec<_> = self
            .session
            .fetch(message_id.to_string(), "RFC822")
            .await
            .context("Impossible de récupérer l'email")?
            .collect::<Vec<_>>()
            .await;

        for message in messages {
            let message = message.context("Réponse FETCH invalide")?;
            if let Some(body) = message.body() {
                debug!("Email récupéré, taille: {} bytes", body.len());
                return Ok(body.to_vec());
            }
        }

        anyhow::bail!("Email introuvable ou vide pour l'ID: {}", message_id);
    }

    async fn flag_deleted(&mut self, message_id: u32) -> Result<()> {
        debug!("Marquage de l'email {} comme supprimé", message_id);

        let results: Vec<_> = self
            .session
            .store(message_id.to_string(), "+FLAGS (\\Deleted)")
            .await
            .context("Impossible de marquer l'email comme supprimé")?
            .collect::<Vec<_>>()
            .await;

        for result in results {
            result.context("Réponse STORE invalide")?;
        }
        Ok(())
    }

    async fn expunge(&mut self) -> Result<usize> {
        let expunged: Vec<_> = self
            .session
            .expunge()
            .await
            .context("Impossible d'expunge les emails supprimés")?
            .collect::<Vec<_>>()
            .await;

        let count = expunged.into_iter().filter(|r| r.is_ok()).count();
        info!("{} email(s) supprimé(s) définitivement de {}", count, self.folder);
        Ok(count)
    }
}
