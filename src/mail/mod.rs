pub mod imap_client;
pub mod message;

use anyhow::Result;
use async_trait::async_trait;

pub use imap_client::ImapClient;
pub use message::{Attachment, ParsedEmail};

/// Boîte mail dont le dossier sélectionné est traité.
#[async_trait]
pub trait MailSource: Send {
    /// Identifiants de tous les messages présents, par ordre croissant.
    async fn list_messages(&mut self) -> Result<Vec<u32>>;

    /// Message RFC822 brut.
    async fn fetch_raw(&mut self, message_id: u32) -> Result<Vec<u8>>;

    async fn flag_deleted(&mut self, message_id: u32) -> Result<()>;

    /// Supprime définitivement les messages marqués, retourne leur nombre.
    async fn expunge(&mut self) -> Result<usize>;
}
