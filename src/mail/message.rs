use anyhow::{Context, Result};
use log::debug;
use mail_parser::{MessageParser, MessagePart, MimeHeaders, PartType};

#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub content_type: String,
}

/// Email décodé : objet et pièces jointes.
#[derive(Debug, Clone)]
pub struct ParsedEmail {
    pub subject: String,
    pub attachments: Vec<Attachment>,
}

impl ParsedEmail {
    /// Décode un message RFC822 brut.
    ///
    /// Les en-têtes encodés (RFC 2047, RFC 2231) de l'objet et des noms de
    /// fichiers sont décodés par mail-parser. Une pièce jointe est toute
    /// partie non multipart portant un en-tête Content-Disposition et un nom
    /// de fichier, y compris dans les messages transférés (message/rfc822).
    pub fn parse(raw_email: &[u8]) -> Result<Self> {
        let message = MessageParser::default()
            .parse(raw_email)
            .context("Impossible de parser l'email")?;

        let subject = message.subject().unwrap_or_default().to_string();

        let mut attachments = Vec::new();
        Self::collect_attachments(&message.parts, &mut attachments);

        debug!(
            "Email parsé: objet {:?}, {} pièce(s) jointe(s)",
            subject,
            attachments.len()
        );

        Ok(ParsedEmail {
            subject,
            attachments,
        })
    }

    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    fn collect_attachments(parts: &[MessagePart<'_>], attachments: &mut Vec<Attachment>) {
        for part in parts {
            match &part.body {
                PartType::Message(inner) => Self::collect_attachments(&inner.parts, attachments),
                _ => attachments.extend(Self::attachment_from_part(part)),
            }
        }
    }

    fn attachment_from_part(part: &MessagePart<'_>) -> Option<Attachment> {
        if matches!(part.body, PartType::Multipart(_)) {
            return None;
        }
        part.content_disposition()?;

        let filename = part.attachment_name()?.trim();
        if filename.is_empty() {
            return None;
        }

        let content_type = part
            .content_type()
            .map(|ct| match ct.subtype() {
                Some(subtype) => format!("{}/{}", ct.ctype(), subtype),
                None => ct.ctype().to_string(),
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Some(Attachment {
            filename: filename.to_string(),
            content: part.contents().to_vec(),
            content_type,
        })
    }
}
