//! Extraction du numéro de dossier (cinq chiffres) depuis l'objet d'un email.

use regex::Regex;
use std::sync::OnceLock;

/// "n°12345", "N° 12345", "nº12345", "no 12345", "n.12345", "n12345"
fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\bn(?:[°º]|o\.?|\.)?\s*(\d{5})\b").expect("marker regex is valid")
    })
}

fn bare_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d{5})\b").expect("bare regex is valid"))
}

/// Retourne le numéro de dossier de l'objet, ou `None`.
///
/// Un numéro précédé d'un marqueur « n° » est toujours préféré à un nombre
/// isolé de cinq chiffres situé ailleurs dans l'objet. Sinon le premier
/// nombre isolé de cinq chiffres gagne.
pub fn extract_case_number(subject: &str) -> Option<String> {
    marker_regex()
        .captures(subject)
        .or_else(|| bare_regex().captures(subject))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_forms() {
        assert_eq!(extract_case_number("Dossier n°12345 - pièces jointes").as_deref(), Some("12345"));
        assert_eq!(extract_case_number("DOSSIER N° 54321").as_deref(), Some("54321"));
        assert_eq!(extract_case_number("Réf nº 11111").as_deref(), Some("11111"));
        assert_eq!(extract_case_number("dossier no 22222").as_deref(), Some("22222"));
        assert_eq!(extract_case_number("dossier No.33333").as_deref(), Some("33333"));
        assert_eq!(extract_case_number("Dossier n44444 complet").as_deref(), Some("44444"));
    }

    #[test]
    fn test_marker_takes_precedence_over_earlier_bare_number() {
        assert_eq!(
            extract_case_number("Facture 99999 pour le dossier n° 12345").as_deref(),
            Some("12345")
        );
    }

    #[test]
    fn test_bare_number_fallback() {
        assert_eq!(extract_case_number("Carte grise 67890 DUPONT").as_deref(), Some("67890"));
        assert_eq!(extract_case_number("67890").as_deref(), Some("67890"));
    }

    #[test]
    fn test_first_bare_number_wins() {
        assert_eq!(extract_case_number("12345 et 67890").as_deref(), Some("12345"));
    }

    #[test]
    fn test_not_found() {
        assert_eq!(extract_case_number("Bonjour, voici les documents"), None);
        assert_eq!(extract_case_number("Commande 123456"), None);
        assert_eq!(extract_case_number("n° 1234"), None);
        assert_eq!(extract_case_number(""), None);
    }
}
