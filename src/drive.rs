use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::mail::Attachment;

/// Accès au Drive partagé contenant un répertoire par dossier.
pub struct Drive {
    base_path: PathBuf,
}

impl Drive {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Drive {
            base_path: base_path.into(),
        }
    }

    /// Tous les répertoires dont le nom contient le numéro, dans l'ordre de parcours.
    ///
    /// Le parcours est descendant : à chaque niveau, les sous-répertoires
    /// immédiats (triés par nom) sont examinés avant de descendre dans le
    /// premier d'entre eux. Un dossier placé à la racine l'emporte donc sur
    /// un homonyme rangé plus bas. Les répertoires illisibles sont ignorés.
    pub fn find_case_folders(&self, case_number: &str) -> Vec<PathBuf> {
        debug!("Recherche du dossier {} sous {:?}", case_number, self.base_path);

        WalkDir::new(&self.base_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Entrée du Drive ignorée: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_dir())
            .flat_map(|entry| matching_subfolders(entry.path(), case_number))
            .collect()
    }

    /// Premier répertoire correspondant au numéro de dossier.
    pub fn find_case_folder(&self, case_number: &str) -> Option<PathBuf> {
        let matches = self.find_case_folders(case_number);
        if matches.len() > 1 {
            warn!(
                "{} répertoires correspondent au dossier {} : {:?} - le premier est retenu",
                matches.len(),
                case_number,
                matches
            );
        }
        matches.into_iter().next()
    }

    /// Écrit la pièce jointe dans le répertoire du dossier, en écrasant un
    /// éventuel fichier de même nom.
    pub fn save_attachment(folder: &Path, attachment: &Attachment) -> Result<PathBuf> {
        let filename = safe_file_name(&attachment.filename).with_context(|| {
            format!("Nom de pièce jointe inutilisable: {:?}", attachment.filename)
        })?;
        let file_path = folder.join(filename);

        fs::write(&file_path, &attachment.content)
            .with_context(|| format!("Impossible d'écrire la pièce jointe {:?}", file_path))?;

        info!("Attachment saved: {:?} ({} bytes)", file_path, attachment.content.len());

        Ok(file_path)
    }
}

/// Sous-répertoires immédiats de `dir` dont le nom contient le numéro, triés par nom.
fn matching_subfolders(dir: &Path, case_number: &str) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Répertoire du Drive illisible {:?}: {}", dir, e);
            return Vec::new();
        }
    };

    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().contains(case_number))
        .map(|entry| entry.path())
        .collect();
    matches.sort();
    matches
}

/// Ne garde que le dernier composant du nom pour rester dans le répertoire du dossier.
pub fn safe_file_name(raw: &str) -> Option<String> {
    let last = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or("")
        .trim();

    if last.is_empty() || last == "." || last == ".." {
        None
    } else {
        Some(last.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn drive_fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("2024/DOSSIER_12345_DUPONT")).unwrap();
        fs::create_dir_all(dir.path().join("2025/DOSSIER_67890_MARTIN/scans")).unwrap();
        fs::create_dir_all(dir.path().join("ARCHIVES/12345_ANCIEN")).unwrap();
        fs::write(dir.path().join("2025/note_55555.txt"), b"pas un dossier").unwrap();
        dir
    }

    #[test]
    fn test_find_case_folder_nested() {
        let dir = drive_fixture();
        let drive = Drive::new(dir.path());

        assert_eq!(
            drive.find_case_folder("67890"),
            Some(dir.path().join("2025/DOSSIER_67890_MARTIN"))
        );
    }

    #[test]
    fn test_find_case_folder_first_in_name_order() {
        let dir = drive_fixture();
        let drive = Drive::new(dir.path());

        assert_eq!(drive.find_case_folders("12345").len(), 2);
        assert_eq!(
            drive.find_case_folder("12345"),
            Some(dir.path().join("2024/DOSSIER_12345_DUPONT"))
        );
    }

    #[test]
    fn test_shallow_folder_wins_over_deeper_one() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("A_ARCHIVES/12345_ANCIEN")).unwrap();
        fs::create_dir_all(dir.path().join("DOSSIER_12345_DUPONT")).unwrap();
        let drive = Drive::new(dir.path());

        assert_eq!(
            drive.find_case_folders("12345"),
            vec![
                dir.path().join("DOSSIER_12345_DUPONT"),
                dir.path().join("A_ARCHIVES/12345_ANCIEN"),
            ]
        );
        assert_eq!(
            drive.find_case_folder("12345"),
            Some(dir.path().join("DOSSIER_12345_DUPONT"))
        );
    }

    #[test]
    fn test_files_are_not_folders() {
        let dir = drive_fixture();
        let drive = Drive::new(dir.path());

        assert_eq!(drive.find_case_folder("55555"), None);
    }

    #[test]
    fn test_missing_base_path() {
        let drive = Drive::new("/nonexistent/quadraflow/drive");
        assert_eq!(drive.find_case_folder("12345"), None);
    }

    #[test]
    fn test_save_attachment_overwrites() {
        let dir = TempDir::new().unwrap();
        let first = Attachment {
            filename: "justificatif.pdf".to_string(),
            content: b"v1".to_vec(),
            content_type: "application/pdf".to_string(),
        };
        let second = Attachment {
            content: b"version 2".to_vec(),
            ..first.clone()
        };

        Drive::save_attachment(dir.path(), &first).unwrap();
        let path = Drive::save_attachment(dir.path(), &second).unwrap();

        assert_eq!(path, dir.path().join("justificatif.pdf"));
        assert_eq!(fs::read(path).unwrap(), b"version 2");
    }

    #[test]
    fn test_save_attachment_stays_in_folder() {
        let dir = TempDir::new().unwrap();
        let attachment = Attachment {
            filename: "../../etc/mandat.pdf".to_string(),
            content: b"%PDF".to_vec(),
            content_type: "application/pdf".to_string(),
        };

        let path = Drive::save_attachment(dir.path(), &attachment).unwrap();
        assert_eq!(path, dir.path().join("mandat.pdf"));
    }

    #[test]
    fn test_safe_file_name() {
        assert_eq!(safe_file_name("carte grise.pdf").as_deref(), Some("carte grise.pdf"));
        assert_eq!(safe_file_name("C:\\scans\\cni.jpg").as_deref(), Some("cni.jpg"));
        assert_eq!(safe_file_name(".."), None);
        assert_eq!(safe_file_name("dossier/"), None);
        assert_eq!(safe_file_name("   "), None);
    }
}
