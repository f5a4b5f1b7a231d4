use std::fs;
use quadraflow::case_number::extract_case_number;
use quadraflow::drive::Drive;
use quadraflow::mail::ParsedEmail;

#[test]
fn test_parse_dossier_email_fixture() {
    // Load test email file
    let raw = fs::read("data_test/dossier_12345.eml")
        .expect("Failed to read test email file data_test/dossier_12345.eml");

    let email = ParsedEmail::parse(&raw).expect("Failed to parse email");

    assert_eq!(email.subject, "Dossier n°12345 - pièces jointes");
    assert_eq!(extract_case_number(&email.subject).as_deref(), Some("12345"));

    // Le corps texte et HTML ne sont pas des pièces jointes
    assert_eq!(email.attachments.len(), 1, "Only the PDF should be an attachment");

    let pdf = &email.attachments[0];
    assert_eq!(pdf.filename, "justificatif_domicile.pdf");
    assert_eq!(pdf.content_type, "application/pdf");
    assert!(pdf.content.starts_with(b"%PDF-1.4"));

    println!("✅ Parsed fixture: {} ({} bytes)", pdf.filename, pdf.content.len());
}

#[test]
fn test_fixture_attachment_filed_into_case_folder() {
    let raw = fs::read("data_test/dossier_12345.eml")
        .expect("Failed to read test email file data_test/dossier_12345.eml");
    let email = ParsedEmail::parse(&raw).expect("Failed to parse email");

    let drive_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(drive_dir.path().join("CLIENTS/D/DOSSIER_12345_DUPONT")).unwrap();
    let drive = Drive::new(drive_dir.path());

    let case = extract_case_number(&email.subject).unwrap();
    let folder = drive.find_case_folder(&case).expect("Case folder should be found");
    let path = Drive::save_attachment(&folder, &email.attachments[0]).unwrap();

    assert_eq!(
        path,
        drive_dir.path().join("CLIENTS/D/DOSSIER_12345_DUPONT/justificatif_domicile.pdf")
    );
    assert_eq!(fs::read(&path).unwrap(), email.attachments[0].content);
}
