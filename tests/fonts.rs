use std::time::Duration;

use transcript_pdf::fonts::{
    FontOptions, FontSet, FontSource, FontVariant, LoadedFont, load_fonts, resolve_style,
    validate_font,
};

use FontVariant::{Bold, BoldItalic, Italic, Light, Mono, Regular};

#[test]
fn present_variants_are_used_as_is() {
    assert_eq!(resolve_style(Bold, &[Regular, Bold]), (Bold, false));
    assert_eq!(resolve_style(Regular, &[Regular]), (Regular, false));
    assert_eq!(resolve_style(Mono, &[]), (Mono, false));
}

#[test]
fn fallback_chains() {
    assert_eq!(resolve_style(Bold, &[Regular, Light]), (Regular, true));
    assert_eq!(resolve_style(Italic, &[Regular, Light]), (Light, true));
    assert_eq!(resolve_style(Italic, &[Regular]), (Regular, true));
    assert_eq!(resolve_style(BoldItalic, &[Regular, Bold]), (Bold, true));
    assert_eq!(resolve_style(BoldItalic, &[Regular, Light]), (Light, true));
    assert_eq!(resolve_style(Light, &[Regular, Bold]), (Regular, true));
    // Nothing in the chain: first available face.
    assert_eq!(resolve_style(Light, &[Bold]), (Bold, true));
}

#[test]
fn builtin_set_reports_helvetica_variants() {
    let set = FontSet::builtin();
    assert!(set.is_builtin());
    assert_eq!(set.variants(), FontVariant::BUILTIN);

    let partial = FontSet {
        family: "Noto".into(),
        faces: vec![LoadedFont {
            variant: Bold,
            data: Vec::new(),
            face_index: 0,
        }],
    };
    assert!(!partial.is_builtin());
    assert_eq!(partial.variants(), [Bold]);
}

#[test]
fn validation_rejects_non_truetype_data() {
    assert!(validate_font(b"", 0).is_err());
    assert!(validate_font(b"OTTO\0\0\0\0", 0).is_err());
    assert!(validate_font(b"wOFF\0\0\0\0", 0).is_err());
    // Right magic, no tables.
    assert!(validate_font(&[0, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 0).is_err());
}

#[tokio::test]
async fn builtin_source_needs_no_io() {
    let set = load_fonts(&FontOptions::default()).await;
    assert!(set.is_builtin());
    assert_eq!(set.family, "Helvetica");
}

#[tokio::test]
async fn directory_without_valid_fonts_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("Fake-Regular.ttf"), b"<html>not a font</html>").unwrap();
    std::fs::write(dir.path().join("Fake-Bold.ttf"), [0u8, 1, 0, 0, 9, 9]).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

    let options = FontOptions {
        source: FontSource::Directory(dir.path().to_path_buf()),
        timeout: Duration::from_secs(5),
    };
    let set = load_fonts(&options).await;
    assert!(set.is_builtin());
}

#[tokio::test]
async fn missing_or_empty_directory_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let empty = FontOptions {
        source: FontSource::Directory(dir.path().to_path_buf()),
        timeout: Duration::from_secs(5),
    };
    assert!(load_fonts(&empty).await.is_builtin());

    let missing = FontOptions {
        source: FontSource::Directory(dir.path().join("nope")),
        timeout: Duration::from_secs(5),
    };
    assert!(load_fonts(&missing).await.is_builtin());
}

#[tokio::test]
async fn unknown_family_or_timeout_falls_back() {
    let unknown = FontOptions {
        source: FontSource::Family("No Such Family 7f3a".into()),
        timeout: Duration::from_secs(30),
    };
    assert!(load_fonts(&unknown).await.is_builtin());

    let hurried = FontOptions {
        source: FontSource::Family("No Such Family 7f3a".into()),
        timeout: Duration::ZERO,
    };
    let set = load_fonts(&hurried).await;
    assert!(set.is_builtin());
    assert_eq!(set.variants(), FontVariant::BUILTIN);
}
