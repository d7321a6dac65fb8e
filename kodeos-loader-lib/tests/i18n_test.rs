use kodeos_loader_lib::i18n::{Language, MessageKey, flashing_progress, text, unknown_command};
use strum::IntoEnumIterator;

#[test]
fn every_key_is_translated_in_every_language() {
    for lang in Language::iter() {
        for key in MessageKey::iter() {
            let value = text(lang, key);
            assert!(
                !value.starts_with('<'),
                "{lang} is missing {}",
                key.as_str()
            );
        }
    }
}

#[test]
fn languages_differ_where_expected() {
    assert_eq!(text(Language::En, MessageKey::EraseButton), "Erase");
    assert_eq!(text(Language::Es, MessageKey::EraseButton), "Borrar");
    assert_eq!(text(Language::De, MessageKey::EraseButton), "Löschen");
}

#[test]
fn progress_placeholder_is_filled() {
    assert_eq!(flashing_progress(Language::En, 37), "Flashing (37%)...");
    assert_eq!(flashing_progress(Language::Es, 100), "Flasheando (100%)...");
}

#[test]
fn language_tags_parse() {
    assert_eq!("es".parse::<Language>().unwrap(), Language::Es);
    assert_eq!("DE".parse::<Language>().unwrap(), Language::De);
    assert!("fr".parse::<Language>().is_err());
    assert_eq!(Language::default(), Language::En);
    assert_eq!(Language::Es.to_string(), "es");
}

#[test]
fn shell_messages_follow_the_language() {
    assert_eq!(
        unknown_command(Language::En, "flsh"),
        "unknown command 'flsh', type 'help'"
    );
    assert_eq!(
        unknown_command(Language::Es, "flsh"),
        "comando desconocido 'flsh', escriba 'help'"
    );
    assert!(text(Language::De, MessageKey::ShellHelp).starts_with("Befehle:"));
    assert_ne!(
        text(Language::Es, MessageKey::ShellUsageLang),
        text(Language::En, MessageKey::ShellUsageLang)
    );
}
