use acme_order::{compose, load_fragment, ConfigurationError, FragmentKind, SecretLoader};
use proptest::prelude::*;
use secrecy::ExposeSecret;
use std::fs;
use std::path::Path;

const VALUES: [(FragmentKind, &str); 5] = [
    (FragmentKind::Host, "db.local"),
    (FragmentKind::Port, "5432"),
    (FragmentKind::Database, "orders"),
    (FragmentKind::Username, "svc"),
    (FragmentKind::Password, "s3cr3t"),
];

fn mount(dir: &Path, skip: Option<FragmentKind>, blank: Option<FragmentKind>) {
    for (kind, value) in VALUES {
        if Some(kind) == skip {
            continue;
        }
        let content = if Some(kind) == blank { " \n\t" } else { value };
        fs::write(dir.join(kind.file_name()), content).unwrap();
    }
}

#[test]
fn test_load_fragment_missing_file_is_absent() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_fragment(dir.path().join("nope")).is_none());
}

#[test]
fn test_load_fragment_trims_trailing_newline() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("host"), "db.local\n").unwrap();
    assert_eq!(load_fragment(dir.path().join("host")).unwrap().expose_secret(), "db.local");
}

#[test]
fn test_full_mount_composes_expected_descriptor() {
    let dir = tempfile::tempdir().unwrap();
    mount(dir.path(), None, None);

    let descriptor = compose(&SecretLoader::new(dir.path()).load_all()).unwrap();
    assert_eq!(
        descriptor.expose(),
        "Host=db.local;Port=5432;Database=orders;Username=svc;Password=s3cr3t"
    );
    assert_eq!(
        descriptor.redacted(),
        "Host=db.local;Port=5432;Database=orders;Username=svc;Password=********"
    );
}

#[test]
fn test_blank_file_matches_missing_file() {
    let missing = tempfile::tempdir().unwrap();
    mount(missing.path(), Some(FragmentKind::Password), None);
    let blank = tempfile::tempdir().unwrap();
    mount(blank.path(), None, Some(FragmentKind::Password));

    let a = compose(&SecretLoader::new(missing.path()).load_all()).unwrap_err();
    let b = compose(&SecretLoader::new(blank.path()).load_all()).unwrap_err();
    assert_eq!(a, b);
    assert_eq!(a, ConfigurationError::MissingFragments(vec![FragmentKind::Password]));
}

#[test]
fn test_error_message_names_fragment_without_values() {
    let dir = tempfile::tempdir().unwrap();
    mount(dir.path(), Some(FragmentKind::Host), None);

    let message = compose(&SecretLoader::new(dir.path()).load_all()).unwrap_err().to_string();
    assert!(message.contains("host"));
    for (_, value) in VALUES {
        assert!(!message.contains(value));
    }
}

fn fragment_value() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._-]{1,16}"
}

proptest! {
    #[test]
    fn composition_is_conjunctive(
        values in prop::collection::vec(fragment_value(), 5),
        present in prop::collection::vec(any::<bool>(), 5),
        blank_instead in any::<bool>(),
    ) {
        let dir = tempfile::tempdir().unwrap();
        for (i, kind) in FragmentKind::ALL.into_iter().enumerate() {
            if present[i] {
                fs::write(dir.path().join(kind.file_name()), &values[i]).unwrap();
            } else if blank_instead {
                fs::write(dir.path().join(kind.file_name()), "   ").unwrap();
            }
        }

        let result = compose(&SecretLoader::new(dir.path()).load_all());
        if present.iter().all(|p| *p) {
            let descriptor = result.unwrap();
            let expected = format!(
                "Host={};Port={};Database={};Username={};Password={}",
                values[0], values[1], values[2], values[3], values[4]
            );
            prop_assert_eq!(descriptor.expose(), expected.as_str());
        } else {
            let expected: Vec<FragmentKind> = FragmentKind::ALL
                .into_iter()
                .zip(&present)
                .filter(|(_, p)| !**p)
                .map(|(k, _)| k)
                .collect();
            prop_assert_eq!(result.unwrap_err(), ConfigurationError::MissingFragments(expected));
        }
    }
}
