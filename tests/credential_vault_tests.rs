//! Credential round trip through the on-disk, encrypted store, exercised at
//! the same layer the `role credential` CLI subcommands use.

use molectl::credentials::{CredentialRecord, CredentialStore};

#[test]
fn a_saved_credential_survives_a_fresh_store_handle_pointed_at_the_same_root() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = CredentialStore::open_under(dir.path()).unwrap();
        store
            .save(&CredentialRecord {
                name: "internal-registry".into(),
                url: "https://registry.example.invalid".into(),
                username: "ci-bot".into(),
                token: "s3cr3t!token".into(),
            })
            .unwrap();
    }

    // A second store instance, as a fresh CLI invocation would open.
    let reopened = CredentialStore::open_under(dir.path()).unwrap();
    let loaded = reopened.load("internal-registry").unwrap();
    assert_eq!(loaded.username, "ci-bot");
    assert_eq!(loaded.token, "s3cr3t!token");
}

#[test]
fn deleting_and_relisting_reflects_the_current_set() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::open_under(dir.path()).unwrap();

    for name in ["alpha", "beta", "gamma"] {
        store
            .save(&CredentialRecord {
                name: name.into(),
                url: "https://example.invalid".into(),
                username: "u".into(),
                token: "t".into(),
            })
            .unwrap();
    }
    store.delete("beta").unwrap();

    assert_eq!(store.list().unwrap(), vec!["alpha", "gamma"]);
}

#[test]
fn credential_files_are_not_plaintext_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::open_under(dir.path()).unwrap();
    let token = "super-secret-value";
    store
        .save(&CredentialRecord {
            name: "nexus".into(),
            url: "https://nexus.example.invalid".into(),
            username: "u".into(),
            token: token.into(),
        })
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("nexus")).unwrap();
    assert!(!raw.contains(token));
    assert!(raw.starts_with("$MOLECTL_VAULT"));
}
