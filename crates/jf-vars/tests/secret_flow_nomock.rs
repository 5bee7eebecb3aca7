//! Secret flow through a real store and a real masker, no mocks.
//!
//! Every path that can finalize a secret value (seed, set, recompute)
//! must leave the masker able to scrub that value from text.

use std::sync::Arc;

use jf_mask::SecretMasker;
use jf_vars::{SetOptions, VariableStore, VariableValue};

const CANARY: &str = "canary-9f8e7d6c5b4a";

#[test]
fn seeded_secret_is_maskable() {
    let masker = Arc::new(SecretMasker::new());
    let seed = vec![(
        "connection".to_string(),
        VariableValue {
            value: Some(CANARY.to_string()),
            secret: true,
            read_only: false,
        },
    )];
    let (_store, _) = VariableStore::new(masker.clone(), seed);
    let masked = masker.mask(&format!("connecting with {}", CANARY));
    assert!(!masked.contains(CANARY), "leak: {}", masked);
}

#[test]
fn set_secret_is_maskable() {
    let masker = Arc::new(SecretMasker::new());
    let (store, _) = VariableStore::new(masker.clone(), Vec::new());
    store.set_with("token", CANARY, SetOptions::secret()).unwrap();
    assert!(!masker.mask(CANARY).contains(CANARY));
}

#[test]
fn expanded_value_derived_from_secret_is_maskable() {
    let masker = Arc::new(SecretMasker::new());
    let seed = vec![
        (
            "password".to_string(),
            VariableValue {
                value: Some(CANARY.to_string()),
                secret: true,
                read_only: false,
            },
        ),
        (
            "conn_string".to_string(),
            VariableValue::from("server=db;pw=$(password)"),
        ),
    ];
    let (store, warnings) = VariableStore::new(masker.clone(), seed);
    assert!(warnings.is_empty());

    let derived = store.get("conn_string").unwrap();
    assert_eq!(derived, format!("server=db;pw={}", CANARY));

    // The derived value is tainted secret and registered whole.
    assert_eq!(store.secret_variables().len(), 2);
    let masked = masker.mask(&format!("task output: {}", derived));
    assert!(!masked.contains(CANARY), "leak: {}", masked);
    assert!(!masked.contains(&derived), "leak: {}", masked);
}

#[test]
fn taint_marks_export_partition() {
    let masker = Arc::new(SecretMasker::new());
    let seed = vec![
        (
            "secret_part".to_string(),
            VariableValue {
                value: Some(CANARY.to_string()),
                secret: true,
                read_only: false,
            },
        ),
        ("derived".to_string(), VariableValue::from("x-$(secret_part)")),
        ("public".to_string(), VariableValue::from("open")),
    ];
    let (store, _) = VariableStore::new(masker, seed);

    let mut exported = std::collections::HashMap::new();
    store.copy_into(&mut exported, |v| v.to_string());

    assert!(exported["secret_part"].secret);
    assert!(exported["derived"].secret, "taint must reach the export");
    assert!(!exported["public"].secret);
}

#[test]
fn recompute_registers_new_combination() {
    let masker = Arc::new(SecretMasker::new());
    let (store, _) = VariableStore::new(masker.clone(), Vec::new());
    store
        .set_with("password", CANARY, SetOptions::secret())
        .unwrap();
    store.set("arg", "--pw=$(password)").unwrap();
    let warnings = store.recompute_expanded();
    assert!(warnings.is_empty());

    let combined = format!("--pw={}", CANARY);
    assert_eq!(store.get("arg").as_deref(), Some(combined.as_str()));
    let masked = masker.mask(&format!("running with {}", combined));
    assert!(!masked.contains(CANARY), "leak: {}", masked);
}

#[test]
fn debug_formatting_never_shows_secret_values() {
    let masker = Arc::new(SecretMasker::new());
    let (store, _) = VariableStore::new(masker, Vec::new());
    store.set_with("token", CANARY, SetOptions::secret()).unwrap();

    for variable in store.secret_variables() {
        let debug = format!("{:?}", variable);
        assert!(!debug.contains(CANARY), "Debug leaked: {}", debug);
    }

    let mut exported = std::collections::HashMap::new();
    store.copy_into(&mut exported, |v| v.to_string());
    let debug = format!("{:?}", exported["token"]);
    assert!(!debug.contains(CANARY), "Debug leaked: {}", debug);
}
