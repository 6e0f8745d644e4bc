// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::types::RealmId;

fn sample_record() -> TokenRecord {
    TokenRecord {
        access_token: "at-1".into(),
        refresh_token: "rt-1".into(),
        access_expiry_ms: 1_700_000_000_000,
        refresh_expiry_ms: Some(1_800_000_000_000),
        environment: "production".into(),
    }
}

#[test]
fn load_missing_key_returns_none() {
    let db = TokenDb::in_memory().expect("open");
    let key = TokenKey::new("acme", RealmId::from("realm-1"));
    assert!(db.load(&key).expect("load").is_none());
}

#[test]
fn save_then_load_roundtrips() {
    let db = TokenDb::in_memory().expect("open");
    let key = TokenKey::new("acme", RealmId::from("realm-1"));
    let record = sample_record();
    db.save(&key, &record, 1_000).expect("save");

    let loaded = db.load(&key).expect("load").expect("present");
    assert_eq!(loaded, record);
}

#[test]
fn save_overwrites_existing_row_for_same_key() {
    let db = TokenDb::in_memory().expect("open");
    let key = TokenKey::new("acme", RealmId::from("realm-1"));
    db.save(&key, &sample_record(), 1_000).expect("save");

    let mut updated = sample_record();
    updated.access_token = "at-2".into();
    db.save(&key, &updated, 2_000).expect("save");

    let loaded = db.load(&key).expect("load").expect("present");
    assert_eq!(loaded.access_token, "at-2");
}

#[test]
fn distinct_realms_for_same_tenant_do_not_collide() {
    let db = TokenDb::in_memory().expect("open");
    let key_a = TokenKey::new("acme", RealmId::from("realm-a"));
    let key_b = TokenKey::new("acme", RealmId::from("realm-b"));
    db.save(&key_a, &sample_record(), 1_000).expect("save a");

    assert!(db.load(&key_a).expect("load a").is_some());
    assert!(db.load(&key_b).expect("load b").is_none());
}

#[test]
fn load_batch_returns_only_present_keys() {
    let db = TokenDb::in_memory().expect("open");
    let key_a = TokenKey::new("acme", RealmId::from("realm-a"));
    let key_b = TokenKey::new("acme", RealmId::from("realm-b"));
    db.save(&key_a, &sample_record(), 1_000).expect("save a");

    let batch = db
        .load_batch(&[key_a.clone(), key_b.clone()])
        .expect("batch");
    assert_eq!(batch.len(), 1);
    assert!(batch.contains_key(&key_a));
    assert!(!batch.contains_key(&key_b));
}

#[test]
fn delete_removes_row() {
    let db = TokenDb::in_memory().expect("open");
    let key = TokenKey::new("acme", RealmId::from("realm-1"));
    db.save(&key, &sample_record(), 1_000).expect("save");
    db.delete(&key).expect("delete");
    assert!(db.load(&key).expect("load").is_none());
}
