// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::types::RealmId;

#[test]
fn same_key_returns_the_same_guard_instance() {
    let map = GuardMap::new();
    let key = TokenKey::new("acme", RealmId::from("realm-1"));
    let a = map.guard_for(&key);
    let b = map.guard_for(&key);
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn distinct_keys_get_distinct_guards() {
    let map = GuardMap::new();
    let key_a = TokenKey::new("acme", RealmId::from("realm-a"));
    let key_b = TokenKey::new("acme", RealmId::from("realm-b"));
    let a = map.guard_for(&key_a);
    let b = map.guard_for(&key_b);
    assert!(!Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn second_caller_blocks_until_first_releases() {
    let map = Arc::new(GuardMap::new());
    let key = TokenKey::new("acme", RealmId::from("realm-1"));

    let guard = map.guard_for(&key);
    let first = guard.lock().await;

    let map2 = map.clone();
    let key2 = key.clone();
    let order = Arc::new(SyncMutex::new(Vec::<&'static str>::new()));
    let order2 = order.clone();
    let handle = tokio::spawn(async move {
        let guard = map2.guard_for(&key2);
        let _second = guard.lock().await;
        order2.lock().push("second");
    });

    tokio::task::yield_now().await;
    order.lock().push("first_still_holding");
    drop(first);

    handle.await.expect("join");
    assert_eq!(*order.lock(), vec!["first_still_holding", "second"]);
}
