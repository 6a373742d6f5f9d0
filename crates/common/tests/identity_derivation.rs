//! Integration tests for garage keys, robot tokens and the garage store

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use ::common::crypto::{KeyError, RootSecret, TOKEN_LENGTH};
use ::common::identity::{Garage, GarageError, GarageEvent, RobotIdentity};

#[test]
fn test_token_derivation_is_deterministic() {
    let root = RootSecret::generate().unwrap();
    for account in 0..3 {
        let first = RobotIdentity::derive(&root, account).unwrap();
        let second = RobotIdentity::derive(&root, account).unwrap();
        assert_eq!(first.token(), second.token());
        assert_eq!(first.token().as_str().len(), TOKEN_LENGTH);
        assert_eq!(first.token_hash(), second.token_hash());
        assert_eq!(first.hash_id(), second.hash_id());
        assert_eq!(
            first.nostr().public_key_hex(),
            second.nostr().public_key_hex()
        );
    }
}

#[test]
fn test_accounts_yield_distinct_robots() {
    let root = RootSecret::generate().unwrap();
    let tokens: HashSet<String> = (0..10)
        .map(|account| {
            RobotIdentity::derive(&root, account)
                .unwrap()
                .token()
                .as_str()
                .to_string()
        })
        .collect();
    assert_eq!(tokens.len(), 10);
}

#[test]
fn test_robot_survives_restart() {
    let root = RootSecret::generate().unwrap();
    let t0 = RobotIdentity::derive(&root, 0).unwrap().token().clone();
    let t1 = RobotIdentity::derive(&root, 1).unwrap().token().clone();
    assert_ne!(t0, t1);

    // all that survives a restart is the encoded garage key
    let encoded = root.encode().unwrap();
    drop(root);

    let restored = RootSecret::decode(&encoded).unwrap();
    assert_eq!(RobotIdentity::derive(&restored, 0).unwrap().token(), &t0);
    assert_eq!(RobotIdentity::derive(&restored, 1).unwrap().token(), &t1);
}

#[test]
fn test_mutated_garage_key_is_rejected() {
    let encoded = RootSecret::generate().unwrap().encode().unwrap();

    // flip one character of the data part
    let position = encoded.len() - 10;
    let original = encoded.as_bytes()[position] as char;
    let replacement = if original == 'q' { 'p' } else { 'q' };
    let mut mutated = encoded.clone();
    mutated.replace_range(position..position + 1, &replacement.to_string());

    assert!(matches!(
        RootSecret::decode(&mutated),
        Err(KeyError::MalformedKey(_))
    ));
    assert!(matches!(
        RootSecret::decode(&encoded[..encoded.len() - 1]),
        Err(KeyError::MalformedKey(_))
    ));
}

#[test]
fn test_garage_persists_keys_and_account() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garage.toml");

    let garage = Garage::create().unwrap();
    garage.increment_account().unwrap();
    let robot = garage.robot().unwrap();
    let keys = robot.pgp_keys().unwrap().clone();
    garage.save(&path).unwrap();

    let loaded = Garage::load_from_persistence(&path).unwrap();
    assert_eq!(loaded.account().unwrap(), 1);
    assert_eq!(loaded.encoded_key().unwrap(), garage.encoded_key().unwrap());

    let reloaded = loaded.robot().unwrap();
    assert_eq!(reloaded.token(), robot.token());
    // keys are generated once per robot, not on every load
    assert_eq!(reloaded.pgp_keys().unwrap(), &keys);
    assert!(reloaded.robot_key().is_ok());
}

#[test]
fn test_garage_observers() {
    let garage = Garage::create().unwrap();
    let events = Arc::new(Mutex::new(Vec::new()));

    let seen = events.clone();
    let subscription = garage.subscribe(move |event| seen.lock().push(event.clone()));

    garage.increment_account().unwrap();
    garage.decrement_account().unwrap();
    // saturates at account zero
    garage.decrement_account().unwrap();
    assert_eq!(garage.account().unwrap(), 0);

    garage.unsubscribe(subscription);
    garage.increment_account().unwrap();

    let events = events.lock();
    assert_eq!(events.first(), Some(&GarageEvent::AccountChanged(1)));
    assert!(!events.contains(&GarageEvent::AccountChanged(2)));
}

#[test]
fn test_disposed_garage_refuses_work() {
    let garage = Garage::create().unwrap();
    garage.dispose();
    assert!(matches!(garage.robot(), Err(GarageError::Disposed)));
    assert!(matches!(
        garage.set_account_index(2),
        Err(GarageError::Disposed)
    ));
}

#[test]
fn test_negative_account_rejected() {
    let garage = Garage::create().unwrap();
    assert!(garage.set_account_index(-3).is_err());
    assert_eq!(garage.account().unwrap(), 0);
}

#[test]
fn test_known_answer_vector() {
    let root = RootSecret::from([7u8; 32]);
    let cases = [
        (
            0,
            "HCE3S26PAjJoHMdKkEPs68rGbwfRiMwkbGGb",
            "a0cce23ce9319154b441e511983fc425d7d25d57150ead91430127c7c2bce5c8",
            "2bc0e0b681e284314623ac763984699c746c2b6395aebedd0bde146fe324fa58",
        ),
        (
            1,
            "TjInSPd2jrfv0b9RR8RdRysDS5VBGeVzudSt",
            "994664ebe134f08b016b1567184a5f1f9ee61180c6ecd1b3b57797c78d8c26dd",
            "c2dd2f78944398fe46e6dbd7483baee8cb7a0902bce968d7b5a62851f9c56da6",
        ),
    ];
    for (account, token, hash_id, nostr_pubkey) in cases {
        let robot = RobotIdentity::derive(&root, account).unwrap();
        assert_eq!(robot.token().as_str(), token);
        assert_eq!(robot.hash_id(), hash_id);
        assert_eq!(robot.nostr().public_key_hex(), nostr_pubkey);
    }
}
