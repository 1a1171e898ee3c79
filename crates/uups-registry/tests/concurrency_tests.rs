//! Concurrency tests
//!
//! Many threads against one registry. Every call must appear to run under a
//! single lock: no lost writes, no reader seeing a torn swap, exactly one
//! successful initialize.

use std::sync::Arc;
use std::thread;
use uups_registry::prelude::*;
use uups_test_utils::{fresh_registry, upgraded_registry};

#[test]
fn racing_initializers_one_winner() {
    let registry = Arc::new(fresh_registry());
    let callers: Vec<Principal> = (0..16).map(|_| Principal::new()).collect();

    let results: Vec<(Principal, Result<(), RegistryError>)> = thread::scope(|s| {
        let handles: Vec<_> = callers
            .iter()
            .map(|&caller| {
                let registry = Arc::clone(&registry);
                s.spawn(move || (caller, registry.initialize(caller)))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<Principal> = results
        .iter()
        .filter(|(_, r)| r.is_ok())
        .map(|(p, _)| *p)
        .collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(registry.owner(), Some(winners[0]));
    assert!(results
        .iter()
        .filter(|(_, r)| r.is_err())
        .all(|(_, r)| *r == Err(RegistryError::AlreadyInitialized)));
}

#[test]
fn concurrent_writes_form_one_chain() {
    let (registry, _) = upgraded_registry();
    let registry = Arc::new(registry);

    thread::scope(|s| {
        for t in 0..8u128 {
            let registry = Arc::clone(&registry);
            s.spawn(move || {
                let caller = Principal::new();
                for i in 0..200u128 {
                    registry.write(caller, t * 1_000 + i + 1).unwrap();
                }
            });
        }
    });

    let mut current = 0;
    let mut writes = 0;
    for event in registry.events() {
        if let RegistryEvent::ValueUpdated { previous, new, .. } = event {
            assert_eq!(previous, current);
            current = new;
            writes += 1;
        }
    }
    assert_eq!(writes, 8 * 200);
    assert_eq!(registry.read(), Ok(current));
    assert!(registry.event_log().verify_integrity().is_ok());
}

#[test]
fn readers_never_see_torn_swap() {
    let (registry, owner) = upgraded_registry();
    let registry = Arc::new(registry);

    thread::scope(|s| {
        let upgrader = Arc::clone(&registry);
        s.spawn(move || {
            for i in 0..500 {
                let target = if i % 2 == 0 { BOX_V1 } else { BOX_V2 };
                upgrader.upgrade_to(owner, &ImplementationId::new(target)).unwrap();
            }
        });

        for _ in 0..4 {
            let reader = Arc::clone(&registry);
            s.spawn(move || {
                for _ in 0..500 {
                    let snapshot = reader.snapshot();
                    let expected = match snapshot.implementation.as_ref().map(ImplementationId::as_str) {
                        Some(BOX_V1) => VersionTag(1),
                        Some(BOX_V2) => VersionTag(2),
                        other => panic!("unexpected implementation {other:?}"),
                    };
                    assert_eq!(snapshot.status.version(), Some(expected));
                }
            });
        }
    });
}

#[test]
fn racing_upgrades_only_owner_succeeds() {
    let (registry, owner) = upgraded_registry();
    let registry = Arc::new(registry);
    let strangers: Vec<Principal> = (0..8).map(|_| Principal::new()).collect();

    thread::scope(|s| {
        for &stranger in &strangers {
            let registry = Arc::clone(&registry);
            s.spawn(move || {
                for _ in 0..100 {
                    assert_eq!(
                        registry.upgrade_to(stranger, &ImplementationId::new(BOX_V1)),
                        Err(RegistryError::NotOwner { caller: stranger })
                    );
                }
            });
        }
        let registry = Arc::clone(&registry);
        s.spawn(move || {
            for _ in 0..100 {
                registry.upgrade_to(owner, &ImplementationId::new(BOX_V2)).unwrap();
            }
        });
    });

    let upgrades = registry
        .events()
        .into_iter()
        .filter(|e| matches!(e, RegistryEvent::Upgraded { .. }))
        .collect::<Vec<_>>();
    // One from the fixture plus the owner's hundred.
    assert_eq!(upgrades.len(), 101);
    assert!(upgrades
        .iter()
        .all(|e| matches!(e, RegistryEvent::Upgraded { caller, .. } if *caller == owner)));
}
