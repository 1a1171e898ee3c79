//! Registry behaviour tests
//!
//! Covers the swap protocol end to end: exactly-once initialization,
//! owner-gated upgrades, capability-gated writes and state that survives
//! every swap.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use uups_registry::prelude::*;
use uups_test_utils::{
    fresh_registry, initialized_registry, layout_registry, upgraded_registry, ExtendedLayoutBox,
    NarrowLayoutBox, RetypedLayoutBox,
};

fn box_v2() -> ImplementationId {
    ImplementationId::new(BOX_V2)
}

fn box_v1() -> ImplementationId {
    ImplementationId::new(BOX_V1)
}

#[test]
fn read_after_initialize_is_zero() {
    let (registry, _) = initialized_registry();
    assert_eq!(registry.read(), Ok(0));
}

#[test]
fn second_initialize_fails_for_everyone() {
    let (registry, owner) = initialized_registry();

    assert_eq!(registry.initialize(owner), Err(RegistryError::AlreadyInitialized));
    assert_eq!(
        registry.initialize(Principal::new()),
        Err(RegistryError::AlreadyInitialized)
    );
    assert_eq!(registry.owner(), Some(owner));
    assert_eq!(registry.events().len(), 1);
}

#[test]
fn non_owner_upgrade_changes_nothing() {
    let (registry, owner) = upgraded_registry();
    registry.write(owner, 17).unwrap();
    let before = registry.snapshot();
    let events_before = registry.events().len();

    let stranger = Principal::new();
    assert_eq!(
        registry.upgrade_to(stranger, &box_v1()),
        Err(RegistryError::NotOwner { caller: stranger })
    );
    assert_eq!(
        registry.upgrade(stranger, Arc::new(BoxV1)),
        Err(RegistryError::NotOwner { caller: stranger })
    );

    assert_eq!(registry.snapshot(), before);
    assert_eq!(registry.events().len(), events_before);
}

#[test]
fn write_on_v1_fails_and_keeps_value() {
    let (registry, owner) = initialized_registry();

    let err = registry.write(owner, 5).unwrap_err();
    assert_eq!(
        err,
        RegistryError::UnsupportedOperation {
            operation: "write",
            version: VersionTag(1)
        }
    );
    assert_eq!(registry.read(), Ok(0));
    // No ValueUpdated for the rejected write
    assert_eq!(registry.events(), vec![RegistryEvent::Initialized { owner }]);
}

#[test]
fn write_after_downgrade_fails_and_keeps_value() {
    let (registry, owner) = upgraded_registry();
    registry.write(owner, 9).unwrap();
    registry.upgrade_to(owner, &box_v1()).unwrap();

    assert!(registry.write(owner, 10).is_err());
    assert_eq!(registry.read(), Ok(9));
    assert_eq!(registry.version_tag(), Ok(VersionTag(1)));
}

#[test]
fn write_then_read_boundaries() {
    let (registry, owner) = upgraded_registry();

    registry.write(owner, StoredValue::MAX).unwrap();
    assert_eq!(registry.read(), Ok(StoredValue::MAX));

    registry.write(owner, 0).unwrap();
    assert_eq!(registry.read(), Ok(0));
}

#[test]
fn version_tag_tracks_active_component() {
    let (registry, owner) = initialized_registry();
    assert_eq!(registry.version_tag(), Ok(VersionTag(1)));

    registry.upgrade_to(owner, &box_v2()).unwrap();
    assert_eq!(registry.version_tag(), Ok(VersionTag(2)));

    registry.upgrade_to(owner, &box_v1()).unwrap();
    assert_eq!(registry.version_tag(), Ok(VersionTag(1)));
}

#[test]
fn value_survives_swaps() {
    let (registry, owner) = upgraded_registry();
    registry.write(owner, 1234).unwrap();

    registry.upgrade_to(owner, &box_v1()).unwrap();
    assert_eq!(registry.read(), Ok(1234));

    registry.upgrade_to(owner, &box_v2()).unwrap();
    assert_eq!(registry.read(), Ok(1234));
}

#[test]
fn any_caller_may_write_on_v2() {
    let (registry, _) = upgraded_registry();
    let stranger = Principal::new();

    registry.write(stranger, 8).unwrap();
    assert_eq!(registry.read(), Ok(8));
    assert_eq!(
        registry.events().last(),
        Some(&RegistryEvent::ValueUpdated {
            previous: 0,
            new: 8,
            caller: stranger
        })
    );
}

#[test]
fn events_are_ordered_with_parameters() {
    let registry = fresh_registry();
    let owner = Principal::new();
    let writer = Principal::new();

    registry.initialize(owner).unwrap();
    registry.upgrade_to(owner, &box_v2()).unwrap();
    registry.write(writer, 3).unwrap();
    registry.write(writer, 4).unwrap();

    assert_eq!(
        registry.events(),
        vec![
            RegistryEvent::Initialized { owner },
            RegistryEvent::Upgraded {
                previous_version: VersionTag(1),
                new_version: VersionTag(2),
                implementation: box_v2(),
                caller: owner,
            },
            RegistryEvent::ValueUpdated {
                previous: 0,
                new: 3,
                caller: writer
            },
            RegistryEvent::ValueUpdated {
                previous: 3,
                new: 4,
                caller: writer
            },
        ]
    );
    assert!(registry.event_log().verify_integrity().is_ok());
}

#[test]
fn layout_checks_on_upgrade() {
    let (registry, owner) = layout_registry();
    registry.write(owner, 77).unwrap();

    let err = registry.upgrade(owner, Arc::new(NarrowLayoutBox)).unwrap_err();
    match err {
        RegistryError::IncompatibleLayout {
            implementation,
            expected,
            found,
        } => {
            assert_eq!(implementation.as_str(), "box-narrow");
            assert_eq!(expected, PersistentState::layout().fingerprint());
            assert_ne!(expected, found);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(registry.version_tag(), Ok(VersionTag(2)));

    assert_eq!(registry.upgrade(owner, Arc::new(ExtendedLayoutBox)), Ok(VersionTag(3)));
    assert_eq!(registry.read(), Ok(77));
}

#[test]
fn appended_slot_cannot_be_retyped_later() {
    let (registry, owner) = layout_registry();
    registry.write(owner, 5).unwrap();
    assert_eq!(registry.upgrade(owner, Arc::new(ExtendedLayoutBox)), Ok(VersionTag(3)));
    let events_before = registry.events().len();

    let err = registry.upgrade(owner, Arc::new(RetypedLayoutBox)).unwrap_err();
    match err {
        RegistryError::IncompatibleLayout {
            implementation,
            expected,
            found,
        } => {
            assert_eq!(implementation.as_str(), "box-v4");
            assert_eq!(expected, ExtendedLayoutBox.storage_layout().fingerprint());
            assert_eq!(found, RetypedLayoutBox.storage_layout().fingerprint());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(registry.version_tag(), Ok(VersionTag(3)));
    assert_eq!(registry.read(), Ok(5));
    assert_eq!(registry.events().len(), events_before);

    // Dropping the appended slot is refused as well.
    assert!(matches!(
        registry.upgrade_to(owner, &box_v2()),
        Err(RegistryError::IncompatibleLayout { .. })
    ));
}

#[test]
fn retyped_slot_accepted_straight_from_base_layout() {
    let (registry, owner) = layout_registry();
    assert_eq!(registry.upgrade(owner, Arc::new(RetypedLayoutBox)), Ok(VersionTag(4)));
}

#[test]
fn unpublished_component_cannot_be_bound() {
    let (registry, owner) = upgraded_registry();

    assert_eq!(
        registry.upgrade(owner, Arc::new(ExtendedLayoutBox)),
        Err(RegistryError::IllegalTransition {
            from: RegistryStatus::Active { version: VersionTag(2) },
            to: RegistryStatus::Active { version: VersionTag(3) },
        })
    );
    assert_eq!(registry.implementation(), Some(box_v2()));
}

#[test]
fn initialize_always_starts_at_first_version() {
    let config = uups_test_utils::quiet_config().with_initial_implementation(BOX_V2);
    let book = DeploymentBook::with_config(config, uups_test_utils::default_catalog());

    assert_eq!(
        book.deploy(Principal::new()).unwrap_err(),
        RegistryError::IllegalTransition {
            from: RegistryStatus::Uninitialized,
            to: RegistryStatus::Active { version: VersionTag(2) },
        }
    );
    assert!(book.is_empty());
    assert!(book.event_log().is_empty());
}

#[test]
fn ownership_transfer_moves_upgrade_right() {
    let (registry, a) = initialized_registry();
    let b = Principal::new();

    assert_eq!(
        registry.transfer_ownership(b, b),
        Err(RegistryError::NotOwner { caller: b })
    );
    assert_eq!(
        registry.transfer_ownership(a, Principal::nil()),
        Err(RegistryError::InvalidOwner(Principal::nil()))
    );
    assert_eq!(registry.owner(), Some(a));

    registry.transfer_ownership(a, b).unwrap();
    assert_eq!(
        registry.upgrade_to(a, &box_v2()),
        Err(RegistryError::NotOwner { caller: a })
    );
    assert_eq!(registry.upgrade_to(b, &box_v2()), Ok(VersionTag(2)));
}

#[test]
fn custom_catalog_component_can_be_selected() {
    let mut catalog = ComponentCatalog::with_defaults();
    catalog.register(Arc::new(ExtendedLayoutBox)).unwrap();
    let registry = ComponentRegistry::with_config(
        uups_test_utils::quiet_config(),
        Arc::new(catalog),
    );
    let owner = Principal::new();
    registry.initialize(owner).unwrap();

    assert_eq!(
        registry.upgrade_to(owner, &ImplementationId::new("box-v3")),
        Ok(VersionTag(3))
    );
    assert_eq!(registry.status(), RegistryStatus::Active { version: VersionTag(3) });
}

/// deploy → initialize by A → v1, 0 → A upgrades → v2 → set 42 → 42 →
/// B upgrade fails → still v2 holding 42.
#[test]
fn end_to_end_through_deployment_book() {
    let book = DeploymentBook::with_config(uups_test_utils::quiet_config(), uups_test_utils::default_catalog());
    let a = Principal::new();
    let b = Principal::new();

    let registry = book.deploy(a).unwrap();
    assert_eq!(registry.get_version(), Ok(VersionTag(1)));
    assert_eq!(registry.get_value(), Ok(0));

    assert_eq!(book.upgrade_most_recent(a, &box_v2()), Ok(VersionTag(2)));
    assert_eq!(registry.get_version(), Ok(VersionTag(2)));

    registry.set_value(b, 42).unwrap();
    assert_eq!(registry.get_value(), Ok(42));

    assert_eq!(
        book.upgrade_most_recent(b, &box_v2()),
        Err(RegistryError::NotOwner { caller: b })
    );
    assert_eq!(registry.status(), RegistryStatus::Active { version: VersionTag(2) });
    assert_eq!(registry.get_value(), Ok(42));
}
