//! Write path: coercion, persistence, dedupe, and change side effects.

use std::cell::RefCell;
use std::rc::Rc;

use conf::{ids, ConfService, EnvOverrides};
use errors::ConfError;
use fc_core::{RawValue, SettingId, SettingScope, SettingValue};
use testing::{MemStore, PurgeEvent, RecordingCloud, RecordingCrawler, RecordingPurge,
    ScriptedUpgrades};

struct Rig {
    store: MemStore,
    purge: RecordingPurge,
    cloud: RecordingCloud,
    crawler: RecordingCrawler,
    svc: ConfService,
}

fn rig(env: EnvOverrides) -> Rig {
    let store = MemStore::new();
    let purge = RecordingPurge::new();
    let cloud = RecordingCloud::new();
    let crawler = RecordingCrawler::new();
    let mut svc = ConfService::new(
        Box::new(store.clone()),
        Box::new(purge.clone()),
        Box::new(cloud.clone()),
        Box::new(crawler.clone()),
        Box::new(ScriptedUpgrades::new()),
        env,
    );
    svc.init();
    Rig {
        store,
        purge,
        cloud,
        crawler,
        svc,
    }
}

fn admin_rig() -> Rig {
    rig(EnvOverrides {
        admin_or_cli: true,
        ..EnvOverrides::default()
    })
}

fn id(s: &str) -> SettingId {
    SettingId::from(s)
}

#[test]
fn bool_coercion_from_form_literals() {
    let mut r = admin_rig();

    r.svc.update(&id(ids::CACHE_MOBILE), RawValue::from("false")).unwrap();
    assert_eq!(
        r.svc.val(&id(ids::CACHE_MOBILE)),
        Some(SettingValue::Bool(false))
    );
    // already false: no change, no purge
    assert!(r.purge.take().is_empty());

    r.svc.update(&id(ids::CACHE_MOBILE), RawValue::from("1")).unwrap();
    assert_eq!(
        r.svc.val(&id(ids::CACHE_MOBILE)),
        Some(SettingValue::Bool(true))
    );
    assert_eq!(
        r.purge.take(),
        vec![PurgeEvent::All("conf changed [id] cache.mobile".to_string())]
    );
}

#[test]
fn multi_switch_wraps_modulo_cardinality() {
    let mut r = admin_rig();

    r.svc.update(&id(ids::CACHE), RawValue::Int(4)).unwrap();
    // 0..=2 states: 4 wraps to 1
    assert_eq!(r.svc.val(&id(ids::CACHE)), Some(SettingValue::Int(1)));
    assert!(r.svc.is_on(&id(ids::CACHE)));
    assert_eq!(
        r.purge.take(),
        vec![PurgeEvent::All("conf changed [id] cache".to_string())]
    );

    // truthy non-numeric input lands on plain on
    r.svc.update(&id(ids::CACHE), RawValue::from("yes")).unwrap();
    assert_eq!(r.svc.val(&id(ids::CACHE)), Some(SettingValue::Int(1)));
}

#[test]
fn masked_secret_update_is_a_noop() {
    let mut r = admin_rig();
    r.svc
        .update(&id(ids::CLOUD_API_KEY), RawValue::from("k-123456"))
        .unwrap();
    assert_eq!(r.cloud.cleared(), 1);

    r.svc
        .update(&id(ids::CLOUD_API_KEY), RawValue::from("********"))
        .unwrap();
    assert_eq!(
        r.store.stored(SettingScope::Global, ids::CLOUD_API_KEY),
        Some(SettingValue::Str("k-123456".to_string()))
    );
    assert_eq!(r.cloud.cleared(), 1);

    // a mix of asterisks and content is a real value
    r.svc
        .update(&id(ids::CLOUD_API_KEY), RawValue::from("**x**"))
        .unwrap();
    assert_eq!(
        r.store.stored(SettingScope::Global, ids::CLOUD_API_KEY),
        Some(SettingValue::Str("**x**".to_string()))
    );
    assert_eq!(r.cloud.cleared(), 2);
}

#[test]
fn mask_guard_only_applies_to_secret_entries() {
    let mut r = admin_rig();
    r.svc
        .update(&id(ids::SERVER_IP), RawValue::from("***"))
        .unwrap();
    assert_eq!(
        r.svc.val(&id(ids::SERVER_IP)),
        Some(SettingValue::Str("***".to_string()))
    );
}

#[test]
fn drop_domain_change_resets_crawler_map() {
    let mut r = admin_rig();
    r.svc
        .update(&id(ids::CRAWLER_DROP_DOMAIN), RawValue::from(true))
        .unwrap();
    assert_eq!(r.crawler.resets(), 1);

    // unchanged value: no reset
    r.svc
        .update(&id(ids::CRAWLER_DROP_DOMAIN), RawValue::from(true))
        .unwrap();
    assert_eq!(r.crawler.resets(), 1);
}

#[test]
fn uri_list_change_purges_the_symmetric_difference() {
    let mut r = admin_rig();

    r.svc
        .update(&id(ids::CACHE_FORCE_URI), RawValue::from("^/a$\n/b"))
        .unwrap();
    // anchors are stored but trimmed off before purging
    assert_eq!(
        r.purge.take(),
        vec![
            PurgeEvent::Url("/a".to_string()),
            PurgeEvent::Url("/b".to_string()),
        ]
    );

    r.svc
        .update(&id(ids::CACHE_FORCE_URI), RawValue::from("/b\n/c"))
        .unwrap();
    let events = r.purge.take();
    assert_eq!(events.len(), 2);
    assert!(events.contains(&PurgeEvent::Url("/c".to_string())));
    assert!(events.contains(&PurgeEvent::Url("/a".to_string())));
    assert!(!events.contains(&PurgeEvent::Url("/b".to_string())));
}

#[test]
fn uri_filter_strips_scheme_and_host() {
    let mut r = admin_rig();
    r.svc
        .update(
            &id(ids::CACHE_FORCE_URI),
            RawValue::from("https://shop.example.com/checkout\n /cart \n/cart"),
        )
        .unwrap();
    assert_eq!(
        r.svc.val(&id(ids::CACHE_FORCE_URI)),
        Some(SettingValue::List(vec![
            "/checkout".to_string(),
            "/cart".to_string(),
        ]))
    );
}

#[test]
fn unknown_id_is_rejected() {
    let mut r = admin_rig();
    let err = r.svc.update(&id("no.such"), RawValue::Int(1)).unwrap_err();
    assert!(matches!(err, ConfError::UnknownSettingId { .. }));
    assert_eq!(r.store.stored(SettingScope::Global, "no.such"), None);
}

#[test]
fn reserved_version_key_is_rejected() {
    let mut r = admin_rig();
    let err = r.svc.update(&id(ids::VER), RawValue::from("9.9")).unwrap_err();
    assert!(matches!(err, ConfError::ReservedSettingId { .. }));
    assert_eq!(
        r.store.stored(SettingScope::Global, ids::VER),
        Some(SettingValue::Str(conf::CORE_VER.to_string()))
    );
}

#[test]
fn overlong_string_is_rejected_keeping_old_value() {
    let mut r = admin_rig();
    let long = "1".repeat(46);
    let err = r
        .svc
        .update(&id(ids::SERVER_IP), RawValue::from(long.as_str()))
        .unwrap_err();
    assert!(matches!(err, ConfError::ValidationRejected { .. }));
    assert_eq!(
        r.svc.val(&id(ids::SERVER_IP)),
        Some(SettingValue::Str(String::new()))
    );
}

#[test]
fn string_values_are_trimmed() {
    let mut r = admin_rig();
    r.svc
        .update(&id(ids::SERVER_IP), RawValue::from("  10.0.0.1  "))
        .unwrap();
    assert_eq!(
        r.svc.val(&id(ids::SERVER_IP)),
        Some(SettingValue::Str("10.0.0.1".to_string()))
    );
}

#[test]
fn failed_persistence_drops_the_write() {
    let mut r = admin_rig();
    r.store.fail_writes(true);

    assert!(r.svc.update(&id(ids::TTL_PUB), RawValue::Int(123)).is_ok());
    assert_eq!(r.svc.val(&id(ids::TTL_PUB)), Some(SettingValue::Int(604_800)));
    assert!(r.purge.take().is_empty());

    r.store.fail_writes(false);
    r.svc.update(&id(ids::TTL_PUB), RawValue::Int(123)).unwrap();
    assert_eq!(r.svc.val(&id(ids::TTL_PUB)), Some(SettingValue::Int(123)));
}

#[test]
fn deduped_write_still_refreshes_memory() {
    let mut r = admin_rig();
    // process-local override diverges memory from storage
    r.svc.force_option(&id(ids::TTL_PUB), SettingValue::Int(42));
    assert_eq!(r.svc.val(&id(ids::TTL_PUB)), Some(SettingValue::Int(42)));

    // storage already holds 604800, so the write dedupes, but memory
    // converges back to the written value
    r.svc
        .update(&id(ids::TTL_PUB), RawValue::Int(604_800))
        .unwrap();
    assert_eq!(r.svc.val(&id(ids::TTL_PUB)), Some(SettingValue::Int(604_800)));
}

#[test]
fn batch_reports_per_id_and_notifies_callbacks() {
    let mut r = admin_rig();
    let seen: Rc<RefCell<Vec<SettingId>>> = Rc::default();
    let sink = Rc::clone(&seen);
    r.svc.on_after_update(Box::new(move |pairs| {
        sink.borrow_mut()
            .extend(pairs.iter().map(|(id, _)| id.clone()));
    }));

    let outcome = r.svc.update_confs(vec![
        (id(ids::TTL_PUB), RawValue::Int(3600)),
        (id("no.such"), RawValue::Int(1)),
        (id(ids::CACHE_MOBILE), RawValue::from("1")),
    ]);

    assert!(!outcome.ok());
    assert_eq!(
        outcome.applied,
        vec![id(ids::TTL_PUB), id(ids::CACHE_MOBILE)]
    );
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].0, id("no.such"));

    assert_eq!(
        seen.borrow().as_slice(),
        &[id(ids::TTL_PUB), id(ids::CACHE_MOBILE)]
    );
}

#[test]
fn network_update_purges_and_mirrors_locally() {
    let mut r = rig(EnvOverrides {
        admin_or_cli: true,
        network_mode: true,
        network_activated: true,
        ..EnvOverrides::default()
    });
    r.purge.take();

    r.svc
        .network_update(&id(ids::CACHE), RawValue::from(false))
        .unwrap();
    assert_eq!(
        r.store.stored(SettingScope::Network, ids::CACHE),
        Some(SettingValue::Bool(false))
    );
    assert_eq!(
        r.purge.take(),
        vec![PurgeEvent::All(
            "network conf changed [id] cache".to_string()
        )]
    );
    // the local effective set tracks this id, so the write is mirrored
    assert_eq!(r.svc.val(&id(ids::CACHE)), Some(SettingValue::Bool(false)));

    // same value again: deduped, no purge
    r.svc
        .network_update(&id(ids::CACHE), RawValue::from(false))
        .unwrap();
    assert!(r.purge.take().is_empty());
}

#[test]
fn network_update_rejects_non_network_ids() {
    let mut r = rig(EnvOverrides {
        admin_or_cli: true,
        network_mode: true,
        network_activated: true,
        ..EnvOverrides::default()
    });

    let err = r
        .svc
        .network_update(&id(ids::CLOUD_API_KEY), RawValue::from("k"))
        .unwrap_err();
    assert!(matches!(err, ConfError::UnknownSettingId { .. }));

    let err = r
        .svc
        .network_update(&id(ids::VER), RawValue::from("9.9"))
        .unwrap_err();
    assert!(matches!(err, ConfError::ReservedSettingId { .. }));
}

#[test]
fn list_settings_accept_preparsed_lists() {
    let mut r = admin_rig();
    r.svc
        .update(
            &id(ids::OPTM_EXC_ROLES),
            RawValue::from(vec!["editor".to_string(), " author ".to_string()]),
        )
        .unwrap();
    assert_eq!(
        r.svc.val(&id(ids::OPTM_EXC_ROLES)),
        Some(SettingValue::List(vec![
            "editor".to_string(),
            "author".to_string(),
        ]))
    );
}
