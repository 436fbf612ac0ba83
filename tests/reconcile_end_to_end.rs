//! End-to-end reconciliation against in-memory backends

mod common;

use common::{config_with_aliases, route, TestEngine};
use edgeplane::domain::{
    Behavior, Certificate, EventKind, EventTarget, FinalizerState, GroupName, PathSpec,
    RecordSet, RecordType,
};
use edgeplane::storage::{DnsRecordRepository, InMemoryCertificateRepository, StatusRepository};
use edgeplane::{EdgeplaneError, EngineConfig};

fn public() -> GroupName {
    GroupName::new("public")
}

#[tokio::test]
async fn single_descriptor_converges_to_one_origin() {
    let engine = TestEngine::new(EngineConfig::default(), vec![]);
    engine.apply(&route("web", "public", "h")).await.unwrap();

    let model = engine.distributions.get(&public()).await.unwrap();
    assert_eq!(model.origins.len(), 1);
    assert_eq!(model.origins[0].host, "h");
    assert_eq!(model.origins[0].behaviors, vec![Behavior::new("/*", "h")]);

    let status = engine.statuses.get(&public()).await.unwrap().unwrap();
    assert_eq!(status.distribution_id, model.identity.as_ref().map(|i| i.id.clone()));
}

#[tokio::test]
async fn removing_last_descriptor_removes_distribution_and_status() {
    let engine = TestEngine::new(EngineConfig::default(), vec![]);
    let web = route("web", "public", "h");
    engine.apply(&web).await.unwrap();

    let removed = web.with_finalizer(FinalizerState::Managed).removed();
    engine.apply(&removed).await.unwrap();

    assert!(engine.distributions.get(&public()).await.is_none());
    assert!(engine.statuses.get(&public()).await.unwrap().is_none());
    let stored = engine.descriptors.get(&removed.reference).await.unwrap();
    assert_eq!(stored.finalizer, FinalizerState::Released);
}

#[tokio::test]
async fn removing_one_of_two_descriptors_keeps_the_distribution() {
    let engine = TestEngine::new(EngineConfig::default(), vec![]);
    let web = route("web", "public", "web.example.net");
    let mut api = route("api", "public", "api.example.net");
    api.paths = vec![PathSpec::prefix("/api")];

    engine.apply(&web).await.unwrap();
    engine.apply(&api).await.unwrap();
    let model = engine.distributions.get(&public()).await.unwrap();
    assert_eq!(model.origins.len(), 2);

    engine.apply(&api.clone().removed()).await.unwrap();

    let model = engine.distributions.get(&public()).await.unwrap();
    assert_eq!(model.origins.len(), 1);
    assert_eq!(model.origins[0].host, "web.example.net");

    let status = engine.statuses.get(&public()).await.unwrap().unwrap();
    assert_eq!(status.is_synced(&web.reference), Some(true));
    assert_eq!(status.is_synced(&api.reference), None);
}

#[tokio::test]
async fn deletion_disabled_never_calls_delete() {
    let config = EngineConfig { deletion_enabled: false, ..EngineConfig::default() };
    let engine = TestEngine::new(config, vec![]);
    let web = route("web", "public", "h");
    engine.apply(&web).await.unwrap();
    engine.apply(&web.removed()).await.unwrap();

    let calls = engine.distributions.calls().await;
    assert!(calls.iter().all(|call| !call.starts_with("delete")), "calls: {:?}", calls);
    assert!(engine.distributions.get(&public()).await.is_some());
    assert!(engine.statuses.get(&public()).await.unwrap().is_some());
}

#[tokio::test]
async fn web_acl_conflict_is_fatal_before_backends() {
    let engine = TestEngine::new(EngineConfig::default(), vec![]);
    let a = route("a", "public", "a.example.net").with_web_acl("acl-1");
    let mut b = route("b", "public", "b.example.net").with_web_acl("acl-2");
    b.paths = vec![PathSpec::prefix("/b")];

    engine.apply(&a).await.unwrap();
    let err = engine.apply(&b).await.unwrap_err();

    assert!(matches!(err, EdgeplaneError::Conflict { .. }));
    assert!(err.to_string().contains("acl-1, acl-2"));
    assert_eq!(engine.distributions.calls().await, vec!["create:public".to_string()]);

    let warnings: Vec<_> = engine
        .events
        .events()
        .await
        .into_iter()
        .filter(|event| event.kind == EventKind::Warning)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().any(|e| matches!(e.target, EventTarget::Status(_))));
    assert!(warnings.iter().all(|e| e.reason == "Conflict"));
}

#[tokio::test]
async fn dns_failure_still_records_distribution_success() {
    let engine = TestEngine::new(config_with_aliases(), vec![]);
    engine.dns.fail_on("www.example.com").await;
    let web = route("web", "public", "h").with_alternate_domain("www.example.com");

    let err = engine.apply(&web).await.unwrap_err();
    assert!(matches!(err, EdgeplaneError::Backend { .. }));

    let status = engine.statuses.get(&public()).await.unwrap().unwrap();
    assert!(status.distribution_id.is_some());
    assert!(status.address.is_some());
    assert!(status.aliases.is_empty());
    assert_eq!(status.is_synced(&web.reference), Some(false));
    assert_eq!(
        engine.descriptors.get(&web.reference).await.unwrap().finalizer,
        FinalizerState::Managed
    );
}

#[tokio::test]
async fn unmanaged_dns_record_is_left_alone() {
    let engine = TestEngine::new(config_with_aliases(), vec![]);
    engine
        .dns
        .insert(RecordSet::alias("www.example.com", RecordType::A, "legacy.example.net"))
        .await;
    let web = route("web", "public", "h")
        .with_alternate_domain("www.example.com")
        .with_alternate_domain("cdn.example.com");

    let err = engine.apply(&web).await.unwrap_err();
    assert!(matches!(err, EdgeplaneError::Conflict { .. }));

    let legacy = engine.dns.record("www.example.com", RecordType::A).await.unwrap();
    assert_eq!(legacy.alias_target.as_deref(), Some("legacy.example.net"));
    assert!(engine.dns.record("www.example.com", RecordType::Txt).await.is_none());

    let status = engine.statuses.get(&public()).await.unwrap().unwrap();
    assert_eq!(status.aliases.iter().collect::<Vec<_>>(), vec!["cdn.example.com"]);
}

#[tokio::test]
async fn aliases_follow_alternate_domains() {
    let engine = TestEngine::new(config_with_aliases(), vec![]);
    let web = route("web", "public", "h").with_alternate_domain("www.example.com");
    engine.apply(&web).await.unwrap();

    let address = engine.statuses.get(&public()).await.unwrap().unwrap().address.unwrap();
    let a = engine.dns.record("www.example.com", RecordType::A).await.unwrap();
    assert_eq!(a.alias_target.as_deref(), Some(address.as_str()));
    assert!(engine.dns.record("www.example.com", RecordType::Aaaa).await.is_some());

    let mut renamed = web;
    renamed.alternate_domains = vec!["shop.example.com".to_string()];
    engine.apply(&renamed).await.unwrap();

    assert!(engine.dns.list_record_sets("www.example.com").await.unwrap().is_empty());
    assert!(engine.dns.record("shop.example.com", RecordType::A).await.is_some());
    let status = engine.statuses.get(&public()).await.unwrap().unwrap();
    assert_eq!(status.aliases.iter().collect::<Vec<_>>(), vec!["shop.example.com"]);
}

#[tokio::test]
async fn creation_guard_touches_no_backend() {
    let config = EngineConfig { creation_enabled: false, ..EngineConfig::default() };
    let engine = TestEngine::new(config, vec![]);

    let err = engine.apply(&route("web", "public", "h")).await.unwrap_err();

    assert!(matches!(err, EdgeplaneError::Validation { .. }));
    assert!(engine.distributions.calls().await.is_empty());
    assert!(engine.statuses.all().await.is_empty());
    let events = engine.events.events().await;
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0].target, EventTarget::Descriptor(_)));
}

#[tokio::test]
async fn lost_status_is_recovered_from_distribution_lookup() {
    let engine = TestEngine::new(EngineConfig::default(), vec![]);
    let web = route("web", "public", "h");
    engine.apply(&web).await.unwrap();
    engine.statuses.delete(&public()).await.unwrap();

    engine.apply(&web).await.unwrap();

    assert_eq!(
        engine.distributions.calls().await,
        vec!["create:public".to_string(), "update:public".to_string()]
    );
    assert!(engine.statuses.get(&public()).await.unwrap().unwrap().distribution_id.is_some());
}

#[tokio::test]
async fn tls_without_matching_certificate_fails_build() {
    let mut config = EngineConfig::default();
    config.tls.enabled = true;
    let engine = TestEngine::with_certificates(
        config,
        vec![],
        InMemoryCertificateRepository::new(vec![Certificate::issued("arn:c", "other.example.org")]),
    );

    let err = engine
        .apply(&route("web", "public", "h").with_alternate_domain("www.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, EdgeplaneError::Build { .. }));
    assert!(engine.distributions.calls().await.is_empty());
}

#[tokio::test]
async fn distinct_groups_reconcile_concurrently() {
    let engine = TestEngine::new(EngineConfig::default(), vec![]);
    let a = route("a", "alpha", "a.example.net");
    let b = route("b", "beta", "b.example.net");
    engine.descriptors.put(a.clone()).await;
    engine.descriptors.put(b.clone()).await;

    let (ra, rb) = tokio::join!(engine.reconciler.reconcile(&a), engine.reconciler.reconcile(&b));
    ra.unwrap();
    rb.unwrap();

    let statuses = engine.statuses.all().await;
    assert_eq!(statuses.len(), 2);
    assert!(engine.distributions.get(&GroupName::new("alpha")).await.is_some());
    assert!(engine.distributions.get(&GroupName::new("beta")).await.is_some());
}

#[tokio::test]
async fn reconcile_is_idempotent() {
    let engine = TestEngine::new(config_with_aliases(), vec![]);
    let web = route("web", "public", "h").with_alternate_domain("www.example.com");
    engine.apply(&web).await.unwrap();
    let first = engine.distributions.get(&public()).await.unwrap();

    engine.apply(&web).await.unwrap();
    let second = engine.distributions.get(&public()).await.unwrap();

    assert_eq!(first, second);
    let txt = engine.dns.record("www.example.com", RecordType::Txt).await.unwrap();
    assert_eq!(txt.values.len(), 1);
}
