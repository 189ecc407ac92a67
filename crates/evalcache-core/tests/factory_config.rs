//! Factory wiring driven by YAML configuration.

use anyhow::Result;
use evalcache_core::{
    AppId, Cache, CacheConfig, CacheError, CacheExt, CacheFactory, CacheRead, Domain, FieldTag,
    KeyGeneratorConfig, KeyQuery, LocalCache, ResponseFieldMap,
};

#[test]
fn yaml_config_builds_an_exact_cache() -> Result<()> {
    let config = CacheConfig::from_yaml_str(
        r#"
kind: Local
key_generator:
  kind: exact
"#,
    )?;
    assert_eq!(config.key_generator, KeyGeneratorConfig::Exact);

    let factory = CacheFactory::new();
    let cache = factory.create_from_config(&config)?;
    assert_eq!(cache.borrow().kind(), "Local");

    let app = AppId::new();
    let fields = ResponseFieldMap::new().with(FieldTag::Objective, 1.0);
    cache
        .borrow_mut()
        .insert(app, &Domain::real(vec![1.0]), fields.clone())?;
    cache
        .borrow_mut()
        .insert(app, &Domain::real(vec![1.0 + 1e-12]), fields)?;
    assert_eq!(cache.borrow().inspect(|r| r.size()), 2);
    assert_eq!(
        cache.borrow().inspect(|r| r.key_generator().name()),
        "Exact"
    );
    Ok(())
}

#[test]
fn epsilon_config_merges_nearby_points() -> Result<()> {
    let config = CacheConfig::from_yaml_str("key_generator:\n  kind: epsilon\n  epsilon: 1.0e-3\n")?;
    let mut cache = LocalCache::from_config(&config)?;

    let app = AppId::new();
    let fields = ResponseFieldMap::new().with(FieldTag::Objective, 1.0);
    let (first, inserted) = cache.insert(app, &Domain::real(vec![0.5]), fields.clone())?;
    assert!(inserted);
    let (second, inserted) = cache.insert(app, &Domain::real(vec![0.5005]), fields)?;
    assert!(!inserted);
    assert_eq!(first, second);

    let (hit, _) = cache.find(app, KeyQuery::Domain(&Domain::real(vec![0.4995])));
    assert_eq!(hit, first);
    Ok(())
}

#[test]
fn factory_wires_views_and_rejects_unknown_kinds() -> Result<()> {
    let factory = CacheFactory::new();
    let core = factory.create("Local", &CacheConfig::default())?;
    let view = factory.create_view("Pareto", core.clone())?;
    assert_eq!(view.borrow().kind(), "Pareto");

    let app = AppId::new();
    core.borrow_mut().insert(
        app,
        &Domain::real(vec![0.0]),
        ResponseFieldMap::new().with(FieldTag::MultiObjective, vec![1.0, 2.0]),
    )?;
    assert_eq!(view.borrow().inspect(|r| r.size()), 1);

    let err = factory
        .create("Remote", &CacheConfig::default())
        .err()
        .expect("unknown kind must not construct a cache");
    assert_eq!(
        err,
        CacheError::UnknownKind {
            kind: "Remote".into()
        }
    );
    assert!(!err.is_usage());
    assert!(matches!(
        factory.create_view("Hypervolume", core),
        Err(CacheError::UnknownKind { .. })
    ));
    Ok(())
}

#[test]
fn custom_kinds_can_be_registered() -> Result<()> {
    let mut factory = CacheFactory::new();
    factory.register_cache("Scratch", |_config| Ok(LocalCache::new().into_shared()));
    assert_eq!(factory.kinds(), vec!["Local", "Scratch", "Pareto"]);

    let cache = factory.create("Scratch", &CacheConfig::default())?;
    assert_eq!(cache.borrow().inspect(|r| r.size()), 0);
    Ok(())
}
