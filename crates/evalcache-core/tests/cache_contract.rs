//! Behavioural contract of the owning cache: counts, cursor scopes, erase
//! accounting, annotations and subscriber dispatch.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use evalcache_core::{
    AppId, Cache, CacheEntry, CacheError, CacheRead, CachedKey, Cursor, Domain, FieldTag,
    KeyQuery, LocalCache, ResponseFieldMap,
};
use serde_json::json;

fn point(x: f64) -> Domain {
    Domain::real(vec![x])
}

fn objective(v: f64) -> ResponseFieldMap {
    ResponseFieldMap::new().with(FieldTag::Objective, v)
}

fn populated() -> (LocalCache, AppId, AppId) {
    let mut cache = LocalCache::new();
    let (a, b) = (AppId::new(), AppId::new());
    for x in [1.0, 2.0, 3.0] {
        cache.insert(a, &point(x), objective(x)).unwrap();
    }
    for x in [1.5, 2.5] {
        cache.insert(b, &point(x), objective(x)).unwrap();
    }
    (cache, a, b)
}

fn real_of(cache: &LocalCache, at: &Cursor) -> Option<f64> {
    cache.entry(at).map(|e| e.domain().real[0])
}

#[test]
fn size_is_sum_of_application_sizes() {
    let (cache, a, b) = populated();
    assert_eq!(cache.size(), 5);
    assert_eq!(cache.size_app(a) + cache.size_app(b), cache.size());
    assert_eq!(cache.size_app(AppId::new()), 0);
    assert_eq!(cache.applications().len(), 2);
}

#[test]
fn reinsert_is_idempotent() {
    let (mut cache, a, _) = populated();
    let (first, _) = cache.find(a, KeyQuery::Domain(&point(2.0)));
    let (again, inserted) = cache.insert(a, &point(2.0), objective(2.0)).unwrap();
    assert!(!inserted);
    assert_eq!(again, first);
    assert_eq!(cache.size(), 5);
    assert_eq!(cache.size_app(a), 3);
}

#[test]
fn augmented_insert_adds_only_new_fields() {
    let mut cache = LocalCache::new();
    let app = AppId::new();
    let notified: Rc<RefCell<Vec<usize>>> = Rc::default();
    let sink = notified.clone();
    cache.on_update(Rc::new(
        move |_: &dyn CacheRead, _: &Cursor, added: &BTreeSet<FieldTag>| {
            sink.borrow_mut().push(added.len());
        },
    ));

    let (at, _) = cache.insert(app, &point(0.5), objective(1.0)).unwrap();
    let richer = objective(99.0)
        .with(FieldTag::Gradient, vec![1.0])
        .with(FieldTag::Hessian, vec![vec![2.0]]);
    cache.insert(app, &point(0.5), richer.clone()).unwrap();

    let fields = cache.entry(&at).and_then(|e| e.response(app)).unwrap();
    assert_eq!(fields.len(), 3);
    // Existing fields win.
    assert_eq!(
        fields.get(&FieldTag::Objective).and_then(|v| v.as_real()),
        Some(1.0)
    );
    assert_eq!(*notified.borrow(), vec![2]);

    cache.insert(app, &point(0.5), richer).unwrap();
    assert_eq!(*notified.borrow(), vec![2]);
    assert_eq!(cache.entry(&at).and_then(|e| e.response(app)).unwrap().len(), 3);
}

#[test]
fn find_hit_is_singleton_scoped() {
    let (cache, a, _) = populated();
    let (it, _) = cache.find(a, KeyQuery::Domain(&point(2.0)));
    assert_eq!(real_of(&cache, &it), Some(2.0));

    let past = cache.next(&it);
    assert_eq!(past, cache.end());
    let back = cache.prev(&past);
    assert_eq!(back, it);
    assert_eq!(cache.prev(&back), cache.end());
}

#[test]
fn find_miss_returns_reusable_key() {
    let (cache, a, _) = populated();
    let (miss, key) = cache.find(a, KeyQuery::Domain(&point(7.0)));
    assert!(miss.is_end());
    assert!(!key.is_empty());

    let (again, same_key) = cache.find(a, KeyQuery::Key(&key));
    assert!(again.is_end());
    assert_eq!(same_key, key);
}

#[test]
fn bounds_walk_the_application_order() {
    let (cache, a, b) = populated();

    let (lb, _) = cache.lower_bound(a, KeyQuery::Domain(&point(2.0)));
    assert_eq!(real_of(&cache, &lb), Some(2.0));
    let next = cache.next(&lb);
    assert_eq!(real_of(&cache, &next), Some(3.0));
    assert!(cache.next(&next).is_end());
    assert_eq!(real_of(&cache, &cache.prev(&lb)), Some(1.0));

    let (ub, _) = cache.upper_bound(a, KeyQuery::Domain(&point(2.0)));
    assert_eq!(real_of(&cache, &ub), Some(3.0));

    let (between, _) = cache.lower_bound(b, KeyQuery::Domain(&point(1.7)));
    assert_eq!(real_of(&cache, &between), Some(2.5));
    assert!(cache.upper_bound(b, KeyQuery::Domain(&point(2.5))).0.is_end());

    // Stepping back from an application-scoped end lands on its last key.
    let end = cache.next(&next);
    assert_eq!(real_of(&cache, &cache.prev(&end)), Some(3.0));
}

#[test]
fn global_iteration_is_key_ordered() {
    let (cache, a, _) = populated();
    let mut seen = Vec::new();
    let mut at = cache.begin();
    while at != cache.end() {
        seen.push(real_of(&cache, &at).unwrap());
        at = cache.next(&at);
    }
    assert_eq!(seen, vec![1.0, 1.5, 2.0, 2.5, 3.0]);
    assert_eq!(cache.iter().count(), 5);

    let per_app: Vec<f64> = cache.iter_app(a).map(|e| e.domain().real[0]).collect();
    assert_eq!(per_app, vec![1.0, 2.0, 3.0]);
    assert_eq!(real_of(&cache, &cache.begin_app(a)), Some(1.0));
}

#[test]
fn cursor_inequality_negates_equality() {
    let (cache, a, b) = populated();
    let x = cache.begin_app(a);
    let y = cache.begin_app(b);
    assert!(x != y);
    assert!(!(x == y));
    assert!(!(cache.end() != Cursor::end()));
    let (miss, _) = cache.find(a, KeyQuery::Domain(&point(42.0)));
    assert!(miss == cache.end());
}

#[test]
fn erase_accounting() {
    let (mut cache, a, b) = populated();

    assert_eq!(cache.erase(a, KeyQuery::Domain(&point(9.0))).unwrap(), 0);
    assert_eq!(cache.erase(b, KeyQuery::Domain(&point(1.5))).unwrap(), 1);
    assert_eq!(cache.size_app(b), 1);

    let expected = cache.size_app(a);
    assert_eq!(cache.erase_app(a).unwrap(), expected);
    assert_eq!(cache.size_app(a), 0);
    assert_eq!(cache.size_app(b), 1);

    assert_eq!(cache.erase_at(&Cursor::end()).unwrap(), 0);
    assert_eq!(cache.erase_key(&CachedKey::default()).unwrap(), 1);
    assert_eq!(cache.size(), 0);

    cache.clear().unwrap();
    cache.clear_app(a).unwrap();
    assert_eq!(cache.size(), 0);
}

#[test]
fn erase_by_cursor_removes_that_entry() {
    let (mut cache, a, _) = populated();
    let (it, _) = cache.find(a, KeyQuery::Domain(&point(1.0)));
    assert_eq!(cache.erase_at(&it).unwrap(), 1);
    assert!(cache.entry(&it).is_none());
    assert_eq!(cache.size(), 4);
    assert_eq!(cache.erase_at(&it).unwrap(), 0);
}

#[test]
fn annotations() {
    let (mut cache, a, _) = populated();
    let (it, _) = cache.find(a, KeyQuery::Domain(&point(3.0)));

    cache.annotate(&it, "source", json!("lhs")).unwrap();
    cache.annotate(&it, "batch", json!(4)).unwrap();
    cache.annotate(&it, "batch", json!(5)).unwrap();
    let entry = cache.entry(&it).unwrap();
    assert_eq!(entry.annotations().len(), 2);
    assert_eq!(entry.annotation("batch"), Some(&json!(5)));

    assert_eq!(cache.erase_annotation(&it, "source").unwrap(), 1);
    assert_eq!(cache.erase_annotation(&it, "source").unwrap(), 0);
    assert_eq!(cache.erase_annotations(&it).unwrap(), 1);
    assert_eq!(cache.erase_annotations(&it).unwrap(), 0);

    let err = cache.annotate(&Cursor::end(), "x", json!(1)).unwrap_err();
    assert_eq!(err.to_string(), "cannot annotate nonexistant item");
    assert!(err.is_usage());
    let err = cache.annotate(&it, "", json!(1)).unwrap_err();
    assert_eq!(err.to_string(), "cannot annotate with empty attribute");
    assert!(matches!(
        cache.erase_annotation(&Cursor::end(), "x"),
        Err(CacheError::NonexistentItem { .. })
    ));
}

#[test]
fn subscribers_run_in_order_and_see_post_mutation_state() {
    let mut cache = LocalCache::new();
    let app = AppId::new();
    let log: Rc<RefCell<Vec<String>>> = Rc::default();

    let first = log.clone();
    cache.on_insert(Rc::new(move |reader: &dyn CacheRead, at: &Cursor| {
        assert!(reader.entry(at).is_some());
        first.borrow_mut().push(format!("first:{}", reader.size()));
    }));
    let second = log.clone();
    let second_id = cache.on_insert(Rc::new(move |reader: &dyn CacheRead, _: &Cursor| {
        second.borrow_mut().push(format!("second:{}", reader.size()));
    }));
    let erased = log.clone();
    cache.on_erase(Rc::new(
        move |reader: &dyn CacheRead, _: AppId, entry: &CacheEntry| {
            erased
                .borrow_mut()
                .push(format!("erase:{}:{}", entry.domain().real[0], reader.size()));
        },
    ));
    let cleared = log.clone();
    cache.on_clear(Rc::new(move |_: &dyn CacheRead, scope: Option<AppId>| {
        cleared
            .borrow_mut()
            .push(format!("clear:{}", scope.is_some()));
    }));

    cache.insert(app, &point(1.0), objective(1.0)).unwrap();
    assert!(cache.unsubscribe(second_id));
    cache.insert(app, &point(2.0), objective(2.0)).unwrap();
    cache.erase(app, KeyQuery::Domain(&point(1.0))).unwrap();
    cache.clear_app(app).unwrap();
    cache.insert(app, &point(3.0), objective(3.0)).unwrap();
    cache.clear().unwrap();
    // Nothing left: no further notification.
    cache.clear().unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "first:1",
            "second:1",
            "first:2",
            "erase:1:1",
            "clear:true",
            "first:1",
            "clear:false",
        ]
    );
}
