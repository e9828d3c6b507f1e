//! Excluded sets must match the per-object gate.

mod helpers;

use std::collections::BTreeSet;
use std::sync::Arc;

use helpers::*;
use uam_engine::{
    AccessLevel, Actor, DynamicUserGroup, MembershipFamily, ObjectId, ObjectRef, UserGroup,
};

fn ids(values: &[u64]) -> BTreeSet<ObjectId> {
    values.iter().copied().map(ObjectId::from).collect()
}

#[test]
fn test_anonymous_excluded_posts() {
    let engine = TestEngine::new(news_site());
    engine.save(group_with("Restricted", &[post(10), post(11)]));

    let excluded = engine.handler.excluded_posts(&Actor::anonymous());
    assert_eq!(*excluded, ids(&[10, 11]));
}

#[test]
fn test_members_and_admins_see_everything() {
    let engine = TestEngine::new(news_site());
    let mut group = group_with("Restricted", &[post(10), category(NEWS)]);
    group.add_object("_user_", 4_u64, None, None);
    engine.save(group);

    assert!(engine.handler.excluded_posts(&Actor::user(4_u64)).is_empty());
    assert!(engine.handler.excluded_terms(&Actor::user(4_u64)).is_empty());

    let admin = Actor::user(1_u64).with_role("administrator");
    assert!(engine.handler.excluded_posts(&admin).is_empty());

    let outsider = Actor::user(2_u64);
    assert_eq!(*engine.handler.excluded_posts(&outsider), ids(&[10, 11]));
    assert_eq!(*engine.handler.excluded_terms(&outsider), ids(&[NEWS, SPORTS, FOOTBALL]));
}

#[test]
fn test_authors_keep_their_own_posts() {
    let engine = TestEngine::new(news_site());
    engine.save(group_with("Staff", &[post(12)]));

    assert_eq!(*engine.handler.excluded_posts(&Actor::user(3_u64)), ids(&[13]));
    assert_eq!(*engine.handler.excluded_posts(&Actor::user(4_u64)), ids(&[12, 13]));
}

#[test]
fn test_excluded_set_is_cached_per_epoch() {
    let engine = TestEngine::new(news_site());
    engine.save(group_with("Restricted", &[post(10)]));
    let anonymous = Actor::anonymous();

    let first = engine.handler.excluded_posts(&anonymous);
    let second = engine.handler.excluded_posts(&anonymous);
    assert!(Arc::ptr_eq(&first, &second));

    engine.save(group_with("More", &[post(20)]));
    let third = engine.handler.excluded_posts(&anonymous);
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(*third, ids(&[10, 20, 21]));
}

#[test]
fn test_excluded_sets_match_check_object_access() {
    let engine = TestEngine::new(news_site());

    let mut sports = group_with("Sports", &[category(SPORTS), post(12)]);
    sports.add_object("_role_", "editor", None, None);
    engine.save(sports);

    let mut archive = group_with("Archive", &[ObjectRef::new("page", 20_u64)]);
    archive.add_object("post", 13_u64, Some(yesterday()), Some(yesterday()));
    archive.set_read_access(AccessLevel::All);
    engine.save(archive);

    let mut everything = UserGroup::new("Defaults");
    everything.add_default_type("_term_", None, None);
    everything.remove_object("category", WEATHER);
    everything.add_object("_user_", 4_u64, None, None);
    engine.save(everything);

    let mut guests = DynamicUserGroup::not_logged_in();
    guests.add_object("post", 11_u64, None, None);
    engine.save_dynamic(guests);

    let actors = [
        Actor::anonymous(),
        Actor::user(2_u64).with_role("editor"),
        Actor::user(3_u64).with_role("author"),
        Actor::user(4_u64).with_role("subscriber"),
    ];
    let ctx = engine.handler.resolve_context();

    for actor in &actors {
        for family in [MembershipFamily::Post, MembershipFamily::Term] {
            let excluded = engine.handler.excluded_objects(actor, &family);

            let mut expected = BTreeSet::new();
            for object_type in engine.handler.types().object_types_of(&family) {
                for id in ctx.all_ids_of_type(&object_type) {
                    if !engine
                        .handler
                        .check_object_access(actor, object_type.clone(), id.clone(), false)
                    {
                        expected.insert(id);
                    }
                }
            }

            assert_eq!(*excluded, expected, "{actor:?} {family}");
        }
    }
}
