//! Integration tests for relation resolution, lazy collections and cascading deletes.

mod common;

use docguard::{EntityType, OrmError, RelatedSequence};
use serde_json::json;

#[test]
fn test_owning_reference_dereference() {
    let (mapper, _) = common::setup();
    let family = common::saved_family(&mapper);
    let mut person = mapper.create("Person").expect("create");
    person.set_attribute("name", "Jo").expect("name");

    assert!(mapper.dereference(&person, "family").expect("unset").is_none());

    person.set_reference("family", &family).expect("by entity");
    mapper.save(&mut person).expect("save");
    let resolved = mapper.dereference(&person, "family").expect("deref").expect("family");
    assert_eq!(resolved, family);

    person.set_reference("family", family.id().to_string()).expect("by id");
    assert_eq!(mapper.dereference(&person, "family").expect("deref"), Some(family.clone()));

    person.set_reference("family", "dangling").expect("dangling id");
    assert!(mapper.dereference(&person, "family").expect("deref").is_none());

    assert!(matches!(
        mapper.dereference(&person, "name"),
        Err(OrmError::UnknownField { .. })
    ));
}

#[test]
fn test_has_many_inverse() {
    let (mapper, _) = common::setup();
    let alice = common::saved_person(&mapper);
    let bob = common::saved_person(&mapper);
    let loner = common::saved_person(&mapper);
    let acme = common::saved_organization(&mapper, &[&alice, &bob]);
    let globex = common::saved_organization(&mapper, &[&alice]);

    let mut orgs = mapper.has_many(&alice, "orgs").expect("has_many");
    orgs.sort_by(|a, b| a.id().cmp(b.id()));
    let mut expected = vec![acme.clone(), globex];
    expected.sort_by(|a, b| a.id().cmp(b.id()));
    assert_eq!(orgs, expected);

    assert_eq!(mapper.has_many(&bob, "orgs").expect("has_many"), vec![acme]);
    assert!(mapper.has_many(&loner, "orgs").expect("has_many").is_empty());

    assert!(matches!(
        mapper.has_many(&alice, "family"),
        Err(OrmError::UnknownField { .. })
    ));
}

#[test]
fn test_has_one_inverse() {
    let (mapper, _) = common::setup();
    let family = common::saved_family(&mapper);
    let mut person = mapper.create("Person").expect("create");
    person.set_attribute("name", "Kim").expect("name");
    person.set_reference("family", &family).expect("family");
    mapper.save(&mut person).expect("save");
    common::saved_person(&mapper);

    let members = mapper.has_one(&family, "members").expect("has_one");
    assert_eq!(members, vec![person]);
}

#[test]
fn test_inverse_with_bad_remote_field() {
    let (mapper, _) = common::setup();
    mapper
        .register(
            EntityType::builder("Club")
                .attribute("name")
                .has_many("members", "Person", "clubs")
                .build()
                .expect("club"),
        )
        .expect("register");
    mapper.ensure_table("Club").expect("table");

    let mut club = mapper.create("Club").expect("create");
    club.set_attribute("name", "Chess").expect("name");
    mapper.save(&mut club).expect("save");

    assert!(matches!(
        mapper.has_many(&club, "members"),
        Err(OrmError::InvalidRelationDescriptor(_))
    ));
    assert!(mapper.registry().validate().is_err());
}

#[test]
fn test_lazy_collection_preserves_order() {
    let (mapper, _) = common::setup();
    let people: Vec<_> = (0..5).map(|_| common::saved_person(&mapper)).collect();
    let refs: Vec<_> = people.iter().collect();
    let org = common::saved_organization(&mapper, &refs);

    let loaded = mapper.get("Organization", org.id()).expect("get").expect("present");
    let persons = loaded.collection("persons").expect("persons");
    assert_eq!(persons.remote_type(), "Person");
    assert_eq!(persons.len(), people.len());

    let ids: Vec<&str> = persons.ids().collect();
    let expected: Vec<&str> = people.iter().map(|p| p.id()).collect();
    assert_eq!(ids, expected);

    let iterated: Vec<_> = persons
        .iter()
        .map(|p| p.expect("load").expect("present"))
        .collect();
    assert_eq!(iterated, people);
}

#[test]
fn test_lazy_collection_reads_are_fresh() {
    let (mapper, _) = common::setup();
    let alice = common::saved_person(&mapper);
    let org = common::saved_organization(&mapper, &[&alice]);
    let persons = org.collection("persons").expect("persons");

    let before = persons.get(0).expect("get").expect("present");
    let mut renamed = before.clone();
    renamed.set_attribute("name", "Alice Renamed").expect("name");
    mapper.update(&renamed).expect("update");

    let after = persons.get(0).expect("get").expect("present");
    assert_eq!(after.attribute("name"), Some(&json!("Alice Renamed")));
}

#[test]
fn test_lazy_collection_writes() {
    let (mapper, _) = common::setup();
    let a = common::saved_person(&mapper);
    let b = common::saved_person(&mapper);
    let c = common::saved_person(&mapper);
    let family = common::saved_family(&mapper);
    let mut org = common::saved_organization(&mapper, &[&a]);

    {
        let persons = org.collection_mut("persons").expect("persons");
        persons.insert(0, &b).expect("insert front");
        persons.insert(2, &c).expect("insert at end");
        assert_eq!(persons.ids().collect::<Vec<_>>(), vec![b.id(), a.id(), c.id()]);

        persons.set(1, &c).expect("set");
        assert_eq!(persons.ids().collect::<Vec<_>>(), vec![b.id(), c.id(), c.id()]);

        assert!(persons.remove(&c));
        assert_eq!(persons.ids().collect::<Vec<_>>(), vec![b.id(), c.id()]);
        assert!(!persons.remove(&a));

        persons.delete(0).expect("delete");
        assert_eq!(persons.ids().collect::<Vec<_>>(), vec![c.id()]);

        assert!(matches!(persons.get(5), Err(OrmError::IndexOutOfRange { index: 5, len: 1 })));
        assert!(matches!(persons.delete(1), Err(OrmError::IndexOutOfRange { .. })));
        assert!(matches!(persons.insert(3, &a), Err(OrmError::IndexOutOfRange { .. })));
        assert!(matches!(persons.push(&family), Err(OrmError::TypeMismatch { .. })));
        assert!(persons.contains_id(c.id()));
    }

    mapper.update(&org).expect("update");
    let reloaded = mapper.get("Organization", org.id()).expect("get").expect("present");
    assert_eq!(
        reloaded.collection("persons").expect("persons").ids().collect::<Vec<_>>(),
        vec![c.id()]
    );
}

#[test]
fn test_cascading_delete_has_many() {
    let (mapper, store) = common::setup();
    let alice = common::saved_person(&mapper);
    let bob = common::saved_person(&mapper);
    let acme = common::saved_organization(&mapper, &[&alice, &bob, &alice]);
    let globex = common::saved_organization(&mapper, &[&bob]);

    assert!(mapper.delete(&alice).expect("delete"));
    assert!(store.document(common::DATABASE, "Person_table", alice.id()).is_none());

    let acme = mapper.get("Organization", acme.id()).expect("get").expect("present");
    assert_eq!(
        acme.collection("persons").expect("persons").ids().collect::<Vec<_>>(),
        vec![bob.id()],
        "every occurrence of the deleted id is scrubbed"
    );
    let globex = mapper.get("Organization", globex.id()).expect("get").expect("present");
    assert_eq!(
        globex.collection("persons").expect("persons").ids().collect::<Vec<_>>(),
        vec![bob.id()]
    );
    assert!(mapper.has_many(&alice, "orgs").expect("has_many").is_empty());
}

#[test]
fn test_cascading_delete_has_one() {
    let (mapper, _) = common::setup();
    let family = common::saved_family(&mapper);
    let mut members = Vec::new();
    for _ in 0..3 {
        let mut person = common::saved_person(&mapper);
        person.set_reference("family", &family).expect("family");
        mapper.update(&person).expect("update");
        members.push(person);
    }
    assert_eq!(mapper.has_one(&family, "members").expect("has_one").len(), 3);

    assert!(mapper.delete(&family).expect("delete"));
    for member in &members {
        let reloaded = mapper.get("Person", member.id()).expect("get").expect("present");
        assert_eq!(reloaded.reference_id("family").expect("family"), None);
    }
    assert!(mapper.get("Family", family.id()).expect("get").is_none());
}
