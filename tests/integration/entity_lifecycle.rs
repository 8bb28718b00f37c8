//! Integration tests for entity lifecycle operations: get, filter, save, update,
//! refresh and delete against the in-memory store.

mod common;

use docguard::connection::{ConnectionError, ConnectionParams};
use docguard::store::memory::MemoryStore;
use docguard::store::{Document, Predicate, StoreConnection, StoreDriver, StoreError, WriteOutcome};
use docguard::{EntityState, Mapper, OrmError, RelatedSequence};
use fake::faker::internet::en::SafeEmail;
use fake::Fake;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

#[test]
fn test_save_then_get_round_trip() {
    let (mapper, store) = common::setup();
    let family = common::saved_family(&mapper);

    let mut person = mapper.create("Person").expect("Failed to create Person");
    assert_eq!(person.state(), EntityState::Transient);
    let email: String = SafeEmail().fake();
    person.set_attribute("name", "Grace").expect("name");
    person.set_attribute("email", email.clone()).expect("email");
    person.set_reference("family", &family).expect("family");

    let saved = mapper.save(&mut person).expect("Failed to save");
    assert_eq!(saved.state(), EntityState::Persisted);
    assert_eq!(store.document_count(common::DATABASE, "Person_table"), 1);

    let loaded = mapper
        .get("Person", person.id())
        .expect("Failed to get")
        .expect("Person should exist");
    assert_eq!(loaded, person);
    assert!(loaded.is_persisted());
    assert_eq!(loaded.attribute("name"), Some(&json!("Grace")));
    assert_eq!(loaded.attribute("email"), Some(&json!(email)));
    assert_eq!(loaded.reference_id("family").expect("family"), Some(family.id()));
}

#[test]
fn test_stored_layout() {
    let (mapper, store) = common::setup();
    let alice = common::saved_person(&mapper);
    let bob = common::saved_person(&mapper);
    let org = common::saved_organization(&mapper, &[&alice, &bob]);

    let stored = store
        .document(common::DATABASE, "Organization_table", org.id())
        .expect("stored organization");
    assert_eq!(stored.get("id"), Some(&json!(org.id())));
    assert_eq!(stored.get("persons"), Some(&json!([alice.id(), bob.id()])));

    let person = store
        .document(common::DATABASE, "Person_table", alice.id())
        .expect("stored person");
    assert_eq!(person.get("family"), Some(&JsonValue::Null));
    assert!(person.get("orgs").is_none(), "inverse relations are never stored");

    let fetched = mapper.fetch_document(&org).expect("fetch").expect("present");
    assert_eq!(fetched, stored);

    let text = org.to_json().expect("to_json");
    let parsed: JsonValue = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(parsed, JsonValue::Object(stored));
}

#[test]
fn test_get_missing_and_empty_id() {
    let (mapper, _) = common::setup();
    assert!(mapper.get("Person", "does-not-exist").expect("get").is_none());
    assert!(matches!(mapper.get("Person", ""), Err(OrmError::MissingArgument(_))));
    assert!(matches!(
        mapper.get("Ghost", "x"),
        Err(OrmError::UnknownEntityType(_))
    ));
}

#[test]
fn test_filter_by_attribute() {
    let (mapper, _) = common::setup();
    for name in ["Ann", "Ann", "Ben"] {
        let mut person = mapper.create("Person").expect("create");
        person.set_attribute("name", name).expect("name");
        mapper.save(&mut person).expect("save");
    }

    assert_eq!(mapper.filter("Person", "name", "Ann").expect("filter").len(), 2);
    assert_eq!(mapper.filter("Person", "name", "Ben").expect("filter").len(), 1);
    assert!(mapper.filter("Person", "name", "Cy").expect("filter").is_empty());
    assert!(matches!(
        mapper.filter("Person", "", "Ann"),
        Err(OrmError::MissingArgument(_))
    ));

    let predicate = Predicate::eq("family", JsonValue::Null);
    assert_eq!(mapper.filter_by("Person", predicate).expect("filter_by").len(), 3);
}

#[test]
fn test_duplicate_save_is_rejected() {
    let (mapper, store) = common::setup();
    let person = common::saved_person(&mapper);

    let mut again = person.clone();
    match mapper.save(&mut again) {
        Err(OrmError::WriteRejected { table, message }) => {
            assert_eq!(table, "Person_table");
            assert!(message.contains(person.id()));
        }
        other => panic!("expected WriteRejected, got {other:?}"),
    }
    assert_eq!(store.document_count(common::DATABASE, "Person_table"), 1);
}

#[test]
fn test_update_drops_null_collection_entries() {
    let (mapper, store) = common::setup();
    let alice = common::saved_person(&mapper);

    let mut raw = Document::new();
    raw.insert("id".to_string(), json!("org-1"));
    raw.insert("name".to_string(), json!("Acme"));
    raw.insert("persons".to_string(), json!([null, alice.id(), null]));
    let outcome = common::raw_connection(&store)
        .insert("Organization_table", raw)
        .expect("raw insert");
    assert!(outcome.is_ok());

    let org = mapper.get("Organization", "org-1").expect("get").expect("present");
    let persons = org.collection("persons").expect("persons");
    assert_eq!(persons.len(), 3);
    assert!(persons.get(0).expect("null entry").is_none());
    assert_eq!(persons.get(1).expect("entry").expect("alice"), alice);

    let outcome = mapper.update(&org).expect("update");
    assert_eq!(outcome.replaced, 1);
    let stored = store
        .document(common::DATABASE, "Organization_table", "org-1")
        .expect("stored");
    assert_eq!(stored.get("persons"), Some(&json!([alice.id()])));
}

#[test]
fn test_refresh_reloads_in_place() {
    let (mapper, _) = common::setup();
    let mut person = common::saved_person(&mapper);

    let mut other_copy = mapper.get("Person", person.id()).expect("get").expect("present");
    other_copy.set_attribute("name", "Renamed").expect("name");
    mapper.update(&other_copy).expect("update");

    assert_ne!(person.attribute("name"), Some(&json!("Renamed")));
    assert!(mapper.refresh(&mut person).expect("refresh"));
    assert_eq!(person.attribute("name"), Some(&json!("Renamed")));

    assert!(mapper.delete(&person).expect("delete"));
    assert!(!mapper.refresh(&mut person).expect("refresh after delete"));
    assert_eq!(person.attribute("name"), Some(&json!("Renamed")));
}

#[test]
fn test_schema_drift_fails_instantiation() {
    let (mapper, store) = common::setup();

    let mut raw = Document::new();
    raw.insert("id".to_string(), json!("p-1"));
    raw.insert("nickname".to_string(), json!("no name field"));
    common::raw_connection(&store)
        .insert("Person_table", raw)
        .expect("raw insert");

    match mapper.get("Person", "p-1") {
        Err(OrmError::InstantiationFailure { entity_type, .. }) => assert_eq!(entity_type, "Person"),
        other => panic!("expected InstantiationFailure, got {other:?}"),
    }
}

#[test]
fn test_attribute_and_reference_guards() {
    let (mapper, _) = common::setup();
    let mut person = mapper.create("Person").expect("create");
    let org = common::saved_organization(&mapper, &[]);

    assert!(matches!(
        person.set_attribute("shoe_size", 44),
        Err(OrmError::UnknownField { .. })
    ));
    assert!(matches!(
        person.set_attribute("family", "f-1"),
        Err(OrmError::UnknownField { .. })
    ));
    assert!(matches!(
        person.set_reference("family", &org),
        Err(OrmError::TypeMismatch { .. })
    ));

    person.set_reference("family", "f-raw").expect("raw id");
    assert_eq!(person.reference_id("family").expect("family"), Some("f-raw"));
    person.set_reference("family", None::<&docguard::Entity>).expect("clear");
    assert_eq!(person.reference_id("family").expect("family"), None);
}

/// Driver whose filter answers with the store's "nothing" sentinel
struct NothingStore(MemoryStore);

struct NothingConnection(Box<dyn StoreConnection>);

impl StoreDriver for NothingStore {
    fn connect(&self, params: &ConnectionParams) -> Result<Box<dyn StoreConnection>, ConnectionError> {
        Ok(Box::new(NothingConnection(self.0.connect(params)?)))
    }
}

impl StoreConnection for NothingConnection {
    fn list_databases(&mut self) -> Result<Vec<String>, StoreError> {
        self.0.list_databases()
    }
    fn create_database(&mut self, name: &str) -> Result<(), StoreError> {
        self.0.create_database(name)
    }
    fn drop_database(&mut self, name: &str) -> Result<(), StoreError> {
        self.0.drop_database(name)
    }
    fn list_tables(&mut self) -> Result<Vec<String>, StoreError> {
        self.0.list_tables()
    }
    fn create_table(&mut self, name: &str) -> Result<(), StoreError> {
        self.0.create_table(name)
    }
    fn drop_table(&mut self, name: &str) -> Result<(), StoreError> {
        self.0.drop_table(name)
    }
    fn get(&mut self, table: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.0.get(table, id)
    }
    fn filter(&mut self, _table: &str, _predicate: &Predicate) -> Result<Option<Vec<Document>>, StoreError> {
        Ok(None)
    }
    fn insert(&mut self, table: &str, document: Document) -> Result<WriteOutcome, StoreError> {
        self.0.insert(table, document)
    }
    fn replace(&mut self, table: &str, document: Document) -> Result<WriteOutcome, StoreError> {
        self.0.replace(table, document)
    }
    fn delete(&mut self, table: &str, id: &str) -> Result<WriteOutcome, StoreError> {
        self.0.delete(table, id)
    }
    fn close(&mut self) -> Result<(), StoreError> {
        self.0.close()
    }
}

#[test]
fn test_filter_nothing_sentinel() {
    let store = MemoryStore::new().with_database(common::DATABASE);
    let mapper = Mapper::in_memory(Arc::new(NothingStore(store)));
    mapper.register(common::organization_type()).expect("register");
    mapper.register(common::person_type()).expect("register");
    mapper.register(common::family_type()).expect("register");
    mapper.provision().expect("provision");

    match mapper.filter("Person", "name", "Ann") {
        Err(OrmError::NoResult { entity_type }) => assert_eq!(entity_type, "Person"),
        other => panic!("expected NoResult, got {other:?}"),
    }

    // relation scans treat the sentinel as "no matches"
    let person = common::saved_person(&mapper);
    assert!(mapper.has_many(&person, "orgs").expect("has_many").is_empty());
}
