//! Shared fixtures for the integration tests.
//!
//! Three entity types wired together through every relation kind:
//!
//! - `Organization { name, persons: [Person ids] }`
//! - `Person { name, family: Family id, orgs: has-many Organization.persons }`
//! - `Family { name, members: has-one Person.family }`
#![allow(dead_code)]

use docguard::connection::{Connection, ConnectionFactory, ConnectionParams};
use docguard::store::memory::MemoryStore;
use docguard::{Entity, EntityType, Mapper};
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::{LastName, Name};
use fake::Fake;
use std::sync::Arc;

pub const DATABASE: &str = "test";

pub fn organization_type() -> EntityType {
    EntityType::builder("Organization")
        .attribute("name")
        .collection("persons", "Person")
        .build()
        .expect("Failed to declare Organization")
}

pub fn person_type() -> EntityType {
    EntityType::builder("Person")
        .attribute("name")
        .optional_attribute("email")
        .reference("family", "Family")
        .has_many("orgs", "Organization", "persons")
        .build()
        .expect("Failed to declare Person")
}

pub fn family_type() -> EntityType {
    EntityType::builder("Family")
        .attribute("name")
        .has_one("members", "Person", "family")
        .build()
        .expect("Failed to declare Family")
}

/// Mapper over a fresh in-memory store with the three fixture types provisioned
pub fn setup() -> (Mapper, MemoryStore) {
    let store = MemoryStore::new().with_database(DATABASE);
    let mapper = Mapper::in_memory(Arc::new(store.clone()));
    mapper.register(organization_type()).expect("Failed to register Organization");
    mapper.register(person_type()).expect("Failed to register Person");
    mapper.register(family_type()).expect("Failed to register Family");
    mapper.registry().validate().expect("Fixture relations should line up");
    mapper.provision().expect("Failed to provision tables");
    (mapper, store)
}

/// Raw connection to the fixture database, bypassing the pool
pub fn raw_connection(store: &MemoryStore) -> Connection {
    ConnectionFactory::new(Arc::new(store.clone()))
        .open(&ConnectionParams::default())
        .expect("Failed to open raw connection")
}

pub fn saved_person(mapper: &Mapper) -> Entity {
    let mut person = mapper.create("Person").expect("Failed to create Person");
    person
        .set_attribute("name", Name().fake::<String>())
        .expect("Failed to set name");
    mapper.save(&mut person).expect("Failed to save Person");
    person
}

pub fn saved_family(mapper: &Mapper) -> Entity {
    let mut family = mapper.create("Family").expect("Failed to create Family");
    family
        .set_attribute("name", LastName().fake::<String>())
        .expect("Failed to set name");
    mapper.save(&mut family).expect("Failed to save Family");
    family
}

pub fn saved_organization(mapper: &Mapper, members: &[&Entity]) -> Entity {
    let mut org = mapper.create("Organization").expect("Failed to create Organization");
    org.set_attribute("name", CompanyName().fake::<String>())
        .expect("Failed to set name");
    for member in members {
        org.collection_mut("persons")
            .expect("persons collection")
            .push(member)
            .expect("Failed to add member");
    }
    mapper.save(&mut org).expect("Failed to save Organization");
    org
}
