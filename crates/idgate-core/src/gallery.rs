//! Enrolled gallery and snapshot publishing.

use crate::types::Person;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    #[error("person {0} has no enrollment templates")]
    NoTemplates(Uuid),
    #[error("duplicate person id: {0}")]
    DuplicateId(Uuid),
}

/// Immutable, ordered set of enrolled persons.
///
/// Every person has at least one template and ids are unique. Order is
/// only significant for tie-breaking during matching.
#[derive(Debug, Default)]
pub struct Gallery {
    persons: Vec<Arc<Person>>,
}

impl Gallery {
    pub fn new(persons: Vec<Person>) -> Result<Self, GalleryError> {
        let mut seen = HashSet::with_capacity(persons.len());
        for person in &persons {
            if person.templates.is_empty() {
                return Err(GalleryError::NoTemplates(person.id));
            }
            if !seen.insert(person.id) {
                return Err(GalleryError::DuplicateId(person.id));
            }
        }

        Ok(Self {
            persons: persons.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn persons(&self) -> &[Arc<Person>] {
        &self.persons
    }

    pub fn len(&self) -> usize {
        self.persons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.persons.is_empty()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Arc<Person>> {
        self.persons.iter().find(|p| &p.id == id)
    }
}

/// Owner of the current gallery snapshot.
///
/// Enrollment publishes a whole new [`Gallery`]; matching takes an `Arc`
/// to whatever snapshot is current and keeps it for the entire cycle.
#[derive(Debug, Default)]
pub struct GalleryStore {
    current: RwLock<Arc<Gallery>>,
}

impl GalleryStore {
    pub fn new(gallery: Gallery) -> Self {
        Self {
            current: RwLock::new(Arc::new(gallery)),
        }
    }

    /// Current snapshot. The lock is only held long enough to clone the `Arc`.
    pub fn snapshot(&self) -> Arc<Gallery> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the current snapshot. Cycles already holding the old one finish with it.
    pub fn publish(&self, gallery: Gallery) {
        let persons = gallery.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(gallery);
        tracing::info!(persons, "gallery snapshot published");
    }
}
