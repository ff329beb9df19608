use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;

use crate::config::Config;
use crate::contact::Contact;
use crate::search;

/// Identifier of a contact within one session. Assigned when the contact
/// enters the store and never reused; not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContactId(u64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {} as a contact list: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize contacts: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("contact index {index} out of range (list has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no contact with id {0}")]
    UnknownId(ContactId),
    #[error("no contact file selected")]
    NoFile,
}

#[derive(Debug, Clone)]
pub struct StoredContact {
    pub id: ContactId,
    pub contact: Contact,
}

/// One row of a filtered view.
#[derive(Debug, Clone, Copy)]
pub struct FilterHit<'a> {
    /// Position in the full list at the time of filtering.
    pub index: usize,
    pub id: ContactId,
    pub contact: &'a Contact,
}

/// Read a contact list from `path`.
pub fn load(path: &Path) -> Result<Vec<Contact>, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `contacts` to `path` as JSON indented with four spaces.
pub fn save(path: &Path, contacts: &[Contact]) -> Result<(), StoreError> {
    let text = to_json(contacts)?;
    fs::write(path, text).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn to_json(contacts: &[Contact]) -> Result<String, StoreError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    contacts
        .serialize(&mut ser)
        .map_err(StoreError::Serialize)?;
    // serde_json only ever emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// The contact list of the running session.
#[derive(Debug, Default)]
pub struct ContactStore {
    entries: Vec<StoredContact>,
    next_id: u64,
    path: Option<PathBuf>,
    modified: bool,
}

impl ContactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with an empty list and forget the current file.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.path = None;
        self.modified = false;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[StoredContact] {
        &self.entries
    }

    /// Contacts in list order, detached from their ids.
    pub fn contacts(&self) -> Vec<Contact> {
        self.entries.iter().map(|entry| entry.contact.clone()).collect()
    }

    pub fn get(&self, id: ContactId) -> Option<&Contact> {
        self.position(id).map(|index| &self.entries[index].contact)
    }

    pub fn position(&self, id: ContactId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.id == id)
    }

    /// Load `path` and replace the list with its contents. On failure the
    /// store is left exactly as it was.
    pub fn open(&mut self, path: &Path, config: &mut Config) -> Result<(), StoreError> {
        let contacts = load(path)?;
        log::info!("loaded {} contacts from {}", contacts.len(), path.display());

        self.entries.clear();
        for contact in contacts {
            self.push(contact);
        }
        self.path = Some(path.to_path_buf());
        self.modified = false;
        remember(config, path);
        Ok(())
    }

    /// Save to the current file.
    pub fn save_current(&mut self) -> Result<PathBuf, StoreError> {
        let path = self.path.clone().ok_or(StoreError::NoFile)?;
        save(&path, &self.contacts())?;
        log::info!("saved {} contacts to {}", self.len(), path.display());
        self.modified = false;
        Ok(path)
    }

    /// Save to `path` and make it the current file.
    pub fn save_as(&mut self, path: &Path, config: &mut Config) -> Result<(), StoreError> {
        save(path, &self.contacts())?;
        log::info!("saved {} contacts to {}", self.len(), path.display());
        self.path = Some(path.to_path_buf());
        self.modified = false;
        remember(config, path);
        Ok(())
    }

    pub fn add(&mut self, contact: Contact) -> ContactId {
        self.modified = true;
        self.push(contact)
    }

    pub fn replace(&mut self, index: usize, contact: Contact) -> Result<(), StoreError> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })?;
        entry.contact = contact;
        self.modified = true;
        Ok(())
    }

    pub fn delete(&mut self, index: usize) -> Result<Contact, StoreError> {
        let len = self.entries.len();
        if index >= len {
            return Err(StoreError::IndexOutOfRange { index, len });
        }
        self.modified = true;
        Ok(self.entries.remove(index).contact)
    }

    pub fn replace_by_id(&mut self, id: ContactId, contact: Contact) -> Result<(), StoreError> {
        let index = self.position(id).ok_or(StoreError::UnknownId(id))?;
        self.replace(index, contact)
    }

    pub fn delete_by_id(&mut self, id: ContactId) -> Result<Contact, StoreError> {
        let index = self.position(id).ok_or(StoreError::UnknownId(id))?;
        self.delete(index)
    }

    /// Contacts matching `query` in list order. A blank query matches all.
    pub fn filter(&self, query: &str) -> Vec<FilterHit<'_>> {
        let normalized = search::normalize_query(query);
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| match &normalized {
                Some(needle) => search::matches(&entry.contact, needle),
                None => true,
            })
            .map(|(index, entry)| FilterHit {
                index,
                id: entry.id,
                contact: &entry.contact,
            })
            .collect()
    }

    fn push(&mut self, contact: Contact) -> ContactId {
        let id = ContactId(self.next_id);
        self.next_id += 1;
        self.entries.push(StoredContact { id, contact });
        id
    }
}

fn remember(config: &mut Config, path: &Path) {
    if let Err(err) = config.remember(path) {
        log::warn!("could not record {} as last file: {:#}", path.display(), err);
    }
}
