//! Vault catalog
//!
//! Folders are only needed to find the designated folder's id. The items
//! inside that folder, keyed by name, drive the rest of the run.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tracing::debug;

use crate::client::VaultClient;
use crate::error::{Error, Result};

/// Folder id the vault CLI understands as "items without a folder"
const NO_FOLDER: &str = "null";

/// A vault folder
#[derive(Debug, Clone, Deserialize)]
pub struct Folder {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    /// `None` for the vault's built-in "No Folder" entry
    #[serde(default)]
    pub id: Option<String>,
}

/// A custom field on an item
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Field {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// A vault item
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub notes: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<Field>,
}

impl Item {
    pub fn new(name: impl Into<String>, notes: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: notes.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field {
            name: name.into(),
            value: Some(value.into()),
        });
        self
    }

    /// Value of the first field called `name` (exact match)
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.value.as_deref())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Items indexed by exact, case-sensitive name, in listing order.
///
/// Inserting a name twice keeps the first position and the last item.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) {
        match self.index.get(&item.name) {
            Some(&pos) => self.items[pos] = item,
            None => {
                self.index.insert(item.name.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Item> {
        self.index.get(name).map(|&pos| &self.items[pos])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl FromIterator<Item> for Catalog {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for item in iter {
            catalog.insert(item);
        }
        catalog
    }
}

/// Loads folders and items through a vault client
pub struct CatalogLoader<'a, C> {
    client: &'a C,
}

impl<'a, C: VaultClient> CatalogLoader<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Folder name -> folder id
    pub async fn load_folders(&self) -> Result<HashMap<String, Option<String>>> {
        let stdout = self
            .client
            .invoke(&["list", "folders"])
            .await
            .map_err(|e| {
                debug!(error = %e, "listing folders failed");
                Error::FolderListError
            })?;

        let folders: Vec<Folder> = serde_json::from_str(&stdout).map_err(|e| {
            debug!(error = %e, "folder list is not valid JSON");
            Error::FolderListError
        })?;

        Ok(folders.into_iter().map(|f| (f.name, f.id)).collect())
    }

    /// Items inside one folder (`None` selects items without a folder)
    pub async fn load_items(&self, folder_id: Option<&str>) -> Result<Catalog> {
        let folder_id = folder_id.unwrap_or(NO_FOLDER);
        let stdout = self
            .client
            .invoke(&["list", "items", "--folderid", folder_id])
            .await
            .map_err(|e| {
                debug!(error = %e, "listing items failed");
                Error::ItemListError
            })?;

        let items: Vec<Item> = serde_json::from_str(&stdout).map_err(|e| {
            debug!(error = %e, "item list is not valid JSON");
            Error::ItemListError
        })?;

        Ok(items.into_iter().collect())
    }

    /// Catalog of the folder called `folder_name`
    pub async fn resolve(&self, folder_name: &str) -> Result<Catalog> {
        let folders = self.load_folders().await?;
        let folder_id = folders
            .get(folder_name)
            .ok_or_else(|| Error::FolderNotFound(folder_name.to_string()))?;

        let catalog = self.load_items(folder_id.as_deref()).await?;
        debug!(folder = folder_name, items = catalog.len(), "catalog loaded");
        Ok(catalog)
    }
}
