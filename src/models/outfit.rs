//! Outfit entity: a named set of products curated by a customer.
//!
//! This is the persisted layout only. Rows live in `outfit`, product links
//! in the `outfit_products` join table; deletion is soft (`deleted_at`).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutfitError {
    #[error("outfit name must not be blank")]
    BlankName,

    #[error("customer reference must not be blank")]
    BlankCustomer,

    #[error("outfit {0} is deleted")]
    Deleted(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outfit {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Linked product ids (many-to-many).
    #[serde(default)]
    pub products: BTreeSet<String>,
    /// Customer id of the author.
    pub created_by: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Outfit {
    pub const TABLE: &'static str = "outfit";
    pub const PRODUCTS_JOIN_TABLE: &'static str = "outfit_products";

    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Result<Self, OutfitError> {
        Self::new_at(name, created_by, Utc::now())
    }

    pub fn new_at(
        name: impl Into<String>,
        created_by: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, OutfitError> {
        let name = name.into();
        let created_by = created_by.into();
        if name.trim().is_empty() {
            return Err(OutfitError::BlankName);
        }
        if created_by.trim().is_empty() {
            return Err(OutfitError::BlankCustomer);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            thumbnail: None,
            products: BTreeSet::new(),
            created_by,
            metadata: Map::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Link a product. Returns `false` if it was already linked.
    pub fn add_product(&mut self, product_id: impl Into<String>, now: DateTime<Utc>) -> Result<bool, OutfitError> {
        self.ensure_live()?;
        let added = self.products.insert(product_id.into());
        if added {
            self.updated_at = now;
        }
        Ok(added)
    }

    /// Unlink a product. Returns `false` if it was not linked.
    pub fn remove_product(&mut self, product_id: &str, now: DateTime<Utc>) -> Result<bool, OutfitError> {
        self.ensure_live()?;
        let removed = self.products.remove(product_id);
        if removed {
            self.updated_at = now;
        }
        Ok(removed)
    }

    /// Mark deleted. The first deletion time is kept.
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(now);
            self.updated_at = now;
        }
    }

    pub fn restore(&mut self, now: DateTime<Utc>) {
        if self.deleted_at.take().is_some() {
            self.updated_at = now;
        }
    }

    fn ensure_live(&self) -> Result<(), OutfitError> {
        if self.is_deleted() {
            Err(OutfitError::Deleted(self.id))
        } else {
            Ok(())
        }
    }
}
