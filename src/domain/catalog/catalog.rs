use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use super::errors::CatalogError;
use super::item::Item;

/// Identity map of catalog items.
///
/// Each id maps to one shared `Arc<Item>`, so every order line that
/// references the same item sees the same instance. Stock changes go through
/// `add_stock` / `remove_stock`, which replace the shared instance
/// copy-on-write when an order line still holds the previous one.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<Uuid, Arc<Item>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached instance for `item.id`, inserting `item` if absent
    pub fn intern(&mut self, item: Item) -> Arc<Item> {
        self.items
            .entry(item.id)
            .or_insert_with(|| Arc::new(item))
            .clone()
    }

    pub fn get(&self, item_id: &Uuid) -> Option<&Arc<Item>> {
        self.items.get(item_id)
    }

    pub fn contains(&self, item_id: &Uuid) -> bool {
        self.items.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Check that `quantity` can be taken from the item without changing it
    pub fn check_stock(&self, item_id: &Uuid, quantity: i32) -> Result<(), CatalogError> {
        let item = self
            .items
            .get(item_id)
            .ok_or(CatalogError::UnknownItem(*item_id))?;

        if quantity < 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }
        if item.stock_quantity < quantity {
            return Err(CatalogError::NotEnoughStock {
                item_id: *item_id,
                requested: quantity,
                available: item.stock_quantity,
            });
        }
        Ok(())
    }

    pub fn add_stock(&mut self, item_id: &Uuid, quantity: i32) -> Result<(), CatalogError> {
        let item = self
            .items
            .get_mut(item_id)
            .ok_or(CatalogError::UnknownItem(*item_id))?;
        Arc::make_mut(item).add_stock(quantity)
    }

    pub fn remove_stock(&mut self, item_id: &Uuid, quantity: i32) -> Result<(), CatalogError> {
        let item = self
            .items
            .get_mut(item_id)
            .ok_or(CatalogError::UnknownItem(*item_id))?;
        Arc::make_mut(item).remove_stock(quantity)
    }
}
