use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::CatalogError;

/// Variant-specific attributes of a catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "dtype", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Book { author: String, isbn: String },
    Album { artist: String, etc: String },
    Movie { director: String, actor: String },
}

impl ItemKind {
    /// Discriminator stored alongside the row
    pub fn dtype(&self) -> &'static str {
        match self {
            ItemKind::Book { .. } => "BOOK",
            ItemKind::Album { .. } => "ALBUM",
            ItemKind::Movie { .. } => "MOVIE",
        }
    }
}

/// Catalog item. Loaders only read `name`, `price` and `stock_quantity`,
/// which every variant shares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub price: i64,
    pub stock_quantity: i32,
    pub kind: ItemKind,
}

impl Item {
    pub fn new(name: impl Into<String>, price: i64, stock_quantity: i32, kind: ItemKind) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            price,
            stock_quantity,
            kind,
        }
    }

    pub fn book(name: impl Into<String>, price: i64, stock_quantity: i32) -> Self {
        Self::new(
            name,
            price,
            stock_quantity,
            ItemKind::Book {
                author: String::new(),
                isbn: String::new(),
            },
        )
    }

    pub fn add_stock(&mut self, quantity: i32) -> Result<(), CatalogError> {
        if quantity < 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }
        self.stock_quantity += quantity;
        Ok(())
    }

    pub fn remove_stock(&mut self, quantity: i32) -> Result<(), CatalogError> {
        if quantity < 0 {
            return Err(CatalogError::InvalidQuantity(quantity));
        }
        let rest = self.stock_quantity - quantity;
        if rest < 0 {
            return Err(CatalogError::NotEnoughStock {
                item_id: self.id,
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        self.stock_quantity = rest;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_stock_within_available() {
        let mut item = Item::book("Rust in Action", 10_000, 10);
        item.remove_stock(4).unwrap();
        assert_eq!(item.stock_quantity, 6);
    }

    #[test]
    fn test_remove_stock_beyond_available_leaves_stock() {
        let mut item = Item::book("Rust in Action", 10_000, 10);
        let err = item.remove_stock(11).unwrap_err();

        assert!(matches!(
            err,
            CatalogError::NotEnoughStock { requested: 11, available: 10, .. }
        ));
        assert_eq!(item.stock_quantity, 10);
    }

    #[test]
    fn test_negative_quantities_rejected() {
        let mut item = Item::book("Rust in Action", 10_000, 10);
        assert_eq!(item.add_stock(-1), Err(CatalogError::InvalidQuantity(-1)));
        assert_eq!(item.remove_stock(-1), Err(CatalogError::InvalidQuantity(-1)));
    }

    #[test]
    fn test_item_kind_is_tagged() {
        let kind = ItemKind::Album {
            artist: "Seo Taiji".to_string(),
            etc: "remastered".to_string(),
        };

        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"dtype\":\"ALBUM\""));

        let deserialized: ItemKind = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.dtype(), "ALBUM");
    }
}
