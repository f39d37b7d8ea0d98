use serde::Serialize;

use crate::store::Page;
use super::errors::LoadError;

/// Relations reachable from an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Relation {
    Member,
    Delivery,
    OrderItems,
    /// Catalog item of each order item, reached through `OrderItems`
    OrderItemsItem,
    /// The member's other orders
    MemberOrders,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    ToOne,
    ToMany,
}

impl Relation {
    pub fn cardinality(&self) -> Cardinality {
        match self {
            Relation::Member | Relation::Delivery | Relation::OrderItemsItem => Cardinality::ToOne,
            Relation::OrderItems | Relation::MemberOrders => Cardinality::ToMany,
        }
    }

    pub fn is_collection(&self) -> bool {
        self.cardinality() == Cardinality::ToMany
    }
}

/// Which relations one join query resolves, and an optional page.
///
/// `validate` rejects plans whose result would be silently wrong before a
/// single query is issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPlan {
    relations: Vec<Relation>,
    page: Option<(i64, i64)>,
}

impl FetchPlan {
    pub fn new() -> Self {
        Self {
            relations: Vec::new(),
            page: None,
        }
    }

    /// Member, delivery, order items and each item's catalog entry
    pub fn order_graph() -> Self {
        Self::new()
            .join(Relation::Member)
            .join(Relation::Delivery)
            .join(Relation::OrderItems)
            .join(Relation::OrderItemsItem)
    }

    pub fn join(mut self, relation: Relation) -> Self {
        if !self.relations.contains(&relation) {
            self.relations.push(relation);
        }
        self
    }

    pub fn page(mut self, offset: i64, limit: i64) -> Self {
        self.page = Some((offset, limit));
        self
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn collections(&self) -> Vec<Relation> {
        self.relations.iter().copied().filter(Relation::is_collection).collect()
    }

    /// Relations of `required` this plan does not join, in `required` order
    pub fn missing(&self, required: &[Relation]) -> Vec<Relation> {
        required
            .iter()
            .copied()
            .filter(|relation| !self.relations.contains(relation))
            .collect()
    }

    /// Check the plan and return its page, if any
    pub fn validate(&self) -> Result<Option<Page>, LoadError> {
        let collections = self.collections();
        if collections.len() > 1 {
            return Err(LoadError::CompoundCollectionFetch(collections));
        }
        if self.relations.contains(&Relation::MemberOrders) {
            return Err(LoadError::UnsupportedRelation(Relation::MemberOrders));
        }
        if self.relations.contains(&Relation::OrderItemsItem) && !self.relations.contains(&Relation::OrderItems) {
            return Err(LoadError::UnsupportedRelation(Relation::OrderItemsItem));
        }

        self.page
            .map(|(offset, limit)| Page::new(offset, limit))
            .transpose()
            .map_err(LoadError::from)
    }
}

impl Default for FetchPlan {
    fn default() -> Self {
        Self::order_graph()
    }
}
