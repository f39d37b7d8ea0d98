// Shared fixtures for store-backed tests

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::catalog::{Catalog, Item};
use crate::domain::delivery::Delivery;
use crate::domain::member::{Address, Member};
use crate::domain::order::{Order, OrderLine};
use crate::store::{Change, InMemoryStore, Store};

pub(crate) struct Fixture {
    pub store: InMemoryStore,
    pub members: Vec<Member>,
    pub items: Vec<Item>,
}

impl Fixture {
    /// Two members and four books
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let members = vec![
            Member::new("userA", Address::new("Seoul", "1", "1111")),
            Member::new("userB", Address::new("Busan", "2", "2222")),
        ];
        let items = vec![
            Item::book("JPA1 BOOK", 10_000, 100),
            Item::book("JPA2 BOOK", 20_000, 100),
            Item::book("SPRING1 BOOK", 20_000, 200),
            Item::book("SPRING2 BOOK", 40_000, 300),
        ];
        for member in &members {
            store.insert_member(member).unwrap();
        }
        for item in &items {
            store.insert_item(item).unwrap();
        }
        Self { store, members, items }
    }

    /// Place and persist an order; `lines` are (item index, count)
    pub async fn place(&self, member: usize, lines: &[(usize, i32)]) -> Uuid {
        let mut catalog = Catalog::new();
        for item in &self.items {
            catalog.intern(self.store.stored_item(item.id).unwrap().unwrap());
        }
        let lines: Vec<OrderLine> = lines
            .iter()
            .map(|(index, count)| OrderLine::new(self.items[*index].id, *count))
            .collect();

        let member = Arc::new(self.members[member].clone());
        let delivery = Delivery::ready(member.address.clone());
        let order = Order::place(member, delivery, &lines, &mut catalog).unwrap();

        let mut changes = vec![Change::insert_order(&order)];
        changes.extend(lines.iter().map(|line| Change::AdjustStock {
            item_id: line.item_id,
            delta: -line.count,
        }));
        self.store.apply(&changes).await.unwrap();
        order.id()
    }

    /// One order per entry of `sizes`, with that many lines.
    /// Returns the ids sorted, which is the canonical root order.
    pub async fn place_many(&self, sizes: &[usize]) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for (n, size) in sizes.iter().enumerate() {
            let lines: Vec<(usize, i32)> = (0..*size).map(|k| (k % self.items.len(), 1)).collect();
            ids.push(self.place(n % self.members.len(), &lines).await);
        }
        ids.sort();
        ids
    }
}
