use serde::Deserialize;
use uuid::Uuid;

use crate::domain::member::Member;
use crate::domain::order::OrderStatus;

/// Criteria filter applied to the root order query of every loader
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrderSearch {
    /// Orders placed by exactly this member
    pub member_id: Option<Uuid>,
    /// Substring of the member name
    pub member_name: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl OrderSearch {
    pub fn all() -> Self {
        Self::default()
    }

    /// The orders of one member, by identity rather than by name
    pub fn by_member(member_id: Uuid) -> Self {
        Self {
            member_id: Some(member_id),
            ..Self::default()
        }
    }

    pub fn by_member_name(name: impl Into<String>) -> Self {
        Self {
            member_name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.order_status = Some(status);
        self
    }

    pub fn matches(&self, member: &Member, status: OrderStatus) -> bool {
        let member_ok = self.member_id.map_or(true, |wanted| wanted == member.id);
        let name_ok = match self.member_name.as_deref() {
            Some(fragment) if !fragment.is_empty() => member.name.contains(fragment),
            _ => true,
        };
        let status_ok = self.order_status.map_or(true, |wanted| wanted == status);
        member_ok && name_ok && status_ok
    }

    /// LIKE pattern for the member name, if the filter sets one.
    ///
    /// `%`, `_` and `\` in the fragment match literally, as they do in
    /// `matches`; the query must declare `ESCAPE '\'`.
    pub(crate) fn member_name_pattern(&self) -> Option<String> {
        self.member_name
            .as_deref()
            .filter(|fragment| !fragment.is_empty())
            .map(|fragment| {
                let mut pattern = String::with_capacity(fragment.len() + 2);
                pattern.push('%');
                for c in fragment.chars() {
                    if matches!(c, '%' | '_' | '\\') {
                        pattern.push('\\');
                    }
                    pattern.push(c);
                }
                pattern.push('%');
                pattern
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid page: offset {offset} must be >= 0 and limit {limit} must be > 0")]
pub struct InvalidPage {
    pub offset: i64,
    pub limit: i64,
}

/// Offset/limit window over roots ordered by order id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    offset: i64,
    limit: i64,
}

impl Page {
    pub fn new(offset: i64, limit: i64) -> Result<Self, InvalidPage> {
        if offset < 0 || limit <= 0 {
            return Err(InvalidPage { offset, limit });
        }
        Ok(Self { offset, limit })
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    /// Apply this window to an already ordered, de-duplicated sequence
    pub fn slice<T>(&self, items: Vec<T>) -> Vec<T> {
        let offset = usize::try_from(self.offset).unwrap_or(usize::MAX);
        let limit = usize::try_from(self.limit).unwrap_or(usize::MAX);
        items.into_iter().skip(offset).take(limit).collect()
    }
}
