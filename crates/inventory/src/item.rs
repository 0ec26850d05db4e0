use serde::{Deserialize, Serialize};

use relo_core::{DomainError, DomainResult, Entity, InventoryId, Money};

/// Catalog (inventory master) item.
///
/// `stock` is signed: consumption recorded on cost sheets may run ahead of
/// physical receipts, and the ledger must keep counting rather than clamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: InventoryId,
    /// Display label; not unique.
    pub code: String,
    pub description: String,
    pub unit: String,
    pub price: Money,
    pub stock: i64,
    /// Reorder threshold, display only.
    pub critical_stock: i64,
}

impl InventoryItem {
    pub fn new(id: InventoryId, code: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            id,
            code: code.into(),
            description: String::new(),
            unit: String::new(),
            price,
            stock,
            critical_stock: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_critical_stock(mut self, critical_stock: i64) -> Self {
        self.critical_stock = critical_stock;
        self
    }

    /// True when stock has fallen to or below the reorder threshold.
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.critical_stock
    }

    /// Catalog edit checks (used by the catalog surface, never by reconciliation).
    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("code cannot be empty"));
        }
        if self.price < Money::ZERO {
            return Err(DomainError::validation("price cannot be negative"));
        }
        Ok(())
    }
}

impl Entity for InventoryItem {
    type Id = InventoryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_stock_is_inclusive_of_threshold() {
        let item = InventoryItem::new(InventoryId::new(1), "BOX-L", Money::from_cents(350), 5)
            .with_critical_stock(5);
        assert!(item.is_low_stock());

        let item = item.with_critical_stock(4);
        assert!(!item.is_low_stock());
    }

    #[test]
    fn negative_price_is_rejected() {
        let item = InventoryItem::new(InventoryId::new(1), "TAPE", Money::from_cents(-1), 0);
        assert!(matches!(item.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn blank_code_is_rejected() {
        let item = InventoryItem::new(InventoryId::new(1), "  ", Money::from_cents(100), 0);
        assert!(item.validate().is_err());
    }
}
