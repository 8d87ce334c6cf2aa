//! Query model for inventory listings.
//!
//! Raw request parameters are parsed leniently into an [`InventoryQuery`]:
//! malformed values fall back to defaults rather than failing the request.
//! The same parsed query drives the in-memory matcher and the SQL builder.

use core::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use bytebasket_core::page::PageRequest;
use bytebasket_core::FoodbankId;

use crate::item::{DietaryCategory, InventoryItem};

/// Raw query-string parameters, as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryQueryParams {
    pub search: Option<String>,
    pub category: Option<String>,
    pub dietary_category: Option<String>,
    pub foodbank_id: Option<String>,
    pub storage_location: Option<String>,
    pub expiring_soon: Option<String>,
    pub low_stock_only: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryQuery {
    pub filter: InventoryFilter,
    pub sort: SortSpec,
    pub page: PageRequest,
}

impl InventoryQuery {
    pub fn parse(params: &InventoryQueryParams) -> Self {
        Self {
            filter: InventoryFilter::parse(params),
            sort: SortSpec::parse(params.sort_by.as_deref(), params.sort_order.as_deref()),
            page: PageRequest::parse(params.page.as_deref(), params.limit.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    /// Case-insensitive substring of item name or category.
    pub search: Option<String>,
    /// Case-insensitive equality.
    pub category: Option<String>,
    pub dietary_category: Option<DietaryCategory>,
    pub foodbank_id: Option<FoodbankId>,
    /// Case-insensitive substring.
    pub storage_location: Option<String>,
    pub expiring_soon: bool,
    pub low_stock_only: bool,
}

impl InventoryFilter {
    pub fn parse(params: &InventoryQueryParams) -> Self {
        Self {
            search: non_blank(params.search.as_deref()),
            category: non_blank(params.category.as_deref()),
            dietary_category: params
                .dietary_category
                .as_deref()
                .and_then(|v| v.parse().ok()),
            foodbank_id: params.foodbank_id.as_deref().and_then(|v| v.parse().ok()),
            storage_location: non_blank(params.storage_location.as_deref()),
            expiring_soon: parse_flag(params.expiring_soon.as_deref()),
            low_stock_only: parse_flag(params.low_stock_only.as_deref()),
        }
    }

    pub fn matches(&self, item: &InventoryItem, now: DateTime<Utc>) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !item.item_name.to_lowercase().contains(&needle)
                && !item.category.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if item.category.to_lowercase() != category.to_lowercase() {
                return false;
            }
        }
        if let Some(dietary) = self.dietary_category {
            if item.dietary_category != Some(dietary) {
                return false;
            }
        }
        if let Some(foodbank_id) = self.foodbank_id {
            if item.foodbank_id != foodbank_id {
                return false;
            }
        }
        if let Some(location) = &self.storage_location {
            let needle = location.to_lowercase();
            let hit = item
                .storage_location
                .as_deref()
                .is_some_and(|l| l.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.expiring_soon && !item.status(now).is_expiring_soon {
            return false;
        }
        if self.low_stock_only && !item.low_stock {
            return false;
        }
        true
    }
}

/// Allow-listed sort columns.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortColumn {
    ItemName,
    Category,
    Quantity,
    MinimumStockLevel,
    ExpirationDate,
    StorageLocation,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortColumn {
    pub const ALL: [SortColumn; 8] = [
        SortColumn::ItemName,
        SortColumn::Category,
        SortColumn::Quantity,
        SortColumn::MinimumStockLevel,
        SortColumn::ExpirationDate,
        SortColumn::StorageLocation,
        SortColumn::CreatedAt,
        SortColumn::UpdatedAt,
    ];

    /// Column name; doubles as the accepted `sort_by` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortColumn::ItemName => "item_name",
            SortColumn::Category => "category",
            SortColumn::Quantity => "quantity",
            SortColumn::MinimumStockLevel => "minimum_stock_level",
            SortColumn::ExpirationDate => "expiration_date",
            SortColumn::StorageLocation => "storage_location",
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(
            self,
            SortColumn::ItemName | SortColumn::Category | SortColumn::StorageLocation
        )
    }

    /// Unknown names yield `None`; callers fall back to the default column.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        SortColumn::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub column: SortColumn,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn new(column: SortColumn, order: SortOrder) -> Self {
        Self { column, order }
    }

    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>) -> Self {
        Self {
            column: sort_by.and_then(SortColumn::parse).unwrap_or_default(),
            order: sort_order.map(SortOrder::parse).unwrap_or_default(),
        }
    }

    /// Total order used by the in-memory backend: absent values last in both
    /// directions, ties broken on id ascending.
    pub fn compare(&self, a: &InventoryItem, b: &InventoryItem) -> Ordering {
        let primary = match self.column {
            SortColumn::ItemName => self.order.apply(
                a.item_name.to_lowercase().cmp(&b.item_name.to_lowercase()),
            ),
            SortColumn::Category => self.order.apply(
                a.category.to_lowercase().cmp(&b.category.to_lowercase()),
            ),
            SortColumn::Quantity => self.order.apply(a.quantity.cmp(&b.quantity)),
            SortColumn::MinimumStockLevel => self
                .order
                .apply(a.minimum_stock_level.cmp(&b.minimum_stock_level)),
            SortColumn::ExpirationDate => {
                nulls_last(a.expiration_date, b.expiration_date, self.order)
            }
            SortColumn::StorageLocation => nulls_last(
                a.storage_location.as_deref().map(str::to_lowercase),
                b.storage_location.as_deref().map(str::to_lowercase),
                self.order,
            ),
            SortColumn::CreatedAt => self.order.apply(a.created_at.cmp(&b.created_at)),
            SortColumn::UpdatedAt => self.order.apply(a.updated_at.cmp(&b.updated_at)),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

fn nulls_last<T: Ord>(a: Option<T>, b: Option<T>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => order.apply(a.cmp(&b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// `true`, `1` and `yes` (any case) enable a flag; anything else disables it.
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::NewInventoryItem;
    use bytebasket_core::UserId;
    use chrono::Duration;

    fn item(name: &str, category: &str, quantity: i64) -> InventoryItem {
        InventoryItem::create(
            NewInventoryItem {
                foodbank_id: FoodbankId::new(),
                item_name: name.to_string(),
                category: category.to_string(),
                quantity,
                expiration_date: None,
                storage_location: None,
                dietary_category: None,
                barcode: None,
                minimum_stock_level: None,
            },
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    fn params() -> InventoryQueryParams {
        InventoryQueryParams::default()
    }

    #[test]
    fn defaults_when_params_missing_or_invalid() {
        let q = InventoryQuery::parse(&InventoryQueryParams {
            page: Some("zero".to_string()),
            limit: Some("0".to_string()),
            sort_by: Some("password_hash".to_string()),
            sort_order: Some("sideways".to_string()),
            dietary_category: Some("carnivore".to_string()),
            foodbank_id: Some("not-a-uuid".to_string()),
            ..params()
        });

        assert_eq!(q.page, PageRequest::default());
        assert_eq!(q.sort, SortSpec::new(SortColumn::CreatedAt, SortOrder::Desc));
        assert_eq!(q.filter.dietary_category, None);
        assert_eq!(q.filter.foodbank_id, None);
    }

    #[test]
    fn limit_is_capped() {
        let page = PageRequest::parse(Some("3"), Some("5000"));
        assert_eq!(page.limit, bytebasket_core::page::MAX_LIMIT);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn flags_accept_common_spellings() {
        for on in ["true", "TRUE", "1", "yes"] {
            assert!(parse_flag(Some(on)), "{on}");
        }
        for off in ["false", "0", "no", ""] {
            assert!(!parse_flag(Some(off)), "{off}");
        }
        assert!(!parse_flag(None));
    }

    #[test]
    fn category_filter_is_case_insensitive_equality() {
        let filter = InventoryFilter::parse(&InventoryQueryParams {
            category: Some("grains".to_string()),
            ..params()
        });
        let now = Utc::now();
        assert!(filter.matches(&item("Rice", "Grains", 5), now));
        assert!(!filter.matches(&item("Rice", "Whole Grains", 5), now));
    }

    #[test]
    fn search_matches_name_or_category() {
        let filter = InventoryFilter::parse(&InventoryQueryParams {
            search: Some("RIC".to_string()),
            ..params()
        });
        let now = Utc::now();
        assert!(filter.matches(&item("Brown rice", "Grains", 5), now));
        assert!(filter.matches(&item("Beans", "Rice & Legumes", 5), now));
        assert!(!filter.matches(&item("Beans", "Canned", 5), now));
    }

    #[test]
    fn low_stock_and_expiring_flags_filter() {
        let now = Utc::now();
        let low = item("Milk", "Dairy", 2);
        let plenty = item("Flour", "Baking", 200);
        let mut expiring = item("Bread", "Bakery", 200);
        expiring.expiration_date = Some(now + Duration::days(2));

        let low_only = InventoryFilter {
            low_stock_only: true,
            ..Default::default()
        };
        assert!(low_only.matches(&low, now));
        assert!(!low_only.matches(&plenty, now));

        let soon = InventoryFilter {
            expiring_soon: true,
            ..Default::default()
        };
        assert!(soon.matches(&expiring, now));
        assert!(!soon.matches(&plenty, now));
    }

    #[test]
    fn absent_values_sort_last_both_ways() {
        let now = Utc::now();
        let mut dated = item("A", "X", 1);
        dated.expiration_date = Some(now);
        let undated = item("B", "X", 1);

        for order in [SortOrder::Asc, SortOrder::Desc] {
            let spec = SortSpec::new(SortColumn::ExpirationDate, order);
            assert_eq!(spec.compare(&dated, &undated), Ordering::Less);
        }
    }

    #[test]
    fn ties_break_on_id() {
        let a = item("Same", "X", 1);
        let b = item("same", "X", 1);
        let spec = SortSpec::new(SortColumn::ItemName, SortOrder::Desc);
        assert_eq!(spec.compare(&a, &b), a.id.cmp(&b.id));
    }

    #[test]
    fn sort_by_quantity_ascending() {
        let mut items = vec![item("a", "x", 30), item("b", "x", 10), item("c", "x", 20)];
        let spec = SortSpec::parse(Some("quantity"), Some("asc"));
        items.sort_by(|a, b| spec.compare(a, b));
        let quantities: Vec<i64> = items.iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, vec![10, 20, 30]);
    }

}
