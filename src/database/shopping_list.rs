use std::collections::BTreeMap;

use crate::schema::ShoppingListRow;

pub const SHOPPING_LIST_HEADER: &str = "Your shopping cart";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingListItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per (name, unit); the result is ordered by name, then unit.
pub fn aggregate(rows: Vec<ShoppingListRow>) -> Vec<ShoppingListItem> {
    let mut totals: BTreeMap<(String, String), i64> = BTreeMap::new();
    for row in rows {
        *totals.entry((row.name, row.measurement_unit)).or_default() += i64::from(row.amount);
    }

    totals
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingListItem {
            name,
            measurement_unit,
            amount,
        })
        .collect()
}

pub fn render(items: &[ShoppingListItem]) -> String {
    let mut text = format!("{SHOPPING_LIST_HEADER}\n\n");
    for item in items {
        text.push_str(&format!(
            "{} ({}): {}\n",
            item.name, item.measurement_unit, item.amount
        ));
    }
    text
}

pub fn file_name(username: &str) -> String {
    format!("{username}_shopping_list.txt")
}
