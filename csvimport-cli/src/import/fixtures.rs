//! Shared test fixtures

use crate::schema::Schema;

/// A small shop schema exercising every field kind
pub const SHOP_SCHEMA: &str = r#"
[models."shop.Category"]
fields = [
    { name = "title", kind = "text", unique = true },
    { name = "code", kind = "text" },
]

[models."shop.Supplier"]
fields = [
    { name = "name", kind = "text", nullable = false },
    { name = "country", kind = "text" },
]

[models."shop.Tag"]
fields = [
    { name = "name", kind = "text", unique = true },
]

[models."shop.Label"]
fields = [
    { name = "name", kind = "text", unique = true },
]

[models."shop.Item"]
fields = [
    { name = "name", kind = "text", nullable = false },
    { name = "sku", kind = "text", unique = true },
    { name = "price", kind = "DecimalField" },
    { name = "stock", kind = "PositiveIntegerField" },
    { name = "added", kind = "DateField" },
    { name = "category", kind = "ForeignKey", related = "shop.Category", nullable = false },
    { name = "supplier", kind = "ForeignKey", related = "shop.Supplier" },
    { name = "tags", kind = "ManyToManyField", related = "shop.Tag" },
    { name = "labels", kind = "ManyToManyField", related = "shop.Label", through = "shop.ItemLabel" },
]

[models."shop.ItemLabel"]
fields = [
    { name = "item", kind = "foreign_key", related = "shop.Item", nullable = false },
    { name = "label", kind = "foreign_key", related = "shop.Label", nullable = false },
    { name = "weight", kind = "integer" },
]
"#;

pub fn shop_schema() -> Schema {
    Schema::from_toml_str(SHOP_SCHEMA).expect("shop schema is valid")
}

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}
