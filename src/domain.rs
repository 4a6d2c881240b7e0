use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A venture as read from the store. Products are kept as stored so that
/// listings return them untouched, whatever fields they carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venture {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "productos", default)]
    pub products: Vec<Value>,
}

impl Venture {
    pub fn new(id: impl Into<String>, products: Vec<Value>) -> Self {
        Venture {
            id: id.into(),
            products,
        }
    }
}

pub fn product_name(product: &Value) -> Option<&str> {
    product.get("nombre").and_then(Value::as_str)
}

/// A sellable item as written by the add operation. `name` is the lookup
/// key, but nothing prevents two entries from sharing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "flgDisponible")]
    pub available: bool,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "precio")]
    pub price: f64,
    pub images: Vec<String>,
    #[serde(rename = "cantidadFavoritos")]
    pub favorite_count: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

/// Partial update for the first product named `name`. Only the fields listed
/// here may change; the name itself never does.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductPatch {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "flgDisponible", default, skip_serializing_if = "Option::is_none")]
    pub available: Option<bool>,
    #[serde(rename = "categoria", default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "precio", default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(rename = "cantidadFavoritos", default, skip_serializing_if = "Option::is_none")]
    pub favorite_count: Option<i64>,
}

impl ProductPatch {
    /// Present fields keyed by wire name, without `nombre`.
    pub fn changes(&self) -> Result<Map<String, Value>, serde_json::Error> {
        let mut fields = match serde_json::to_value(self)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        fields.remove("nombre");
        Ok(fields)
    }

    pub fn apply_to(&self, product: &mut Value) -> Result<(), serde_json::Error> {
        if let Value::Object(target) = product {
            target.extend(self.changes()?);
        }
        Ok(())
    }
}
