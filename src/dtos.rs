use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::ProductPatch,
    errors::{ServiceError, NAME_REQUIRED},
};

pub trait Response {}

/// Fields an add request must carry, in the order they are checked.
pub const REQUIRED_PRODUCT_FIELDS: [&str; 7] = [
    "nombre",
    "descripcion",
    "flgDisponible",
    "categoria",
    "precio",
    "images",
    "cantidadFavoritos",
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddProductRequest {
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
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeleteProductRequest {
    #[serde(rename = "nombre")]
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub nombre: Option<String>,
}

fn as_object(body: &Value) -> Result<&serde_json::Map<String, Value>, ServiceError> {
    body.as_object()
        .ok_or_else(|| ServiceError::Validation(String::from("El cuerpo de la solicitud debe ser un objeto JSON")))
}

fn decode<T: DeserializeOwned>(body: Value) -> Result<T, ServiceError> {
    serde_json::from_value(body).map_err(|e| ServiceError::Validation(format!("Solicitud invalida: {}", e)))
}

impl AddProductRequest {
    pub fn from_body(body: Value) -> Result<Self, ServiceError> {
        let object = as_object(&body)?;
        if let Some(missing) = REQUIRED_PRODUCT_FIELDS.iter().find(|f| !object.contains_key(**f)) {
            return Err(ServiceError::missing_field(missing));
        }
        decode(body)
    }
}

impl DeleteProductRequest {
    pub fn from_body(body: Value) -> Result<Self, ServiceError> {
        if !as_object(&body)?.contains_key("nombre") {
            return Err(ServiceError::Validation(String::from(NAME_REQUIRED)));
        }
        decode(body)
    }
}

pub fn patch_from_body(body: Value) -> Result<ProductPatch, ServiceError> {
    if !as_object(&body)?.contains_key("nombre") {
        return Err(ServiceError::Validation(String::from(NAME_REQUIRED)));
    }
    decode(body)
}

#[derive(Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
impl Response for MessageResponse {}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        MessageResponse {
            message: String::from(message),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProductsResponse {
    pub products: Vec<Value>,
}
impl Response for ProductsResponse {}

#[derive(Deserialize, Serialize)]
pub struct ApiError {
    pub error: String,
}
impl Response for ApiError {}
