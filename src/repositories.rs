use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, to_document, Bson, DateTime as BsonDateTime, Document},
    Client, Collection,
};
use serde_json::Value;
use std::{path::Path, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{event, Level};

use crate::domain::{product_name, Product, ProductPatch, Venture};

const PRODUCTS_FIELD: &str = "productos";

#[derive(Debug)]
pub struct MongoDbInitializationInfo {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database operation failed: {0}")]
    Database(#[from] mongodb::error::Error),
    #[error("failed to encode document: {0}")]
    Encoding(#[from] mongodb::bson::ser::Error),
    #[error("failed to read venture seed file: {0}")]
    SeedIo(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence boundary for ventures and their embedded products. Every
/// mutation is a single-document write, so each call is atomic at the store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VentureRepository: Send + Sync {
    async fn find_venture(&self, venture_id: &str) -> Result<Option<Venture>, StoreError>;

    /// Array-union append: an element identical to an existing one is not
    /// added twice. Returns false when the venture does not exist.
    async fn append_product(&self, venture_id: &str, product: &Product) -> Result<bool, StoreError>;

    /// Applies `patch` to the first product whose name matches. Returns false
    /// when the venture holds no such product.
    async fn update_first_product(&self, venture_id: &str, patch: &ProductPatch) -> Result<bool, StoreError>;

    /// Removes every product whose name matches.
    async fn remove_products(&self, venture_id: &str, name: &str) -> Result<(), StoreError>;

    async fn list_ventures(&self) -> Result<Vec<Venture>, StoreError>;
}

#[derive(Clone, Default)]
pub struct InMemoryVentureRepository {
    ventures: Arc<Mutex<Vec<Venture>>>,
}

impl InMemoryVentureRepository {
    pub fn new() -> Self {
        InMemoryVentureRepository::default()
    }

    pub fn with_ventures(ventures: Vec<Venture>) -> Self {
        InMemoryVentureRepository {
            ventures: Arc::new(Mutex::new(ventures)),
        }
    }

    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let ventures: Vec<Venture> = serde_json::from_str(&raw)?;
        event!(Level::INFO, count = ventures.len(), "Seeded in-memory venture store");
        Ok(InMemoryVentureRepository::with_ventures(ventures))
    }
}

#[async_trait]
impl VentureRepository for InMemoryVentureRepository {
    async fn find_venture(&self, venture_id: &str) -> Result<Option<Venture>, StoreError> {
        let lock = self.ventures.lock().await;
        Ok(lock.iter().find(|v| v.id == venture_id).cloned())
    }

    async fn append_product(&self, venture_id: &str, product: &Product) -> Result<bool, StoreError> {
        let product = serde_json::to_value(product)?;
        let mut lock = self.ventures.lock().await;

        match lock.iter_mut().find(|v| v.id == venture_id) {
            Some(venture) => {
                if !venture.products.contains(&product) {
                    venture.products.push(product);
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_first_product(&self, venture_id: &str, patch: &ProductPatch) -> Result<bool, StoreError> {
        let mut lock = self.ventures.lock().await;
        let target = lock
            .iter_mut()
            .find(|v| v.id == venture_id)
            .and_then(|v| v.products.iter_mut().find(|p| product_name(p) == Some(patch.name.as_str())));

        match target {
            Some(product) => {
                patch.apply_to(product)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove_products(&self, venture_id: &str, name: &str) -> Result<(), StoreError> {
        let mut lock = self.ventures.lock().await;
        if let Some(venture) = lock.iter_mut().find(|v| v.id == venture_id) {
            venture.products.retain(|p| product_name(p) != Some(name));
        }
        Ok(())
    }

    async fn list_ventures(&self) -> Result<Vec<Venture>, StoreError> {
        let lock = self.ventures.lock().await;
        Ok(lock.clone())
    }
}

#[derive(Clone)]
pub struct MongoDbVentureRepository {
    venture_collection: Collection<Document>,
}

impl MongoDbVentureRepository {
    pub async fn new(info: &MongoDbInitializationInfo) -> Result<Self, StoreError> {
        let client = Client::with_uri_str(&info.uri).await?;
        let database = client.database(&info.database);

        event!(
            Level::INFO,
            database = %info.database,
            collection = %info.collection,
            "Connected to MongoDB"
        );

        Ok(MongoDbVentureRepository {
            venture_collection: database.collection(&info.collection),
        })
    }
}

/// Plain JSON for a stored value: dates become RFC 3339 strings, numbers keep
/// their stored kind, anything without a JSON counterpart uses extended JSON.
fn bson_to_json(value: Bson) -> Value {
    match value {
        Bson::Null => Value::Null,
        Bson::Boolean(b) => Value::Bool(b),
        Bson::Int32(i) => Value::from(i),
        Bson::Int64(i) => Value::from(i),
        Bson::Double(f) => serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number),
        Bson::String(s) => Value::String(s),
        Bson::Array(items) => Value::Array(items.into_iter().map(bson_to_json).collect()),
        Bson::Document(fields) => Value::Object(fields.into_iter().map(|(k, v)| (k, bson_to_json(v))).collect()),
        Bson::DateTime(dt) => match dt.try_to_rfc3339_string() {
            Ok(text) => Value::String(text),
            Err(_) => Bson::DateTime(dt).into_relaxed_extjson(),
        },
        other => other.into_relaxed_extjson(),
    }
}

fn venture_from_document(mut document: Document) -> Venture {
    let id = match document.remove("_id") {
        Some(Bson::String(id)) => id,
        Some(Bson::ObjectId(id)) => id.to_hex(),
        Some(other) => other.to_string(),
        None => String::new(),
    };

    let products = match document.remove(PRODUCTS_FIELD) {
        Some(Bson::Array(items)) => items.into_iter().map(bson_to_json).collect(),
        None => Vec::new(),
        Some(other) => {
            event!(Level::WARN, venture_id = %id, "Ignoring non-array productos field: {}", other);
            Vec::new()
        }
    };

    Venture { id, products }
}

/// `$addToSet` of the encoded product, with `createdAt` stored as a BSON date.
fn append_update(product: &Product) -> Result<Document, StoreError> {
    let mut encoded = to_document(product)?;
    encoded.insert(
        "createdAt",
        BsonDateTime::from_millis(product.created_at.timestamp_millis()),
    );

    let mut products = Document::new();
    products.insert(PRODUCTS_FIELD, encoded);
    Ok(doc! { "$addToSet": products })
}

/// Matches the venture only when it holds a product with the name; the
/// positional `$` in [`set_update`] needs this array condition.
fn update_filter(venture_id: &str, name: &str) -> Document {
    let mut filter = doc! { "_id": venture_id };
    filter.insert(format!("{}.nombre", PRODUCTS_FIELD), name);
    filter
}

/// `$set` targeting the first array element matched by [`update_filter`].
fn set_update(patch: &ProductPatch) -> Result<Document, StoreError> {
    let mut set = Document::new();
    set.insert(format!("{}.$.nombre", PRODUCTS_FIELD), patch.name.clone());
    for (field, value) in to_document(patch)? {
        if field != "nombre" {
            set.insert(format!("{}.$.{}", PRODUCTS_FIELD, field), value);
        }
    }
    Ok(doc! { "$set": set })
}

/// `$pull` removes every element matching the condition, not only the first.
fn pull_update(name: &str) -> Document {
    let mut products = Document::new();
    products.insert(PRODUCTS_FIELD, doc! { "nombre": name });
    doc! { "$pull": products }
}

#[async_trait]
impl VentureRepository for MongoDbVentureRepository {
    async fn find_venture(&self, venture_id: &str) -> Result<Option<Venture>, StoreError> {
        let found = self
            .venture_collection
            .find_one(doc! { "_id": venture_id })
            .await?;
        Ok(found.map(venture_from_document))
    }

    async fn append_product(&self, venture_id: &str, product: &Product) -> Result<bool, StoreError> {
        let result = self
            .venture_collection
            .update_one(doc! { "_id": venture_id }, append_update(product)?)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn update_first_product(&self, venture_id: &str, patch: &ProductPatch) -> Result<bool, StoreError> {
        let result = self
            .venture_collection
            .update_one(update_filter(venture_id, &patch.name), set_update(patch)?)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn remove_products(&self, venture_id: &str, name: &str) -> Result<(), StoreError> {
        self.venture_collection
            .update_one(doc! { "_id": venture_id }, pull_update(name))
            .await?;
        Ok(())
    }

    async fn list_ventures(&self) -> Result<Vec<Venture>, StoreError> {
        let mut ventures = Vec::new();
        let mut cursor = self.venture_collection.find(doc! {}).await?;

        while let Some(document) = cursor.try_next().await? {
            ventures.push(venture_from_document(document));
        }

        Ok(ventures)
    }
}
