use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{event, Level};

use crate::{
    domain::{product_name, Product, Venture},
    dtos::{patch_from_body, AddProductRequest, DeleteProductRequest, MessageResponse, ProductsResponse, Response},
    errors::{ServiceError, PRODUCT_NOT_FOUND},
    metrics::{Outcome, ProductMetrics},
    repositories::VentureRepository,
};

pub const PRODUCT_ADDED: &str = "Producto agregado exitosamente";
pub const PRODUCT_UPDATED: &str = "Producto actualizado exitosamente";
pub const PRODUCT_DELETED: &str = "Producto eliminado exitosamente";

// traits
pub trait Command {}
pub trait Query {}

pub(crate) trait CommandHandler<C: Command, R: Response> {
    async fn handle(&self, input: &C) -> Result<R, ServiceError>;
}

pub(crate) trait QueryHandler<Q: Query, R: Response> {
    async fn handle(&self, input: &Q) -> Result<R, ServiceError>;
}

// commands
pub struct AddProductCommand {
    pub venture_id: String,
    pub body: Value,
}
impl Command for AddProductCommand {}

pub struct UpdateProductCommand {
    pub venture_id: String,
    pub body: Value,
}
impl Command for UpdateProductCommand {}

pub struct DeleteProductCommand {
    pub venture_id: String,
    pub body: Value,
}
impl Command for DeleteProductCommand {}

// queries
pub struct GetVentureProductsQuery {
    pub venture_id: String,
}
impl Query for GetVentureProductsQuery {}

pub struct GetAllProductsQuery {
    pub name: Option<String>,
}
impl Query for GetAllProductsQuery {}

async fn require_venture(repository: &dyn VentureRepository, venture_id: &str) -> Result<Venture, ServiceError> {
    match repository.find_venture(venture_id).await? {
        Some(venture) => Ok(venture),
        None => {
            event!(Level::DEBUG, venture_id = %venture_id, "Venture not found");
            Err(ServiceError::venture_not_found())
        }
    }
}

fn observe<R>(metrics: &ProductMetrics, operation: &str, result: Result<R, ServiceError>) -> Result<R, ServiceError> {
    let outcome = match &result {
        Ok(_) => Outcome::Success,
        Err(ServiceError::Store(e)) => {
            event!(Level::ERROR, operation = %operation, "Venture store failure: {}", e);
            Outcome::Failed
        }
        Err(_) => Outcome::Rejected,
    };
    metrics.record(operation, outcome);
    result
}

// command handlers
#[derive(Clone)]
pub struct AddProductCommandHandler {
    repository: Arc<dyn VentureRepository>,
    metrics: Arc<ProductMetrics>,
}

impl AddProductCommandHandler {
    pub fn new(repository: Arc<dyn VentureRepository>, metrics: Arc<ProductMetrics>) -> Self {
        AddProductCommandHandler { repository, metrics }
    }

    async fn add(&self, input: &AddProductCommand) -> Result<MessageResponse, ServiceError> {
        let request = AddProductRequest::from_body(input.body.clone())?;
        require_venture(self.repository.as_ref(), &input.venture_id).await?;

        let product = Product {
            name: request.name,
            description: request.description,
            available: request.available,
            category: request.category,
            price: request.price,
            images: request.images,
            favorite_count: request.favorite_count,
            created_at: Utc::now(),
        };

        // The venture may have been removed since the lookup above.
        if !self.repository.append_product(&input.venture_id, &product).await? {
            return Err(ServiceError::venture_not_found());
        }
        event!(Level::INFO, venture_id = %input.venture_id, product = %product.name, "Product added");

        Ok(MessageResponse::new(PRODUCT_ADDED))
    }
}

impl CommandHandler<AddProductCommand, MessageResponse> for AddProductCommandHandler {
    async fn handle(&self, input: &AddProductCommand) -> Result<MessageResponse, ServiceError> {
        observe(&self.metrics, "add_product", self.add(input).await)
    }
}

#[derive(Clone)]
pub struct UpdateProductCommandHandler {
    repository: Arc<dyn VentureRepository>,
    metrics: Arc<ProductMetrics>,
}

impl UpdateProductCommandHandler {
    pub fn new(repository: Arc<dyn VentureRepository>, metrics: Arc<ProductMetrics>) -> Self {
        UpdateProductCommandHandler { repository, metrics }
    }

    async fn update(&self, input: &UpdateProductCommand) -> Result<MessageResponse, ServiceError> {
        let patch = patch_from_body(input.body.clone())?;
        require_venture(self.repository.as_ref(), &input.venture_id).await?;

        if !self.repository.update_first_product(&input.venture_id, &patch).await? {
            return Err(ServiceError::NotFound(String::from(PRODUCT_NOT_FOUND)));
        }
        event!(Level::INFO, venture_id = %input.venture_id, product = %patch.name, "Product updated");

        Ok(MessageResponse::new(PRODUCT_UPDATED))
    }
}

impl CommandHandler<UpdateProductCommand, MessageResponse> for UpdateProductCommandHandler {
    async fn handle(&self, input: &UpdateProductCommand) -> Result<MessageResponse, ServiceError> {
        observe(&self.metrics, "update_product", self.update(input).await)
    }
}

#[derive(Clone)]
pub struct DeleteProductCommandHandler {
    repository: Arc<dyn VentureRepository>,
    metrics: Arc<ProductMetrics>,
}

impl DeleteProductCommandHandler {
    pub fn new(repository: Arc<dyn VentureRepository>, metrics: Arc<ProductMetrics>) -> Self {
        DeleteProductCommandHandler { repository, metrics }
    }

    async fn delete(&self, input: &DeleteProductCommand) -> Result<MessageResponse, ServiceError> {
        let request = DeleteProductRequest::from_body(input.body.clone())?;
        require_venture(self.repository.as_ref(), &input.venture_id).await?;

        // Succeeds even when nothing matches.
        self.repository.remove_products(&input.venture_id, &request.name).await?;
        event!(Level::INFO, venture_id = %input.venture_id, product = %request.name, "Products deleted");

        Ok(MessageResponse::new(PRODUCT_DELETED))
    }
}

impl CommandHandler<DeleteProductCommand, MessageResponse> for DeleteProductCommandHandler {
    async fn handle(&self, input: &DeleteProductCommand) -> Result<MessageResponse, ServiceError> {
        observe(&self.metrics, "delete_product", self.delete(input).await)
    }
}

// query handlers
#[derive(Clone)]
pub struct GetVentureProductsQueryHandler {
    repository: Arc<dyn VentureRepository>,
    metrics: Arc<ProductMetrics>,
}

impl GetVentureProductsQueryHandler {
    pub fn new(repository: Arc<dyn VentureRepository>, metrics: Arc<ProductMetrics>) -> Self {
        GetVentureProductsQueryHandler { repository, metrics }
    }
}

impl QueryHandler<GetVentureProductsQuery, ProductsResponse> for GetVentureProductsQueryHandler {
    async fn handle(&self, input: &GetVentureProductsQuery) -> Result<ProductsResponse, ServiceError> {
        let result = require_venture(self.repository.as_ref(), &input.venture_id)
            .await
            .map(|venture| ProductsResponse {
                products: venture.products,
            });
        observe(&self.metrics, "list_venture_products", result)
    }
}

#[derive(Clone)]
pub struct GetAllProductsQueryHandler {
    repository: Arc<dyn VentureRepository>,
    metrics: Arc<ProductMetrics>,
}

impl GetAllProductsQueryHandler {
    pub fn new(repository: Arc<dyn VentureRepository>, metrics: Arc<ProductMetrics>) -> Self {
        GetAllProductsQueryHandler { repository, metrics }
    }

    async fn list(&self, input: &GetAllProductsQuery) -> Result<ProductsResponse, ServiceError> {
        let filter = input.name.as_deref().filter(|name| !name.is_empty());
        let products = self
            .repository
            .list_ventures()
            .await?
            .into_iter()
            .flat_map(|venture| venture.products)
            .filter(|product| filter.map_or(true, |name| product_name(product) == Some(name)))
            .collect();

        Ok(ProductsResponse { products })
    }
}

impl QueryHandler<GetAllProductsQuery, ProductsResponse> for GetAllProductsQueryHandler {
    async fn handle(&self, input: &GetAllProductsQuery) -> Result<ProductsResponse, ServiceError> {
        observe(&self.metrics, "list_all_products", self.list(input).await)
    }
}
