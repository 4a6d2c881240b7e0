use std::sync::Arc;

use crate::{
    auth::AuthSettings,
    cqrs::{
        AddProductCommandHandler, DeleteProductCommandHandler, GetAllProductsQueryHandler,
        GetVentureProductsQueryHandler, UpdateProductCommandHandler,
    },
    metrics::ProductMetrics,
    repositories::VentureRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub add_product_command_handler: Arc<AddProductCommandHandler>,
    pub update_product_command_handler: Arc<UpdateProductCommandHandler>,
    pub delete_product_command_handler: Arc<DeleteProductCommandHandler>,
    pub get_venture_products_query_handler: Arc<GetVentureProductsQueryHandler>,
    pub get_all_products_query_handler: Arc<GetAllProductsQueryHandler>,
    pub auth: Option<AuthSettings>,
}

impl AppState {
    /// Wires every handler to the same venture store.
    pub fn new(
        repository: Arc<dyn VentureRepository>,
        metrics: Arc<ProductMetrics>,
        auth: Option<AuthSettings>,
    ) -> AppState {
        AppState {
            add_product_command_handler: Arc::new(AddProductCommandHandler::new(repository.clone(), metrics.clone())),
            update_product_command_handler: Arc::new(UpdateProductCommandHandler::new(
                repository.clone(),
                metrics.clone(),
            )),
            delete_product_command_handler: Arc::new(DeleteProductCommandHandler::new(
                repository.clone(),
                metrics.clone(),
            )),
            get_venture_products_query_handler: Arc::new(GetVentureProductsQueryHandler::new(
                repository.clone(),
                metrics.clone(),
            )),
            get_all_products_query_handler: Arc::new(GetAllProductsQueryHandler::new(repository, metrics)),
            auth,
        }
    }
}
