use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Json, Path, Query, State},
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde_json::Value;

use crate::{
    auth,
    cqrs::{
        AddProductCommand, CommandHandler, DeleteProductCommand, GetAllProductsQuery, GetVentureProductsQuery,
        QueryHandler, UpdateProductCommand,
    },
    dtos::{ApiError, ProductFilter},
    errors::ServiceError,
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route(
            "/emprendimientos/{id}/agregar_producto",
            post(add_product).route_layer(from_fn_with_state(state.clone(), auth::authentication_middleware)),
        )
        .route(
            "/emprendimientos/{id}/actualizar_producto",
            put(update_product).route_layer(from_fn_with_state(state.clone(), auth::authentication_middleware)),
        )
        .route(
            "/emprendimientos/{id}/borrar_producto",
            delete(delete_product).route_layer(from_fn_with_state(state.clone(), auth::authentication_middleware)),
        )
        .route("/emprendimientos/{id}/productos", get(get_venture_products))
        .route("/productos", get(get_all_products))
        .with_state(state)
}

pub async fn index() -> &'static str {
    "OK"
}

/// Keeps the rejection's own status (400, 415, 422) with the usual error body.
fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, Response> {
    body.map(|Json(value)| value).map_err(|rejection| {
        let error = format!("Cuerpo JSON invalido: {}", rejection.body_text());
        (rejection.status(), Json(ApiError { error })).into_response()
    })
}

fn respond<R: serde::Serialize>(status: StatusCode, result: Result<R, ServiceError>) -> Response {
    match result {
        Ok(response) => (status, Json(response)).into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn add_product(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let command = AddProductCommand { venture_id: id, body };

    respond(StatusCode::CREATED, state.add_product_command_handler.handle(&command).await)
}

pub async fn update_product(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let command = UpdateProductCommand { venture_id: id, body };

    respond(StatusCode::OK, state.update_product_command_handler.handle(&command).await)
}

pub async fn delete_product(
    Path(id): Path<String>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let body = match json_body(body) {
        Ok(body) => body,
        Err(rejection) => return rejection,
    };
    let command = DeleteProductCommand { venture_id: id, body };

    respond(StatusCode::OK, state.delete_product_command_handler.handle(&command).await)
}

pub async fn get_venture_products(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    let query = GetVentureProductsQuery { venture_id: id };

    respond(StatusCode::OK, state.get_venture_products_query_handler.handle(&query).await)
}

pub async fn get_all_products(Query(filter): Query<ProductFilter>, State(state): State<Arc<AppState>>) -> Response {
    let query = GetAllProductsQuery { name: filter.nombre };

    respond(StatusCode::OK, state.get_all_products_query_handler.handle(&query).await)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::AuthSettings,
        domain::{fixtures::product_value, Venture},
        metrics::ProductMetrics,
        repositories::{InMemoryVentureRepository, VentureRepository},
    };

    struct TestApp {
        repo: Arc<InMemoryVentureRepository>,
        router: Router,
    }

    fn app_with(ventures: Vec<Venture>, auth: Option<AuthSettings>) -> TestApp {
        let repo = Arc::new(InMemoryVentureRepository::with_ventures(ventures));
        let state = Arc::new(AppState::new(
            repo.clone(),
            Arc::new(ProductMetrics::new().unwrap()),
            auth,
        ));
        TestApp {
            repo,
            router: router(state),
        }
    }

    fn app(ventures: Vec<Venture>) -> TestApp {
        app_with(ventures, None)
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    fn new_product(name: &str) -> Value {
        json!({
            "nombre": name,
            "descripcion": "Pan de masa madre",
            "flgDisponible": true,
            "categoria": "panaderia",
            "precio": 4.5,
            "images": ["pan.png"],
            "cantidadFavoritos": 0
        })
    }

    async fn stored(app: &TestApp, id: &str) -> Vec<Value> {
        app.repo.find_venture(id).await.unwrap().unwrap().products
    }

    #[tokio::test]
    async fn add_product_returns_created() {
        let app = app(vec![Venture::new("v1", vec![])]);

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/emprendimientos/v1/agregar_producto",
            Some(new_product("Pan")),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({"message": "Producto agregado exitosamente"}));
        let products = stored(&app, "v1").await;
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["nombre"], json!("Pan"));
    }

    #[tokio::test]
    async fn add_product_missing_field_leaves_list_unchanged() {
        let app = app(vec![Venture::new("v1", vec![product_value("A", 10.0)])]);
        let mut body = new_product("Pan");
        body.as_object_mut().unwrap().remove("precio");

        let (status, body) = send(&app.router, Method::POST, "/emprendimientos/v1/agregar_producto", Some(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "El campo precio es obligatorio"}));
        assert_eq!(stored(&app, "v1").await, vec![product_value("A", 10.0)]);
    }

    #[tokio::test]
    async fn add_product_to_unknown_venture_is_not_found() {
        let app = app(vec![]);

        let (status, body) = send(
            &app.router,
            Method::POST,
            "/emprendimientos/v404/agregar_producto",
            Some(new_product("Pan")),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Emprendimiento no encontrado"}));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let app = app(vec![Venture::new("v1", vec![])]);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/emprendimientos/v1/agregar_producto")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{nombre"))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_without_json_content_type_is_unsupported() {
        let app = app(vec![Venture::new("v1", vec![])]);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/emprendimientos/v1/agregar_producto")
            .body(Body::from(new_product("Pan").to_string()))
            .unwrap();

        let response = app.router.clone().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].is_string());
        assert!(stored(&app, "v1").await.is_empty());
    }

    #[tokio::test]
    async fn listings_return_stored_products_untouched() {
        let legacy = json!({"nombre": "Vela", "precio": 10, "color": "rojo"});
        let app = app(vec![Venture::new("v1", vec![legacy.clone(), product_value("B", 2.0)])]);

        let (status, body) = send(&app.router, Method::GET, "/emprendimientos/v1/productos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([legacy.clone(), product_value("B", 2.0)]));

        let (status, body) = send(&app.router, Method::GET, "/productos?nombre=Vela", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([legacy]));
    }

    #[tokio::test]
    async fn update_product_changes_only_given_fields() {
        let app = app(vec![Venture::new("v1", vec![product_value("A", 10.0), product_value("B", 20.0)])]);

        let (status, body) = send(
            &app.router,
            Method::PUT,
            "/emprendimientos/v1/actualizar_producto",
            Some(json!({"nombre": "A", "precio": 15})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Producto actualizado exitosamente"}));
        assert_eq!(stored(&app, "v1").await, vec![product_value("A", 15.0), product_value("B", 20.0)]);
    }

    #[tokio::test]
    async fn update_unknown_product_is_not_found() {
        let app = app(vec![Venture::new("v1", vec![product_value("A", 10.0)])]);

        let (status, body) = send(
            &app.router,
            Method::PUT,
            "/emprendimientos/v1/actualizar_producto",
            Some(json!({"nombre": "Z", "precio": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "Producto no encontrado"}));
        assert_eq!(stored(&app, "v1").await, vec![product_value("A", 10.0)]);
    }

    #[tokio::test]
    async fn update_without_name_is_a_bad_request() {
        let app = app(vec![Venture::new("v1", vec![product_value("A", 10.0)])]);

        let (status, _) = send(
            &app.router,
            Method::PUT,
            "/emprendimientos/v1/actualizar_producto",
            Some(json!({"precio": 1})),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_removes_all_duplicates() {
        let app = app(vec![Venture::new(
            "v1",
            vec![product_value("A", 1.0), product_value("A", 2.0), product_value("B", 3.0)],
        )]);

        let (status, body) = send(
            &app.router,
            Method::DELETE,
            "/emprendimientos/v1/borrar_producto",
            Some(json!({"nombre": "A"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"message": "Producto eliminado exitosamente"}));
        assert_eq!(stored(&app, "v1").await, vec![product_value("B", 3.0)]);
    }

    #[tokio::test]
    async fn delete_of_absent_name_is_ok() {
        let app = app(vec![Venture::new("v1", vec![product_value("B", 3.0)])]);

        let (status, _) = send(
            &app.router,
            Method::DELETE,
            "/emprendimientos/v1/borrar_producto",
            Some(json!({"nombre": "A"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored(&app, "v1").await, vec![product_value("B", 3.0)]);
    }

    #[tokio::test]
    async fn delete_on_unknown_venture_is_not_found() {
        let app = app(vec![]);

        let (status, _) = send(
            &app.router,
            Method::DELETE,
            "/emprendimientos/v1/borrar_producto",
            Some(json!({"nombre": "A"})),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_venture_products() {
        let app = app(vec![Venture::new("v1", vec![product_value("A", 1.0)]), Venture::new("empty", vec![])]);

        let (status, body) = send(&app.router, Method::GET, "/emprendimientos/v1/productos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::to_value(vec![product_value("A", 1.0)]).unwrap());

        let (status, body) = send(&app.router, Method::GET, "/emprendimientos/empty/productos", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));

        let (status, _) = send(&app.router, Method::GET, "/emprendimientos/missing/productos", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_all_products_with_and_without_filter() {
        let app = app(vec![
            Venture::new("v1", vec![product_value("A", 1.0), product_value("B", 2.0)]),
            Venture::new("v2", vec![product_value("A", 3.0)]),
        ]);

        let (status, body) = send(&app.router, Method::GET, "/productos?nombre=A", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::to_value(vec![product_value("A", 1.0), product_value("A", 3.0)]).unwrap());

        let (_, body) = send(&app.router, Method::GET, "/productos", None).await;
        assert_eq!(
            body,
            serde_json::to_value(vec![product_value("A", 1.0), product_value("B", 2.0), product_value("A", 3.0)]).unwrap()
        );

        let (status, body) = send(&app.router, Method::GET, "/productos?nombre=Z", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn configured_auth_rejects_requests_without_token() {
        let app = app_with(
            vec![Venture::new("v1", vec![])],
            Some(AuthSettings {
                domain: String::from("https://tenant.example"),
                audience: String::from("products-api"),
            }),
        );

        let (status, _) = send(
            &app.router,
            Method::POST,
            "/emprendimientos/v1/agregar_producto",
            Some(new_product("Pan")),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(stored(&app, "v1").await.is_empty());

        let (status, _) = send(&app.router, Method::GET, "/emprendimientos/v1/productos", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
