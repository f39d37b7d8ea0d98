// ============================================================================
// API - actix-web endpoints
// ============================================================================
//
// Read endpoints, one per loading strategy, all returning the same order
// shape except v1 (raw aggregates) and simple-orders (no lines):
// - GET  /api/v1/orders               naive aggregates
// - GET  /api/v2/orders               naive, mapped to DTOs
// - GET  /api/v3/orders               join fetch
// - GET  /api/v3.1/orders             paged to-one join + batched lines
// - GET  /api/v4/orders               projection, one line query per order
// - GET  /api/v5/orders               projection, two steps
// - GET  /api/v6/orders               projection, flat rows grouped
// - GET  /api/simple-orders           orders without lines
// - GET  /api/orders/{id}
//
// Writes:
// - POST /api/orders                  place an order
// - POST /api/orders/{id}/cancel      cancel an order
//
// ============================================================================

mod errors;

use actix_web::{web, App, HttpResponse, HttpServer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::order::OrderStatus;
use crate::service::{OrderService, ServiceError};
use crate::store::{OrderSearch, Page};

pub struct AppState {
    pub service: Arc<OrderService>,
    pub default_page_limit: i64,
}

/// Criteria filter from the query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    pub member_id: Option<Uuid>,
    pub member_name: Option<String>,
    pub order_status: Option<OrderStatus>,
}

impl From<SearchParams> for OrderSearch {
    fn from(params: SearchParams) -> Self {
        OrderSearch {
            member_id: params.member_id,
            member_name: params.member_name,
            order_status: params.order_status,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub member_id: Uuid,
    pub item_id: Uuid,
    pub count: i32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub order_id: Uuid,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/v1/orders", web::get().to(orders_v1))
            .route("/v2/orders", web::get().to(orders_v2))
            .route("/v3/orders", web::get().to(orders_v3))
            .route("/v3.1/orders", web::get().to(orders_v3_page))
            .route("/v4/orders", web::get().to(orders_v4))
            .route("/v5/orders", web::get().to(orders_v5))
            .route("/v6/orders", web::get().to(orders_v6))
            .route("/simple-orders", web::get().to(simple_orders))
            .route("/orders", web::post().to(place_order))
            .route("/orders/{order_id}", web::get().to(find_order))
            .route("/orders/{order_id}/cancel", web::post().to(cancel_order)),
    );
}

/// Start the API server
pub async fn start_api_server(state: web::Data<AppState>, bind: &str) -> std::io::Result<()> {
    tracing::info!("🛒 Starting order API on http://{}/api", bind);

    HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind)?
        .run()
        .await
}

async fn orders_v1(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let orders = state.service.orders_naive(&search.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn orders_v2(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let orders = state.service.order_dtos_naive(&search.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn orders_v3(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let orders = state.service.order_dtos_fetch_join(&search.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn orders_v3_page(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
    page: web::Query<PageParams>,
) -> Result<HttpResponse, ServiceError> {
    let offset = page.offset.unwrap_or(0);
    let limit = page.limit.unwrap_or(state.default_page_limit);
    let orders = state
        .service
        .order_dtos_page(&search.into_inner().into(), offset, limit)
        .await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn orders_v4(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let orders = state.service.order_dtos_per_order(&search.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn orders_v5(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let orders = state.service.order_dtos_two_step(&search.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn orders_v6(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
) -> Result<HttpResponse, ServiceError> {
    let orders = state.service.order_dtos_flat(&search.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn simple_orders(
    state: web::Data<AppState>,
    search: web::Query<SearchParams>,
    page: web::Query<PageParams>,
) -> Result<HttpResponse, ServiceError> {
    let page = match (page.offset, page.limit) {
        (None, None) => None,
        (offset, limit) => Some(
            Page::new(offset.unwrap_or(0), limit.unwrap_or(state.default_page_limit))
                .map_err(crate::loading::LoadError::from)?,
        ),
    };
    let orders = state.service.simple_orders(&search.into_inner().into(), page).await?;
    Ok(HttpResponse::Ok().json(orders))
}

async fn find_order(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ServiceError> {
    let order = state.service.find_order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

async fn place_order(
    state: web::Data<AppState>,
    body: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, ServiceError> {
    let request = body.into_inner();
    let order_id = state
        .service
        .place_order(request.member_id, request.item_id, request.count)
        .await?;
    Ok(HttpResponse::Created().json(PlaceOrderResponse { order_id }))
}

async fn cancel_order(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, ServiceError> {
    state.service.cancel_order(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::test;
    use crate::domain::catalog::Item;
    use crate::domain::member::{Address, Member};
    use crate::loading::projection::{OrderDto, SimpleOrderDto};
    use crate::loading::LoaderConfig;
    use crate::store::InMemoryStore;

    struct Seeded {
        state: web::Data<AppState>,
        member: Member,
        book: Item,
    }

    fn seeded() -> Seeded {
        let store = InMemoryStore::new();
        let member = Member::new("userA", Address::new("Seoul", "1", "1111"));
        let book = Item::book("JPA1 BOOK", 10_000, 100);
        store.insert_member(&member).unwrap();
        store.insert_item(&book).unwrap();

        let service = OrderService::new(Arc::new(store), LoaderConfig::new(2).unwrap());
        let state = web::Data::new(AppState {
            service: Arc::new(service),
            default_page_limit: 100,
        });
        Seeded { state, member, book }
    }

    async fn place(seeded: &Seeded, count: i32) -> Uuid {
        seeded
            .state
            .service
            .place_order(seeded.member.id, seeded.book.id, count)
            .await
            .unwrap()
    }

    #[actix_web::test]
    async fn test_paged_orders() {
        let seeded = seeded();
        let mut ids = Vec::new();
        for count in 1..=5 {
            ids.push(place(&seeded, count).await);
        }
        ids.sort();

        let app = test::init_service(App::new().app_data(seeded.state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v3.1/orders?offset=0&limit=2").to_request();
        let first: Vec<OrderDto> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first.iter().map(|o| o.order_id).collect::<Vec<_>>(), ids[0..2].to_vec());

        let req = test::TestRequest::get().uri("/api/v3.1/orders?offset=4&limit=2").to_request();
        let last: Vec<OrderDto> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(last.len(), 1);

        let req = test::TestRequest::get().uri("/api/v3.1/orders").to_request();
        let all: Vec<OrderDto> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(all.len(), 5);
    }

    #[actix_web::test]
    async fn test_invalid_page_is_bad_request() {
        let seeded = seeded();
        let app = test::init_service(App::new().app_data(seeded.state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v3.1/orders?offset=-1&limit=2").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/api/simple-orders?limit=0").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_every_strategy_returns_the_same_orders() {
        let seeded = seeded();
        place(&seeded, 1).await;
        place(&seeded, 2).await;
        let app = test::init_service(App::new().app_data(seeded.state.clone()).configure(configure)).await;

        let mut results = Vec::new();
        for uri in ["/api/v2/orders", "/api/v3/orders", "/api/v4/orders", "/api/v5/orders", "/api/v6/orders"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let mut orders: Vec<OrderDto> = test::call_and_read_body_json(&app, req).await;
            orders.sort_by_key(|o| o.order_id);
            results.push(orders);
        }
        assert!(results.windows(2).all(|pair| pair[0] == pair[1]));
        assert_eq!(results[0].len(), 2);
    }

    #[actix_web::test]
    async fn test_v1_returns_aggregates_and_search_filters() {
        let seeded = seeded();
        place(&seeded, 1).await;
        let app = test::init_service(App::new().app_data(seeded.state.clone()).configure(configure)).await;

        let req = test::TestRequest::get().uri("/api/v1/orders").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body[0]["member"]["name"], "userA");
        assert_eq!(body[0]["order_items"][0]["item"]["name"], "JPA1 BOOK");

        let req = test::TestRequest::get().uri("/api/simple-orders?memberName=nobody").to_request();
        let none: Vec<SimpleOrderDto> = test::call_and_read_body_json(&app, req).await;
        assert!(none.is_empty());

        let req = test::TestRequest::get().uri("/api/simple-orders?orderStatus=ORDERED").to_request();
        let some: Vec<SimpleOrderDto> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(some.len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v5/orders?memberId={}", seeded.member.id))
            .to_request();
        let own: Vec<OrderDto> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(own.len(), 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/v5/orders?memberId={}", Uuid::now_v7()))
            .to_request();
        let other: Vec<OrderDto> = test::call_and_read_body_json(&app, req).await;
        assert!(other.is_empty());
    }

    #[actix_web::test]
    async fn test_place_and_cancel() {
        let seeded = seeded();
        let app = test::init_service(App::new().app_data(seeded.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(serde_json::json!({
                "memberId": seeded.member.id,
                "itemId": seeded.book.id,
                "count": 2
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let placed: PlaceOrderResponse = test::read_body_json(resp).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/orders/{}/cancel", placed.order_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{}", placed.order_id))
            .to_request();
        let order: OrderDto = test::call_and_read_body_json(&app, req).await;
        assert_eq!(order.order_status, OrderStatus::Cancelled);

        let req = test::TestRequest::post()
            .uri(&format!("/api/orders/{}/cancel", placed.order_id))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[actix_web::test]
    async fn test_insufficient_stock_and_unknown_order() {
        let seeded = seeded();
        let app = test::init_service(App::new().app_data(seeded.state.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/api/orders")
            .set_json(serde_json::json!({
                "memberId": seeded.member.id,
                "itemId": seeded.book.id,
                "count": 101
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::get()
            .uri(&format!("/api/orders/{}", Uuid::now_v7()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
