use crate::query::parse_filters;
use actix_cors::Cors;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer, Result as ActixResult};
use leadx_core::Record;
use leadx_storage::{StorageManager, DEFAULT_PER_PAGE};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const NOT_FILTERABLE: &str = "Model not found or not filterable";

#[derive(Serialize)]
struct PageMeta {
    page: usize,
    per_page: usize,
    total: usize,
    last_page: usize,
}

#[derive(Serialize)]
struct FilterResponse {
    data: Vec<serde_json::Value>,
    meta: PageMeta,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(storage: Arc<StorageManager>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(storage.clone()))
                .configure(Self::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Register the API routes; expects `web::Data<Arc<StorageManager>>`
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/api/entities", web::get().to(list_entities))
            .route("/api/filter/{entity}", web::get().to(filter_entity))
            .route("/api/filter/{entity}/search-criteria", web::get().to(search_criteria));
    }
}

fn not_filterable() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({ "error": NOT_FILTERABLE }))
}

async fn list_entities(storage: web::Data<Arc<StorageManager>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(storage.list_entities()))
}

async fn filter_entity(
    storage: web::Data<Arc<StorageManager>>,
    path: web::Path<String>,
    req: HttpRequest,
) -> ActixResult<HttpResponse> {
    let name = path.into_inner();
    let Some(entity) = storage.entity(&name) else {
        return Ok(not_filterable());
    };

    let (filters, page) = parse_filters(req.query_string());
    debug!(entity = %name, filters = filters.len(), page, "Filtering entity");
    let result = entity.filter_page(&filters, page, DEFAULT_PER_PAGE);

    let response = FilterResponse {
        data: result.records.iter().map(Record::to_json).collect(),
        meta: PageMeta {
            page: result.page,
            per_page: result.per_page,
            total: result.total,
            last_page: result.total.div_ceil(result.per_page).max(1),
        },
    };
    Ok(HttpResponse::Ok().json(response))
}

async fn search_criteria(
    storage: web::Data<Arc<StorageManager>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let name = path.into_inner();
    match storage.entity(&name) {
        Some(entity) => Ok(HttpResponse::Ok().json(entity.search_criteria())),
        None => Ok(not_filterable()),
    }
}
