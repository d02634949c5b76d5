//! HTTP API Layer
//!
//! This crate provides the REST API for claims batching using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for claims, insurer management, batches and health
//! - **Middleware**: Request ids, tracing and audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! Handlers only talk to the batching ports, so the router runs the same
//! against PostgreSQL and against the in-memory store.
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let app = create_router(AppState::new(ports, health));
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod notifier;
pub mod handlers;
pub mod dto;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use core_kernel::HealthCheckable;
use domain_batching::{BatchingPorts, ClaimIntake};

use crate::handlers::{claims, health, insurers};
use crate::middleware::audit_middleware;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ports: BatchingPorts,
    pub intake: ClaimIntake,
    pub health: Arc<dyn HealthCheckable>,
}

impl AppState {
    pub fn new(ports: BatchingPorts, health: Arc<dyn HealthCheckable>) -> Self {
        Self {
            intake: ClaimIntake::new(ports.clone()),
            ports,
            health,
        }
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let claims_routes = Router::new()
        .route("/", post(claims::submit_claim))
        .route("/:id/cost", get(claims::get_claim_cost));

    let insurer_routes = Router::new()
        .route("/", get(insurers::list_insurers).post(insurers::create_insurer))
        .route(
            "/:id",
            get(insurers::get_insurer)
                .put(insurers::update_insurer)
                .delete(insurers::delete_insurer),
        )
        .route("/:id/batches", get(insurers::list_batches))
        .route("/:id/batch-details", get(insurers::latest_batch_details))
        .route("/:id/batch-details/:batch_date", get(insurers::batch_details_on))
        .route("/:id/optimize", post(insurers::optimize))
        .route("/:id/cost-analysis", get(insurers::cost_analysis))
        .route("/:id/recommendations", get(insurers::recommendations));

    let api_routes = Router::new()
        .nest("/claims", claims_routes)
        .nest("/insurers", insurer_routes)
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
