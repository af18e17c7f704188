//! REST surface for polling clients.

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::extract::Extension;
use axum::routing::{get, post, put};

use crate::chat::MessageBoard;
use crate::presence::PresenceTracker;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct ApiState {
    pub tracker: Arc<PresenceTracker>,
    pub board: Arc<MessageBoard>,
}

impl ApiState {
    pub fn new(tracker: Arc<PresenceTracker>, board: Arc<MessageBoard>) -> Self {
        Self { tracker, board }
    }
}

/// Create chat routes
pub fn routes(state: ApiState) -> Router {
    Router::new()
        .route(
            "/participants",
            get(handlers::list_participants).post(handlers::register),
        )
        .route("/status", post(handlers::heartbeat))
        .route(
            "/messages",
            get(handlers::list_messages).post(handlers::post_message),
        )
        .route(
            "/messages/:id",
            put(handlers::edit_message).delete(handlers::delete_message),
        )
        .layer(Extension(state))
}
