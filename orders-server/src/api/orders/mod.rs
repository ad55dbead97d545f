//! Order API Module
//!
//! | Path | Method | Meaning |
//! |------|--------|---------|
//! | /orders | POST | Create an order |
//! | /orders?page=<cursor> | GET | One page of orders |
//! | /orders/{id} | GET | Order detail |
//! | /orders/{id} | PUT | Advance status (`shipped` / `completed`) |
//! | /orders/{id} | DELETE | Delete an order |

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new().nest("/orders", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(handler::create).get(handler::list))
        .route(
            "/{id}",
            get(handler::get_by_id)
                .put(handler::update_status)
                .delete(handler::delete),
        )
}
