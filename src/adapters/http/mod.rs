//! HTTP inbound adapter.
//!
//! Every studio operation is `POST /api/<operation>` with a JSON body and
//! passes the request pipeline before it runs.

mod caller;
mod handlers;
mod routes;
mod state;

pub use caller::CallerKey;
pub use routes::create_router;
pub use state::AppState;
