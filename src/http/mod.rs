//! HTTP control surface
//!
//! Plain GET endpoints so the recorder can be driven from a browser or a
//! one-line `curl`:
//! - GET / - device identity
//! - GET /start, GET /stop - start/stop recording
//! - GET /status - recorder state
//! - GET /set_time?time=<epoch> - set the clock used for file names
//! - GET /list - stored recordings with sizes
//! - GET /download?file=, /delete?file=, /rename?old=&new= - file management
//! - GET /health - health check

mod handlers;
mod routes;
mod state;

pub use handlers::DeviceInfo;
pub use routes::create_router;
pub use state::AppState;
