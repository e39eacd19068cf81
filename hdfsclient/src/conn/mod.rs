//! Session lifecycle: endpoint resolution, shared transports and the
//! bookkeeping that ties file handles to the session they came from.

mod manager;
mod session;

pub use manager::ConnectionManager;
pub use session::Session;
