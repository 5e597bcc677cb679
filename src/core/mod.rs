pub mod backend;
pub mod errors;
pub mod helpers;
pub mod query_params;
pub mod remote;
pub mod session;
pub mod static_server;
