pub mod api_client;
pub mod config;
pub mod dashboard_service;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod quiz_service;
pub mod session_store;

pub use api_client::ApiClient;
pub use config::Config;
pub use dashboard_service::DashboardService;
pub use errors::ClientError;
pub use models::*;
pub use quiz_service::{QuizPhase, QuizService};
pub use session_store::SessionStore;
