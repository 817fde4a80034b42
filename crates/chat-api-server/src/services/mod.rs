pub mod company_data;
pub mod conversation;
pub mod llm_service;
pub mod roi;

pub use company_data::{CompanyData, CompanyDataService};
pub use conversation::ConversationOrchestrator;
pub use llm_service::LlmService;
