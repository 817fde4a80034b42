pub mod settings;

pub use settings::{
    AppConfig, CompanyConfig, ConversationConfig, LlmConfig, ServerConfig, Settings,
};
