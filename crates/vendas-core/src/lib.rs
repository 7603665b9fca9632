pub mod ai;
pub mod config;
pub mod context;
pub mod drive;
pub mod sheet;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use ai::{GatewayError, GeminiClient, LlmClient};
pub use config::Config;
pub use context::{build_context, compose, ContextPolicy};
pub use drive::{DriveClient, DriveError, DriveFile};
pub use sheet::{Sheet, SheetSet};
pub use state::{AnalyzeRequest, AnalyzeResponse, ApiError, ChatMessage, ChatRole, FileInfo, ReloadResponse};
pub use store::SheetStore;
