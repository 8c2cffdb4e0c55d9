pub mod cache;
pub mod context;
pub mod domain;
pub mod normalize;
pub mod pipeline;
pub mod ports;
pub mod rooms;

pub use cache::{AnswerCache, RETENTION_CAP};
pub use context::{ContextAssembler, EXCERPT_CHARS, HISTORY_TURNS};
pub use domain::{Chat, DocumentRecord, PromptMessage, QaRecord, Role, User, UserCredentials};
pub use normalize::normalize;
pub use pipeline::{ChatPipeline, ChatTurn, PipelineError, StreamOutcome};
pub use ports::{
    DatabaseService, PortError, PortResult, QuestionAnsweringService, TextExtractionService,
    TokenStream,
};
pub use rooms::{ChatRooms, DeletionSummary};
