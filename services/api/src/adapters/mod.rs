pub mod db;
pub mod extractor;
pub mod memory_db;
pub mod qa_llm;

pub use db::DbAdapter;
pub use extractor::DocumentTextExtractor;
pub use memory_db::MemoryDb;
pub use qa_llm::OpenAiQaAdapter;
