pub mod config;
pub mod dispatcher;
pub mod extractor;
pub mod gaps;
pub mod handlers;
pub mod ingest;
pub mod json;
pub mod llm;
pub mod manager;
pub mod nlp;
pub mod schema;
pub mod service;
pub mod summary;
pub mod tokens;
pub mod types;

pub use dispatcher::AgentDispatcher;
pub use extractor::TaskCandidate;
pub use gaps::KnowledgeGapAnalyzer;
pub use ingest::{IngestQueue, IngestStatus, IngestTicket, IngestWorker, SubmitOutcome};
pub use manager::{ProjectManager, ProjectManagerBuilder};
pub use nlp::LanguageAnalyzer;
pub use service::{AnalysisArtifact, AnalysisService};
pub use summary::SummarySynthesizer;
pub use types::*;
