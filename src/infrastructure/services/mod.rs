//! Infrastructure services

mod rag_service;

pub use rag_service::{
    AnalyzeOptions, CollectionInfo, CollectionStatus, CorrectiveRagService, IngestionSummary,
    SYSTEM_TYPE,
};
