//! API request, response and error types

pub mod error;
pub mod json;
pub mod rag;

pub use error::{ApiError, ApiErrorResponse};
pub use json::Json;
pub use rag::{
    DirectoryForm, MessageResponse, QueryRequest, QueryResponse, SearchDocument, SearchRequest,
    SearchResponse, ServiceInfo, UploadResponse,
};
