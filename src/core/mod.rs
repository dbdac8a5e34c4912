pub mod aggregate;
pub mod engine;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod serializer;
pub mod validator;

pub use crate::domain::model::{
    AggregateDocument, CategoryMode, ChannelRecord, ExtractResult, FetchError, FetchResult,
    RunReport, SourceDescriptor, SourceReport, TransformResult, ValidationOutcome, Verdict,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
