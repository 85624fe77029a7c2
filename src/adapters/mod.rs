//! Subsystem adapters binding the generic operation pattern to fixed label
//! schemas and result-code vocabularies.
//!
//! | Family | Code source |
//! |---|---|
//! | [`http`] | numeric status |
//! | [`rpc`] | status of the call result |
//! | [`db`], [`api`] | derived from the error |
//! | [`cache`] | hit/miss and success/failure from the error |
//! | [`s3`], [`dynamo`], [`search`], [`worker`] | supplied by the caller |
//! | [`service`] | none, event counter |

pub mod api;
pub mod build_info;
pub mod cache;
pub mod db;
pub mod dynamo;
pub mod http;
pub mod rpc;
pub mod s3;
pub mod search;
pub mod service;
pub mod worker;

pub use api::{ApiCall, ApiCallMetrics, ApiRequestMetrics};
pub use build_info::BuildInfo;
pub use cache::{CacheMetricer, CacheMetrics, CacheRecorder};
pub use db::{DbMetrics, DbQuery};
pub use dynamo::{DynamoMetrics, TableMetrics};
pub use http::{
    track_http, HttpHandlerMetricer, HttpHandlerMetrics, HttpMetrics, UNMATCHED_HANDLER,
};
pub use rpc::{split_method_name, RpcCode, RpcMetrics, RpcStatus};
pub use s3::{BucketMetrics, S3Metrics};
pub use search::{SearchMetrics, SearchProviderMetrics};
pub use service::{Activity, DaemonMetrics, ServiceMetricer, ServiceMetrics};
pub use worker::{QueueMetrics, WorkerMetricer, WorkerMetrics};
