//! Unary RPC instrumentation.
//!
//! Series are keyed by `{grpc_service, grpc_method}`; the total counter adds
//! the lowercased status code name.

use std::fmt;
use std::future::Future;

use crate::error::Result;
use crate::labels::LabelSet;
use crate::operation::{DurationLabels, Operation, OperationDescriptors, OperationSession};
use crate::registry::{Buckets, MetricDescriptor, MetricsRegistry};

const UNARY: OperationDescriptors = OperationDescriptors {
    in_flight: Some(MetricDescriptor::gauge(
        "grpc_unary_requests_in_flight",
        "The current number of gRPC unary requests being served.",
        &["grpc_service", "grpc_method"],
    )),
    total: MetricDescriptor::counter(
        "grpc_unary_requests_total",
        "Total number of gRPC unary requests made and responded.",
        &["grpc_service", "grpc_method", "grpc_code"],
    ),
    duration: MetricDescriptor::histogram(
        "grpc_unary_requests_duration_seconds",
        "The gRPC unary request latencies in seconds.",
        &["grpc_service", "grpc_method"],
        Buckets::Latency,
    ),
    duration_labels: DurationLabels::Base,
};

/// gRPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RpcCode {
    Ok,
    Canceled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl RpcCode {
    /// Label value for this code.
    pub fn as_str(self) -> &'static str {
        match self {
            RpcCode::Ok => "ok",
            RpcCode::Canceled => "canceled",
            RpcCode::Unknown => "unknown",
            RpcCode::InvalidArgument => "invalidargument",
            RpcCode::DeadlineExceeded => "deadlineexceeded",
            RpcCode::NotFound => "notfound",
            RpcCode::AlreadyExists => "alreadyexists",
            RpcCode::PermissionDenied => "permissiondenied",
            RpcCode::ResourceExhausted => "resourceexhausted",
            RpcCode::FailedPrecondition => "failedprecondition",
            RpcCode::Aborted => "aborted",
            RpcCode::OutOfRange => "outofrange",
            RpcCode::Unimplemented => "unimplemented",
            RpcCode::Internal => "internal",
            RpcCode::Unavailable => "unavailable",
            RpcCode::DataLoss => "dataloss",
            RpcCode::Unauthenticated => "unauthenticated",
        }
    }

    /// Map a wire status number. Out-of-range values are `Unknown`.
    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => RpcCode::Ok,
            1 => RpcCode::Canceled,
            3 => RpcCode::InvalidArgument,
            4 => RpcCode::DeadlineExceeded,
            5 => RpcCode::NotFound,
            6 => RpcCode::AlreadyExists,
            7 => RpcCode::PermissionDenied,
            8 => RpcCode::ResourceExhausted,
            9 => RpcCode::FailedPrecondition,
            10 => RpcCode::Aborted,
            11 => RpcCode::OutOfRange,
            12 => RpcCode::Unimplemented,
            13 => RpcCode::Internal,
            14 => RpcCode::Unavailable,
            15 => RpcCode::DataLoss,
            16 => RpcCode::Unauthenticated,
            _ => RpcCode::Unknown,
        }
    }
}

impl fmt::Display for RpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by RPC handlers expose their status code through this.
pub trait RpcStatus {
    fn rpc_code(&self) -> RpcCode;
}

impl RpcStatus for RpcCode {
    fn rpc_code(&self) -> RpcCode {
        *self
    }
}

/// Split `/package.Service/Method` into service and method.
///
/// A name without a separating slash yields `unknown` as the service.
pub fn split_method_name(full_method: &str) -> (&str, &str) {
    let trimmed = full_method.strip_prefix('/').unwrap_or(full_method);
    match trimmed.split_once('/') {
        Some((service, method)) => (service, method),
        None => ("unknown", trimmed),
    }
}

/// Registered unary RPC series.
#[derive(Clone)]
pub struct RpcMetrics {
    unary: Operation,
}

impl RpcMetrics {
    pub fn register(registry: &MetricsRegistry) -> Result<Self> {
        Ok(Self {
            unary: Operation::register(registry, &UNARY)?,
        })
    }

    pub fn begin(&self, full_method: &str) -> OperationSession {
        let (service, method) = split_method_name(full_method);
        self.unary.begin(LabelSet::new([service, method]))
    }

    pub fn end(&self, session: &mut OperationSession, code: RpcCode) {
        self.unary.end(session, code.as_str());
    }

    /// Time a unary handler future and classify its result.
    ///
    /// The result is passed through untouched.
    pub async fn observe_unary<F, T, E>(&self, full_method: &str, call: F) -> std::result::Result<T, E>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: RpcStatus,
    {
        let mut session = self.begin(full_method);
        let result = call.await;
        let code = match &result {
            Ok(_) => RpcCode::Ok,
            Err(err) => err.rpc_code(),
        };
        self.end(&mut session, code);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_full_method_names() {
        assert_eq!(split_method_name("/orders.v1.Orders/Get"), ("orders.v1.Orders", "Get"));
        assert_eq!(split_method_name("orders.Orders/Get"), ("orders.Orders", "Get"));
        assert_eq!(split_method_name("/Get"), ("unknown", "Get"));
        assert_eq!(split_method_name("Get"), ("unknown", "Get"));
    }

    #[test]
    fn code_names_are_lowercased() {
        assert_eq!(RpcCode::InvalidArgument.as_str(), "invalidargument");
        assert_eq!(RpcCode::from_i32(4), RpcCode::DeadlineExceeded);
        assert_eq!(RpcCode::from_i32(2), RpcCode::Unknown);
        assert_eq!(RpcCode::from_i32(99), RpcCode::Unknown);
    }

    #[test]
    fn observe_unary_passes_success_through() {
        let registry = MetricsRegistry::new();
        let rpc = RpcMetrics::register(&registry).unwrap();

        let result: std::result::Result<u32, RpcCode> =
            tokio_test::block_on(rpc.observe_unary("/orders.Orders/List", async { Ok(7) }));
        assert_eq!(result, Ok(7));
        assert_eq!(
            registry.snapshot().counter(
                "grpc_unary_requests_total",
                &[("grpc_service", "orders.orders"), ("grpc_method", "list"), ("grpc_code", "ok")]
            ),
            Some(1.0)
        );
    }

    #[tokio::test]
    async fn observe_unary_records_error_code() {
        let registry = MetricsRegistry::new();
        let rpc = RpcMetrics::register(&registry).unwrap();

        let result: std::result::Result<(), RpcCode> = rpc
            .observe_unary("/orders.Orders/Get", async { Err(RpcCode::NotFound) })
            .await;
        assert_eq!(result, Err(RpcCode::NotFound));

        let snap = registry.snapshot();
        assert_eq!(
            snap.counter(
                "grpc_unary_requests_total",
                &[("grpc_service", "orders.orders"), ("grpc_method", "get"), ("grpc_code", "notfound")]
            ),
            Some(1.0)
        );
        assert_eq!(
            snap.gauge(
                "grpc_unary_requests_in_flight",
                &[("grpc_service", "orders.orders"), ("grpc_method", "get")]
            ),
            Some(0.0)
        );
    }
}
