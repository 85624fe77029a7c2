//! Result codes and the generic error-to-code rule.

use std::error::Error;
use std::fmt;

/// Short token classifying how an operation ended.
///
/// Only ever used as a label value; nothing in this crate branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultCode {
    Ok,
    Failed,
    Canceled,
    NotFound,
    Timeout,
}

impl ResultCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCode::Ok => "ok",
            ResultCode::Failed => "failed",
            ResultCode::Canceled => "canceled",
            ResultCode::NotFound => "not_found",
            ResultCode::Timeout => "timeout",
        }
    }

    /// Derive a code from an optional error.
    ///
    /// `None` is `ok`. An error whose source chain contains [`Canceled`] or a
    /// cancelled tokio task is `canceled`. Anything else is `failed`; the
    /// richer codes (`not_found`, `timeout`) are never derived and must be
    /// passed explicitly by the caller.
    pub fn from_error(err: Option<&(dyn Error + 'static)>) -> Self {
        match err {
            None => ResultCode::Ok,
            Some(err) if is_cancellation(err) => ResultCode::Canceled,
            Some(_) => ResultCode::Failed,
        }
    }

    pub fn from_result<T, E>(result: &Result<T, E>) -> Self
    where
        E: Error + 'static,
    {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(err) => Self::from_error(Some(err)),
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ResultCode {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Marker error for an operation abandoned by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Canceled;

impl fmt::Display for Canceled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation canceled")
    }
}

impl Error for Canceled {}

fn is_cancellation(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if err.is::<Canceled>() {
            return true;
        }
        if let Some(join) = err.downcast_ref::<tokio::task::JoinError>() {
            if join.is_cancelled() {
                return true;
            }
        }
        current = err.source();
    }
    false
}
