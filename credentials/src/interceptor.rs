//! Request interceptors.
//!
//! An interceptor maps one outgoing request to the request that continues
//! down the pipeline. Stages cannot fail and cannot short-circuit; they hold
//! no mutable state, so one instance serves concurrent requests.

#[cfg(test)]
#[path = "interceptor_test.rs"]
mod interceptor_test;

use crate::request::ApiRequest;

/// A stage of the outgoing request pipeline.
pub trait Interceptor: Send + Sync {
    /// Return the request that should continue to the next stage.
    fn intercept(&self, request: ApiRequest) -> ApiRequest;
}

impl<F> Interceptor for F
where
    F: Fn(ApiRequest) -> ApiRequest + Send + Sync,
{
    fn intercept(&self, request: ApiRequest) -> ApiRequest {
        self(request)
    }
}

/// Marks every request as carrying credentials.
///
/// Method, URL, headers and body pass through untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct CredentialsInterceptor;

impl Interceptor for CredentialsInterceptor {
    fn intercept(&self, request: ApiRequest) -> ApiRequest {
        request.with_credentials(true)
    }
}
