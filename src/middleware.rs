//! Tower middleware that runs every request through a [`ThrottleGate`].
//!
//! The layer does not know where the identifier lives on a request; the
//! caller supplies an extractor closure (query parameter, header, whatever
//! the transport uses). Extraction returning `None` surfaces as
//! [`ThrottleError::MissingIdentifier`], a denial as
//! [`ThrottleError::RateLimited`] with the retry hint attached.

use crate::error::ThrottleError;
use crate::gate::{GateResult, RejectReason, ThrottleGate};
use crate::store::CounterStore;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower_layer::Layer;
use tower_service::Service;

/// A layer that gates each request on a [`ThrottleGate`] decision.
pub struct ThrottleLayer<S, F> {
    gate: Arc<ThrottleGate<S>>,
    extract: Arc<F>,
}

impl<S, F> ThrottleLayer<S, F> {
    /// Wrap `gate`, pulling identifiers out of requests with `extract`.
    pub fn new(gate: ThrottleGate<S>, extract: F) -> Self {
        Self { gate: Arc::new(gate), extract: Arc::new(extract) }
    }
}

impl<S, F> Clone for ThrottleLayer<S, F> {
    fn clone(&self) -> Self {
        Self { gate: self.gate.clone(), extract: self.extract.clone() }
    }
}

impl<Inner, S, F> Layer<Inner> for ThrottleLayer<S, F> {
    type Service = ThrottleService<Inner, S, F>;

    fn layer(&self, inner: Inner) -> Self::Service {
        ThrottleService { inner, gate: self.gate.clone(), extract: self.extract.clone() }
    }
}

/// Middleware service produced by [`ThrottleLayer`].
pub struct ThrottleService<Inner, S, F> {
    inner: Inner,
    gate: Arc<ThrottleGate<S>>,
    extract: Arc<F>,
}

impl<Inner: Clone, S, F> Clone for ThrottleService<Inner, S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            gate: self.gate.clone(),
            extract: self.extract.clone(),
        }
    }
}

impl<Inner, S, F, Req> Service<Req> for ThrottleService<Inner, S, F>
where
    Inner: Service<Req> + Clone + Send + 'static,
    Inner::Future: Send + 'static,
    S: CounterStore + 'static,
    F: Fn(&Req) -> Option<String> + Send + Sync + 'static,
    Req: Send + 'static,
{
    type Response = Inner::Response;
    type Error = ThrottleError<Inner::Error>;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(ThrottleError::Inner)
    }

    fn call(&mut self, request: Req) -> Self::Future {
        let gate = self.gate.clone();
        let identifier = (self.extract)(&request);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match gate.check(identifier.as_deref()).await {
                GateResult::Admit => inner.call(request).await.map_err(ThrottleError::Inner),
                GateResult::Deny { retry_after } => {
                    Err(ThrottleError::RateLimited { retry_after })
                }
                GateResult::Reject(RejectReason::MissingIdentifier) => {
                    Err(ThrottleError::MissingIdentifier)
                }
            }
        })
    }
}
