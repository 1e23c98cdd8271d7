//! Request logging with request ids and timing.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use http::{HeaderValue, Request, Response};
use tower::{Layer, Service};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Tags every request with an `x-request-id` (kept when the client sent
/// one), echoes it on the response and logs method, path and duration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggerLayer;

impl<S> Layer<S> for RequestLoggerLayer {
    type Service = RequestLoggerService<S>;

    fn layer(&self, service: S) -> Self::Service {
        RequestLoggerService { service }
    }
}

#[derive(Debug, Clone)]
pub struct RequestLoggerService<S> {
    service: S,
}

impl<S, B, ResBody> Service<Request<B>> for RequestLoggerService<S>
where
    S: Service<Request<B>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    B: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| Uuid::new_v4().to_string(), ToString::to_string);
        let header = HeaderValue::from_str(&request_id).ok();
        if let Some(value) = &header {
            request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        let start = Instant::now();
        let span = tracing::info_span!("request", request_id = %request_id, method = %method, path = %path);

        debug!(parent: &span, "Received request");
        let future = self.service.call(request);
        Box::pin(
            async move {
                let result = future.await;
                let duration_ms = start.elapsed().as_millis();
                match result {
                    Ok(mut response) => {
                        info!(status = response.status().as_u16(), duration_ms, "Request completed");
                        if let Some(value) = header {
                            response.headers_mut().insert(REQUEST_ID_HEADER, value);
                        }
                        Ok(response)
                    }
                    Err(e) => {
                        warn!(duration_ms, "Request failed");
                        Err(e)
                    }
                }
            }
            .instrument(span),
        )
    }
}
