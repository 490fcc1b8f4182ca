//! Server module - Main server implementation.
//!
//! This module provides the `Server` that ties together the router, the
//! global middleware stack and the application state. Every request gets a
//! fresh `RequestContext` that flows through middleware, the authorization
//! gate and the handler, and is dropped when the response is sent.

use crate::auth::context::RequestContext;
use crate::middleware::{Middleware, MiddlewareStack};
use crate::router::Router;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::future::Future;
use std::net::TcpListener;
use std::sync::Arc;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main server struct.
pub struct Server<S> {
    router: Router<S>,
    middleware: MiddlewareStack,
    state: Arc<S>,
}

impl<S: Send + Sync + 'static> Server<S> {
    /// Create a new server.
    pub fn new(router: Router<S>, state: Arc<S>) -> Self {
        Self {
            router,
            middleware: MiddlewareStack::new(),
            state,
        }
    }

    /// Add middleware.
    pub fn with_middleware(mut self, middleware: Box<dyn Middleware>) -> Self {
        self.middleware.add(middleware);
        self
    }

    /// Bind `addr` and serve until Ctrl-C.
    pub async fn run(self, addr: &str) -> Result<(), BoxError> {
        let listener = TcpListener::bind(addr)?;
        self.serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), BoxError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = Arc::new(self.router);
        let middleware = Arc::new(self.middleware);
        let state = self.state;

        let make_svc = make_service_fn(move |_| {
            let router = router.clone();
            let middleware = middleware.clone();
            let state = state.clone();

            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let router = router.clone();
                    let middleware = middleware.clone();
                    let state = state.clone();
                    async move {
                        // Liveness, answered before any middleware
                        if req.uri().path() == "/health" && req.method() == Method::GET {
                            let mut resp = Response::new(Body::from("ok"));
                            resp.headers_mut()
                                .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
                            *resp.status_mut() = StatusCode::OK;
                            return Ok::<_, Infallible>(resp);
                        }

                        let mut ctx = RequestContext::new();
                        let resp = match middleware.before(req, &mut ctx).await {
                            Ok(req) => router.handle(req, &ctx, state).await,
                            Err(resp) => resp,
                        };
                        Ok::<_, Infallible>(middleware.after(resp, &ctx).await)
                    }
                }))
            }
        });

        let local_addr = listener.local_addr()?;
        let server = hyper::Server::from_tcp(listener)?.serve(make_svc);
        tracing::info!(addr = %local_addr, "server listening");

        server.with_graceful_shutdown(shutdown).await?;
        tracing::info!("server stopped");
        Ok(())
    }
}
