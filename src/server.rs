//! HTTP serving of the generated PAC script.
//!
//! Every GET, on any path, regenerates the script from the current files:
//! proxies first, then domains, then compilation and rendering. The only
//! failure a client is told about is a missing proxy configuration.
//! Anything else is answered with a generic 500.

use crate::compiler::{compile_domain_rules, compile_proxy_defines};
use crate::config::{AppConfig, SourcesConfig};
use crate::domains::DomainSource;
use crate::error::{PacError, Result};
use crate::proxies::{ProxySource, PROXY_EXAMPLE};
use crate::template::PacTemplate;
use hyper::header::{ALLOW, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use rand::Rng;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// MIME type browsers expect for PAC files.
pub const PAC_CONTENT_TYPE: &str = "application/x-ns-proxy-autoconfig";

fn proxy_missing_message() -> String {
    format!(
        "No proxy is configured. Write the proxy directives into the proxy configuration file, \
         separated by semicolons, for example: {}\n",
        PROXY_EXAMPLE
    )
}

const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error\n";

/// Per-request PAC generation.
#[derive(Clone)]
pub struct PacService {
    domains: DomainSource,
    proxies: ProxySource,
    template: PacTemplate,
}

impl PacService {
    pub fn new(domains: DomainSource, proxies: ProxySource, template: PacTemplate) -> Self {
        Self {
            domains,
            proxies,
            template,
        }
    }

    /// Builds the service from configuration, validating the template.
    pub fn from_config(config: &SourcesConfig) -> Result<Self> {
        Ok(Self::new(
            DomainSource::from_config(config)?,
            ProxySource::from_config(config),
            PacTemplate::builtin()?,
        ))
    }

    /// Generates the PAC script from the current sources.
    pub async fn generate(&self) -> Result<String> {
        let proxies = self.proxies.resolve().await?;
        let domains = self.domains.resolve().await;

        let rules = compile_domain_rules(&domains);
        let defines = compile_proxy_defines(&proxies);

        debug!(
            domains = domains.len(),
            proxies = proxies.len(),
            "Compiled PAC script"
        );
        Ok(self.template.render(&rules, &defines))
    }

    /// Answers one request. Always produces a response.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        if req.method() != Method::GET {
            return method_not_allowed();
        }

        // Generation runs as its own task: a client disconnect cannot
        // interrupt a cache write, and a panic still yields a response.
        let service = self.clone();
        let outcome = tokio::spawn(async move { service.generate().await }.in_current_span()).await;

        match outcome {
            Ok(Ok(script)) => pac_response(script),
            Ok(Err(e)) if e.is_proxy_config_error() => {
                warn!(error = %e, "Proxy configuration unavailable");
                proxy_missing_response()
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to generate PAC script");
                internal_error_response()
            }
            Err(e) => {
                error!(error = %e, "PAC generation task failed");
                internal_error_response()
            }
        }
    }
}

fn random_filename() -> String {
    format!("{}.pac", rand::thread_rng().gen_range(100_000..1_000_000))
}

fn pac_response(script: String) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, PAC_CONTENT_TYPE)
        .header(
            CONTENT_DISPOSITION,
            format!("inline; filename=\"{}\"", random_filename()),
        )
        .body(Body::from(script))
        .unwrap_or_else(|_| bare_internal_error())
}

fn proxy_missing_response() -> Response<Body> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_DISPOSITION, "inline")
        .body(Body::from(proxy_missing_message()))
        .unwrap_or_else(|_| bare_internal_error())
}

fn internal_error_response() -> Response<Body> {
    Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header(CONTENT_TYPE, "text/plain")
        .header(CONTENT_DISPOSITION, "inline")
        .body(Body::from(INTERNAL_ERROR_MESSAGE))
        .unwrap_or_else(|_| bare_internal_error())
}

fn method_not_allowed() -> Response<Body> {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(ALLOW, "GET")
        .header(CONTENT_TYPE, "text/plain")
        .body(Body::from("Method Not Allowed\n"))
        .unwrap_or_else(|_| bare_internal_error())
}

fn bare_internal_error() -> Response<Body> {
    let mut response = Response::new(Body::from(INTERNAL_ERROR_MESSAGE));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// The PAC HTTP server.
pub struct PacServer {
    addr: SocketAddr,
    service: PacService,
}

impl PacServer {
    /// Creates a server from the application configuration.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_service(
            config.server.listen_addr()?,
            PacService::from_config(&config.sources)?,
        ))
    }

    /// Creates a server for an explicit address and service.
    pub fn with_service(addr: SocketAddr, service: PacService) -> Self {
        Self { addr, service }
    }

    /// Binds the listener and starts serving in the background.
    ///
    /// Port 0 binds an ephemeral port; see [`ServerHandle::local_addr`].
    pub async fn start(self) -> Result<ServerHandle> {
        let service = self.service;
        let make_svc = make_service_fn(move |conn: &AddrStream| {
            let service = service.clone();
            let remote = conn.remote_addr();
            async move {
                Ok::<_, Infallible>(service_fn(move |req: Request<Body>| {
                    let service = service.clone();
                    let span = tracing::info_span!(
                        "request",
                        client = %remote,
                        method = %req.method(),
                        path = %req.uri().path(),
                        status = tracing::field::Empty
                    );
                    async move {
                        let response = service.handle(req).await;
                        tracing::Span::current().record("status", response.status().as_u16());
                        debug!("Request completed");
                        Ok::<_, Infallible>(response)
                    }
                    .instrument(span)
                }))
            }
        });

        let server = Server::try_bind(&self.addr)
            .map_err(PacError::server)?
            .serve(make_svc);
        let local_addr = server.local_addr();

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let graceful = server.with_graceful_shutdown(async move {
            // Dropping every sender also stops the server.
            let _ = shutdown_rx.recv().await;
        });

        let task = tokio::spawn(async move {
            let result = graceful.await;
            info!("PAC server stopped");
            result
        });

        info!(listen = %local_addr, "PAC server started");

        Ok(ServerHandle {
            local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Running server.
///
/// Dropping the handle shuts the server down unless a [`ShutdownTrigger`]
/// is still alive.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<std::result::Result<(), hyper::Error>>,
}

impl ServerHandle {
    /// The bound address.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns a trigger that stops the server from another task.
    pub fn shutdown_trigger(&self) -> ShutdownTrigger {
        ShutdownTrigger(self.shutdown.clone())
    }

    /// Stops accepting connections and waits for in-flight requests.
    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        Self::join(self.task).await
    }

    /// Waits until the server exits, through a [`ShutdownTrigger`] or an
    /// accept error. Does not request shutdown itself.
    pub async fn wait(self) -> Result<()> {
        let _shutdown = self.shutdown;
        Self::join(self.task).await
    }

    async fn join(task: JoinHandle<std::result::Result<(), hyper::Error>>) -> Result<()> {
        task.await
            .map_err(PacError::server)?
            .map_err(PacError::server)
    }
}

/// Requests a graceful shutdown of a running server.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger(broadcast::Sender<()>);

impl ShutdownTrigger {
    pub fn trigger(&self) {
        let _ = self.0.send(());
    }
}
