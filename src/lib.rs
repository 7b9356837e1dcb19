pub mod config;
pub mod context;
pub mod dispatch;
pub mod exception;
pub mod middleware;
pub mod param;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod trie;
pub mod util;

pub use config::Config;
pub use context::{Context, Locals, Params};
pub use dispatch::{DiagnosticsSink, LogSink};
pub use exception::{ConfigError, Exception, RouteError};
pub use middleware::{from_fn, handler_fn, Handler, HandlerResult, Middleware, Next};
pub use param::{HttpEncoding, HttpVersion, Method};
pub use request::Request;
pub use response::{Payload, Response, SealedResponse};
pub use router::{Resolution, Router};
pub use server::{serve_connection, Server};
