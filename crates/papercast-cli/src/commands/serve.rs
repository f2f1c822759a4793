//! `papercast serve`.

use papercast_server::{PipelineServer, ServiceState, routes};

use crate::config::ServerConfig;
use crate::server::ServeResult;

/// Serves every registered pipeline over HTTP until a shutdown signal.
pub async fn serve(server: PipelineServer, config: ServerConfig) -> ServeResult<()> {
    let app = routes().with_state(ServiceState::new(server));
    crate::server::serve(app, config).await
}
