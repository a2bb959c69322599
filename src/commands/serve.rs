use crate::api::Mode;
use crate::commands::Out;
use crate::{server, Config, Result};

/// Serves the HTTP API until the process is stopped.
pub async fn serve(config: Config, mode: Mode, bind: Option<&str>) -> Result<Out<()>> {
    server::serve(&config, mode, bind).await?;
    Ok("The server has stopped".into())
}
