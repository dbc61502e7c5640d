use anyhow::Result;
use unibridge::cli::{actions, actions::Action, start, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let action = start()?;

    let result = match action {
        Action::Server { .. } => actions::server::handle(action).await,
    };

    telemetry::shutdown_tracer();

    result
}
