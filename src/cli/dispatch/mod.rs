use crate::cli::{actions::Action, config::Config};
use anyhow::Result;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let config = Config::from_matches(matches)?;

    Ok(Action::Server {
        config: Box::new(config),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn builds_a_server_action() {
        let matches = commands::new().get_matches_from(vec![
            "unibridge",
            "--port",
            "9090",
            "--session-jwks-url",
            "https://sessions.example.com/jwks.json",
        ]);

        let Action::Server { config } = handler(&matches).expect("action");
        assert_eq!(config.port, 9090);
    }
}
