pub mod server;

use crate::cli::config::Config;

#[derive(Debug)]
pub enum Action {
    Server { config: Box<Config> },
}
