//! Aviary server entry point.

use std::sync::Arc;

use aviary::{
    api,
    conf::{self, Conf},
    error::AviaryError,
    ice::{HttpIceCredentialProvider, IceCredentialProvider},
};
use slog::{o, Drain};
use slog_scope::{error, GlobalLoggerGuard};

fn main() {
    dotenv::dotenv().ok();

    let config_path = std::env::args().nth(1);
    let conf = match Conf::parse(config_path.as_deref()) {
        Ok(conf) => conf,
        Err(e) => {
            eprintln!("failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = init_logger(&conf.log);

    let sys = actix::System::new("aviary");
    let ice_provider: Arc<dyn IceCredentialProvider> =
        Arc::new(HttpIceCredentialProvider::new(&conf.ice));

    actix::spawn(async move {
        if let Err(e) = api::run(conf, ice_provider).await {
            error!("aviary exited with an error"; "error" => %e);
            std::process::exit(1);
        }
    });
    sys.run().unwrap();
}

/// Initializes the [`slog`] logger, human-readable by default or
/// newline-delimited JSON when `log.json` is set, and installs it as the
/// process-wide `log`-facade backend via [`slog_stdlog`].
fn init_logger(log_conf: &conf::Log) -> GlobalLoggerGuard {
    let min_level = log_conf.level.parse().unwrap_or(slog::Level::Info);

    let logger = if log_conf.json {
        let drain = slog_json::Json::default(std::io::stdout()).fuse();
        let drain = slog::LevelFilter::new(drain, min_level).fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        slog::Logger::root(drain, o!())
    } else {
        let decorator = slog_term::TermDecorator::new().build();
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        let drain = slog_envlogger::new(drain).fuse();
        let drain = slog::LevelFilter::new(drain, min_level).fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        slog::Logger::root(drain, o!())
    };

    let scope_guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init().unwrap();
    scope_guard
}
