use perch_core::config::{AppConfig, LoadOptions};
use perch_db::{connect_with_settings, migrations, BoutiqueSeed};
use secrecy::ExposeSecret;

use crate::commands::CommandResult;

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "config_validation",
                format!("configuration issue: {error}"),
                1,
            );
        }
    };

    let missing = config.database.missing_required();
    if !missing.is_empty() {
        return CommandResult::failure(
            "seed",
            "config_validation",
            format!("database connection fields are not set: {}", missing.join(", ")),
            1,
        );
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "seed",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    let result = runtime.block_on(async {
        let url = config.database.connection_url();
        let pool = connect_with_settings(
            url.expose_secret(),
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", format!("failed to connect to `{}:{}`: {error}", config.database.host, config.database.port)))?;

        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string()))?;

        BoutiqueSeed::load(&pool)
            .await
            .map_err(|error| ("seed_execution", error.to_string()))?;

        let verification = BoutiqueSeed::verify(&pool)
            .await
            .map_err(|error| ("seed_verification", error.to_string()))?;

        let run_result: Result<String, (&'static str, String)> = if verification.all_present() {
            Ok(BoutiqueSeed::describe(&verification))
        } else {
            Err(("seed_verification", BoutiqueSeed::describe(&verification)))
        };

        pool.close().await;
        run_result
    });

    match result {
        Ok(summary) => CommandResult::success("seed", summary),
        Err((error_class, message)) => CommandResult::failure("seed", error_class, message, 1),
    }
}
