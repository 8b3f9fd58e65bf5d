use tracing::{error, info};

use cabinet::auth::ensure_admin;
use cabinet::web::WebServer;
use cabinet::{Config, Database, FileStorage, UserRepository};

#[tokio::main]
async fn main() {
    // Load configuration
    let mut config = match Config::load("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config.toml: {e}");
            eprintln!("Using default configuration.");
            Config::default()
        }
    };
    config.apply_env_overrides();

    // Initialize logging
    if let Err(e) = cabinet::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        cabinet::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> cabinet::Result<()> {
    config.validate()?;

    info!("Cabinet - multi-user file storage");

    let db = Database::open(&config.database.path).await?;
    info!(path = %config.database.path, "Database opened");

    let storage = FileStorage::new(&config.files.storage_path)?;
    info!(path = %config.files.storage_path, "File storage ready");

    if let Some((username, password)) = config.admin.credentials() {
        let users = UserRepository::new(db.pool());
        match ensure_admin(&users, username, password).await {
            Ok(Some(admin)) => {
                info!(user_id = admin.id, username = %admin.username, "Administrator created")
            }
            Ok(None) => info!(username = %username, "Administrator already exists"),
            Err(e) => error!(username = %username, error = %e, "Failed to create administrator"),
        }
    }

    let server = WebServer::new(&config, db, storage)?;
    info!("Server configured on {}", server.addr());

    server.run().await
}
