use std::sync::Arc;

use chrono::Duration;
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::store::{MemoryStore, MongoStore, SharedStore};
use crate::voting::VoteCipher;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    #[serde(default = "default_schedule_transitions")]
    schedule_transitions: bool,
    // secrets
    jwt_secret: String,
    vote_secret: String,
}

fn default_schedule_transitions() -> bool {
    true
}

impl Config {
    /// Valid lifetime of auth tokens in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Should election status changes be scheduled at window boundaries?
    pub fn schedule_transitions(&self) -> bool {
        self.schedule_transitions
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Secret the vote payload encryption key is derived from.
    pub fn vote_secret(&self) -> &[u8] {
        self.vote_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Which storage backend to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Mongodb,
    Memory,
}

/// Configuration for the store.
#[derive(Deserialize)]
struct StoreConfig {
    // non-secrets
    store: StoreKind,
    db_name: Option<String>,
    // secrets
    db_uri: Option<String>,
}

/// A fairing that loads the store config, connects to the database if
/// needed, performs any setup necessary, and places a [`SharedStore`] into
/// managed state.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let store: SharedStore = match config.store {
            StoreKind::Memory => {
                warn!("Using the in-memory store: nothing will be persisted");
                Arc::new(MemoryStore::new())
            }
            StoreKind::Mongodb => {
                let db_uri = match config.db_uri {
                    Some(db_uri) => db_uri,
                    None => {
                        error!("`db_uri` must be set when `store` is \"mongodb\"");
                        return Err(rocket);
                    }
                };
                info!("Loaded database config, connecting...");
                // Construct the connection.
                let client = match MongoClient::with_uri_str(db_uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                let db_name = config.db_name.unwrap_or_else(|| "evoting".to_string());
                let db = client.database(&db_name);

                // Ensure the required indexes exist.
                match MongoStore::connect(&db).await {
                    Ok(store) => {
                        info!("...database connection online!");
                        Arc::new(store)
                    }
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                }
            }
        };

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// A fairing that derives the vote encryption key from the configured secret
/// and places a [`VoteCipher`] into managed state. Depends on the config
/// being in managed state, so must be attached after [`ConfigFairing`].
pub struct CipherFairing;

#[rocket::async_trait]
impl Fairing for CipherFairing {
    fn info(&self) -> Info {
        Info {
            name: "Vote Cipher",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let config = match rocket.state::<Config>() {
            Some(config) => config,
            None => {
                error!("Config was not available when deriving the vote key");
                return Err(rocket);
            }
        };
        let cipher = match VoteCipher::from_secret(config.vote_secret()) {
            Ok(cipher) => cipher,
            Err(e) => {
                error!("Failed to derive the vote encryption key: {e}");
                return Err(rocket);
            }
        };
        info!("Derived vote encryption key");

        // Manage the state.
        rocket = rocket.manage(cipher);
        Ok(rocket)
    }
}
