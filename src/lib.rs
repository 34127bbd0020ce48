#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{CipherFairing, ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;
use crate::voting::ClockFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod scheduled_task;
pub mod store;
pub mod voting;

pub use config::Config;

/// Assemble the server: routes, error catchers, and the fairings that load
/// config, connect the store, derive the vote key and schedule elections.
/// Ignite fairings run in attach order.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .register("/", api::catchers())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(CipherFairing)
        .attach(ClockFairing)
}

/// A server running against the given store, with test secrets and no
/// scheduled transitions.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: store::SharedStore) -> Rocket<Build> {
    use rocket::figment::providers::Serialized;

    // Global values take precedence over every profile in `Rocket.toml`.
    let figment = rocket::Config::figment()
        .merge(Serialized::global("auth_ttl", 3600))
        .merge(Serialized::global("schedule_transitions", false))
        .merge(Serialized::global("jwt_secret", "test-jwt-secret"))
        .merge(Serialized::global("vote_secret", "test-vote-secret"))
        .merge(Serialized::global("log_level", "off"));

    rocket::custom(figment)
        .mount("/", api::routes())
        .register("/", api::catchers())
        .manage(store)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(CipherFairing)
        .attach(ClockFairing)
}
