// src/lib.rs

pub mod entities {
    pub mod prelude;

    pub mod action;
    pub mod applied_event;
    pub mod block;
    pub mod currency_track;
    pub mod deposit;
    pub mod deposit_delta;
    pub mod intent;
    pub mod participant;
    pub mod payee_details;
    pub mod payment_verifier;
    pub mod rate_version;
    pub mod stat;
    pub mod transaction;
    pub mod verifier_track;
}

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod ids;
pub mod lifecycle;
pub mod payee;
pub mod rates;
pub mod stats;
pub mod store;
