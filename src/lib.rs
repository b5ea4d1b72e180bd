//! # Little Joys (journal gateway + session toolkit)
//!
//! `littlejoys` is the engine room of a social journal application. It ships
//! two cooperating halves in one crate:
//!
//! - The **client session toolkit** (`session`, `token`, `gateway`, `auth`):
//!   a persisted session store, a token accessor that reconciles every storage
//!   convention the auth provider left behind, and an authenticated request
//!   gateway with a uniform response policy. A confirmed `401` is the only
//!   network outcome that mutates session state.
//! - The **API surface** (`littlejoys`): the axum routes the journal frontend
//!   talks to: posts, profile statistics, token refresh, and the weather and
//!   reverse-geocoding proxies that keep third-party API keys server side.
//!
//! Identity lives in Supabase (GoTrue); rows live behind PostgREST. Both are
//! reached over plain REST through the clients in [`supabase`].

pub mod auth;
pub mod cli;
pub mod gateway;
pub mod littlejoys;
pub mod session;
pub mod supabase;
pub mod token;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
