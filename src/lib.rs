//! forkfeed — data and session core for a food-photo social network.
//!
//! The crate covers everything below the screens: the SQLite store and its
//! schema, the store-owning worker thread, per-entity data-access handlers,
//! the login session, and the use-case controllers the presentation layer
//! calls.  Camera capture, GPS, map rendering, and image loading stay on
//! the platform side and talk to this crate through plain values.

pub mod app;
pub mod controllers;
pub mod entities;
pub mod handlers;
pub mod logging;
pub mod sample_data;
pub mod session;
pub mod store;
pub mod worker;
