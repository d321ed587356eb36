mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod media;
    pub mod pagination;
    pub mod schema;
    pub mod shopping_list;
}
mod authentication {
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    pub mod cache;

    pub use self::cache::*;
}

pub mod api {
    mod catalog;
    mod links;
    mod recipes;
    mod rejection;
    mod reply;
    mod routes;
    mod users;

    pub use rejection::handle_rejection;
    pub use routes::routes;
}

pub mod config;
pub mod fixtures;
pub mod state;

pub use authentication::*;
pub use cache::{get_revoked_session, is_session_revoked, revoke_session, RevokedSession};
pub use constants::*;
pub use database::*;
