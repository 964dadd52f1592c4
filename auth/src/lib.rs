pub mod middleware {
    pub mod auth;
}

pub mod services {
    pub mod identity_client;
}

pub use middleware::auth::AuthMiddleware;
pub use services::identity_client::IdentityClient;
