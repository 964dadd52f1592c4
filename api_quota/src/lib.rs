use actix_web::web::{self};

pub mod routes {
    pub mod pay;
    pub mod quota;
}

mod services {
    pub(crate) mod pay;
    pub(crate) mod quota;
}

mod dtos {
    pub(crate) mod pay;
    pub(crate) mod quota;
}

pub fn mount_quota() -> actix_web::Scope {
    web::scope("/quota")
        .service(routes::quota::get_quota)
        .service(routes::quota::get_check)
        .service(routes::quota::post_increment)
        .service(routes::quota::post_reset)
}
pub fn mount_pay() -> actix_web::Scope {
    web::scope("/pay")
        .service(routes::pay::post_link)
        .service(routes::pay::get_status)
        .service(routes::pay::post_wait)
}
pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/pay").service(routes::pay::post_webhook)
}
