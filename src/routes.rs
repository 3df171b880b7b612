use crate::{
    api::{payroll, policy},
    auth::middleware::auth_middleware,
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Config::from_env rejects a zero rate
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / requests_per_min as u64).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("non-zero period and burst size");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/payroll")
                    // /payroll
                    .service(web::resource("").route(web::get().to(payroll::list_payslips)))
                    // /payroll/generate
                    .service(
                        web::resource("/generate").route(web::post().to(payroll::generate_payroll)),
                    )
                    // /payroll/my (before /{id})
                    .service(web::resource("/my").route(web::get().to(payroll::my_payslips)))
                    // /payroll/{id}
                    .service(web::resource("/{id}").route(web::get().to(payroll::get_payslip)))
                    .service(
                        web::resource("/{id}/confirm").route(web::put().to(payroll::confirm_payroll)),
                    )
                    .service(web::resource("/{id}/pay").route(web::put().to(payroll::mark_paid)))
                    .service(web::resource("/{id}/fail").route(web::put().to(payroll::mark_failed))),
            )
            .service(
                web::resource("/policy")
                    .route(web::get().to(policy::get_policy))
                    .route(web::put().to(policy::update_policy)),
            ),
    );
}
