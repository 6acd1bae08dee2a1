use middleware::client::ClientLimiter;

pub mod middleware {
    pub mod client;
}

/// Per-client throttle allowing `permits_per_second` requests per client address.
pub fn client_middleware(permits_per_second: u32) -> ClientLimiter {
    ClientLimiter::new(permits_per_second)
}
