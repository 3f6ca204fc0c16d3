use keyhole_core::TrustedSubnet;
use keyhole_shortener::ShortenerService;

pub struct AppState<R> {
    pub service: ShortenerService<R>,
    pub trusted_subnet: Option<TrustedSubnet>,
}

// Derived Clone would demand R: Clone; the service clones by Arc.
impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            trusted_subnet: self.trusted_subnet,
        }
    }
}

impl<R> AppState<R> {
    pub fn new(service: ShortenerService<R>, trusted_subnet: Option<TrustedSubnet>) -> Self {
        Self {
            service,
            trusted_subnet,
        }
    }
}
