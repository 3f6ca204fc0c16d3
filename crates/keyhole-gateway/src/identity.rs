//! Cookie-based owner identity.
//!
//! Every request carries an opaque owner id in the `keyhole_uid` cookie.
//! Requests without one get a freshly generated id, which is both attached
//! to the request for handlers and set on the response, so a browser keeps
//! the same identity from its first shorten call onward.

use axum::extract::Request;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use rand::rngs::OsRng;
use rand::RngCore;

pub const OWNER_COOKIE: &str = "keyhole_uid";

/// Owner id of the current request, inserted by [`owner_identity`].
#[derive(Debug, Clone)]
pub struct OwnerId(pub String);

pub async fn owner_identity(mut request: Request, next: Next) -> Response {
    let existing = request
        .headers()
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(cookie_value);

    let (owner_id, fresh) = match existing {
        Some(id) => (id, false),
        None => (generate_owner_id(), true),
    };
    request.extensions_mut().insert(OwnerId(owner_id.clone()));

    let mut response = next.run(request).await;
    if fresh {
        let cookie = format!("{OWNER_COOKIE}={owner_id}; Path=/; HttpOnly");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Picks the owner cookie out of a `Cookie:` header.
fn cookie_value(header: &str) -> Option<String> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == OWNER_COOKIE && !value.is_empty()).then(|| value.to_owned())
    })
}

/// 128 bits of OS randomness, hex-encoded. Opaque to everything but the
/// ownership checks; there is nothing to decode server-side.
fn generate_owner_id() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    let mut id = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        id.push_str(&format!("{byte:02x}"));
    }
    id
}
