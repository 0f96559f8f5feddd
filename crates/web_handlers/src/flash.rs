use actix_web::{HttpRequest, cookie::Cookie};
use campgrounds::Flash;

/// Cookie carrying flash messages across a redirect.
pub const FLASH_COOKIE: &str = "flash";

/// Messages left for this request by the previous response.
pub fn read_flash(req: &HttpRequest) -> Flash {
    req.cookie(FLASH_COOKIE)
        .and_then(|cookie| {
            let decoded = urlencoding::decode(cookie.value()).ok()?;
            serde_json::from_str(&decoded).ok()
        })
        .unwrap_or_default()
}

/// Cookie storing `flash` for the next request.
pub fn flash_cookie(flash: &Flash) -> Cookie<'static> {
    let json = serde_json::to_string(flash).unwrap_or_else(|_| "{}".to_string());
    Cookie::build(FLASH_COOKIE, urlencoding::encode(&json).into_owned())
        .path("/")
        .http_only(true)
        .finish()
}

/// Cookie that removes the flash once it has been shown.
pub fn clear_flash_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build(FLASH_COOKIE, "").path("/").finish();
    cookie.make_removal();
    cookie
}
