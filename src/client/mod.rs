pub mod browser_login;
pub mod core;
pub mod request;
pub mod signing;
pub mod token;

pub use browser_login::{bind_listener, BrowserLogin, BrowserOpener, CallbackState, SystemBrowser};
pub use core::{OxApiClient, DEFAULT_SSO_DOMAIN};
pub use request::{prefix_url, prepare_request, RequestOptions};
pub use signing::{AuthData, OAuthSession};
pub use token::{AccessToken, RequestToken};
