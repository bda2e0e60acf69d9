//! Embedded pages and static assets; everything ships inside the binary.

pub(crate) const INDEX_HTML: &str = include_str!("../assets/index.html");
pub(crate) const LOGIN_HTML: &str = include_str!("../assets/login.html");
pub(crate) const ADMIN_HTML: &str = include_str!("../assets/admin.html");
pub(crate) const APP_CSS: &str = include_str!("../assets/app.css");
pub(crate) const CHAT_JS: &str = include_str!("../assets/chat.js");
pub(crate) const LOGIN_JS: &str = include_str!("../assets/login.js");
pub(crate) const ADMIN_JS: &str = include_str!("../assets/admin.js");
