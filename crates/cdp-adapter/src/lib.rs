//! Chromium-backed browser driver.
//!
//! Launches a local Chrome/Chromium through chromiumoxide and exposes a single
//! tab as a [`research_core::BrowserDriver`].

pub mod browser;
pub mod config;
pub mod error;
mod scripts;

pub use browser::ChromiumBrowser;
pub use config::{detect_chrome_executable, ChromiumConfig};
pub use error::CdpError;
