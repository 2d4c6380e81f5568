//! Opening the authorization URL

use async_trait::async_trait;
use tracing::warn;

/// Presents the authorization URL to the user.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, url: &str);
}

/// Opens the system browser, printing the URL when that fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

#[async_trait]
impl BrowserLauncher for SystemBrowser {
    async fn launch(&self, url: &str) {
        if let Err(e) = open::that(url) {
            warn!(error = %e, "Could not open the browser");
            display_authorization_url(url);
        }
    }
}

/// Prints the URL for manual navigation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

#[async_trait]
impl BrowserLauncher for NoBrowser {
    async fn launch(&self, url: &str) {
        display_authorization_url(url);
    }
}

pub fn display_authorization_url(url: &str) {
    println!("\nOpen this URL in your browser to sign in:");
    println!("  {url}");
    println!("\nWaiting for the sign-in to complete...");
}
