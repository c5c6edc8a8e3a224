use std::time::Duration;

use cdp_adapter::{detect_chrome_executable, ChromiumBrowser, ChromiumConfig};
use research_core::{BrowserDriver, ElementQuery, WaitPolicy};

const PAGE: &str = "data:text/html,<html><head><title>Smoke</title></head><body>\
<h1 id='t'>Hello research</h1><a href='https://example.com/a'>A</a>\
<a href='/relative'>B</a><input id='q'></body></html>";

#[tokio::test]
#[ignore = "requires a local Chrome/Chromium"]
async fn drives_a_real_page() {
    if detect_chrome_executable().is_none() {
        return;
    }
    let browser = ChromiumBrowser::launch(ChromiumConfig {
        disable_sandbox: true,
        ..ChromiumConfig::default()
    })
    .await
    .expect("launch");

    browser
        .navigate(PAGE, WaitPolicy::Load, Duration::from_secs(10))
        .await
        .expect("navigate");
    let info = browser.current_page_info().await.expect("info");
    assert_eq!(info.title, "Smoke");
    assert_eq!(browser.get_text("#t").await.expect("text"), "Hello research");

    let links = browser
        .get_all_elements("a[href]", ElementQuery::links(10))
        .await
        .expect("links");
    assert_eq!(links.len(), 2);
    assert_eq!(links[1].attribute.as_deref(), Some("/relative"));

    browser.type_text("#q", "tokio").await.expect("type");
    assert!(browser.click("#missing").await.is_err());

    browser.close().await.expect("close");
    browser.close().await.expect("second close is a no-op");
}
