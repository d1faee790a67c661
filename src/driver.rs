use std::process::Child;
use std::process::Command;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use fantoccini::Client;
use fantoccini::ClientBuilder;
use fantoccini::Locator;
use fantoccini::elements::Element;
use serde_json::json;

use crate::error::CrawlError;
use crate::site::Site;

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_ATTEMPTS: u32 = 20;
const CONNECT_BACKOFF: Duration = Duration::from_millis(250);

/// One chromedriver process plus the WebDriver session riding on it. Every
/// page worker owns its own session so sessions never share browser state.
pub struct DriverSession {
    client: Client,
    chromedriver: Option<Child>,
    debug: bool,
}

impl DriverSession {
    /// Spawns chromedriver on `port` and connects a client to it. With
    /// `debug` the browser runs headed instead of headless.
    pub async fn open(chromedriver_path: &str, port: u16, debug: bool) -> Result<Self> {
        let mut chromedriver = Command::new(chromedriver_path)
            .arg(format!("--port={port}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to start chromedriver at {chromedriver_path:?}"))?;
        let client = match connect(port, debug).await {
            Ok(client) => client,
            Err(e) => {
                let _ = chromedriver.kill();
                let _ = chromedriver.wait();
                return Err(e);
            }
        };
        let mut session = Self {
            client,
            chromedriver: Some(chromedriver),
            debug,
        };
        if let Err(e) = session.client.minimize_window().await {
            session.shutdown();
            return Err(e.into());
        }
        Ok(session)
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Navigates to `url` and checks the session did not land on the site's
    /// blocked sentinel page.
    pub async fn goto(&self, url: &str, site: Site) -> Result<()> {
        self.client.goto(url).await?;
        if let Some(blocked) = site.blocked_url() {
            let current = self.client.current_url().await?;
            if current.as_str() == blocked {
                return Err(CrawlError::Blocked(blocked.to_string()).into());
            }
        }
        Ok(())
    }

    pub async fn wait_for(&self, xpath: &str) -> Result<Element> {
        let element = self
            .client
            .wait()
            .at_most(WAIT_TIMEOUT)
            .for_element(Locator::XPath(xpath))
            .await?;
        Ok(element)
    }

    pub async fn wait_and_click(&self, xpath: &str) -> Result<()> {
        self.wait_for(xpath).await?.click().await?;
        Ok(())
    }

    pub async fn quit(mut self) -> Result<()> {
        self.client.clone().close().await?;
        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        if let Some(mut child) = self.chromedriver.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for DriverSession {
    fn drop(&mut self) {
        // In debug mode a dropped (failed) session stays open for inspection.
        if !self.debug {
            self.shutdown();
        }
    }
}

async fn connect(port: u16, debug: bool) -> Result<Client> {
    let mut chrome_options = json!({
        "excludeSwitches": ["enable-logging"],
    });
    if !debug {
        chrome_options["args"] = json!(["--headless=new", "--disable-gpu"]);
    }
    let mut capabilities = serde_json::Map::new();
    capabilities.insert("goog:chromeOptions".to_string(), chrome_options);

    let webdriver_url = format!("http://localhost:{port}");

    // chromedriver needs a moment to start listening after spawn.
    let mut last_error = None;
    for _ in 0..CONNECT_ATTEMPTS {
        match ClientBuilder::native()
            .capabilities(capabilities.clone())
            .connect(&webdriver_url)
            .await
        {
            Ok(client) => return Ok(client),
            Err(e) => {
                last_error = Some(e);
                tokio::time::sleep(CONNECT_BACKOFF).await;
            }
        }
    }
    Err(anyhow::Error::new(last_error.unwrap())
        .context(format!("chromedriver on port {port} never accepted a session")))
}
