use rand::Rng;
use trawler_core::BrowserConfig;

/// Chromium flags applied to every launch.
pub const LAUNCH_ARGS: &[&str] = &[
    "--disable-setuid-sandbox",
    "--disable-infobars",
    "--window-position=0,0",
    "--ignore-certificate-errors",
    "--ignore-certificate-errors-spki-list",
    "--disable-dev-shm-usage",
    "--disable-accelerated-2d-canvas",
    "--disable-gpu",
    "--hide-scrollbars",
    "--disable-notifications",
    "--disable-extensions",
    "--force-device-scale-factor=1",
];

/// Common desktop user agents
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

/// Fingerprint configuration for anti-detection
#[derive(Debug, Clone)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub languages: Vec<String>,
}

impl FingerprintConfig {
    /// Generate a randomized fingerprint configuration
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();

        // Common viewport sizes
        let viewports = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

        let ua_idx = rng.gen_range(0..USER_AGENTS.len());
        let vp_idx = rng.gen_range(0..viewports.len());
        let (width, height) = viewports[vp_idx];

        Self {
            user_agent: USER_AGENTS[ua_idx].to_string(),
            viewport_width: width,
            viewport_height: height,
            languages: vec!["en-US".to_string(), "en".to_string()],
        }
    }

    /// Fingerprint pinned to the configured window, with the configured
    /// user agent if one is set.
    pub fn from_config(config: &BrowserConfig) -> Self {
        let mut fingerprint = Self::randomized();
        fingerprint.viewport_width = config.window_width;
        fingerprint.viewport_height = config.window_height;
        if let Some(agent) = &config.user_agent {
            fingerprint.user_agent.clone_from(agent);
        }
        fingerprint
    }

    /// Script injected before every document to mask automation markers.
    pub fn stealth_script(&self) -> String {
        let languages = serde_json::to_string(&self.languages).unwrap_or_else(|_| "[]".to_string());
        format!(
            r"(() => {{
    Object.defineProperty(navigator, 'webdriver', {{ get: () => false }});
    Object.defineProperty(navigator, 'languages', {{ get: () => {languages} }});
    Object.defineProperty(navigator, 'plugins', {{ get: () => [1, 2, 3, 4, 5] }});
    if (!navigator.mediaDevices) {{
        navigator.mediaDevices = {{ getUserMedia: async () => new MediaStream() }};
    }}
    window.chrome = window.chrome || {{ runtime: {{}} }};
    Object.defineProperty(window.screen, 'width', {{ get: () => {width} }});
    Object.defineProperty(window.screen, 'height', {{ get: () => {height} }});
}})();",
            width = self.viewport_width,
            height = self.viewport_height,
        )
    }
}
