//! Launch configuration and Chrome discovery.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::browser::BrowserConfig;
use serde::{Deserialize, Serialize};
use which::which;

use crate::error::CdpError;

/// Configuration for launching the browser.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChromiumConfig {
    pub headless: bool,
    /// Explicit Chrome/Chromium binary; discovered on PATH when unset.
    pub executable: Option<PathBuf>,
    /// Profile directory; chromiumoxide picks a temporary one when unset.
    pub user_data_dir: Option<PathBuf>,
    pub disable_sandbox: bool,
    pub request_timeout_ms: u64,
    pub launch_timeout_ms: u64,
    pub window_size: (u32, u32),
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            executable: None,
            user_data_dir: None,
            disable_sandbox: false,
            request_timeout_ms: 30_000,
            launch_timeout_ms: 20_000,
            window_size: (1280, 900),
        }
    }
}

const CHROME_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-component-update",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-hang-monitor",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-sync",
    "--metrics-recording-only",
    "--no-first-run",
    "--no-default-browser-check",
    "--password-store=basic",
    "--use-mock-keychain",
];

impl ChromiumConfig {
    /// The executable to launch: the configured one if it exists, else a discovered one.
    pub fn resolve_executable(&self) -> Result<PathBuf, CdpError> {
        match &self.executable {
            Some(path) if path.exists() => Ok(path.clone()),
            Some(path) => Err(CdpError::MissingExecutable(path.display().to_string())),
            None => detect_chrome_executable().ok_or(CdpError::ExecutableNotFound),
        }
    }

    pub(crate) fn browser_config(&self) -> Result<BrowserConfig, CdpError> {
        let executable = self.resolve_executable()?;
        let (width, height) = self.window_size;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .request_timeout(Duration::from_millis(self.request_timeout_ms))
            .launch_timeout(Duration::from_millis(self.launch_timeout_ms))
            .window_size(width, height)
            .args(CHROME_ARGS.iter().copied());

        if !self.headless {
            builder = builder.with_head();
        }
        if self.disable_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(dir) = &self.user_data_dir {
            std::fs::create_dir_all(dir).map_err(|err| {
                CdpError::Config(format!("failed to create {}: {err}", dir.display()))
            })?;
            builder = builder.user_data_dir(dir);
        }

        builder.build().map_err(CdpError::Config)
    }
}

/// Find a Chrome/Chromium binary on PATH, then in the usual install locations.
pub fn detect_chrome_executable() -> Option<PathBuf> {
    detect_in(chrome_executable_names(), &os_specific_chrome_paths())
}

fn detect_in(names: &[&str], fallback_paths: &[PathBuf]) -> Option<PathBuf> {
    names
        .iter()
        .find_map(|name| which(name).ok())
        .or_else(|| fallback_paths.iter().find(|p| p.exists()).cloned())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        ["PROGRAMFILES", "PROGRAMFILES(X86)", "LOCALAPPDATA"]
            .iter()
            .filter_map(|key| std::env::var(key).ok())
            .map(|root| PathBuf::from(root.trim()))
            .flat_map(|root| {
                [
                    root.join("Google/Chrome/Application/chrome.exe"),
                    root.join("Chromium/Application/chrome.exe"),
                    root.join("Microsoft/Edge/Application/msedge.exe"),
                ]
            })
            .collect()
    }

    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"),
            PathBuf::from("/Applications/Chromium.app/Contents/MacOS/Chromium"),
        ]
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        [
            "/usr/bin/google-chrome-stable",
            "/usr/bin/google-chrome",
            "/usr/bin/chromium-browser",
            "/usr/bin/chromium",
            "/snap/bin/chromium",
        ]
        .iter()
        .map(|p| Path::new(p).to_path_buf())
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::{env, fs};
    use tempfile::tempdir;

    fn fake_executable(dir: &Path, name: &str) -> PathBuf {
        let exe_path = dir.join(name);
        fs::write(&exe_path, b"").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&exe_path, fs::Permissions::from_mode(0o755)).unwrap();
        }
        exe_path
    }

    #[test]
    #[serial]
    fn detects_from_path_entries() {
        let dir = tempdir().unwrap();
        let exe_path = fake_executable(dir.path(), "my-chromium");
        let original_path = env::var("PATH").ok();
        env::set_var("PATH", dir.path());
        let detected = detect_in(&["my-chromium"], &[]);
        if let Some(value) = original_path {
            env::set_var("PATH", value);
        }
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    fn falls_back_to_known_locations() {
        let dir = tempdir().unwrap();
        let exe_path = fake_executable(dir.path(), "chrome-at-known-location");
        let missing = dir.path().join("absent");
        let detected = detect_in(&["definitely-not-a-real-browser"], &[missing, exe_path.clone()]);
        assert_eq!(detected, Some(exe_path));
    }

    #[test]
    fn configured_executable_must_exist() {
        let cfg = ChromiumConfig {
            executable: Some(PathBuf::from("/nonexistent/chrome")),
            ..ChromiumConfig::default()
        };
        assert!(matches!(
            cfg.resolve_executable(),
            Err(CdpError::MissingExecutable(_))
        ));
    }

    #[test]
    fn browser_config_builds_with_explicit_executable() {
        let dir = tempdir().unwrap();
        let exe_path = fake_executable(dir.path(), "chrome");
        let cfg = ChromiumConfig {
            executable: Some(exe_path),
            user_data_dir: Some(dir.path().join("profile")),
            disable_sandbox: true,
            ..ChromiumConfig::default()
        };
        assert!(cfg.browser_config().is_ok());
        assert!(dir.path().join("profile").is_dir());
    }
}
