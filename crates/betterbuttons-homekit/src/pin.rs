//! Pairing PIN persistence.
//!
//! The PIN is stored as plain ASCII digits in `<state dir>/serverPin`. On
//! first start a random 8-digit PIN is generated, checked against the PINs
//! HAP refuses, and written back so pairings survive restarts.

use std::path::{Path, PathBuf};

use rand::Rng;
use tracing::{info, warn};

use betterbuttons_core::{Error, Result};

/// File name of the stored PIN inside the state directory.
pub const PIN_FILE: &str = "serverPin";

/// PINs HAP controllers reject.
pub const INVALID_PINS: [&str; 12] = [
    "00000000", "11111111", "22222222", "33333333", "44444444", "55555555", "66666666",
    "77777777", "88888888", "99999999", "12345678", "87654321",
];

pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 8 && pin.bytes().all(|b| b.is_ascii_digit()) && !INVALID_PINS.contains(&pin)
}

/// Draw a random acceptable PIN.
pub fn generate_pin<R: Rng + ?Sized>(rng: &mut R) -> String {
    loop {
        let pin = format!("{:08}", rng.gen_range(0..99_999_999u32));
        if is_valid_pin(&pin) {
            return pin;
        }
    }
}

/// Setup code in the `XXX-XX-XXX` form shown to users.
pub fn format_setup_code(pin: &str) -> String {
    if !is_valid_pin(pin) {
        return pin.to_string();
    }
    format!("{}-{}-{}", &pin[..3], &pin[3..5], &pin[5..])
}

/// File-backed PIN store.
#[derive(Debug, Clone)]
pub struct PinStore {
    dir: PathBuf,
}

impl PinStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PIN_FILE)
    }

    /// Read the stored PIN. `Ok(None)` if none has been stored yet.
    pub async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path()).await {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Storage(format!(
                "failed to read {}: {}",
                self.path().display(),
                e
            ))),
        }
    }

    pub async fn store(&self, pin: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::Storage(format!("failed to create {}: {}", self.dir.display(), e))
        })?;
        tokio::fs::write(self.path(), pin.as_bytes())
            .await
            .map_err(|e| {
                Error::Storage(format!("failed to write {}: {}", self.path().display(), e))
            })
    }

    /// The stored PIN, generating and persisting one if none exists.
    pub async fn load_or_generate(&self) -> Result<String> {
        if let Some(pin) = self.load().await? {
            if is_valid_pin(&pin) {
                return Ok(pin);
            }
            warn!(
                category = "pairing",
                path = %self.path().display(),
                "Stored pairing PIN is not usable, generating a new one"
            );
        }

        let pin = generate_pin(&mut rand::thread_rng());
        self.store(&pin).await?;
        info!(
            category = "pairing",
            path = %self.path().display(),
            "Generated new pairing PIN"
        );
        Ok(pin)
    }
}
