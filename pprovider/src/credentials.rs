//! Secure in-memory credential storage shared across adapters.
//!
//! Keys are resolved at call time, so a vendor configured without a
//! credential fails with `Auth` on first use rather than at construction.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use pcommon::VendorName;

use crate::VendorError;

#[derive(PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl Clone for SecretString {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

#[derive(Default)]
pub struct CredentialVault {
    keys: Mutex<HashMap<VendorName, SecretString>>,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault").finish_non_exhaustive()
    }
}

impl CredentialVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_api_key(
        &self,
        vendor: impl Into<VendorName>,
        api_key: impl Into<String>,
    ) -> Result<(), VendorError> {
        let api_key = SecretString::new(api_key);
        if api_key.is_empty() {
            return Err(VendorError::auth("api key must not be empty"));
        }

        self.keys_mut()?.insert(vendor.into(), api_key);
        Ok(())
    }

    pub fn api_key(&self, vendor: &str) -> Result<Option<SecretString>, VendorError> {
        Ok(self.keys_ref()?.get(vendor).cloned())
    }

    /// Resolves the key or fails with `Auth`, naming the vendor in the
    /// detail string.
    pub fn require_api_key(&self, vendor: &str) -> Result<SecretString, VendorError> {
        self.api_key(vendor)?.ok_or_else(|| {
            VendorError::auth(format!("no {vendor} credentials configured"))
        })
    }

    pub fn has_credentials(&self, vendor: &str) -> Result<bool, VendorError> {
        Ok(self.keys_ref()?.contains_key(vendor))
    }

    pub fn clear(&self, vendor: &str) -> Result<bool, VendorError> {
        Ok(self.keys_mut()?.remove(vendor).is_some())
    }

    fn keys_ref(&self) -> Result<MutexGuard<'_, HashMap<VendorName, SecretString>>, VendorError> {
        self.keys
            .lock()
            .map_err(|_| VendorError::fault("credential vault lock poisoned"))
    }

    fn keys_mut(&self) -> Result<MutexGuard<'_, HashMap<VendorName, SecretString>>, VendorError> {
        self.keys
            .lock()
            .map_err(|_| VendorError::fault("credential vault lock poisoned"))
    }
}
