//! The backup document: every user-data collection in one JSON file, stamped with a digest of its
//! contents.

use crate::model::{Category, Collection, List, PaymentMethod, Settings, Subscription};
use crate::repo::Repository;
use crate::Result;
use anyhow::{ensure, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// The newest backup document format this build understands.
pub const FORMAT_VERSION: u32 = 1;

/// The user data carried in a backup. When reading a document, a collection that is `None` was
/// absent and is left alone locally. Templates and currency rates are reference data and are
/// never part of a backup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscriptions: Option<Vec<Subscription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lists: Option<Vec<List>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_methods: Option<Vec<PaymentMethod>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

impl BackupData {
    /// Reads the current value of every backed-up collection.
    pub fn gather(repo: &Repository) -> Self {
        Self {
            subscriptions: Some(repo.subscriptions()),
            categories: Some(repo.categories()),
            lists: Some(repo.lists()),
            payment_methods: Some(repo.payment_methods()),
            settings: Some(repo.settings()),
        }
    }

    /// Keeps only the collections that are present in `shape`.
    pub fn restricted_to(self, shape: &BackupData) -> Self {
        Self {
            subscriptions: self.subscriptions.filter(|_| shape.subscriptions.is_some()),
            categories: self.categories.filter(|_| shape.categories.is_some()),
            lists: self.lists.filter(|_| shape.lists.is_some()),
            payment_methods: self.payment_methods.filter(|_| shape.payment_methods.is_some()),
            settings: self.settings.filter(|_| shape.settings.is_some()),
        }
    }

    /// The hex SHA-256 of the serialized data.
    pub fn digest(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self).context("Unable to serialize backup data")?;
        Ok(format!("{:x}", Sha256::digest(&bytes)))
    }

    /// The collections present in this data.
    pub fn collections(&self) -> Vec<Collection> {
        let mut present = Vec::new();
        if self.subscriptions.is_some() {
            present.push(Collection::Subscriptions);
        }
        if self.categories.is_some() {
            present.push(Collection::Categories);
        }
        if self.lists.is_some() {
            present.push(Collection::Lists);
        }
        if self.payment_methods.is_some() {
            present.push(Collection::PaymentMethods);
        }
        if self.settings.is_some() {
            present.push(Collection::Settings);
        }
        present
    }

    /// Overwrites each present collection in `repo`, one at a time. If a write fails the
    /// collections before it have already been replaced; there is no rollback.
    pub fn apply(&self, repo: &Repository) -> Result<Vec<Collection>> {
        let mut applied = Vec::new();
        if let Some(value) = &self.subscriptions {
            repo.save_subscriptions(value)?;
            applied.push(Collection::Subscriptions);
        }
        if let Some(value) = &self.categories {
            repo.save_categories(value)?;
            applied.push(Collection::Categories);
        }
        if let Some(value) = &self.lists {
            repo.save_lists(value)?;
            applied.push(Collection::Lists);
        }
        if let Some(value) = &self.payment_methods {
            repo.save_payment_methods(value)?;
            applied.push(Collection::PaymentMethods);
        }
        if let Some(value) = &self.settings {
            repo.save_settings(value)?;
            applied.push(Collection::Settings);
        }
        debug!("Applied {applied:?} from backup");
        Ok(applied)
    }
}

/// Identifies when and from what a backup document was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stamp {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    /// `BackupData::digest` of the document's data.
    pub digest: String,
}

/// The file written to the drive:
/// `{subscriptions, categories, lists, paymentMethods, settings, stamp}`. Documents without a
/// `stamp`, or with only some of the collections, are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupDocument {
    #[serde(flatten)]
    pub data: BackupData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stamp: Option<Stamp>,
}

impl BackupDocument {
    /// Wraps `data` and stamps it with its digest.
    pub fn new(data: BackupData) -> Result<Self> {
        let stamp = Stamp {
            format_version: FORMAT_VERSION,
            created_at: Utc::now(),
            digest: data.digest()?,
        };
        Ok(Self {
            data,
            stamp: Some(stamp),
        })
    }

    /// Parses a document and checks its stamp.
    pub fn parse(json: &str) -> Result<Self> {
        let document: Self =
            serde_json::from_str(json).context("The backup document is not valid JSON")?;
        document.verify()?;
        Ok(document)
    }

    /// Checks that a stamped document is of a supported format and that its contents match its
    /// digest. Unstamped documents pass.
    pub fn verify(&self) -> Result<()> {
        let Some(stamp) = &self.stamp else {
            return Ok(());
        };
        ensure!(
            stamp.format_version <= FORMAT_VERSION,
            "Backup format version {} is unsupported. Is a newer version of subtrack available?",
            stamp.format_version
        );
        let actual = self.data.digest()?;
        ensure!(
            actual == stamp.digest,
            "The backup document is corrupt: its contents do not match its digest"
        );
        Ok(())
    }

    /// The stamped digest, or the digest of the contents if the document is unstamped.
    pub fn digest(&self) -> Result<String> {
        match &self.stamp {
            Some(stamp) => Ok(stamp.digest.clone()),
            None => self.data.digest(),
        }
    }
}
