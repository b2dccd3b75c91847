//! Investment Preferences
//!
//! User-stated risk tolerance, horizon and alert settings. Stored in memory;
//! the analysis engine does not read them yet.

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AdvisorError, Result};

const MAX_TARGET_RETURN: Decimal = dec!(1000);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestmentHorizon {
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub price_alerts: bool,
    pub risk_warnings: bool,
    pub opportunity_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            price_alerts: true,
            risk_warnings: true,
            opportunity_alerts: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentPreferences {
    pub risk_tolerance: RiskTolerance,
    pub investment_horizon: InvestmentHorizon,
    /// Annual target return, percent
    pub target_return: Decimal,
    /// Allocation drift that should trigger a rebalance, percent
    pub rebalance_threshold: Decimal,
    pub notifications: NotificationSettings,
}

impl Default for InvestmentPreferences {
    fn default() -> Self {
        Self {
            risk_tolerance: RiskTolerance::default(),
            investment_horizon: InvestmentHorizon::default(),
            target_return: dec!(15),
            rebalance_threshold: dec!(10),
            notifications: NotificationSettings::default(),
        }
    }
}

/// Partial update; absent fields keep their current value
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PreferencesUpdate {
    pub risk_tolerance: Option<RiskTolerance>,
    pub investment_horizon: Option<InvestmentHorizon>,
    pub target_return: Option<Decimal>,
    pub rebalance_threshold: Option<Decimal>,
    pub notifications: Option<NotificationSettings>,
}

impl InvestmentPreferences {
    /// Apply an update, rejecting it whole if any field is out of range
    pub fn apply(&self, update: PreferencesUpdate) -> Result<Self> {
        let next = Self {
            risk_tolerance: update.risk_tolerance.unwrap_or(self.risk_tolerance),
            investment_horizon: update.investment_horizon.unwrap_or(self.investment_horizon),
            target_return: update.target_return.unwrap_or(self.target_return),
            rebalance_threshold: update.rebalance_threshold.unwrap_or(self.rebalance_threshold),
            notifications: update.notifications.unwrap_or(self.notifications),
        };
        next.validate()?;
        Ok(next)
    }

    pub fn validate(&self) -> Result<()> {
        if !(Decimal::ZERO..=MAX_TARGET_RETURN).contains(&self.target_return) {
            return Err(AdvisorError::InvalidPreferences(format!(
                "target_return must be between 0 and {MAX_TARGET_RETURN}, got {}",
                self.target_return
            )));
        }
        if !(Decimal::ZERO..=Decimal::ONE_HUNDRED).contains(&self.rebalance_threshold) {
            return Err(AdvisorError::InvalidPreferences(format!(
                "rebalance_threshold must be between 0 and 100, got {}",
                self.rebalance_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct StoredPreferences {
    preferences: InvestmentPreferences,
    is_configured: bool,
}

/// In-memory preference store
#[derive(Clone, Debug, Default)]
pub struct PreferencesStore {
    inner: Arc<RwLock<StoredPreferences>>,
}

impl PreferencesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self) -> InvestmentPreferences {
        self.inner.read().await.preferences.clone()
    }

    /// Whether the user has saved preferences at least once since the last reset
    pub async fn is_configured(&self) -> bool {
        self.inner.read().await.is_configured
    }

    pub async fn update(&self, update: PreferencesUpdate) -> Result<InvestmentPreferences> {
        let mut stored = self.inner.write().await;
        let next = stored.preferences.apply(update)?;
        stored.preferences = next.clone();
        stored.is_configured = true;
        Ok(next)
    }

    pub async fn reset(&self) -> InvestmentPreferences {
        let mut stored = self.inner.write().await;
        *stored = StoredPreferences::default();
        stored.preferences.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = InvestmentPreferences::default();
        assert_eq!(prefs.risk_tolerance, RiskTolerance::Moderate);
        assert_eq!(prefs.target_return, dec!(15));
        assert!(prefs.notifications.risk_warnings);
    }

    #[test]
    fn test_partial_update_from_json() {
        let body = r#"{"risk_tolerance":"aggressive","target_return":"25"}"#;
        let update: PreferencesUpdate = serde_json::from_str(body).unwrap();
        let prefs = InvestmentPreferences::default().apply(update).unwrap();

        assert_eq!(prefs.risk_tolerance, RiskTolerance::Aggressive);
        assert_eq!(prefs.target_return, dec!(25));
        assert_eq!(prefs.investment_horizon, InvestmentHorizon::Medium);
    }

    #[test]
    fn test_out_of_range_update_rejected() {
        let update = PreferencesUpdate {
            rebalance_threshold: Some(dec!(150)),
            ..PreferencesUpdate::default()
        };
        let err = InvestmentPreferences::default().apply(update).unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidPreferences(_)));
    }

    #[tokio::test]
    async fn test_store_update_and_reset() {
        let store = PreferencesStore::new();
        assert!(!store.is_configured().await);

        store
            .update(PreferencesUpdate {
                risk_tolerance: Some(RiskTolerance::Conservative),
                ..PreferencesUpdate::default()
            })
            .await
            .unwrap();
        assert!(store.is_configured().await);
        assert_eq!(store.get().await.risk_tolerance, RiskTolerance::Conservative);

        let bad = PreferencesUpdate {
            target_return: Some(dec!(-1)),
            ..PreferencesUpdate::default()
        };
        assert!(store.update(bad).await.is_err());
        assert_eq!(store.get().await.risk_tolerance, RiskTolerance::Conservative);

        store.reset().await;
        assert!(!store.is_configured().await);
        assert_eq!(store.get().await, InvestmentPreferences::default());
    }
}
