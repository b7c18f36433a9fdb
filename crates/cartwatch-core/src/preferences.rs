//! User notification preferences and the quiet-hours evaluator.
//!
//! The preference tree is owned by the user and mutated only through an
//! explicit save: callers edit a draft copy, and [`PreferencesStore::save`]
//! validates it, persists it remotely, and only then makes it the saved
//! copy that gating and suppression read. A draft that fails validation
//! leaves the saved copy untouched.

use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::notifications::NotificationType;
use crate::remote::PreferencesSource;

/// Serde helper for `"HH:MM"` time-of-day fields.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(de)?;
        NaiveTime::parse_from_str(&s, FORMAT)
            .map_err(|_| serde::de::Error::custom(format!("invalid time of day '{s}', expected HH:MM")))
    }
}

fn tod(hour: u32, min: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, min, 0).unwrap_or(NaiveTime::MIN)
}

/// Expiration alert configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationAlertPrefs {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// How many days before expiry alerts are requested.
    #[serde(default = "default_advance_days")]
    pub advance_days: u32,
}

/// Budget warning configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetWarningPrefs {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Spending percentage at which warnings start (0-100).
    #[serde(default = "default_threshold_percentage")]
    pub threshold_percentage: u8,
}

/// How often a shopping reminder fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderFrequency {
    Daily,
    Weekly,
    Monthly,
}

/// Day of week for scheduled reminders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Shopping reminder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingReminderPrefs {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_frequency")]
    pub frequency: ReminderFrequency,
    #[serde(default = "default_day")]
    pub day: ReminderDay,
    #[serde(with = "hhmm", default = "default_shopping_time")]
    pub time: NaiveTime,
}

/// Meal prep reminder configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPrepReminderPrefs {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_day")]
    pub day: ReminderDay,
    #[serde(with = "hhmm", default = "default_meal_prep_time")]
    pub time: NaiveTime,
}

/// A daily time window during which alert surfacing is suppressed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuietHours {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(with = "hhmm", default = "default_quiet_start")]
    pub start: NaiveTime,
    #[serde(with = "hhmm", default = "default_quiet_end")]
    pub end: NaiveTime,
}

impl QuietHours {
    /// Whether alert surfacing is suppressed at `now`.
    ///
    /// A window with `start == end` covers the whole day. A window with
    /// `start > end` wraps past midnight.
    pub fn is_suppressed(&self, now: NaiveTime) -> bool {
        if !self.enabled {
            return false;
        }
        if self.start == self.end {
            return true;
        }
        if self.start < self.end {
            self.start <= now && now < self.end
        } else {
            now >= self.start || now < self.end
        }
    }
}

/// The full user preference tree.
///
/// Field defaults mirror the server's defaults, so a partial payload
/// deserializes into a complete tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub expiration_alerts: ExpirationAlertPrefs,
    #[serde(default)]
    pub budget_warnings: BudgetWarningPrefs,
    #[serde(default)]
    pub shopping_reminders: ShoppingReminderPrefs,
    #[serde(default)]
    pub meal_prep_reminders: MealPrepReminderPrefs,
    #[serde(default)]
    pub quiet_hours: QuietHours,
}

impl NotificationPreferences {
    /// Category gate, evaluated once per notification at ingestion time.
    ///
    /// Already-ingested records are not re-filtered when preferences
    /// change; only new ingestions see the new gate.
    pub fn allows(&self, kind: NotificationType) -> bool {
        if !self.enabled {
            return false;
        }
        match kind {
            NotificationType::ExpirationAlert => self.expiration_alerts.enabled,
            NotificationType::BudgetWarning => self.budget_warnings.enabled,
            NotificationType::ShoppingReminder => self.shopping_reminders.enabled,
            NotificationType::MealPrepReminder => self.meal_prep_reminders.enabled,
            NotificationType::Other => true,
        }
    }

    /// Validate numeric ranges before a save is accepted.
    ///
    /// Time-of-day format is enforced at deserialization by the [`hhmm`]
    /// helper; `advance_days` is non-negative by construction.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.budget_warnings.threshold_percentage > 100 {
            return Err(ValidationError::OutOfRange {
                field: "budget_warnings.threshold_percentage".to_string(),
                value: i64::from(self.budget_warnings.threshold_percentage),
                max: 100,
            });
        }
        Ok(())
    }

    /// Quiet-hours check against an explicit time-of-day.
    pub fn suppressed_at(&self, now: NaiveTime) -> bool {
        self.quiet_hours.is_suppressed(now)
    }
}

// Default functions
fn default_true() -> bool {
    true
}
fn default_advance_days() -> u32 {
    3
}
fn default_threshold_percentage() -> u8 {
    80
}
fn default_frequency() -> ReminderFrequency {
    ReminderFrequency::Weekly
}
fn default_day() -> ReminderDay {
    ReminderDay::Sunday
}
fn default_shopping_time() -> NaiveTime {
    tod(10, 0)
}
fn default_meal_prep_time() -> NaiveTime {
    tod(15, 0)
}
fn default_quiet_start() -> NaiveTime {
    tod(22, 0)
}
fn default_quiet_end() -> NaiveTime {
    tod(8, 0)
}

impl Default for ExpirationAlertPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            advance_days: default_advance_days(),
        }
    }
}

impl Default for BudgetWarningPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold_percentage: default_threshold_percentage(),
        }
    }
}

impl Default for ShoppingReminderPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            frequency: ReminderFrequency::Weekly,
            day: ReminderDay::Sunday,
            time: default_shopping_time(),
        }
    }
}

impl Default for MealPrepReminderPrefs {
    fn default() -> Self {
        Self {
            enabled: true,
            day: ReminderDay::Sunday,
            time: default_meal_prep_time(),
        }
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: true,
            start: default_quiet_start(),
            end: default_quiet_end(),
        }
    }
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            expiration_alerts: ExpirationAlertPrefs::default(),
            budget_warnings: BudgetWarningPrefs::default(),
            shopping_reminders: ShoppingReminderPrefs::default(),
            meal_prep_reminders: MealPrepReminderPrefs::default(),
            quiet_hours: QuietHours::default(),
        }
    }
}

/// Saved-preferences holder with draft-until-saved semantics.
pub struct PreferencesStore {
    source: Arc<dyn PreferencesSource>,
    saved: Mutex<NotificationPreferences>,
}

impl PreferencesStore {
    /// Start with server defaults; call [`PreferencesStore::load`] to pull
    /// the user's saved tree.
    pub fn new(source: Arc<dyn PreferencesSource>) -> Self {
        Self {
            source,
            saved: Mutex::new(NotificationPreferences::default()),
        }
    }

    /// Fetch the saved tree from the preferences source.
    pub async fn load(&self) -> Result<NotificationPreferences> {
        let prefs = self.source.load_preferences().await?;
        *self.saved.lock().unwrap() = prefs.clone();
        Ok(prefs)
    }

    /// The currently saved preferences. Drafts held by callers are
    /// invisible here until saved.
    pub fn current(&self) -> NotificationPreferences {
        self.saved.lock().unwrap().clone()
    }

    /// Validate and persist a draft. On success the draft becomes the
    /// saved copy; on any failure the previous copy stays in effect.
    pub async fn save(&self, draft: NotificationPreferences) -> Result<NotificationPreferences> {
        draft.validate()?;
        self.source.save_preferences(&draft).await?;
        *self.saved.lock().unwrap() = draft.clone();
        Ok(draft)
    }

    /// Quiet-hours check against local wall-clock time.
    pub fn is_quiet_now(&self) -> bool {
        self.current().suppressed_at(Local::now().time())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn window(start: (u32, u32), end: (u32, u32)) -> QuietHours {
        QuietHours {
            enabled: true,
            start: tod(start.0, start.1),
            end: tod(end.0, end.1),
        }
    }

    #[test]
    fn quiet_hours_wrapping_window_boundaries() {
        let w = window((22, 0), (6, 0));
        assert!(w.is_suppressed(tod(23, 59)));
        assert!(w.is_suppressed(tod(5, 59)));
        assert!(!w.is_suppressed(tod(6, 0)));
        assert!(!w.is_suppressed(tod(21, 59)));
        assert!(w.is_suppressed(tod(22, 0)));
    }

    #[test]
    fn quiet_hours_daytime_window() {
        let w = window((9, 30), (17, 0));
        assert!(w.is_suppressed(tod(9, 30)));
        assert!(w.is_suppressed(tod(12, 0)));
        assert!(!w.is_suppressed(tod(17, 0)));
        assert!(!w.is_suppressed(tod(8, 0)));
    }

    #[test]
    fn quiet_hours_equal_bounds_means_all_day() {
        let w = window((10, 0), (10, 0));
        assert!(w.is_suppressed(tod(0, 0)));
        assert!(w.is_suppressed(tod(10, 0)));
        assert!(w.is_suppressed(tod(23, 59)));
    }

    #[test]
    fn quiet_hours_disabled_never_suppresses() {
        let mut w = window((10, 0), (10, 0));
        w.enabled = false;
        assert!(!w.is_suppressed(tod(10, 0)));
    }

    #[test]
    fn defaults_match_server_tree() {
        let prefs = NotificationPreferences::default();
        assert!(prefs.enabled);
        assert_eq!(prefs.expiration_alerts.advance_days, 3);
        assert_eq!(prefs.budget_warnings.threshold_percentage, 80);
        assert_eq!(prefs.shopping_reminders.frequency, ReminderFrequency::Weekly);
        assert_eq!(prefs.shopping_reminders.day, ReminderDay::Sunday);
        assert_eq!(prefs.quiet_hours.start, tod(22, 0));
        assert_eq!(prefs.quiet_hours.end, tod(8, 0));
    }

    #[test]
    fn partial_payload_fills_defaults() {
        let prefs: NotificationPreferences =
            serde_json::from_str(r#"{"enabled": false}"#).unwrap();
        assert!(!prefs.enabled);
        assert!(prefs.quiet_hours.enabled);
        assert_eq!(prefs.quiet_hours.start, tod(22, 0));
    }

    #[test]
    fn hhmm_round_trip_and_rejects_garbage() {
        let prefs = NotificationPreferences::default();
        let json = serde_json::to_value(&prefs).unwrap();
        assert_eq!(json["quiet_hours"]["start"], "22:00");

        let bad = serde_json::from_str::<NotificationPreferences>(
            r#"{"quiet_hours": {"enabled": true, "start": "25:99", "end": "06:00"}}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn gating_respects_global_and_category_flags() {
        let mut prefs = NotificationPreferences::default();
        assert!(prefs.allows(NotificationType::ExpirationAlert));

        prefs.expiration_alerts.enabled = false;
        assert!(!prefs.allows(NotificationType::ExpirationAlert));
        assert!(prefs.allows(NotificationType::BudgetWarning));
        assert!(prefs.allows(NotificationType::Other));

        prefs.enabled = false;
        assert!(!prefs.allows(NotificationType::BudgetWarning));
        assert!(!prefs.allows(NotificationType::Other));
    }

    #[test]
    fn validate_rejects_threshold_above_hundred() {
        let mut prefs = NotificationPreferences::default();
        prefs.budget_warnings.threshold_percentage = 101;
        assert!(prefs.validate().is_err());

        prefs.budget_warnings.threshold_percentage = 100;
        assert!(prefs.validate().is_ok());
    }

    struct CountingPrefsSource {
        saves: AtomicUsize,
        fail_save: bool,
    }

    #[async_trait]
    impl PreferencesSource for CountingPrefsSource {
        async fn load_preferences(&self) -> Result<NotificationPreferences, SourceError> {
            let mut prefs = NotificationPreferences::default();
            prefs.budget_warnings.threshold_percentage = 50;
            Ok(prefs)
        }

        async fn save_preferences(
            &self,
            _prefs: &NotificationPreferences,
        ) -> Result<(), SourceError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                Err(SourceError::Status {
                    status: 500,
                    message: "boom".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_without_touching_saved_copy() {
        let source = Arc::new(CountingPrefsSource {
            saves: AtomicUsize::new(0),
            fail_save: false,
        });
        let store = PreferencesStore::new(source.clone());

        let mut draft = store.current();
        draft.budget_warnings.threshold_percentage = 250;
        let err = store.save(draft).await.unwrap_err();
        assert!(matches!(err, crate::error::CoreError::Validation(_)));

        // Validation failed before any remote call.
        assert_eq!(source.saves.load(Ordering::SeqCst), 0);
        assert_eq!(store.current().budget_warnings.threshold_percentage, 80);
    }

    #[tokio::test]
    async fn remote_save_failure_keeps_previous_copy() {
        let source = Arc::new(CountingPrefsSource {
            saves: AtomicUsize::new(0),
            fail_save: true,
        });
        let store = PreferencesStore::new(source.clone());

        let mut draft = store.current();
        draft.quiet_hours.enabled = false;
        assert!(store.save(draft).await.is_err());
        assert!(store.current().quiet_hours.enabled);
    }

    #[tokio::test]
    async fn load_replaces_saved_copy() {
        let source = Arc::new(CountingPrefsSource {
            saves: AtomicUsize::new(0),
            fail_save: false,
        });
        let store = PreferencesStore::new(source);
        assert_eq!(store.current().budget_warnings.threshold_percentage, 80);

        store.load().await.unwrap();
        assert_eq!(store.current().budget_warnings.threshold_percentage, 50);
    }

    #[tokio::test]
    async fn successful_save_swaps_saved_copy() {
        let source = Arc::new(CountingPrefsSource {
            saves: AtomicUsize::new(0),
            fail_save: false,
        });
        let store = PreferencesStore::new(source);

        let mut draft = store.current();
        draft.expiration_alerts.enabled = false;
        // The draft is not in effect until saved.
        assert!(store.current().expiration_alerts.enabled);

        store.save(draft).await.unwrap();
        assert!(!store.current().expiration_alerts.enabled);
    }
}
