use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Deserialize;
use strum::{EnumMessage as _, IntoEnumIterator as _};

use crate::NotificationError;

/// Sound name to human-readable label.
pub type Sounds = BTreeMap<String, String>;

/// Users can choose from a number of different default sounds
/// to play when receiving notifications. <https://pushover.net/api#sounds>
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::EnumMessage,
)]
#[strum(serialize_all = "lowercase")]
pub enum Sound {
    /// pushover - Pushover (default)
    #[strum(message = "Pushover (default)")]
    Pushover,
    /// bike - Bike
    #[strum(message = "Bike")]
    Bike,
    /// bugle - Bugle
    #[strum(message = "Bugle")]
    Bugle,
    /// cashregister - Cash Register
    #[strum(message = "Cash Register")]
    CashRegister,
    /// classical - Classical
    #[strum(message = "Classical")]
    Classical,
    /// cosmic - Cosmic
    #[strum(message = "Cosmic")]
    Cosmic,
    /// falling - Falling
    #[strum(message = "Falling")]
    Falling,
    /// gamelan - Gamelan
    #[strum(message = "Gamelan")]
    GameLan,
    /// incoming - Incoming
    #[strum(message = "Incoming")]
    Incoming,
    /// intermission - Intermission
    #[strum(message = "Intermission")]
    Intermission,
    /// magic - Magic
    #[strum(message = "Magic")]
    Magic,
    /// mechanical - Mechanical
    #[strum(message = "Mechanical")]
    Mechanical,
    /// pianobar - Piano Bar
    #[strum(message = "Piano Bar")]
    PianoBar,
    /// siren - Siren
    #[strum(message = "Siren")]
    Siren,
    /// spacealarm - Space Alarm
    #[strum(message = "Space Alarm")]
    SpaceAlarm,
    /// tugboat - Tug Boat
    #[strum(message = "Tug Boat")]
    Tugboat,
    /// alien - Alien Alarm (long)
    #[strum(message = "Alien Alarm (long)")]
    Alien,
    /// climb - Climb (long)
    #[strum(message = "Climb (long)")]
    Climb,
    /// persistent - Persistent (long)
    #[strum(message = "Persistent (long)")]
    Persistent,
    /// echo - Pushover Echo (long)
    #[strum(message = "Pushover Echo (long)")]
    Echo,
    /// updown - Up Down (long)
    #[strum(message = "Up Down (long)")]
    UpDown,
    /// vibrate - Vibrate Only
    #[strum(message = "Vibrate Only")]
    Vibrate,
    /// none - None (silent)
    #[strum(message = "None (silent)")]
    None,
}

impl Sound {
    /// Built-in sounds, used until the first successful refresh.
    pub fn defaults() -> Sounds {
        Self::iter()
            .map(|s| (s.to_string(), s.get_message().unwrap_or_default().to_string()))
            .collect()
    }
}

/// Sound table of one client.
///
/// Readers get an immutable snapshot; a refresh swaps in a whole new table.
#[derive(Debug)]
pub struct SoundTable {
    current: RwLock<Arc<Sounds>>,
    failure: RwLock<Option<String>>,
}

impl Default for SoundTable {
    fn default() -> Self {
        Self::new(Sound::defaults())
    }
}

impl SoundTable {
    /// Creates a [`SoundTable`] holding `sounds`.
    pub fn new(sounds: Sounds) -> Self {
        Self {
            current: RwLock::new(Arc::new(sounds)),
            failure: RwLock::new(None),
        }
    }

    /// Current table.
    pub fn snapshot(&self) -> Arc<Sounds> {
        let current = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&current)
    }

    /// Whether `name` is a known sound.
    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().contains_key(name)
    }

    /// Label of sound `name`.
    pub fn label(&self, name: &str) -> Option<String> {
        self.snapshot().get(name).cloned()
    }

    /// Error of the latest refresh, `None` once a refresh succeeds.
    pub fn last_error(&self) -> Option<String> {
        self.failure
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn replace(&self, sounds: Sounds) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(sounds);
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub(crate) fn fail(&self, e: &NotificationError) {
        *self.failure.write().unwrap_or_else(PoisonError::into_inner) = Some(e.to_string());
    }
}

/// Body of `GET /1/sounds.json`. <https://pushover.net/api#sounds>
#[derive(Debug, Deserialize)]
pub(crate) struct SoundsResponse {
    #[serde(default)]
    pub(crate) sounds: Option<Sounds>,
    #[serde(default)]
    pub(crate) errors: Option<Vec<String>>,
}
