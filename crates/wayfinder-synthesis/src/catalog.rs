//! Output languages and the fixed message catalog.
//!
//! All user-facing strings the synthesizer emits live here, so EN and
//! IT renderings stay in lockstep.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the synthesizer can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    It,
}

impl Language {
    /// Map a BCP-47-ish tag onto a supported language. Any `it*` tag
    /// selects Italian; everything else falls back to English.
    pub fn from_tag(tag: &str) -> Self {
        if tag.to_lowercase().starts_with("it") {
            Language::It
        } else {
            Language::En
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::It => "it",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys into the message catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Message {
    Title,
    WeatherRain,
    WeatherClear,
    FallbackActivity,
    RainAlternative,
    TransportGeneric,
    MissingWeatherWarning,
    MissingPoiWarning,
}

pub(crate) fn text(language: Language, message: Message) -> &'static str {
    use Message::*;
    match (language, message) {
        (Language::En, Title) => "Day-by-day itinerary",
        (Language::En, WeatherRain) => "High rain risk. Prefer indoor activities.",
        (Language::En, WeatherClear) => "Weather looks manageable for outdoor plans.",
        (Language::En, FallbackActivity) => "Local indoor discovery walk",
        (Language::En, RainAlternative) => "Indoor backup: museum or covered market.",
        (Language::En, TransportGeneric) => {
            "Use a practical transfer option and verify timing locally."
        }
        (Language::En, MissingWeatherWarning) => "Weather data missing for some days.",
        (Language::En, MissingPoiWarning) => "POI data missing for some days.",
        (Language::It, Title) => "Itinerario giorno per giorno",
        (Language::It, WeatherRain) => "Rischio pioggia alto. Preferisci attivita al chiuso.",
        (Language::It, WeatherClear) => "Meteo gestibile per attivita all'aperto.",
        (Language::It, FallbackActivity) => "Passeggiata di scoperta al chiuso",
        (Language::It, RainAlternative) => "Alternativa al chiuso: museo o mercato coperto.",
        (Language::It, TransportGeneric) => {
            "Usa un trasferimento pratico e verifica gli orari sul posto."
        }
        (Language::It, MissingWeatherWarning) => "Dati meteo mancanti per alcuni giorni.",
        (Language::It, MissingPoiWarning) => "Dati POI mancanti per alcuni giorni.",
    }
}

pub(crate) fn transport_option(language: Language, title: &str) -> String {
    match language {
        Language::En => format!("Transfer option: {title}"),
        Language::It => format!("Opzione trasferimento: {title}"),
    }
}
