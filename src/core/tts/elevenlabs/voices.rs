use phf::phf_map;
use tracing::{debug, warn};

use super::{DEFAULT_VOICE_ID, VOICE_ID_LENGTH, VOICE_ID_VARIABLE};
use crate::core::collaborators::VariableStore;
use crate::core::models::{Gender, Streaming};

/// Voice per `{language}_{gender}`.
static VOICE_MAP: phf::Map<&'static str, &'static str> = phf_map! {
    "english_male" => "21m00Tcm4TlvDq8ikWAM",
    "english_female" => "EXAVITQu4vr4xnSDxMaL",
    "english_neutral" => "EXAVITQu4vr4xnSDxMaL",

    "japanese_male" => "Mv8AjrYZCBkdsmDHNwcB",
    "japanese_female" => "PmgfHCGeS5b7sH90BOOJ",
    "japanese_neutral" => "PmgfHCGeS5b7sH90BOOJ",

    "chinese_male" => "MI36FIkp9wRP7cpWKPTl",
    "chinese_female" => "ZL9dtgFhmkTzAHUUtQL8",
    "chinese_neutral" => "ZL9dtgFhmkTzAHUUtQL8",

    "german_male" => "uM8iMoqaSe1eDaJiWfxf",
    "german_female" => "nF7t9cuYo0u3kuVI9q4B",
    "german_neutral" => "nF7t9cuYo0u3kuVI9q4B",

    "french_male" => "IPgYtHTNLjC7Bq7IPHrm",
    "french_female" => "SmWACbi37pETyxxMhSpc",
    "french_neutral" => "SmWACbi37pETyxxMhSpc",

    "hindi_male" => "IvLWq57RKibBrqZGpQrC",
    "hindi_female" => "MF4J4IDTRo0AxOO4dpFR",
    "hindi_neutral" => "MF4J4IDTRo0AxOO4dpFR",

    "korean_male" => "nbrxrAz3eYm9NgojrmFK",
    "korean_female" => "AW5wrnG1jVizOYY7R1Oo",
    "korean_neutral" => "AW5wrnG1jVizOYY7R1Oo",

    "italian_male" => "iLVmqjzCGGvqtMCk6vVQ",
    "italian_female" => "b8jhBTcGAq4kQGWmKprT",
    "italian_neutral" => "b8jhBTcGAq4kQGWmKprT",

    "spanish_male" => "JjHBC66wF58p4ogebCNA",
    "spanish_female" => "UOIqAnmS11Reiei1Ytkc",
    "spanish_neutral" => "UOIqAnmS11Reiei1Ytkc",

    "portuguese_male" => "NdHRjGnnDKGnnm2c19le",
    "portuguese_female" => "CZD4BJ803C6T0alQxsR7",
    "portuguese_neutral" => "CZD4BJ803C6T0alQxsR7",

    "dutch_male" => "G53Wkf3yrsXvhoQsmslL",
    "dutch_female" => "YUdpWWny7k5yb4QCeweX",
    "dutch_neutral" => "YUdpWWny7k5yb4QCeweX",

    "russian_male" => "qJBO8ZmKp4te7NTtYgzz",
    "russian_female" => "ymDCYd8puC7gYjxIamPt",
    "russian_neutral" => "ymDCYd8puC7gYjxIamPt",

    "arabic_male" => "s83SAGdFTflAwJcAV81K",
    "arabic_female" => "EXAVITQu4vr4xnSDxMaL",
    "arabic_neutral" => "4wf10lgibMnboGJGCLrP",

    "polish_male" => "H5xTcsAIeS5RAykjz57a",
    "polish_female" => "W0sqKm1Sfw1EzlCH14FQ",
    "polish_neutral" => "W0sqKm1Sfw1EzlCH14FQ",
};

/// ISO 639 codes of the languages in [`VOICE_MAP`].
static LANGUAGE_CODES: phf::Map<&'static str, &'static str> = phf_map! {
    "en" => "english",
    "ja" => "japanese",
    "zh" => "chinese",
    "cmn" => "chinese",
    "de" => "german",
    "fr" => "french",
    "hi" => "hindi",
    "ko" => "korean",
    "it" => "italian",
    "es" => "spanish",
    "pt" => "portuguese",
    "nl" => "dutch",
    "ru" => "russian",
    "ar" => "arabic",
    "pl" => "polish",
};

/// Normalizes `en-US`, `ja_JP`, `English` and the like to a voice map language.
pub fn base_language(language: &str) -> String {
    let base = language
        .split(['_', '-'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    match LANGUAGE_CODES.get(base.as_str()) {
        Some(name) => (*name).to_string(),
        None => base,
    }
}

/// Voice for a language and gender, falling back to the language's neutral voice.
pub fn voice_for_language(language: &str, gender: Gender) -> Option<&'static str> {
    let base = base_language(language);
    VOICE_MAP
        .get(format!("{}_{}", base, gender.as_str()).as_str())
        .or_else(|| VOICE_MAP.get(format!("{base}_neutral").as_str()))
        .copied()
}

pub fn is_valid_voice_id(voice_id: &str) -> bool {
    voice_id.len() == VOICE_ID_LENGTH && voice_id.chars().all(|c| c.is_ascii_alphanumeric())
}

async fn voice_from_variables(streaming: &Streaming, variables: &dyn VariableStore) -> Option<String> {
    let activeflow_id = streaming.activeflow_id.filter(|id| !id.is_nil())?;

    let vars = match variables.get_variables(activeflow_id).await {
        Ok(vars) => vars,
        Err(e) => {
            warn!(
                streaming_id = %streaming.id,
                activeflow_id = %activeflow_id,
                "Could not get flow variables: {}", e
            );
            return None;
        }
    };

    vars.get(VOICE_ID_VARIABLE)
        .filter(|id| is_valid_voice_id(id))
        .cloned()
}

/// Picks the voice for a session.
///
/// Precedence: the session's explicit voice, the flow variable
/// [`VOICE_ID_VARIABLE`], the language and gender table, the default voice.
/// Malformed voice ids from either source are skipped.
pub async fn select_voice(streaming: &Streaming, variables: &dyn VariableStore) -> String {
    if is_valid_voice_id(&streaming.voice_id) {
        return streaming.voice_id.clone();
    }
    if !streaming.voice_id.is_empty() {
        warn!(
            streaming_id = %streaming.id,
            "Ignoring malformed voice id: {:?}", streaming.voice_id
        );
    }

    if let Some(voice_id) = voice_from_variables(streaming, variables).await {
        debug!(streaming_id = %streaming.id, "Using voice from flow variables: {}", voice_id);
        return voice_id;
    }

    if let Some(voice_id) = voice_for_language(&streaming.language, streaming.gender) {
        return voice_id.to_string();
    }

    DEFAULT_VOICE_ID.to_string()
}
