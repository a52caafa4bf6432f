//! Categorical vocabularies
//!
//! One closed enum per categorical field. Variants are the canonical tokens
//! the preprocessor was fit on; `ALIASES` lists every accepted spelling
//! (English and Spanish, folded) and nothing outside it is accepted.

use serde::Serialize;

/// Closed categorical vocabulary
pub trait Vocabulary: Sized + Copy + 'static {
    /// Folded alias -> canonical value
    const ALIASES: &'static [(&'static str, Self)];

    /// Every canonical value
    const ALL: &'static [Self];

    /// Canonical token as seen by the preprocessor
    fn token(&self) -> &'static str;

    /// Map a raw client value to its canonical value.
    fn lookup(raw: &str) -> Option<Self> {
        let key = fold(raw);
        Self::ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, value)| *value)
    }

    fn tokens() -> Vec<&'static str> {
        Self::ALL.iter().map(|v| v.token()).collect()
    }
}

/// Trim, lowercase, treat `-`/`_` as spaces, collapse whitespace.
pub fn fold(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// GENDER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Gender {
    Male,
    Female,
}

impl Vocabulary for Gender {
    const ALIASES: &'static [(&'static str, Self)] = &[
        ("male", Gender::Male),
        ("m", Gender::Male),
        ("man", Gender::Male),
        ("masculino", Gender::Male),
        ("hombre", Gender::Male),
        ("varón", Gender::Male),
        ("varon", Gender::Male),
        ("female", Gender::Female),
        ("f", Gender::Female),
        ("woman", Gender::Female),
        ("femenino", Gender::Female),
        ("mujer", Gender::Female),
    ];

    const ALL: &'static [Self] = &[Gender::Male, Gender::Female];

    fn token(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

// ============================================================================
// ALCOHOL CONSUMPTION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlcoholConsumption {
    Never,
    Occasional,
    Regular,
}

impl Vocabulary for AlcoholConsumption {
    const ALIASES: &'static [(&'static str, Self)] = &[
        ("never", AlcoholConsumption::Never),
        ("none", AlcoholConsumption::Never),
        ("nunca", AlcoholConsumption::Never),
        ("ninguno", AlcoholConsumption::Never),
        ("occasional", AlcoholConsumption::Occasional),
        ("occasionally", AlcoholConsumption::Occasional),
        ("social", AlcoholConsumption::Occasional),
        ("ocasional", AlcoholConsumption::Occasional),
        ("low", AlcoholConsumption::Occasional),
        ("light", AlcoholConsumption::Occasional),
        ("bajo", AlcoholConsumption::Occasional),
        ("regular", AlcoholConsumption::Regular),
        ("frequent", AlcoholConsumption::Regular),
        ("habitual", AlcoholConsumption::Regular),
        ("frecuente", AlcoholConsumption::Regular),
        ("high", AlcoholConsumption::Regular),
        ("heavy", AlcoholConsumption::Regular),
        ("alto", AlcoholConsumption::Regular),
    ];

    const ALL: &'static [Self] = &[
        AlcoholConsumption::Never,
        AlcoholConsumption::Occasional,
        AlcoholConsumption::Regular,
    ];

    fn token(&self) -> &'static str {
        match self {
            AlcoholConsumption::Never => "Never",
            AlcoholConsumption::Occasional => "Occasional",
            AlcoholConsumption::Regular => "Regular",
        }
    }
}

// ============================================================================
// SMOKING STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SmokingStatus {
    Never,
    Former,
    Current,
}

impl Vocabulary for SmokingStatus {
    const ALIASES: &'static [(&'static str, Self)] = &[
        ("never", SmokingStatus::Never),
        ("non smoker", SmokingStatus::Never),
        ("nunca", SmokingStatus::Never),
        ("no fumador", SmokingStatus::Never),
        ("former", SmokingStatus::Former),
        ("ex smoker", SmokingStatus::Former),
        ("exfumador", SmokingStatus::Former),
        ("ex fumador", SmokingStatus::Former),
        ("current", SmokingStatus::Current),
        ("smoker", SmokingStatus::Current),
        ("actual", SmokingStatus::Current),
        ("fumador", SmokingStatus::Current),
        ("fumador actual", SmokingStatus::Current),
    ];

    const ALL: &'static [Self] = &[
        SmokingStatus::Never,
        SmokingStatus::Former,
        SmokingStatus::Current,
    ];

    fn token(&self) -> &'static str {
        match self {
            SmokingStatus::Never => "Never",
            SmokingStatus::Former => "Former",
            SmokingStatus::Current => "Current",
        }
    }
}

// ============================================================================
// PHYSICAL ACTIVITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActivityLevel {
    Low,
    Moderate,
    High,
}

impl Vocabulary for ActivityLevel {
    const ALIASES: &'static [(&'static str, Self)] = &[
        ("low", ActivityLevel::Low),
        ("sedentary", ActivityLevel::Low),
        ("baja", ActivityLevel::Low),
        ("bajo", ActivityLevel::Low),
        ("sedentario", ActivityLevel::Low),
        ("moderate", ActivityLevel::Moderate),
        ("medium", ActivityLevel::Moderate),
        ("moderada", ActivityLevel::Moderate),
        ("moderado", ActivityLevel::Moderate),
        ("media", ActivityLevel::Moderate),
        ("medio", ActivityLevel::Moderate),
        ("high", ActivityLevel::High),
        ("active", ActivityLevel::High),
        ("alta", ActivityLevel::High),
        ("alto", ActivityLevel::High),
        ("activo", ActivityLevel::High),
    ];

    const ALL: &'static [Self] = &[
        ActivityLevel::Low,
        ActivityLevel::Moderate,
        ActivityLevel::High,
    ];

    fn token(&self) -> &'static str {
        match self {
            ActivityLevel::Low => "Low",
            ActivityLevel::Moderate => "Moderate",
            ActivityLevel::High => "High",
        }
    }
}
