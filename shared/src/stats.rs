use serde::{Deserialize, Serialize};
use std::fmt;

/// Which swarm algorithm drove the environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentType {
    #[serde(rename = "GWO")]
    Gwo,
    #[serde(rename = "SMA")]
    Sma,
}

impl EnvironmentType {
    pub const ALL: [EnvironmentType; 2] = [EnvironmentType::Gwo, EnvironmentType::Sma];
}

impl fmt::Display for EnvironmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentType::Gwo => write!(f, "GWO"),
            EnvironmentType::Sma => write!(f, "SMA"),
        }
    }
}

/// Side that won a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
    /// The target was hit before the round timed out
    #[serde(rename = "AttackerWon")]
    Attacker,

    /// The round timed out without a hit
    #[serde(rename = "DefenderWon")]
    Defender,
}

/// One event per concluded round.
///
/// Every field is optional so that partially filled events can still be
/// written to the log. Field names serialize in PascalCase, one JSON object
/// per line, which keeps the log readable by the existing post-processing
/// scripts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoundStatistic {
    /// Type of the simulated environment
    pub environment_type: Option<EnvironmentType>,

    /// Maximum number of playable steps in a round
    pub max_rounds: Option<u32>,

    /// Number of steps actually played
    pub played_rounds: Option<u32>,

    /// Who won this round
    #[serde(rename = "WhoWon")]
    pub winner: Option<Winner>,

    /// Vision distance cap of the objective function. Unlimited vision is
    /// written as the string `"Infinity"`.
    #[serde(default, with = "line_of_sight")]
    pub line_of_sight: Option<f64>,

    pub nr_attackers: Option<u32>,
    pub nr_defenders: Option<u32>,
    pub max_speed: Option<f64>,
    pub area_side_length: Option<f64>,
    pub target_hit_radius: Option<f64>,
}

impl RoundStatistic {
    /// Names of all fields that are not set
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.environment_type.is_none() {
            missing.push("EnvironmentType");
        }
        if self.max_rounds.is_none() {
            missing.push("MaxRounds");
        }
        if self.played_rounds.is_none() {
            missing.push("PlayedRounds");
        }
        if self.winner.is_none() {
            missing.push("WhoWon");
        }
        if self.line_of_sight.is_none() {
            missing.push("LineOfSight");
        }
        if self.nr_attackers.is_none() {
            missing.push("NrAttackers");
        }
        if self.nr_defenders.is_none() {
            missing.push("NrDefenders");
        }
        if self.max_speed.is_none() {
            missing.push("MaxSpeed");
        }
        if self.area_side_length.is_none() {
            missing.push("AreaSideLength");
        }
        if self.target_hit_radius.is_none() {
            missing.push("TargetHitRadius");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Serialize to a single JSON line (no trailing newline)
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// JSON has no infinite numbers, so an unlimited vision distance is spelled
/// out instead of collapsing to `null`.
mod line_of_sight {
    use serde::de::{self, Unexpected};
    use serde::{Deserialize, Deserializer, Serializer};

    const INFINITY: &str = "Infinity";

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) if *v == f64::INFINITY => serializer.serialize_str(INFINITY),
            Some(v) => serializer.serialize_f64(*v),
            None => serializer.serialize_none(),
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Repr::Number(v)) => Ok(Some(v)),
            Some(Repr::Text(text)) if text == INFINITY => Ok(Some(f64::INFINITY)),
            Some(Repr::Text(text)) => Err(de::Error::invalid_value(
                Unexpected::Str(&text),
                &"a number or \"Infinity\"",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> RoundStatistic {
        RoundStatistic {
            environment_type: Some(EnvironmentType::Sma),
            max_rounds: Some(200),
            played_rounds: Some(42),
            winner: Some(Winner::Attacker),
            line_of_sight: Some(10.0),
            nr_attackers: Some(10),
            nr_defenders: Some(2),
            max_speed: Some(13.0),
            area_side_length: Some(40.0),
            target_hit_radius: Some(2.0),
        }
    }

    #[test]
    fn test_default_is_missing_everything() {
        let stat = RoundStatistic::default();
        assert_eq!(stat.missing_fields().len(), 10);
        assert!(!stat.is_complete());
    }

    #[test]
    fn test_complete_event() {
        assert!(complete().is_complete());
    }

    #[test]
    fn test_json_uses_pascal_case_and_string_enums() {
        let line = complete().to_json_line().unwrap();
        assert!(line.contains("\"EnvironmentType\":\"SMA\""));
        assert!(line.contains("\"WhoWon\":\"AttackerWon\""));
        assert!(line.contains("\"PlayedRounds\":42"));
        assert!(line.contains("\"NrDefenders\":2"));
        assert!(!line.contains('\n'));
    }

    #[test]
    fn test_missing_field_is_still_emitted_as_null() {
        let stat = RoundStatistic {
            winner: None,
            ..complete()
        };
        let line = stat.to_json_line().unwrap();
        assert!(line.contains("\"WhoWon\":null"));
        assert_eq!(stat.missing_fields(), vec!["WhoWon"]);
    }

    #[test]
    fn test_parse_line_from_log() {
        let line = r#"{"EnvironmentType":"GWO","MaxRounds":4000,"PlayedRounds":12,"WhoWon":"DefenderWon","LineOfSight":null,"NrAttackers":5,"NrDefenders":1,"MaxSpeed":3.5,"AreaSideLength":20.0,"TargetHitRadius":1.0}"#;
        let stat: RoundStatistic = serde_json::from_str(line).unwrap();
        assert_eq!(stat.environment_type, Some(EnvironmentType::Gwo));
        assert_eq!(stat.winner, Some(Winner::Defender));
        assert_eq!(stat.missing_fields(), vec!["LineOfSight"]);
    }

    #[test]
    fn test_unlimited_vision_survives_the_log() {
        let stat = RoundStatistic {
            line_of_sight: Some(f64::INFINITY),
            ..complete()
        };
        assert!(stat.is_complete());

        let line = stat.to_json_line().unwrap();
        assert!(line.contains("\"LineOfSight\":\"Infinity\""));

        let back: RoundStatistic = serde_json::from_str(&line).unwrap();
        assert_eq!(back.line_of_sight, Some(f64::INFINITY));
        assert!(back.is_complete());
    }

    #[test]
    fn test_finite_vision_stays_a_number() {
        let line = complete().to_json_line().unwrap();
        assert!(line.contains("\"LineOfSight\":10.0"));
        let back: RoundStatistic = serde_json::from_str(&line).unwrap();
        assert_eq!(back, complete());
    }

    #[test]
    fn test_absent_or_unknown_vision() {
        let stat: RoundStatistic = serde_json::from_str("{}").unwrap();
        assert_eq!(stat.line_of_sight, None);

        let err = serde_json::from_str::<RoundStatistic>(r#"{"LineOfSight":"far"}"#);
        assert!(err.is_err());
    }
}
