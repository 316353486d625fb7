//! Trading rule data structures.
//!
//! A rule compares one indicator reading against either a literal threshold
//! or the current bar's price:
//! - `Indicator`: which indicator the rule reads
//! - `Operator`: strict greater-than or less-than
//! - `Comparand`: literal number or the `PRICE` sentinel
//! - `Rule`: validated, immutable combination of the above plus a weight

use crate::domain::error::EngineError;
use crate::domain::indicator::macd::DEFAULT_MACD;
use crate::domain::indicator::IndicatorType;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Indicator {
    Rsi,
    Macd,
    Sma,
    Ema,
}

impl Indicator {
    pub const ALL: [Indicator; 4] = [Indicator::Rsi, Indicator::Macd, Indicator::Sma, Indicator::Ema];
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Indicator::Rsi => "RSI",
            Indicator::Macd => "MACD",
            Indicator::Sma => "SMA",
            Indicator::Ema => "EMA",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operator {
    Gt,
    Lt,
}

impl Operator {
    pub fn apply(self, left: f64, right: f64) -> bool {
        match self {
            Operator::Gt => left > right,
            Operator::Lt => left < right,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Gt => f.write_str(">"),
            Operator::Lt => f.write_str("<"),
        }
    }
}

/// Right-hand side of a rule. Serialized as a JSON number or the string `"PRICE"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparand {
    Value(f64),
    Price,
}

impl Comparand {
    /// Resolve against the current bar's price.
    pub fn resolve(self, current_price: f64) -> f64 {
        match self {
            Comparand::Value(v) => v,
            Comparand::Price => current_price,
        }
    }
}

impl fmt::Display for Comparand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Comparand::Value(v) => write!(f, "{}", v),
            Comparand::Price => f.write_str("PRICE"),
        }
    }
}

impl Serialize for Comparand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Comparand::Value(v) => serializer.serialize_f64(*v),
            Comparand::Price => serializer.serialize_str("PRICE"),
        }
    }
}

impl<'de> Deserialize<'de> for Comparand {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(Comparand::Value(v)),
            Raw::Text(s) if s.eq_ignore_ascii_case("PRICE") => Ok(Comparand::Price),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"PRICE\", found \"{}\"",
                s
            ))),
        }
    }
}

/// Unvalidated rule shape used for deserialization.
#[derive(Debug, Clone, Deserialize)]
struct RuleSpec {
    indicator: Indicator,
    period: usize,
    operator: Operator,
    comparand: Comparand,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RuleSpec")]
pub struct Rule {
    indicator: Indicator,
    period: usize,
    operator: Operator,
    comparand: Comparand,
    weight: f64,
}

impl Rule {
    pub fn new(
        indicator: Indicator,
        period: usize,
        operator: Operator,
        comparand: Comparand,
    ) -> Result<Self, EngineError> {
        Self::with_weight(indicator, period, operator, comparand, 1.0)
    }

    pub fn with_weight(
        indicator: Indicator,
        period: usize,
        operator: Operator,
        comparand: Comparand,
        weight: f64,
    ) -> Result<Self, EngineError> {
        if period == 0 {
            return Err(EngineError::RuleInvalid {
                reason: format!("{} period must be positive", indicator),
            });
        }
        if let Comparand::Value(v) = comparand {
            if !v.is_finite() {
                return Err(EngineError::RuleInvalid {
                    reason: format!("{} threshold must be finite", indicator),
                });
            }
        }
        if !weight.is_finite() {
            return Err(EngineError::RuleInvalid {
                reason: "weight must be finite".into(),
            });
        }
        Ok(Rule {
            indicator,
            period,
            operator,
            comparand,
            weight,
        })
    }

    /// Build a weight-1 rule from parts the caller already knows are valid
    /// (generated or mutated rules with constant periods and clamped values).
    pub(crate) fn from_valid_parts(
        indicator: Indicator,
        period: usize,
        operator: Operator,
        comparand: Comparand,
    ) -> Rule {
        debug_assert!(period > 0);
        debug_assert!(!matches!(comparand, Comparand::Value(v) if !v.is_finite()));
        Rule {
            indicator,
            period,
            operator,
            comparand,
            weight: 1.0,
        }
    }

    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn comparand(&self) -> Comparand {
        self.comparand
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// A copy of this rule with a finite numeric threshold.
    pub(crate) fn with_threshold(&self, value: f64) -> Rule {
        debug_assert!(value.is_finite());
        Rule {
            comparand: Comparand::Value(value),
            ..self.clone()
        }
    }

    /// The indicator series this rule reads. MACD ignores the period.
    pub fn indicator_type(&self) -> IndicatorType {
        match self.indicator {
            Indicator::Rsi => IndicatorType::Rsi(self.period),
            Indicator::Sma => IndicatorType::Sma(self.period),
            Indicator::Ema => IndicatorType::Ema(self.period),
            Indicator::Macd => DEFAULT_MACD,
        }
    }
}

impl TryFrom<RuleSpec> for Rule {
    type Error = EngineError;

    fn try_from(raw: RuleSpec) -> Result<Self, Self::Error> {
        Rule::with_weight(
            raw.indicator,
            raw.period,
            raw.operator,
            raw.comparand,
            raw.weight,
        )
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) {} {}",
            self.indicator, self.period, self.operator, self.comparand
        )?;
        if self.weight != 1.0 {
            write!(f, " @{}", self.weight)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_new_validates_period() {
        let err = Rule::new(Indicator::Rsi, 0, Operator::Lt, Comparand::Value(30.0)).unwrap_err();
        assert!(matches!(err, EngineError::RuleInvalid { .. }));
    }

    #[test]
    fn rule_new_rejects_non_finite_threshold() {
        assert!(Rule::new(Indicator::Sma, 20, Operator::Gt, Comparand::Value(f64::NAN)).is_err());
        assert!(Rule::new(Indicator::Sma, 20, Operator::Gt, Comparand::Value(f64::INFINITY)).is_err());
    }

    #[test]
    fn rule_defaults_weight_to_one() {
        let rule = Rule::new(Indicator::Ema, 50, Operator::Lt, Comparand::Price).unwrap();
        assert_eq!(rule.weight(), 1.0);
    }

    #[test]
    fn macd_rule_uses_fixed_configuration() {
        let a = Rule::new(Indicator::Macd, 5, Operator::Gt, Comparand::Value(0.0)).unwrap();
        let b = Rule::new(Indicator::Macd, 40, Operator::Gt, Comparand::Value(0.0)).unwrap();
        assert_eq!(a.indicator_type(), DEFAULT_MACD);
        assert_eq!(a.indicator_type(), b.indicator_type());
    }

    #[test]
    fn indicator_type_mapping() {
        let rsi = Rule::new(Indicator::Rsi, 14, Operator::Lt, Comparand::Value(30.0)).unwrap();
        let sma = Rule::new(Indicator::Sma, 20, Operator::Lt, Comparand::Price).unwrap();
        assert_eq!(rsi.indicator_type(), IndicatorType::Rsi(14));
        assert_eq!(sma.indicator_type(), IndicatorType::Sma(20));
    }

    #[test]
    fn with_threshold_returns_new_rule() {
        let rule = Rule::new(Indicator::Rsi, 14, Operator::Lt, Comparand::Value(30.0)).unwrap();
        let relaxed = rule.with_threshold(35.0);
        assert_eq!(rule.comparand(), Comparand::Value(30.0));
        assert_eq!(relaxed.comparand(), Comparand::Value(35.0));
        assert_eq!(relaxed.period(), 14);
    }

    #[test]
    fn operator_apply_is_strict() {
        assert!(Operator::Gt.apply(2.0, 1.0));
        assert!(!Operator::Gt.apply(1.0, 1.0));
        assert!(Operator::Lt.apply(1.0, 2.0));
        assert!(!Operator::Lt.apply(1.0, 1.0));
    }

    #[test]
    fn rule_display() {
        let rule = Rule::new(Indicator::Ema, 200, Operator::Lt, Comparand::Price).unwrap();
        assert_eq!(rule.to_string(), "EMA(200) < PRICE");
        let weighted =
            Rule::with_weight(Indicator::Rsi, 14, Operator::Gt, Comparand::Value(70.0), 0.5).unwrap();
        assert_eq!(weighted.to_string(), "RSI(14) > 70 @0.5");
    }

    #[test]
    fn rule_json_roundtrip_uses_price_sentinel() {
        let rule = Rule::new(Indicator::Sma, 50, Operator::Gt, Comparand::Price).unwrap();
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"comparand\":\"PRICE\""));
        assert!(json.contains("\"indicator\":\"SMA\""));
        assert!(json.contains("\"operator\":\"GT\""));
        let back: Rule = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn rule_json_rejects_zero_period() {
        let json = r#"{"indicator":"RSI","period":0,"operator":"LT","comparand":30}"#;
        assert!(serde_json::from_str::<Rule>(json).is_err());
    }

    #[test]
    fn rule_json_rejects_unknown_sentinel() {
        let json = r#"{"indicator":"RSI","period":14,"operator":"LT","comparand":"CLOSE"}"#;
        assert!(serde_json::from_str::<Rule>(json).is_err());
    }

    #[test]
    fn rule_json_weight_defaults() {
        let json = r#"{"indicator":"RSI","period":14,"operator":"LT","comparand":30.5}"#;
        let rule: Rule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.weight(), 1.0);
        assert_eq!(rule.comparand(), Comparand::Value(30.5));
    }
}
