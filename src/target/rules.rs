use regex::Regex;
use semver::Version;

use super::{Condition, ConditionOperator, ConditionValue, Target, TargetContext, Value};
use crate::AttributeValue;

impl Target {
    pub(crate) fn eval(&self, context: &TargetContext) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.eval(context))
    }
}

impl Condition {
    fn eval(&self, context: &TargetContext) -> bool {
        self.operator
            .eval(context.lookup(&self.key).as_ref(), &self.value)
    }
}

impl ConditionOperator {
    /// Applying `Operator` to the values. Returns `false` if the operator cannot be applied or
    /// there's a misconfiguration.
    fn eval(&self, value: Option<&AttributeValue>, condition_value: &ConditionValue) -> bool {
        self.try_eval(value, condition_value).unwrap_or(false)
    }

    /// Try applying `Operator` to the values, returning `None` if the operator cannot be applied.
    fn try_eval(
        &self,
        value: Option<&AttributeValue>,
        condition_value: &ConditionValue,
    ) -> Option<bool> {
        match self {
            Self::Matches | Self::NotMatches => {
                let s = value?.as_str()?;
                let regex = match condition_value {
                    ConditionValue::Single(Value::String(pattern)) => Regex::new(pattern).ok()?,
                    _ => return None,
                };
                let matches = regex.is_match(s);
                Some(matches == matches!(self, Self::Matches))
            }

            Self::OneOf | Self::NotOneOf => {
                let s = match value {
                    Some(AttributeValue::String(s)) => s.clone(),
                    Some(AttributeValue::Number(n)) => n.to_string(),
                    Some(AttributeValue::Boolean(b)) => b.to_string(),
                    _ => return None,
                };
                let ConditionValue::Multiple(values) = condition_value else {
                    return None;
                };
                let is_one_of = values.iter().any(|v| v == &s);
                Some(is_one_of == (*self == Self::OneOf))
            }

            Self::IsNull => {
                let is_null = value.is_none() || value == Some(&AttributeValue::Null);
                let ConditionValue::Single(Value::Boolean(expected_null)) = condition_value else {
                    return None;
                };
                Some(is_null == *expected_null)
            }

            Self::Gte | Self::Gt | Self::Lte | Self::Lt => {
                let condition_version = match condition_value {
                    ConditionValue::Single(Value::String(s)) => Version::parse(s).ok(),
                    _ => None,
                };

                if let Some(condition_version) = condition_version {
                    let version = Version::parse(value?.as_str()?).ok()?;
                    Some(self.compare(&version, &condition_version))
                } else {
                    let condition_number = match condition_value {
                        ConditionValue::Single(Value::Number(n)) => *n,
                        ConditionValue::Single(Value::String(s)) => s.parse().ok()?,
                        _ => return None,
                    };
                    let number = match value? {
                        AttributeValue::Number(n) => *n,
                        AttributeValue::String(s) => s.parse().ok()?,
                        _ => return None,
                    };
                    Some(self.compare(&number, &condition_number))
                }
            }
        }
    }

    fn compare<T: PartialOrd>(&self, value: &T, condition_value: &T) -> bool {
        match self {
            Self::Gt => value > condition_value,
            Self::Gte => value >= condition_value,
            Self::Lt => value < condition_value,
            Self::Lte => value <= condition_value,
            _ => false,
        }
    }
}
