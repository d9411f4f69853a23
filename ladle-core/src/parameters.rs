use crate::{Error, ErrorKind, Result, Value};
use std::collections::HashSet;

/// Values bound to the placeholders of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    /// Bound in order to `?` / `?NNN` placeholders.
    Positional(Vec<Value>),
    /// Bound by name to `:name`, `@name` or `$name` placeholders.
    Named(Vec<(String, Value)>),
}

impl Parameters {
    pub fn len(&self) -> usize {
        match self {
            Parameters::Positional(v) => v.len(),
            Parameters::Named(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        let (positional, named) = match self {
            Parameters::Positional(v) => (Some(v.iter()), None),
            Parameters::Named(v) => (None, Some(v.iter().map(|(_, v)| v))),
        };
        positional
            .into_iter()
            .flatten()
            .chain(named.into_iter().flatten())
    }
}

impl From<Vec<Value>> for Parameters {
    fn from(value: Vec<Value>) -> Self {
        Parameters::Positional(value)
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Parameters::Named(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Builds [`Parameters`]: `params![1, "a"]` is positional, `params![":id" => 1]` is named.
#[macro_export]
macro_rules! params {
    () => {
        $crate::Parameters::Positional(::std::vec::Vec::new())
    };
    ($($name:literal => $value:expr),+ $(,)?) => {
        $crate::Parameters::Named(::std::vec![$((
            ::std::string::String::from($name),
            $crate::Value::from($value),
        )),+])
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Parameters::Positional(::std::vec![$($crate::Value::from($value)),+])
    };
}

/// Validates the parameters of a query before a connection is grabbed.
pub trait ParameterCheck: Send + Sync {
    fn check_parameters(&self, parameters: Option<&Parameters>) -> Result<()>;
}

/// Accepts positional parameters and well formed, unique named parameters.
///
/// Names may start with one of `:`, `@`, `$`, the rest must be alphanumeric or `_`.
/// `NaN` floats are rejected because most backends silently store them as `NULL`.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicParameterCheck;

impl BasicParameterCheck {
    fn check_name(name: &str) -> Result<()> {
        let bare = name.strip_prefix([':', '@', '$']).unwrap_or(name);
        if bare.is_empty()
            || bare.starts_with(|c: char| c.is_ascii_digit())
            || !bare.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(Error::msg(format!(
                "`{}` is not a valid parameter name",
                name
            )));
        }
        Ok(())
    }
}

impl ParameterCheck for BasicParameterCheck {
    fn check_parameters(&self, parameters: Option<&Parameters>) -> Result<()> {
        let Some(parameters) = parameters else {
            return Ok(());
        };
        let result = (|| -> Result<()> {
            if let Parameters::Named(named) = parameters {
                let mut seen = HashSet::with_capacity(named.len());
                for (name, _) in named {
                    Self::check_name(name)?;
                    let bare = name.strip_prefix([':', '@', '$']).unwrap_or(name);
                    if !seen.insert(bare) {
                        return Err(Error::msg(format!(
                            "The parameter `{}` is bound more than once",
                            name
                        )));
                    }
                }
            }
            if parameters
                .values()
                .any(|v| matches!(v, Value::Float64(f) if f.is_nan()))
            {
                return Err(Error::msg("NaN cannot be used as a query parameter"));
            }
            Ok(())
        })();
        result.map_err(|e| {
            let e = e.context(ErrorKind::InvalidParameters);
            log::error!("{:#}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_builds_both_shapes() {
        assert_eq!(
            params![1, "a", None::<i64>],
            Parameters::Positional(vec![
                Value::Int64(1),
                Value::Varchar("a".into()),
                Value::Null
            ])
        );
        assert_eq!(
            params![":id" => 7],
            Parameters::Named(vec![(":id".into(), Value::Int64(7))])
        );
        assert!(params![].is_empty());
    }

    #[test]
    fn check_accepts_missing_and_positional() {
        let check = BasicParameterCheck;
        assert!(check.check_parameters(None).is_ok());
        assert!(check.check_parameters(Some(&params![1, 2.5, "x"])).is_ok());
        assert!(check.check_parameters(Some(&params![":a" => 1, "@b" => 2, "c" => 3])).is_ok());
    }

    #[test]
    fn check_rejects_bad_names() {
        let check = BasicParameterCheck;
        for name in [":", "", "1abc", ":a-b", "$a b"] {
            let error = check
                .check_parameters(Some(&Parameters::Named(vec![(name.into(), Value::Null)])))
                .expect_err(name);
            assert_eq!(ErrorKind::of(&error), Some(ErrorKind::InvalidParameters));
        }
    }

    #[test]
    fn check_rejects_duplicates_and_nan() {
        let check = BasicParameterCheck;
        assert!(check.check_parameters(Some(&params![":a" => 1, "$a" => 2])).is_err());
        assert!(check.check_parameters(Some(&params![f64::NAN])).is_err());
    }
}
