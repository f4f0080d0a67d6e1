use serde_json::{Map, Number, Value};
use crate::error::{Error, Result};
use super::Document;

/// Exact-match conjunction parsed from `key=value&key2=value2`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Filter {
    terms: Vec<(String, String)>,
}

/// Subset of document fields to return; empty means every field.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Projection {
    fields: Vec<String>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn parse<T: Document>(query: &str) -> Result<Self> {
        let mut terms = Vec::new();

        for pair in query.split('&').filter(|s| !s.is_empty()) {
            let mut split = pair.splitn(2, '=');
            let key   = split.next().unwrap_or("");
            let value = match split.next() {
                Some(value) => value,
                None        => return Err(Error::InvalidFilter(format!("missing value for '{}'", key))),
            };

            if !T::FIELDS.contains(&key) {
                return Err(Error::InvalidFilter(format!("unknown field '{}'", key)));
            }

            terms.push((key.to_owned(), value.to_owned()));
        }

        Ok(Self { terms })
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.terms.iter().all(|(key, want)| {
            match doc.get(key) {
                Some(Value::String(s)) => s == want,
                Some(Value::Number(n)) => number(n, want),
                Some(Value::Null)      => want == "null",
                Some(other)            => &other.to_string() == want,
                None                   => want == "null",
            }
        })
    }
}

impl Projection {
    pub fn parse<T: Document, S: AsRef<str>>(fields: &[S]) -> Result<Self> {
        let fields = fields.iter().map(|field| {
            let field = field.as_ref();
            match T::FIELDS.contains(&field) {
                true  => Ok(field.to_owned()),
                false => Err(Error::InvalidFilter(format!("unknown field '{}'", field))),
            }
        }).collect::<Result<_>>()?;
        Ok(Self { fields })
    }

    pub fn apply(&self, doc: Value) -> Value {
        if self.fields.is_empty() {
            return doc;
        }

        match doc {
            Value::Object(mut map) => {
                let mut out = Map::new();
                for field in &self.fields {
                    if let Some(value) = map.remove(field) {
                        out.insert(field.clone(), value);
                    }
                }
                Value::Object(out)
            },
            other => other,
        }
    }
}

// integers compare exactly, anything else by numeric value
fn number(n: &Number, want: &str) -> bool {
    if let (Some(have), Ok(want)) = (n.as_i64(), want.parse::<i64>()) {
        return have == want;
    }

    if let (Some(have), Ok(want)) = (n.as_u64(), want.parse::<u64>()) {
        return have == want;
    }

    match (n.as_f64(), want.parse::<f64>()) {
        (Some(have), Ok(want)) => have == want,
        _                      => false,
    }
}
