use crate::{core::value::Value, records::row::RowData};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid predicate '{0}', expected <field><op><value> with op one of = != < <= > >=")]
    InvalidPredicate(String),

    #[error("Invalid sort key '{0}', expected <field> or <field>:asc|desc")]
    InvalidSortKey(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Ne => "!=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }

    fn accepts(self, ord: Option<Ordering>) -> bool {
        match self {
            Comparator::Eq => ord == Some(Ordering::Equal),
            Comparator::Ne => ord != Some(Ordering::Equal),
            Comparator::Lt => ord == Some(Ordering::Less),
            Comparator::Le => matches!(ord, Some(Ordering::Less | Ordering::Equal)),
            Comparator::Gt => ord == Some(Ordering::Greater),
            Comparator::Ge => matches!(ord, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: Comparator,
    pub value: Value,
}

impl Predicate {
    pub fn new(field: &str, op: Comparator, value: impl Into<Value>) -> Self {
        Predicate {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn matches(&self, row: &RowData) -> bool {
        let ord = row.get_value(&self.field).compare(&self.value);
        self.op.accepts(ord)
    }
}

impl FromStr for Predicate {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // two-character operators first so "<=" is not read as "<"
        const OPS: [(&str, Comparator); 6] = [
            ("!=", Comparator::Ne),
            ("<=", Comparator::Le),
            (">=", Comparator::Ge),
            ("=", Comparator::Eq),
            ("<", Comparator::Lt),
            (">", Comparator::Gt),
        ];

        let (pos, symbol, op) = OPS
            .iter()
            .filter_map(|(symbol, op)| s.find(symbol).map(|pos| (pos, *symbol, *op)))
            .min_by_key(|(pos, symbol, _)| (*pos, std::cmp::Reverse(symbol.len())))
            .ok_or_else(|| QueryError::InvalidPredicate(s.to_string()))?;

        let field = s[..pos].trim();
        if field.is_empty() {
            return Err(QueryError::InvalidPredicate(s.to_string()));
        }

        Ok(Predicate {
            field: field.to_string(),
            op,
            value: Value::infer(s[pos + symbol.len()..].trim()),
        })
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.op.symbol(), self.value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

impl FromStr for SortKey {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, direction) = match s.split_once(':') {
            None => (s, Direction::Asc),
            Some((field, dir)) => match dir.to_ascii_lowercase().as_str() {
                "asc" => (field, Direction::Asc),
                "desc" => (field, Direction::Desc),
                _ => return Err(QueryError::InvalidSortKey(s.to_string())),
            },
        };

        let field = field.trim();
        if field.is_empty() {
            return Err(QueryError::InvalidSortKey(s.to_string()));
        }

        Ok(SortKey {
            field: field.to_string(),
            direction,
        })
    }
}

/// Filter and sort criteria for one entity.
///
/// Filters are a conjunction. Without sort keys, rows come back in storage order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    pub entity: String,
    #[serde(default)]
    pub filters: Vec<Predicate>,
    #[serde(default)]
    pub order_by: Vec<SortKey>,
}

impl QuerySpec {
    pub fn new(entity: &str) -> Self {
        QuerySpec {
            entity: entity.to_string(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, field: &str, op: Comparator, value: impl Into<Value>) -> Self {
        self.filters.push(Predicate::new(field, op, value));
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by.push(SortKey {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn is_ordered(&self) -> bool {
        !self.order_by.is_empty()
    }

    pub fn matches(&self, row: &RowData) -> bool {
        self.filters.iter().all(|p| p.matches(row))
    }

    /// Ordering of two rows under the query's sort keys. Rows tie without any.
    pub fn compare(&self, a: &RowData, b: &RowData) -> Ordering {
        for key in &self.order_by {
            let ord = a.get_value(&key.field).sort_cmp(&b.get_value(&key.field));
            let ord = match key.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `items` by the row each one carries; a no-op without sort keys.
    pub fn sort_by_row<T>(&self, items: &mut [T], row: impl Fn(&T) -> &RowData) {
        if self.is_ordered() {
            items.sort_by(|a, b| self.compare(row(a), row(b)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::FieldValue;

    fn user(id: i64, country: &str) -> RowData {
        RowData::new(
            "users",
            vec![FieldValue::new("id", id), FieldValue::new("country_code", country)],
        )
    }

    #[test]
    fn test_parse_predicates() {
        let p: Predicate = "country_code=UK".parse().unwrap();
        assert_eq!(p, Predicate::new("country_code", Comparator::Eq, "UK"));

        let p: Predicate = "age>=18".parse().unwrap();
        assert_eq!(p, Predicate::new("age", Comparator::Ge, 18i64));

        let p: Predicate = "name != bob".parse().unwrap();
        assert_eq!(p.op, Comparator::Ne);
        assert_eq!(p.value, Value::from("bob"));

        assert!("no_operator".parse::<Predicate>().is_err());
        assert!("=value".parse::<Predicate>().is_err());
    }

    #[test]
    fn test_parse_sort_keys() {
        let k: SortKey = "id".parse().unwrap();
        assert_eq!(k.direction, Direction::Asc);
        let k: SortKey = "id:DESC".parse().unwrap();
        assert_eq!(k.direction, Direction::Desc);
        assert!("id:sideways".parse::<SortKey>().is_err());
    }

    #[test]
    fn test_filters_are_a_conjunction() {
        let query = QuerySpec::new("users")
            .filter("country_code", Comparator::Eq, "UK")
            .filter("id", Comparator::Gt, 1i64);

        assert!(!query.matches(&user(1, "UK")));
        assert!(query.matches(&user(2, "UK")));
        assert!(!query.matches(&user(3, "US")));
    }

    #[test]
    fn test_sort_is_stable_and_directional() {
        let mut rows = vec![user(1, "US"), user(2, "UK"), user(3, "US"), user(4, "UK")];
        QuerySpec::new("users")
            .order_by("country_code", Direction::Desc)
            .sort_by_row(&mut rows, |row| row);

        let ids: Vec<Value> = rows.iter().map(|r| r.get_value("id")).collect();
        assert_eq!(
            ids,
            vec![Value::Int(1), Value::Int(3), Value::Int(2), Value::Int(4)]
        );
    }
}
