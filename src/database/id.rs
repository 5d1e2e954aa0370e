/*
 *     Copyright (C) 2023  Fritz Ochsmann
 *
 *     This program is free software: you can redistribute it and/or modify
 *     it under the terms of the GNU Affero General Public License as published
 *     by the Free Software Foundation, either version 3 of the License, or
 *     (at your option) any later version.
 *
 *     This program is distributed in the hope that it will be useful,
 *     but WITHOUT ANY WARRANTY; without even the implied warranty of
 *     MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *     GNU Affero General Public License for more details.
 *
 *     You should have received a copy of the GNU Affero General Public License
 *     along with this program.  If not, see <http://www.gnu.org/licenses/>.
 */

use crate::error::ApplicationError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use surrealdb::sql::Thing;

/// A record id, exposed as its bare key at the api boundary.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id {
    pub table: String,
    pub id: String,
}

impl From<Thing> for Id {
    fn from(thing: Thing) -> Self {
        let id = match thing.id {
            surrealdb::sql::Id::String(id) => id,
            other => other.to_string(),
        };

        Self {
            table: thing.tb,
            id,
        }
    }
}

impl TryFrom<(&str, &str)> for Id {
    type Error = ApplicationError;

    /// Accepts either `key` or `table:key`, the table has to match the forced one.
    fn try_from((force, id): (&str, &str)) -> Result<Self, Self::Error> {
        let key = match id.split_once(':') {
            Some((table, key)) => {
                // for security reasons we can't allow every table
                if !table.eq(force) {
                    return Err(ApplicationError::NotFound(format!("Unknown {force}")));
                }
                key
            }
            None => id,
        };

        if key.is_empty() {
            return Err(ApplicationError::BadRequest("invalid id".to_owned()));
        }

        Ok(Self {
            table: force.to_string(),
            id: key.to_string(),
        })
    }
}

impl Id {
    pub fn new((table, id): (&str, &str)) -> Self {
        Self {
            table: table.to_string(),
            id: id.to_string(),
        }
    }

    pub fn to_thing(&self) -> Thing {
        Thing::from((self.table.as_str(), self.id.as_str()))
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Thing::deserialize(deserializer).map(Self::from)
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", &self.table, &self.id)
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let id = Id::try_from(("task", "abc")).unwrap();
        assert_eq!(Id::new(("task", "abc")), id);
        assert_eq!("task:abc", id.to_string());

        let prefixed = Id::try_from(("task", "task:abc")).unwrap();
        assert_eq!(id, prefixed);

        assert!(matches!(
            Id::try_from(("task", "user:abc")),
            Err(ApplicationError::NotFound(_))
        ));
        assert!(matches!(
            Id::try_from(("task", "")),
            Err(ApplicationError::BadRequest(_))
        ));
    }

    #[test]
    fn test_thing_round_trip() {
        let id = Id::new(("user", "u1"));
        assert_eq!(id, Id::from(id.to_thing()));
        assert_eq!("\"u1\"", serde_json::to_string(&id).unwrap());
    }
}
