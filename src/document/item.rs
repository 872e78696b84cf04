//! Item record shared by the document and the relational table

use chrono::{DateTime, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Field names, used both as CRDT map keys and as column names
pub mod field {
    pub const FIRST_NAME: &str = "FirstName";
    pub const LAST_NAME: &str = "LastName";
    pub const DEPARTMENT: &str = "Department";
    pub const POSITION: &str = "Position";
    pub const HIRE_DATE: &str = "HireDate";
    pub const BIRTH_DATE: &str = "BirthDate";
    pub const GENDER: &str = "Gender";
    pub const EMAIL: &str = "Email";
    pub const PHONE_NUMBER: &str = "PhoneNumber";
    pub const ADDRESS: &str = "Address";
    pub const STATUS: &str = "Status";
}

/// Keys of the string-valued fields, in column order
pub(crate) const TEXT_FIELDS: [&str; 9] = [
    field::FIRST_NAME,
    field::LAST_NAME,
    field::DEPARTMENT,
    field::POSITION,
    field::GENDER,
    field::EMAIL,
    field::PHONE_NUMBER,
    field::ADDRESS,
    field::STATUS,
];

pub(crate) const DATE_FIELDS: [&str; 2] = [field::HIRE_DATE, field::BIRTH_DATE];

/// One entry of the `items` list
///
/// Every field is optional: clients are free to omit any of them, and the
/// table adapter fills in defaults on write. There is deliberately no id
/// field, so a record has no identity beyond its position and content.
///
/// Dates are calendar dates in UTC. A timestamp read from the document maps
/// to its UTC date, so a client that stores local midnight from a zone east
/// of UTC sees the previous day stored. Clients should send midnight UTC or
/// `YYYY-MM-DD` strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemRecord {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub status: Option<String>,
}

impl ItemRecord {
    /// Record with only a first and last name set
    pub fn named(first_name: &str, last_name: &str) -> Self {
        Self {
            first_name: Some(first_name.to_string()),
            last_name: Some(last_name.to_string()),
            ..Default::default()
        }
    }

    /// Text fields paired with their key, in column order
    pub(crate) fn text_fields(&self) -> [(&'static str, Option<&str>); 9] {
        [
            (field::FIRST_NAME, self.first_name.as_deref()),
            (field::LAST_NAME, self.last_name.as_deref()),
            (field::DEPARTMENT, self.department.as_deref()),
            (field::POSITION, self.position.as_deref()),
            (field::GENDER, self.gender.as_deref()),
            (field::EMAIL, self.email.as_deref()),
            (field::PHONE_NUMBER, self.phone_number.as_deref()),
            (field::ADDRESS, self.address.as_deref()),
            (field::STATUS, self.status.as_deref()),
        ]
    }

    pub(crate) fn date_fields(&self) -> [(&'static str, Option<NaiveDate>); 2] {
        [
            (field::HIRE_DATE, self.hire_date),
            (field::BIRTH_DATE, self.birth_date),
        ]
    }

    pub(crate) fn set_text(&mut self, key: &str, value: Option<String>) {
        let slot = match key {
            field::FIRST_NAME => &mut self.first_name,
            field::LAST_NAME => &mut self.last_name,
            field::DEPARTMENT => &mut self.department,
            field::POSITION => &mut self.position,
            field::GENDER => &mut self.gender,
            field::EMAIL => &mut self.email,
            field::PHONE_NUMBER => &mut self.phone_number,
            field::ADDRESS => &mut self.address,
            field::STATUS => &mut self.status,
            _ => return,
        };
        *slot = value;
    }

    pub(crate) fn set_date(&mut self, key: &str, value: Option<NaiveDate>) {
        match key {
            field::HIRE_DATE => self.hire_date = value,
            field::BIRTH_DATE => self.birth_date = value,
            _ => {}
        }
    }
}

/// Parse a date stored as text
///
/// Accepts a plain `YYYY-MM-DD` date and anything that starts with one
/// (`2024-03-01T00:00:00.000Z`, `2024-03-01 12:00:00`).
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    let date_part = value.get(..10).unwrap_or(value);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Midnight UTC of `date`, in milliseconds since the epoch
pub(crate) fn date_to_millis(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp_millis()
}

/// UTC calendar date of a timestamp
pub(crate) fn date_from_millis(millis: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(millis).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1);
        assert_eq!(parse_date("2024-03-01"), expected);
        assert_eq!(parse_date("2024-03-01T00:00:00.000Z"), expected);
        assert_eq!(parse_date(" 2024-03-01 12:00:00 "), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_millis_conversion_is_midnight_utc() {
        let date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert_eq!(date_to_millis(date), 631_152_000_000);
        assert_eq!(date_from_millis(631_152_000_000), Some(date));
        // Anything during the day maps back to the same date
        assert_eq!(date_from_millis(631_152_000_000 + 3_600_000), Some(date));
    }

    #[test]
    fn test_millis_east_of_utc_map_to_utc_date() {
        // 2024-03-01T00:00:00+08:00 is still February 29th in UTC
        let local_midnight = date_to_millis(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            - 8 * 3_600_000;
        assert_eq!(
            date_from_millis(local_midnight),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
    }

    #[test]
    fn test_set_text_ignores_unknown_keys() {
        let mut record = ItemRecord::named("Alice", "Lee");
        record.set_text("Nickname", Some("Al".to_string()));
        record.set_text(field::DEPARTMENT, Some("Sales".to_string()));

        assert_eq!(record.first_name.as_deref(), Some("Alice"));
        assert_eq!(record.department.as_deref(), Some("Sales"));
    }

    #[test]
    fn test_record_serializes_with_column_names() {
        let record = ItemRecord::named("Cara", "Diaz");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"FirstName\":\"Cara\""));
        assert!(json.contains("\"PhoneNumber\":null"));
    }
}
