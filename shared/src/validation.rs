//! # Validators & Codec Helpers
//!
//! Pure, total, panic-free functions. None of these ever raise — malformed
//! input simply returns `false` (for the boolean validators) or an empty/
//! default JSON shape (for the codec). They are the only place request
//! strings are checked against the wire formats this API promises.

use serde_json::Value;

/// Non-empty, 3–30 characters, `[A-Za-z0-9_-]` only.
pub fn validate_name(value: &str) -> bool {
    let len = value.chars().count();
    if !(3..=30).contains(&len) {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// 36 characters, hex digits everywhere except dashes at positions
/// 8, 13, 18, 23 (the canonical UUID layout).
pub fn validate_uuid(value: &str) -> bool {
    let bytes: Vec<char> = value.chars().collect();
    if bytes.len() != 36 {
        return false;
    }
    const DASH_POSITIONS: [usize; 4] = [8, 13, 18, 23];
    for (i, c) in bytes.iter().enumerate() {
        if DASH_POSITIONS.contains(&i) {
            if *c != '-' {
                return false;
            }
        } else if !c.is_ascii_hexdigit() {
            return false;
        }
    }
    true
}

/// Exactly one `@`, not at position 0; the local part before `@` is drawn
/// from `[A-Za-z0-9._+-]`; the domain has at least one `.` after the `@`,
/// at least one character between `@` and the last `.`, drawn from
/// `[A-Za-z0-9.-]`; and at least one character after the last `.`, which
/// must be alphabetic only (a TLD).
pub fn validate_email(value: &str) -> bool {
    let at_count = value.matches('@').count();
    if at_count != 1 {
        return false;
    }
    let Some(at_pos) = value.find('@') else {
        return false;
    };
    if at_pos == 0 {
        return false;
    }

    let (local, domain) = (&value[..at_pos], &value[at_pos + 1..]);

    if !local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+'))
    {
        return false;
    }

    let Some(last_dot) = domain.rfind('.') else {
        return false;
    };

    let (between, tld) = (&domain[..last_dot], &domain[last_dot + 1..]);

    if between.is_empty() || tld.is_empty() {
        return false;
    }
    if !between.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-')) {
        return false;
    }
    if !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    true
}

/// Strict `YYYY-MM-DDTHH:MM:SS`, no trailing characters, no timezone
/// offset, no fractional seconds.
pub fn validate_timestamp(value: &str) -> bool {
    use chrono::NaiveDateTime;
    if value.len() != 19 {
        return false;
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").is_ok()
}

/// Projects a Postgres rowset into JSON following the fixed coercion table:
/// bool → JSON bool, int2/int4/int8 → JSON number, float4/float8 → JSON
/// number, everything else → JSON string, SQL NULL → JSON null. An empty
/// rowset becomes `[]`. A single row is returned as a bare object rather
/// than a one-element array only when `can_be_object` is true.
pub fn rowset_to_json(rows: &[postgres::Row], can_be_object: bool) -> Value {
    if rows.is_empty() {
        return Value::Array(Vec::new());
    }

    let objects: Vec<Value> = rows.iter().map(row_to_object).collect();

    if objects.len() == 1 && can_be_object {
        objects.into_iter().next().unwrap()
    } else {
        Value::Array(objects)
    }
}

fn row_to_object(row: &postgres::Row) -> Value {
    use serde_json::Map;
    let mut map = Map::with_capacity(row.len());
    for (i, column) in row.columns().iter().enumerate() {
        let value = column_to_json(row, i, column.type_());
        map.insert(column.name().to_string(), value);
    }
    Value::Object(map)
}

fn column_to_json(row: &postgres::Row, i: usize, ty: &postgres::types::Type) -> Value {
    use postgres::types::Type;

    match *ty {
        Type::BOOL => row
            .get::<_, Option<bool>>(i)
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        Type::INT2 => row
            .get::<_, Option<i16>>(i)
            .map(|v| Value::from(v as i64))
            .unwrap_or(Value::Null),
        Type::INT4 => row
            .get::<_, Option<i32>>(i)
            .map(|v| Value::from(v as i64))
            .unwrap_or(Value::Null),
        Type::INT8 => row
            .get::<_, Option<i64>>(i)
            .map(Value::from)
            .unwrap_or(Value::Null),
        Type::FLOAT4 => row
            .get::<_, Option<f32>>(i)
            .and_then(|v| serde_json::Number::from_f64(v as f64))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Type::FLOAT8 => row
            .get::<_, Option<f64>>(i)
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        _ => row
            .get::<_, Option<String>>(i)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_length_bounds() {
        assert!(!validate_name("ab"));
        assert!(validate_name("abc"));
        assert!(validate_name(&"a".repeat(30)));
        assert!(!validate_name(&"a".repeat(31)));
    }

    #[test]
    fn name_character_class() {
        assert!(validate_name("alice_01-x"));
        assert!(!validate_name("alice 01"));
        assert!(!validate_name("alice!"));
    }

    #[test]
    fn uuid_layout() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!validate_uuid("550e8400e29b41d4a716446655440000"));
        assert!(!validate_uuid("550e8400-e29b-41d4-a716-44665544000")); // too short
        assert!(!validate_uuid("zz0e8400-e29b-41d4-a716-446655440000"));
    }

    #[test]
    fn email_shape() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("first.last+tag@sub.example.co"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("user@@example.com"));
        assert!(!validate_email("user@example"));
        assert!(!validate_email("user@.com"));
        assert!(!validate_email("user@example.123"));
    }

    #[test]
    fn timestamp_strict_format() {
        assert!(validate_timestamp("2024-01-15T10:30:00"));
        assert!(!validate_timestamp("2024-01-15T10:30:00Z"));
        assert!(!validate_timestamp("2024-01-15 10:30:00"));
        assert!(!validate_timestamp("2024-01-15T10:30:00.123"));
    }

    #[test]
    fn validators_never_panic_on_arbitrary_input() {
        let samples = [
            "", " ", "\u{0}", "🦀🦀🦀", "a@b@c", "----", "\n\t", "é", "\"; DROP TABLE users; --",
        ];
        for s in samples {
            let _ = validate_name(s);
            let _ = validate_uuid(s);
            let _ = validate_email(s);
            let _ = validate_timestamp(s);
        }
    }

    #[test]
    fn rowset_to_json_empty_is_empty_array() {
        assert_eq!(rowset_to_json(&[], true), Value::Array(Vec::new()));
    }
}
