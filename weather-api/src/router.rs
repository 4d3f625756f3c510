//! # Router (C6)
//!
//! A small hand-written pattern matcher over the fixed path table of §4.6 —
//! any trie or table-driven matcher with equivalent behavior would do as
//! well; this one just walks the split path segments once. Captured
//! parameters are deposited as owned strings; charset/UUID validation of
//! `{id}` happens in the handler via [`shared::validation`], not here.

/// A matched URL, with its captured path parameters. Method dispatch is a
/// separate step, done by the handler against `(method, Endpoint)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Users,
    User { id: String },
    UserSessions { id: String },
    UserSession { id: String, session_uuid: String },
    UserApiKeys { id: String },
    UserApiKey { id: String, key_id: String },
    Stations,
    Station { station_ref: String },
    StationWeatherData { station_ref: String },
}

/// Matches a request path against the fixed table. Unmatched paths yield
/// `None`, which handlers turn into a plain 404.
pub fn route(path: &str) -> Option<Endpoint> {
    let segments: Vec<&str> = path.trim_matches('/').split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["users"] => Some(Endpoint::Users),
        ["users", id] => Some(Endpoint::User { id: (*id).to_string() }),
        ["users", id, "sessions"] => Some(Endpoint::UserSessions { id: (*id).to_string() }),
        ["users", id, "sessions", session_uuid] => Some(Endpoint::UserSession {
            id: (*id).to_string(),
            session_uuid: (*session_uuid).to_string(),
        }),
        ["users", id, "api-keys"] => Some(Endpoint::UserApiKeys { id: (*id).to_string() }),
        ["users", id, "api-keys", key_id] => Some(Endpoint::UserApiKey {
            id: (*id).to_string(),
            key_id: (*key_id).to_string(),
        }),
        ["stations"] => Some(Endpoint::Stations),
        ["stations", station_ref] => Some(Endpoint::Station { station_ref: (*station_ref).to_string() }),
        ["stations", station_ref, "weather-data"] => {
            Some(Endpoint::StationWeatherData { station_ref: (*station_ref).to_string() })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_every_fixed_path_shape() {
        assert_eq!(route("/users"), Some(Endpoint::Users));
        assert_eq!(route("/users/alice"), Some(Endpoint::User { id: "alice".into() }));
        assert_eq!(
            route("/users/alice/sessions"),
            Some(Endpoint::UserSessions { id: "alice".into() })
        );
        assert_eq!(
            route("/users/alice/sessions/9f2c"),
            Some(Endpoint::UserSession { id: "alice".into(), session_uuid: "9f2c".into() })
        );
        assert_eq!(
            route("/users/alice/api-keys"),
            Some(Endpoint::UserApiKeys { id: "alice".into() })
        );
        assert_eq!(
            route("/users/alice/api-keys/k1"),
            Some(Endpoint::UserApiKey { id: "alice".into(), key_id: "k1".into() })
        );
        assert_eq!(route("/stations"), Some(Endpoint::Stations));
        assert_eq!(
            route("/stations/garden"),
            Some(Endpoint::Station { station_ref: "garden".into() })
        );
        assert_eq!(
            route("/stations/garden/weather-data"),
            Some(Endpoint::StationWeatherData { station_ref: "garden".into() })
        );
    }

    #[test]
    fn unmatched_paths_yield_none() {
        assert_eq!(route("/unknown"), None);
        assert_eq!(route("/users/alice/sessions/x/extra"), None);
        assert_eq!(route(""), None);
    }

    #[test]
    fn leading_and_trailing_slashes_are_tolerated() {
        assert_eq!(route("/stations/"), Some(Endpoint::Stations));
        assert_eq!(route("stations"), Some(Endpoint::Stations));
    }
}
