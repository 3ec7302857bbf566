//! Domain types and DTOs
//!
//! Records of the back office (contacts, estimates, quotations, projects,
//! tasks, site settings) plus the request/response shapes of the API.

/// Declares an enum persisted as a TEXT column.
///
/// Generates serde names, `as_str` for binding, and `from_db` which falls back
/// to the default variant for unknown values.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident (default = $default:ident) {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn from_db(s: &str) -> Self {
                match s {
                    $($text => $name::$variant,)+
                    _ => $name::$default,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod admin;
pub mod contacts;
pub mod dashboard;
pub mod estimates;
pub mod pricing;
pub mod projects;
pub mod quotations;
pub mod settings;
pub mod tasks;
pub mod validation;

/// Optional field of a partial update: absent keeps the stored value,
/// `null` clears it, anything else replaces it.
pub type Patch<T> = Option<Option<T>>;

/// Deserializer for [`Patch`] fields, used with `#[serde(default)]`
pub fn nullable<'de, D, T>(deserializer: D) -> Result<Patch<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    <Option<T> as serde::Deserialize>::deserialize(deserializer).map(Some)
}

/// Resolve a [`Patch`] against the stored value
pub fn patched<T: Clone>(patch: Patch<T>, current: &Option<T>) -> Option<T> {
    patch.unwrap_or_else(|| current.clone())
}

/// Free-text search filter shared by the admin list endpoints
#[derive(Debug, Clone, serde::Deserialize, Default)]
pub struct ListFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListFilter {
    /// `%term%` pattern for ILIKE, or None when no search was given
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Status filter checked against the record's status names
    pub fn parsed_status<T>(
        &self,
        parse: fn(&str) -> Option<T>,
    ) -> Result<Option<T>, crate::error::ApiError> {
        self.status()
            .map(|s| parse(s).ok_or_else(|| crate::error::ApiError::invalid("status", "unknown status")))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    text_enum! {
        Color (default = Red) {
            Red => "red",
            DeepBlue => "deep_blue",
        }
    }

    #[test]
    fn text_enum_round_trips_names() {
        assert_eq!(Color::DeepBlue.as_str(), "deep_blue");
        assert_eq!(Color::from_db("deep_blue"), Color::DeepBlue);
        assert_eq!(Color::from_db("purple"), Color::Red);
        assert_eq!(Color::parse("purple"), None);
        assert_eq!(Color::ALL.len(), 2);
        assert_eq!(
            serde_json::to_string(&Color::DeepBlue).unwrap(),
            "\"deep_blue\""
        );
        assert_eq!(Color::DeepBlue.to_string(), "deep_blue");
    }

    #[derive(Debug, serde::Deserialize)]
    struct Edit {
        #[serde(default, deserialize_with = "nullable")]
        note: Patch<String>,
    }

    #[test]
    fn patch_tells_null_from_absent() {
        let absent: Edit = serde_json::from_str("{}").unwrap();
        let cleared: Edit = serde_json::from_str(r#"{"note":null}"#).unwrap();
        let set: Edit = serde_json::from_str(r#"{"note":"hi"}"#).unwrap();

        let stored = Some("old".to_string());
        assert_eq!(patched(absent.note, &stored).as_deref(), Some("old"));
        assert_eq!(patched(cleared.note, &stored), None);
        assert_eq!(patched(set.note, &stored).as_deref(), Some("hi"));
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let filter = ListFilter {
            status: None,
            search: Some("  50%_off ".to_string()),
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%50\\%\\_off%"));

        let blank = ListFilter {
            status: Some("  ".to_string()),
            search: Some("   ".to_string()),
        };
        assert_eq!(blank.search_pattern(), None);
        assert_eq!(blank.status(), None);
    }

    #[test]
    fn status_filter_must_be_known() {
        let filter = ListFilter {
            status: Some("deep_blue".to_string()),
            search: None,
        };
        assert_eq!(filter.parsed_status(Color::parse).unwrap(), Some(Color::DeepBlue));

        let unknown = ListFilter {
            status: Some("green".to_string()),
            search: None,
        };
        assert!(unknown.parsed_status(Color::parse).is_err());
        assert_eq!(ListFilter::default().parsed_status(Color::parse).unwrap(), None);
    }
}
