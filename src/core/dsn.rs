//! Destination strings
//!
//! A destination is written as a URL, `scheme://host[:port][/path]?key=value&...`,
//! or as a plain filesystem path with an optional `?query`. The names
//! `stderr`, `stdout` and `none` (case-insensitive) are reserved; an empty
//! destination means `stderr`.

use super::error::{LoggerError, Result};
use std::fmt;
use std::path::PathBuf;
use url::{form_urlencoded, ParseError, Url};

/// Scheme used for plain filesystem paths
pub const FILE_SCHEME: &str = "file";

/// Destinations handled without a registered factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reserved {
    Stderr,
    Stdout,
    None,
}

impl Reserved {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reserved::Stderr => "stderr",
            Reserved::Stdout => "stdout",
            Reserved::None => "none",
        }
    }
}

/// A parsed destination string
#[derive(Debug, Clone)]
pub struct Dsn {
    raw: String,
    url: Option<Url>,
    scheme: String,
    host: String,
    path: String,
    params: DsnParams,
}

impl Dsn {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();

        match Url::parse(trimmed) {
            // A single letter before the colon is a drive letter, not a scheme.
            Ok(url) if url.scheme().len() > 1 => Ok(Self::from_url(raw, url)),
            Ok(_) | Err(ParseError::RelativeUrlWithoutBase) => Ok(Self::from_path(raw, trimmed)),
            Err(e) => Err(LoggerError::destination(raw, e.to_string())),
        }
    }

    fn from_url(raw: &str, url: Url) -> Self {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => String::new(),
        };

        Self {
            raw: raw.to_string(),
            scheme: url.scheme().to_lowercase(),
            host,
            path: url.path().to_string(),
            params: DsnParams::from_query(url.query().unwrap_or_default()),
            url: Some(url),
        }
    }

    fn from_path(raw: &str, trimmed: &str) -> Self {
        let (path, query) = trimmed.split_once('?').unwrap_or((trimmed, ""));

        Self {
            raw: raw.to_string(),
            url: None,
            scheme: String::new(),
            host: String::new(),
            path: path.to_string(),
            params: DsnParams::from_query(query),
        }
    }

    /// The string this destination was parsed from
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Scheme used to select a factory; plain paths use `file`
    pub fn scheme(&self) -> &str {
        if self.scheme.is_empty() {
            FILE_SCHEME
        } else {
            &self.scheme
        }
    }

    /// Whether the destination was written as a plain path
    pub fn is_plain_path(&self) -> bool {
        self.url.is_none()
    }

    /// `host[:port]`, empty for plain paths
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn params(&self) -> &DsnParams {
        &self.params
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    pub fn reserved(&self) -> Option<Reserved> {
        if !self.scheme.is_empty() {
            return None;
        }
        match self.path.to_lowercase().as_str() {
            "" | "stderr" => Some(Reserved::Stderr),
            "stdout" => Some(Reserved::Stdout),
            "none" => Some(Reserved::None),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        self.reserved() == Some(Reserved::None)
    }

    /// Identity of the physical destination
    ///
    /// Destinations that differ only in their query parameters share a key
    /// and therefore share one sink.
    pub fn destination_key(&self) -> String {
        match self.reserved() {
            Some(reserved) => reserved.as_str().to_string(),
            None => format!("{}://{}{}", self.scheme(), self.host, self.path),
        }
    }

    /// Local filesystem path of a `file` destination
    pub fn file_path(&self) -> Result<PathBuf> {
        let path = match &self.url {
            None => PathBuf::from(&self.path),
            Some(url) => url.to_file_path().map_err(|_| {
                LoggerError::destination(&self.raw, "not a local file path")
            })?,
        };

        if path.as_os_str().is_empty() {
            return Err(LoggerError::destination(&self.raw, "empty file path"));
        }
        Ok(path)
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Query parameters of a destination with typed accessors
///
/// Missing keys and keys with an empty value both yield the caller's
/// default. Values that are present but cannot be parsed are reported as
/// [`LoggerError::InvalidParameter`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DsnParams {
    pairs: Vec<(String, String)>,
}

impl DsnParams {
    pub fn from_query(query: &str) -> Self {
        Self {
            pairs: form_urlencoded::parse(query.as_bytes()).into_owned().collect(),
        }
    }

    /// Value of the first pair with this key, `None` when that value is empty
    ///
    /// Later pairs with the same key are never consulted, so `?a=&a=x` reads
    /// as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Accepts `1 t true 0 f false`, case-insensitive
    pub fn bool(&self, key: &str, default: bool) -> Result<bool> {
        let Some(value) = self.get(key) else {
            return Ok(default);
        };
        match value.to_lowercase().as_str() {
            "1" | "t" | "true" => Ok(true),
            "0" | "f" | "false" => Ok(false),
            _ => Err(LoggerError::invalid_parameter(key, value, "expected a boolean")),
        }
    }

    pub fn int(&self, key: &str, default: i64) -> Result<i64> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value
                .parse()
                .map_err(|_| LoggerError::invalid_parameter(key, value, "expected an integer")),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path_with_query() {
        let dsn = Dsn::parse("/var/log/app.log?level=debug&encoding=mixed").unwrap();
        assert!(dsn.is_plain_path());
        assert_eq!(dsn.scheme(), "file");
        assert_eq!(dsn.path(), "/var/log/app.log");
        assert_eq!(dsn.params().get("level"), Some("debug"));
        assert_eq!(dsn.destination_key(), "file:///var/log/app.log");
        assert_eq!(dsn.file_path().unwrap(), PathBuf::from("/var/log/app.log"));
    }

    #[test]
    fn test_file_url_shares_key_with_plain_path() {
        let url = Dsn::parse("file:///var/log/app.log?level=warn").unwrap();
        let plain = Dsn::parse("/var/log/app.log").unwrap();
        assert_eq!(url.destination_key(), plain.destination_key());
        assert_eq!(url.file_path().unwrap(), PathBuf::from("/var/log/app.log"));
    }

    #[test]
    fn test_reserved_names() {
        assert_eq!(Dsn::parse("").unwrap().reserved(), Some(Reserved::Stderr));
        assert_eq!(Dsn::parse("STDERR").unwrap().reserved(), Some(Reserved::Stderr));
        assert_eq!(Dsn::parse("stdout").unwrap().reserved(), Some(Reserved::Stdout));
        assert!(Dsn::parse("None").unwrap().is_none());
        assert_eq!(Dsn::parse("stderr?level=debug").unwrap().destination_key(), "stderr");
        assert_eq!(Dsn::parse("/tmp/none").unwrap().reserved(), None);
    }

    #[test]
    fn test_network_url() {
        let dsn = Dsn::parse("tcp://collector.local:5140?timeout-ms=250").unwrap();
        assert_eq!(dsn.scheme(), "tcp");
        assert_eq!(dsn.host(), "collector.local:5140");
        assert_eq!(dsn.params().int("timeout-ms", 5000).unwrap(), 250);
        assert_eq!(dsn.destination_key(), "tcp://collector.local:5140");
    }

    #[test]
    fn test_malformed_urls_are_errors() {
        let err = Dsn::parse("tcp://host:99999").unwrap_err();
        assert!(matches!(err, LoggerError::InvalidDestination { .. }));
        assert!(Dsn::parse("tcp://[::1").is_err());
    }

    #[test]
    fn test_typed_params() {
        let params = DsnParams::from_query("a=T&b=0&n=42&bad=yes&empty=&s=x%20y");
        assert!(params.bool("a", false).unwrap());
        assert!(!params.bool("b", true).unwrap());
        assert!(params.bool("missing", true).unwrap());
        assert!(params.bool("empty", true).unwrap());
        assert_eq!(params.int("n", 0).unwrap(), 42);
        assert_eq!(params.int("empty", 7).unwrap(), 7);
        assert_eq!(params.string("s", ""), "x y");

        let err = params.bool("bad", false).unwrap_err();
        assert!(matches!(err, LoggerError::InvalidParameter { .. }));
        assert!(params.int("s", 0).is_err());
    }

    #[test]
    fn test_first_pair_wins_even_when_empty() {
        let params = DsnParams::from_query("a=&a=x&b=1&b=2");
        assert_eq!(params.get("a"), None);
        assert_eq!(params.string("a", "default"), "default");
        assert_eq!(params.get("b"), Some("1"));
    }
}
