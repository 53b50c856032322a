use actix_web::http::header::HeaderMap;

const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
const REAL_IP_HEADER: &str = "x-real-ip";
const UNKNOWN_ADDRESS: &str = "unknown";

/// Best-effort origin of a request, as reported by the proxy in front of us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceAddress(String);

impl SourceAddress {
    /// First non-empty of `x-forwarded-for` and `x-real-ip`, stored verbatim.
    pub fn from_headers(headers: &HeaderMap) -> SourceAddress {
        [FORWARDED_FOR_HEADER, REAL_IP_HEADER]
            .iter()
            .filter_map(|name| headers.get(*name))
            .filter_map(|value| value.to_str().ok())
            .find(|value| !value.is_empty())
            .map(|value| Self(value.to_string()))
            .unwrap_or_else(Self::unknown)
    }

    pub fn unknown() -> SourceAddress {
        Self(String::from(UNKNOWN_ADDRESS))
    }
}

impl AsRef<str> for SourceAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
