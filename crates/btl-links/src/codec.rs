//! Flat query-string form: `?id=&exp=&nonce=&sig=`.
//!
//! Decoding fails closed. A missing, repeated, unknown or unparsable
//! parameter yields [`InvalidReason::Malformed`].

use btl_crypto::{Mac, Nonce};
use url::Url;
use url::form_urlencoded;

use crate::link::{CapabilityLink, InvalidReason, resource_id_ok};

const PARAM_ID: &str = "id";
const PARAM_EXP: &str = "exp";
const PARAM_NONCE: &str = "nonce";
const PARAM_SIG: &str = "sig";

impl CapabilityLink {
    /// Encode as a query string (without the leading `?`).
    #[must_use]
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair(PARAM_ID, &self.resource_id)
            .append_pair(PARAM_EXP, &self.expiry.to_string())
            .append_pair(PARAM_NONCE, &self.nonce.to_hex())
            .append_pair(PARAM_SIG, &self.signature.to_hex())
            .finish()
    }

    /// Attach this link's query to `base`, replacing any existing query.
    #[must_use]
    pub fn to_url(&self, base: &Url) -> Url {
        let mut url = base.clone();
        url.set_query(Some(&self.to_query()));
        url
    }

    /// Decode a link from a query string. A leading `?` is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReason::Malformed`] on any decoding problem.
    pub fn from_query(query: &str) -> Result<Self, InvalidReason> {
        let query = query.strip_prefix('?').unwrap_or(query);

        let mut id = None;
        let mut exp = None;
        let mut nonce = None;
        let mut sig = None;

        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            let slot = match name.as_ref() {
                PARAM_ID => &mut id,
                PARAM_EXP => &mut exp,
                PARAM_NONCE => &mut nonce,
                PARAM_SIG => &mut sig,
                _ => return Err(InvalidReason::Malformed),
            };
            if slot.replace(value.into_owned()).is_some() {
                return Err(InvalidReason::Malformed);
            }
        }

        let resource_id = id.ok_or(InvalidReason::Malformed)?;
        if !resource_id_ok(&resource_id) {
            return Err(InvalidReason::Malformed);
        }
        let expiry = parse_expiry(&exp.ok_or(InvalidReason::Malformed)?)?;
        let nonce = Nonce::from_hex(&nonce.ok_or(InvalidReason::Malformed)?)
            .map_err(|_| InvalidReason::Malformed)?;
        let signature = Mac::from_hex(&sig.ok_or(InvalidReason::Malformed)?)
            .map_err(|_| InvalidReason::Malformed)?;

        Ok(Self {
            resource_id,
            expiry,
            nonce,
            signature,
        })
    }

    /// Decode a link from a URL's query.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidReason::Malformed`] if the URL has no query or the
    /// query does not decode.
    pub fn from_url(url: &Url) -> Result<Self, InvalidReason> {
        Self::from_query(url.query().ok_or(InvalidReason::Malformed)?)
    }
}

/// Plain decimal digits only; no sign, no whitespace.
fn parse_expiry(raw: &str) -> Result<i64, InvalidReason> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InvalidReason::Malformed);
    }
    raw.parse().map_err(|_| InvalidReason::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{LinkStatus, issue_at, verify_at};
    use btl_crypto::LinkSecret;
    use chrono::{DateTime, Duration};

    fn secret() -> LinkSecret {
        LinkSecret::from_bytes(&[0x42; 32]).unwrap()
    }

    fn sample() -> CapabilityLink {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        issue_at("docs/report 1&2", &secret(), Duration::hours(1), now).unwrap()
    }

    fn query_with(replace: &str, value: Option<&str>) -> String {
        let link = sample();
        let pairs = [
            (PARAM_ID, link.resource_id.clone()),
            (PARAM_EXP, link.expiry.to_string()),
            (PARAM_NONCE, link.nonce.to_hex()),
            (PARAM_SIG, link.signature.to_hex()),
        ];
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (name, original) in &pairs {
            if *name == replace {
                if let Some(v) = value {
                    ser.append_pair(name, v);
                }
            } else {
                ser.append_pair(name, original);
            }
        }
        ser.finish()
    }

    #[test]
    fn test_query_roundtrip_escapes_resource() {
        let link = sample();
        let query = link.to_query();
        assert!(query.starts_with("id=docs%2Freport+1%262&exp=1700003600&nonce="));
        assert_eq!(CapabilityLink::from_query(&query).unwrap(), link);
        assert_eq!(
            CapabilityLink::from_query(&format!("?{query}")).unwrap(),
            link
        );
    }

    #[test]
    fn test_url_roundtrip_verifies() {
        let link = sample();
        let base = Url::parse("https://example.com/share?old=1").unwrap();
        let url = link.to_url(&base);
        assert_eq!(url.path(), "/share");
        let decoded = CapabilityLink::from_url(&url).unwrap();
        let now = DateTime::from_timestamp(1_700_000_001, 0).unwrap();
        assert_eq!(verify_at(&decoded, &secret(), now), LinkStatus::Valid);
    }

    #[test]
    fn test_missing_fields() {
        for name in [PARAM_ID, PARAM_EXP, PARAM_NONCE, PARAM_SIG] {
            assert_eq!(
                CapabilityLink::from_query(&query_with(name, None)),
                Err(InvalidReason::Malformed),
                "missing {name}"
            );
        }
        assert_eq!(CapabilityLink::from_query(""), Err(InvalidReason::Malformed));
    }

    #[test]
    fn test_duplicate_field() {
        let query = format!("{}&exp=1", sample().to_query());
        assert_eq!(
            CapabilityLink::from_query(&query),
            Err(InvalidReason::Malformed)
        );
    }

    #[test]
    fn test_unknown_field() {
        let query = format!("{}&extra=1", sample().to_query());
        assert_eq!(
            CapabilityLink::from_query(&query),
            Err(InvalidReason::Malformed)
        );
    }

    #[test]
    fn test_malformed_values() {
        for (name, bad) in [
            (PARAM_ID, ""),
            (PARAM_EXP, "-5"),
            (PARAM_EXP, "+5"),
            (PARAM_EXP, "12x"),
            (PARAM_EXP, "99999999999999999999"),
            (PARAM_NONCE, "abcd"),
            (PARAM_NONCE, "zz"),
            (PARAM_SIG, "00"),
            (PARAM_SIG, "not-hex"),
        ] {
            assert_eq!(
                CapabilityLink::from_query(&query_with(name, Some(bad))),
                Err(InvalidReason::Malformed),
                "{name}={bad}"
            );
        }
    }

    #[test]
    fn test_url_without_query() {
        let url = Url::parse("https://example.com/share").unwrap();
        assert_eq!(CapabilityLink::from_url(&url), Err(InvalidReason::Malformed));
    }
}
