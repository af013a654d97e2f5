use crate::{Error, Result};
use http::uri::Authority;
use http::uri::PathAndQuery;
use http::uri::Scheme;
use http::HeaderMap;
use http::HeaderValue;
use http::Method;
use http::Uri;
use std::borrow::Cow;
use std::mem;
use std::str::FromStr;

/// Signing context for request.
///
/// It takes the uri and headers out of `http::request::Parts` so a signer can
/// canonicalize them without cloning, and puts them back in [`SigningRequest::apply`].
#[derive(Debug)]
pub struct SigningRequest {
    /// HTTP method.
    pub method: Method,
    /// HTTP scheme.
    pub scheme: Scheme,
    /// HTTP authority.
    pub authority: Authority,
    /// HTTP path, as it will be sent on the wire.
    pub path: String,
    /// HTTP query parameters, percent decoded.
    pub query: Vec<(String, String)>,
    /// HTTP headers.
    pub headers: HeaderMap,
}

impl SigningRequest {
    /// Build a signing context from http::request::Parts.
    ///
    /// Returns a `RequestInvalid` error if the uri carries no authority, in which case
    /// the parts are left untouched.
    pub fn build(parts: &mut http::request::Parts) -> Result<Self> {
        if parts.uri.authority().is_none() {
            return Err(Error::request_invalid(
                "request without authority is invalid for signing",
            )
            .with_context(format!("uri: {}", parts.uri)));
        }

        let uri = mem::take(&mut parts.uri).into_parts();
        let paq = uri
            .path_and_query
            .unwrap_or_else(|| PathAndQuery::from_static("/"));
        let path = match paq.path() {
            "" => "/".to_string(),
            v => v.to_string(),
        };

        Ok(SigningRequest {
            method: parts.method.clone(),
            scheme: uri.scheme.unwrap_or(Scheme::HTTP),
            authority: uri.authority.ok_or_else(|| {
                Error::request_invalid("request without authority is invalid for signing")
            })?,
            path,
            query: paq
                .query()
                .map(|v| {
                    form_urlencoded::parse(v.as_bytes())
                        .map(|(k, v)| (k.into_owned(), v.into_owned()))
                        .collect()
                })
                .unwrap_or_default(),

            // Headers are moved out and swapped back in `apply`.
            headers: mem::take(&mut parts.headers),
        })
    }

    /// Apply the signing context back to http::request::Parts.
    ///
    /// Query pairs are written back verbatim, so a signer that encoded them
    /// sends exactly what it signed.
    pub fn apply(mut self, parts: &mut http::request::Parts) -> Result<()> {
        let query_size = self.query_size();

        mem::swap(&mut parts.headers, &mut self.headers);
        parts.method = self.method;
        parts.uri = {
            let mut uri_parts = mem::take(&mut parts.uri).into_parts();
            uri_parts.scheme = Some(self.scheme);
            uri_parts.authority = Some(self.authority);
            uri_parts.path_and_query = {
                let paq = if query_size == 0 {
                    self.path
                } else {
                    let mut s = self.path;
                    s.reserve(query_size + self.query.len() * 2);

                    s.push('?');
                    for (i, (k, v)) in self.query.iter().enumerate() {
                        if i > 0 {
                            s.push('&');
                        }
                        s.push_str(k);
                        s.push('=');
                        s.push_str(v);
                    }

                    s
                };

                Some(PathAndQuery::from_str(&paq)?)
            };
            Uri::from_parts(uri_parts)?
        };

        Ok(())
    }

    /// Get the path percent decoded.
    pub fn path_percent_decoded(&self) -> Cow<'_, str> {
        percent_encoding::percent_decode_str(&self.path).decode_utf8_lossy()
    }

    /// Get query size.
    #[inline]
    pub fn query_size(&self) -> usize {
        self.query
            .iter()
            .map(|(k, v)| k.len() + v.len())
            .sum::<usize>()
    }

    /// Normalize header value: trim surrounding whitespace and collapse inner
    /// runs of spaces into one.
    pub fn header_value_normalize(v: &mut HeaderValue) -> Result<()> {
        let bs = v.as_bytes();
        let needs_work = bs.first() == Some(&b' ')
            || bs.last() == Some(&b' ')
            || bs.first() == Some(&b'\t')
            || bs.last() == Some(&b'\t')
            || bs.windows(2).any(|w| w == b"  ");
        if !needs_work {
            return Ok(());
        }

        let mut out = Vec::with_capacity(bs.len());
        for part in bs
            .split(|b| *b == b' ' || *b == b'\t')
            .filter(|part| !part.is_empty())
        {
            if !out.is_empty() {
                out.push(b' ');
            }
            out.extend_from_slice(part);
        }

        let sensitive = v.is_sensitive();
        *v = HeaderValue::from_bytes(&out)?;
        v.set_sensitive(sensitive);
        Ok(())
    }

    /// Get header names as sorted vector.
    pub fn header_name_to_vec_sorted(&self) -> Vec<&str> {
        let mut h = self
            .headers
            .keys()
            .map(|k| k.as_str())
            .collect::<Vec<&str>>();
        h.sort_unstable();

        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn parts(uri: &str) -> http::request::Parts {
        http::Request::get(uri)
            .header("content-type", "application/json")
            .body(())
            .expect("request must be valid")
            .into_parts()
            .0
    }

    #[test]
    fn test_build_and_apply() -> anyhow::Result<()> {
        let mut parts = parts("https://search.example.com/books/_doc/1?refresh=wait_for&timeout=5m");

        let req = SigningRequest::build(&mut parts)?;
        assert_eq!(req.authority.as_str(), "search.example.com");
        assert_eq!(req.path, "/books/_doc/1");
        assert_eq!(
            req.query,
            vec![
                ("refresh".to_string(), "wait_for".to_string()),
                ("timeout".to_string(), "5m".to_string())
            ]
        );
        assert!(parts.headers.is_empty());

        req.apply(&mut parts)?;
        assert_eq!(
            parts.uri.to_string(),
            "https://search.example.com/books/_doc/1?refresh=wait_for&timeout=5m"
        );
        assert_eq!(parts.headers["content-type"], "application/json");

        Ok(())
    }

    #[test]
    fn test_build_without_authority() {
        let mut parts = parts("/books/_doc/1");

        let err = SigningRequest::build(&mut parts).expect_err("must fail without host");
        assert_eq!(err.kind(), ErrorKind::RequestInvalid);
        assert_eq!(parts.uri.path(), "/books/_doc/1");
    }

    #[test_case("application/json", "application/json"; "untouched")]
    #[test_case("  application/json  ", "application/json"; "trimmed")]
    #[test_case("a   b \t c", "a b c"; "collapsed")]
    fn test_header_value_normalize(input: &str, expected: &str) {
        let mut v = HeaderValue::from_str(input).expect("header must be valid");
        SigningRequest::header_value_normalize(&mut v).expect("normalize must succeed");
        assert_eq!(v, expected);
    }
}
